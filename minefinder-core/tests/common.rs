#![allow(dead_code)]

use minefinder_core::{Board, ClientGame, Room};
use minefinder_types::{BoardConfig, CellPos, ClientMessage, MinePlacement, ServerMessage};

/// Builds a board with mines at fixed coordinates
pub fn board_with_layout(width: u16, height: u16, safe: (u16, u16), mines: &[(u16, u16)]) -> Board {
    let mut board = Board::new(BoardConfig::custom(width, height, mines.len() as u32));
    board
        .apply_mine_placement(&layout(safe, mines))
        .expect("layout should fit the board");
    board
}

pub fn layout(safe: (u16, u16), mines: &[(u16, u16)]) -> MinePlacement {
    MinePlacement {
        safe: safe.into(),
        mines: mines.iter().map(|&pos| pos.into()).collect(),
    }
}

/// Creates a room whose members joined in the given order
pub fn create_room_with(name: &str, members: &[&str]) -> Room {
    let mut room = Room::new(name);
    for member in members {
        room.join(member);
    }
    room
}

pub fn all_positions(board: &Board) -> Vec<CellPos> {
    let config = board.config();
    (0..config.width)
        .flat_map(|x| (0..config.height).map(move |y| CellPos::new(x, y)))
        .collect()
}

/// Asserts two boards show exactly the same cells
pub fn assert_boards_match(left: &Board, right: &Board) {
    assert_eq!(left.config(), right.config());
    assert_eq!(left.cells_remaining(), right.cells_remaining());
    for pos in all_positions(left) {
        assert_eq!(
            left.cell(pos).unwrap(),
            right.cell(pos).unwrap(),
            "cell {} differs",
            pos
        );
    }
}

/// Stands in for the server when relaying a leader's layout to a peer
pub fn relay_layout(messages: &[ClientMessage], peer: &mut ClientGame) -> Vec<ClientMessage> {
    let mut replies = Vec::new();
    for message in messages {
        if let ClientMessage::GameBoardCreated { placement, .. } = message {
            replies.extend(
                peer.handle_server_message(ServerMessage::UpdateGameBoard {
                    placement: placement.clone(),
                })
                .expect("peer should accept the layout"),
            );
        }
    }
    replies
}
