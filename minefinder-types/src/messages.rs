use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::{MinePlacement, Mode, PlayerStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum ClientMessage {
    UserCreated {
        username: String,
    },
    UserDeleted {
        username: String,
    },
    RoomCreated {
        room_name: String,
        username: String,
    },
    UserJoinedRoom {
        room_name: String,
        username: String,
    },
    UserLeftRoom {
        room_name: String,
        username: String,
    },
    GameBoardCreated {
        username: String,
        room_name: String,
        placement: MinePlacement,
    },
    GameBoardReset {
        username: String,
        room_name: String,
        mode: Mode,
    },
    GameCellFlagged {
        username: String,
        room_name: String,
        mines_remaining: i32,
    },
    GameFinished {
        username: String,
        room_name: String,
        won: bool,
        mines_remaining: i32,
        elapsed_seconds: f64,
    },
    RequestResync {
        username: String,
        room_name: String,
    },
    Heartbeat,
}

impl ClientMessage {
    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::UserCreated { .. } => "user-created",
            ClientMessage::UserDeleted { .. } => "user-deleted",
            ClientMessage::RoomCreated { .. } => "room-created",
            ClientMessage::UserJoinedRoom { .. } => "user-joined-room",
            ClientMessage::UserLeftRoom { .. } => "user-left-room",
            ClientMessage::GameBoardCreated { .. } => "game-board-created",
            ClientMessage::GameBoardReset { .. } => "game-board-reset",
            ClientMessage::GameCellFlagged { .. } => "game-cell-flagged",
            ClientMessage::GameFinished { .. } => "game-finished",
            ClientMessage::RequestResync { .. } => "request-resync",
            ClientMessage::Heartbeat => "heartbeat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum ServerMessage {
    UpdateRoomList {
        rooms: Vec<String>,
    },
    UpdatePlayersInRoom {
        players: BTreeMap<String, PlayerStatus>,
    },
    UpdateGameBoard {
        placement: MinePlacement,
    },
    ResetGameBoard {
        mode: Mode,
    },
    SetUserAsLeader,
    Error {
        message: String,
    },
}
