use minefinder_core::Board;
use minefinder_types::{GameError, MinePlacement, Mode, ServerMessage};
use tracing::info;

use crate::session_directory::{Outbox, SessionDirectory};
use crate::websocket::ConnectionId;

/// Round events. Each one is scoped to a room and must come from a member
/// registered on the sending connection.
impl SessionDirectory {
    /// Starts the round with the leader's layout and relays it to the other
    /// members.
    pub fn on_board_created(
        &mut self,
        room_name: &str,
        origin: &str,
        connection_id: ConnectionId,
        placement: MinePlacement,
    ) -> Result<Outbox, GameError> {
        self.authenticate(origin, connection_id)?;

        // Every peer applies the layout to a board of the room's mode.
        let mode = self.room_ref(room_name)?.mode();
        Board::with_mode(mode).apply_mine_placement(&placement)?;

        let room = self.room_mut(room_name)?;
        room.start_round(origin, placement.clone())?;
        info!(
            "Round started in {} by {} with {} mines",
            room_name,
            origin,
            placement.mines.len()
        );

        let mut outbox = self.member_dispatches(
            room_name,
            Some(origin),
            &ServerMessage::UpdateGameBoard { placement },
        );
        outbox.extend(self.roster_dispatches(room_name));
        Ok(outbox)
    }

    pub fn on_board_reset(
        &mut self,
        room_name: &str,
        origin: &str,
        connection_id: ConnectionId,
        mode: Mode,
    ) -> Result<Outbox, GameError> {
        self.authenticate(origin, connection_id)?;
        self.room_mut(room_name)?.reset_round(origin, mode)?;
        info!("Room {} reset to {} by {}", room_name, mode, origin);

        let mut outbox = self.member_dispatches(
            room_name,
            Some(origin),
            &ServerMessage::ResetGameBoard { mode },
        );
        outbox.extend(self.roster_dispatches(room_name));
        Ok(outbox)
    }

    pub fn on_cell_flagged(
        &mut self,
        room_name: &str,
        username: &str,
        connection_id: ConnectionId,
        mines_remaining: i32,
    ) -> Result<Outbox, GameError> {
        self.authenticate(username, connection_id)?;
        self.room_mut(room_name)?
            .record_flag(username, mines_remaining)?;
        Ok(self.roster_dispatches(room_name))
    }

    /// Records a member's result. Once every member has finished the
    /// standings are settled and a second roster carries the outcome.
    pub fn on_game_finished(
        &mut self,
        room_name: &str,
        username: &str,
        connection_id: ConnectionId,
        won: bool,
        mines_remaining: i32,
        elapsed_seconds: f64,
    ) -> Result<Outbox, GameError> {
        self.authenticate(username, connection_id)?;
        let all_finished = self.room_mut(room_name)?.record_finish(
            username,
            won,
            mines_remaining,
            elapsed_seconds,
        )?;
        info!(
            "{} finished in {} ({}, {} mines left, {}s)",
            username,
            room_name,
            if won { "won" } else { "lost" },
            mines_remaining,
            elapsed_seconds
        );

        let mut outbox = self.roster_dispatches(room_name);
        if all_finished && self.room_mut(room_name)?.try_adjudicate().is_some() {
            outbox.extend(self.roster_dispatches(room_name));
        }
        Ok(outbox)
    }
}
