use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::Mode;

/// Race result assigned once every member of the room has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OverallResult {
    Won,
    Lost,
}

/// Per-member view of the current round, as shown in the room roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerStatus {
    pub mines_remaining: i32,
    pub finished: bool,
    pub won: Option<bool>,
    pub elapsed_seconds: Option<f64>,
    pub is_leader: bool,
    pub overall_result: Option<OverallResult>,
}

impl PlayerStatus {
    pub fn new(is_leader: bool) -> Self {
        Self {
            is_leader,
            ..Default::default()
        }
    }

    /// Clears everything but leadership for a new round.
    pub fn reset(&mut self) {
        *self = Self::new(self.is_leader);
    }

    /// Whether the member actually played the round (as opposed to joining
    /// while it was already running).
    pub fn played_round(&self) -> bool {
        self.won.is_some()
    }
}

/// Lobby listing entry served over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomSummary {
    pub name: String,
    pub players: u32,
    pub game_started: bool,
    pub mode: Mode,
    pub created_at: String, // RFC 3339
}
