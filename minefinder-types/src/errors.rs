use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::CellPos;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameError {
    #[error("Cell {pos} is outside the board")]
    InvalidCell { pos: CellPos },
    #[error("Invalid mine placement: {reason}")]
    InvalidPlacement { reason: String },
    #[error("Mines have already been placed")]
    MinesAlreadyPlaced,
    #[error("Mines have not been placed yet")]
    MinesNotPlaced,
    #[error("Name must not be empty")]
    EmptyName,
    #[error("User {username} is not registered")]
    UserNotFound { username: String },
    #[error("User {username} is registered to another connection")]
    IdentityMismatch { username: String },
    #[error("Username {username} is already taken")]
    UsernameTaken { username: String },
    #[error("Room {room_name} does not exist")]
    RoomNotFound { room_name: String },
    #[error("Room {room_name} already exists")]
    RoomAlreadyExists { room_name: String },
    #[error("User {username} is not in room {room_name}")]
    NotInRoom { room_name: String, username: String },
    #[error("User {username} is not the leader of room {room_name}")]
    NotRoomLeader { room_name: String, username: String },
    #[error("A round is already in progress in room {room_name}")]
    RoundAlreadyStarted { room_name: String },
    #[error("No round is in progress in room {room_name}")]
    RoundNotInProgress { room_name: String },
    #[error("User {username} has already finished this round")]
    AlreadyFinished { username: String },
    #[error("Elapsed time must be a finite, non-negative number")]
    InvalidElapsedTime,
}

/// How the server treats a rejected event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The event references something that does not exist or is not the
    /// sender's to act on.
    ProtocolViolation,
    /// A second connection tried to claim a username.
    DuplicateIdentity,
    /// The event belongs to a round the sender is no longer part of.
    DesyncState,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::UsernameTaken { .. } => ErrorKind::DuplicateIdentity,
            GameError::RoundAlreadyStarted { .. }
            | GameError::RoundNotInProgress { .. }
            | GameError::AlreadyFinished { .. }
            | GameError::MinesAlreadyPlaced
            | GameError::MinesNotPlaced => ErrorKind::DesyncState,
            _ => ErrorKind::ProtocolViolation,
        }
    }
}
