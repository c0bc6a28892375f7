use anyhow::{Context, Result, anyhow, bail};
use minefinder_types::{CellPos, ClientMessage, Mode, PlayerStatus, ServerMessage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{Board, RevealOutcome};

/// Client-side game loop: owns the local board and turns player input and
/// server events into the messages to send. Rendering reads the board
/// through [`ClientGame::board`].
#[derive(Debug)]
pub struct ClientGame {
    username: Option<String>,
    room: Option<String>,
    is_leader: bool,
    round_started: bool,
    mode: Mode,
    board: Board,
    started_at: Option<Instant>,
    rooms: Vec<String>,
    players: BTreeMap<String, PlayerStatus>,
    rng: StdRng,
}

impl Default for ClientGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientGame {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mode = Mode::default();
        Self {
            username: None,
            room: None,
            is_leader: false,
            round_started: false,
            mode,
            board: Board::with_mode(mode),
            started_at: None,
            rooms: Vec::new(),
            players: BTreeMap::new(),
            rng,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    pub fn round_started(&self) -> bool {
        self.round_started
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    pub fn players(&self) -> &BTreeMap<String, PlayerStatus> {
        &self.players
    }

    /// Solo players and room leaders decide when a round starts.
    pub fn may_control_game(&self) -> bool {
        self.room.is_none() || self.is_leader
    }

    pub fn register(&mut self, username: &str) -> Vec<ClientMessage> {
        self.username = Some(username.to_string());
        vec![ClientMessage::UserCreated {
            username: username.to_string(),
        }]
    }

    pub fn log_out(&mut self) -> Vec<ClientMessage> {
        let mut messages = self.leave_room();
        if let Some(username) = self.username.take() {
            messages.push(ClientMessage::UserDeleted { username });
        }
        messages
    }

    /// Opens a room and leads it. New rooms always start in the default
    /// mode, so a solo board in another mode is discarded.
    pub fn create_room(&mut self, room_name: &str) -> Result<Vec<ClientMessage>> {
        let username = self.require_username()?;
        if self.rooms.iter().any(|room| room == room_name) {
            bail!("room {} already exists", room_name);
        }
        let mut messages = self.leave_room();
        messages.push(ClientMessage::RoomCreated {
            room_name: room_name.to_string(),
            username,
        });
        self.room = Some(room_name.to_string());
        self.is_leader = true;
        self.reset_board(Mode::default());
        Ok(messages)
    }

    pub fn join_room(&mut self, room_name: &str) -> Result<Vec<ClientMessage>> {
        let username = self.require_username()?;
        let mut messages = self.leave_room();
        messages.push(ClientMessage::UserJoinedRoom {
            room_name: room_name.to_string(),
            username,
        });
        self.room = Some(room_name.to_string());
        self.reset_board(self.mode);
        Ok(messages)
    }

    pub fn leave_room(&mut self) -> Vec<ClientMessage> {
        let Some(room_name) = self.room.take() else {
            return Vec::new();
        };
        self.is_leader = false;
        self.players.clear();
        self.reset_board(self.mode);

        match self.username.clone() {
            Some(username) => vec![ClientMessage::UserLeftRoom {
                room_name,
                username,
            }],
            None => Vec::new(),
        }
    }

    /// Starts a fresh board in `mode`. Followers in a room cannot do this.
    pub fn new_game(&mut self, mode: Mode) -> Vec<ClientMessage> {
        if !self.may_control_game() {
            debug!("Ignoring new game request from a non-leader");
            return Vec::new();
        }
        self.reset_board(mode);

        match (self.room.clone(), self.username.clone()) {
            (Some(room_name), Some(username)) => vec![ClientMessage::GameBoardReset {
                username,
                room_name,
                mode,
            }],
            _ => Vec::new(),
        }
    }

    /// Reveals a cell, placing the mines first if this is the opening click.
    pub fn reveal(&mut self, pos: CellPos) -> Result<Vec<ClientMessage>> {
        let mut messages = Vec::new();
        if self.board.is_game_over() {
            return Ok(messages);
        }

        if !self.board.mines_placed() {
            if !self.may_control_game() {
                debug!("Waiting for the room leader to start the round");
                return Ok(messages);
            }
            let placement = self.board.place_mines(pos, &mut self.rng)?;
            self.round_started = true;
            self.started_at = Some(Instant::now());
            if let Some((room_name, username)) = self.room_identity() {
                messages.push(ClientMessage::GameBoardCreated {
                    username,
                    room_name,
                    placement,
                });
            }
        } else if !self.round_started {
            return Ok(messages);
        }

        let outcome = self.board.reveal_from(pos)?;
        messages.extend(self.finish_messages(outcome));
        Ok(messages)
    }

    pub fn toggle_flag(&mut self, pos: CellPos) -> Result<Vec<ClientMessage>> {
        if !self.round_started {
            return Ok(Vec::new());
        }

        let changed = self.board.toggle_flag(pos)?;
        match (changed, self.room_identity()) {
            (true, Some((room_name, username))) => Ok(vec![ClientMessage::GameCellFlagged {
                username,
                room_name,
                mines_remaining: self.board.mines_remaining(),
            }]),
            _ => Ok(Vec::new()),
        }
    }

    /// Asks the server to replay the room state after a missed event.
    pub fn request_resync(&self) -> Vec<ClientMessage> {
        match self.room_identity() {
            Some((room_name, username)) => vec![ClientMessage::RequestResync {
                username,
                room_name,
            }],
            None => Vec::new(),
        }
    }

    /// Applies an event pushed by the server. Any messages to send back
    /// (a peer board that ends on its first reveal) are returned.
    pub fn handle_server_message(&mut self, message: ServerMessage) -> Result<Vec<ClientMessage>> {
        match message {
            ServerMessage::UpdateRoomList { rooms } => {
                self.rooms = rooms;
                Ok(Vec::new())
            }
            ServerMessage::UpdatePlayersInRoom { players } => {
                self.players = players;
                Ok(Vec::new())
            }
            ServerMessage::UpdateGameBoard { placement } => {
                self.board
                    .apply_mine_placement(&placement)
                    .with_context(|| format!("applying mine layout from {}", placement.safe))?;
                self.round_started = true;
                self.started_at = Some(Instant::now());
                let outcome = self.board.reveal_from(placement.safe)?;
                Ok(self.finish_messages(outcome))
            }
            ServerMessage::ResetGameBoard { mode } => {
                self.reset_board(mode);
                Ok(Vec::new())
            }
            ServerMessage::SetUserAsLeader => {
                info!("Promoted to room leader");
                self.is_leader = true;
                Ok(Vec::new())
            }
            ServerMessage::Error { message } => {
                warn!("Server rejected a request: {}", message);
                Err(anyhow!(message))
            }
        }
    }

    fn reset_board(&mut self, mode: Mode) {
        self.mode = mode;
        self.board = Board::with_mode(mode);
        self.round_started = false;
        self.started_at = None;
    }

    fn finish_messages(&mut self, outcome: RevealOutcome) -> Vec<ClientMessage> {
        if !outcome.is_game_over() {
            return Vec::new();
        }
        // Whole seconds, as shown on the game timer.
        let elapsed_seconds = self
            .started_at
            .map(|started| started.elapsed().as_secs() as f64)
            .unwrap_or(0.0);
        self.round_started = false;

        match self.room_identity() {
            Some((room_name, username)) => vec![ClientMessage::GameFinished {
                username,
                room_name,
                won: outcome == RevealOutcome::Won,
                mines_remaining: self.board.mines_remaining(),
                elapsed_seconds,
            }],
            None => Vec::new(),
        }
    }

    fn room_identity(&self) -> Option<(String, String)> {
        Some((self.room.clone()?, self.username.clone()?))
    }

    fn require_username(&self) -> Result<String> {
        self.username
            .clone()
            .context("register a username before entering a room")
    }
}
