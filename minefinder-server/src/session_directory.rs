use minefinder_core::Room;
use minefinder_types::{GameError, RoomSummary, ServerMessage};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::DuplicateUsernamePolicy;
use crate::websocket::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Connection(ConnectionId),
    Everyone,
}

/// One message to deliver once the directory has been updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

impl Dispatch {
    pub fn to(connection_id: ConnectionId, message: ServerMessage) -> Self {
        Self {
            recipient: Recipient::Connection(connection_id),
            message,
        }
    }

    pub fn everyone(message: ServerMessage) -> Self {
        Self {
            recipient: Recipient::Everyone,
            message,
        }
    }
}

/// Messages produced by one directory operation, in delivery order.
pub type Outbox = Vec<Dispatch>;

/// The directory as shared by every connection task. Holding the lock
/// while delivering an outbox keeps events in order across connections.
pub type SharedDirectory = Arc<Mutex<SessionDirectory>>;

/// Registry of usernames and rooms. Operations never touch sockets; they
/// return the messages the transport should deliver.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    pub(crate) usernames: HashMap<String, ConnectionId>,
    pub(crate) rooms: BTreeMap<String, Room>,
    duplicate_policy: DuplicateUsernamePolicy,
}

impl SessionDirectory {
    pub fn new(duplicate_policy: DuplicateUsernamePolicy) -> Self {
        Self {
            usernames: HashMap::new(),
            rooms: BTreeMap::new(),
            duplicate_policy,
        }
    }

    pub fn connection_for(&self, username: &str) -> Option<ConnectionId> {
        self.usernames.get(username).copied()
    }

    pub fn room(&self, room_name: &str) -> Option<&Room> {
        self.rooms.get(room_name)
    }

    pub fn user_count(&self) -> usize {
        self.usernames.len()
    }

    /// Room names in name order.
    pub fn room_list(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        self.rooms.values().map(Room::summary).collect()
    }

    pub fn register_user(
        &mut self,
        username: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, GameError> {
        if username.trim().is_empty() {
            return Err(GameError::EmptyName);
        }

        match self.usernames.get(username) {
            Some(&bound) if bound != connection_id => match self.duplicate_policy {
                DuplicateUsernamePolicy::Reject => {
                    return Err(GameError::UsernameTaken {
                        username: username.to_string(),
                    });
                }
                DuplicateUsernamePolicy::Replace => {
                    warn!(
                        "Username {} moves from connection {} to {}",
                        username, bound, connection_id
                    );
                }
            },
            _ => {}
        }

        self.usernames.insert(username.to_string(), connection_id);
        info!("Registered user {} on {}", username, connection_id);

        Ok(vec![Dispatch::to(connection_id, self.room_list_message())])
    }

    /// Drops the username binding. Room membership is left to the caller.
    pub fn unregister_user(
        &mut self,
        username: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, GameError> {
        self.authenticate(username, connection_id)?;
        self.usernames.remove(username);
        info!("Unregistered user {}", username);
        Ok(Vec::new())
    }

    /// Creates the room and joins the creator to it as leader. An existing
    /// room is never overwritten.
    pub fn create_room(
        &mut self,
        room_name: &str,
        creator: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, GameError> {
        self.authenticate(creator, connection_id)?;
        if room_name.trim().is_empty() {
            return Err(GameError::EmptyName);
        }
        if self.rooms.contains_key(room_name) {
            return Err(GameError::RoomAlreadyExists {
                room_name: room_name.to_string(),
            });
        }

        self.rooms
            .insert(room_name.to_string(), Room::new(room_name));
        info!("Room {} created by {}", room_name, creator);

        let mut outbox = vec![Dispatch::everyone(self.room_list_message())];
        outbox.extend(self.join_room(room_name, creator, connection_id)?);
        Ok(outbox)
    }

    pub fn join_room(
        &mut self,
        room_name: &str,
        username: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, GameError> {
        self.authenticate(username, connection_id)?;
        let room = self.room_mut(room_name)?;
        if room.is_member(username) {
            return Ok(Vec::new());
        }

        let outcome = room.join(username);
        let mode = room.mode();
        info!(
            "{} joined room {}{}",
            username,
            room_name,
            if outcome.joined_mid_round {
                " mid-round"
            } else {
                ""
            }
        );

        let mut outbox = vec![Dispatch::to(
            connection_id,
            ServerMessage::ResetGameBoard { mode },
        )];
        if outcome.became_leader {
            outbox.push(Dispatch::to(connection_id, ServerMessage::SetUserAsLeader));
        }
        outbox.extend(self.roster_dispatches(room_name));
        Ok(outbox)
    }

    pub fn leave_room(
        &mut self,
        room_name: &str,
        username: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, GameError> {
        self.authenticate(username, connection_id)?;
        self.remove_member(room_name, username, connection_id)
    }

    /// Tears down everything bound to a closed connection: each of its
    /// usernames leaves every room it is in and is then unregistered.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Outbox {
        let mut bound: Vec<String> = self
            .usernames
            .iter()
            .filter(|&(_, &id)| id == connection_id)
            .map(|(name, _)| name.clone())
            .collect();
        bound.sort();

        let mut outbox = Vec::new();
        for username in bound {
            let joined: Vec<String> = self
                .rooms
                .values()
                .filter(|room| room.is_member(&username))
                .map(|room| room.name().to_string())
                .collect();

            for room_name in joined {
                match self.remove_member(&room_name, &username, connection_id) {
                    Ok(dispatches) => outbox.extend(dispatches),
                    Err(e) => warn!("Failed to remove {} from {}: {}", username, room_name, e),
                }
            }

            self.usernames.remove(&username);
            info!("User {} disconnected", username);
        }

        // The closed connection cannot receive anything.
        outbox.retain(|dispatch| dispatch.recipient != Recipient::Connection(connection_id));
        outbox
    }

    /// Replays the state a client needs to rebuild its view of `room_name`.
    pub fn resync(
        &self,
        room_name: &str,
        username: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, GameError> {
        self.authenticate(username, connection_id)?;

        let mut outbox = vec![Dispatch::to(connection_id, self.room_list_message())];
        let Some(room) = self.rooms.get(room_name) else {
            return Ok(outbox);
        };
        if !room.is_member(username) {
            return Ok(outbox);
        }

        outbox.push(Dispatch::to(
            connection_id,
            ServerMessage::UpdatePlayersInRoom {
                players: room.roster(),
            },
        ));
        if room.is_leader(username) {
            outbox.push(Dispatch::to(connection_id, ServerMessage::SetUserAsLeader));
        }

        let still_playing = room
            .status(username)
            .is_some_and(|status| !status.finished);
        if !room.round_in_progress() || !still_playing {
            return Ok(outbox);
        }
        if let Some(placement) = room.placement() {
            outbox.push(Dispatch::to(
                connection_id,
                ServerMessage::ResetGameBoard { mode: room.mode() },
            ));
            outbox.push(Dispatch::to(
                connection_id,
                ServerMessage::UpdateGameBoard {
                    placement: placement.clone(),
                },
            ));
        }
        Ok(outbox)
    }

    /// Checks that `username` is registered to the connection it arrived on.
    pub(crate) fn authenticate(
        &self,
        username: &str,
        connection_id: ConnectionId,
    ) -> Result<(), GameError> {
        match self.usernames.get(username) {
            Some(&bound) if bound == connection_id => Ok(()),
            Some(_) => Err(GameError::IdentityMismatch {
                username: username.to_string(),
            }),
            None => Err(GameError::UserNotFound {
                username: username.to_string(),
            }),
        }
    }

    pub(crate) fn room_mut(&mut self, room_name: &str) -> Result<&mut Room, GameError> {
        self.rooms
            .get_mut(room_name)
            .ok_or_else(|| GameError::RoomNotFound {
                room_name: room_name.to_string(),
            })
    }

    pub(crate) fn room_ref(&self, room_name: &str) -> Result<&Room, GameError> {
        self.rooms
            .get(room_name)
            .ok_or_else(|| GameError::RoomNotFound {
                room_name: room_name.to_string(),
            })
    }

    /// Sends `message` to every registered member of the room except
    /// `except`.
    pub(crate) fn member_dispatches(
        &self,
        room_name: &str,
        except: Option<&str>,
        message: &ServerMessage,
    ) -> Outbox {
        let Some(room) = self.rooms.get(room_name) else {
            return Vec::new();
        };
        room.members()
            .iter()
            .filter(|member| Some(member.as_str()) != except)
            .filter_map(|member| self.usernames.get(member))
            .map(|&id| Dispatch::to(id, message.clone()))
            .collect()
    }

    pub(crate) fn roster_dispatches(&self, room_name: &str) -> Outbox {
        let Some(room) = self.rooms.get(room_name) else {
            return Vec::new();
        };
        let message = ServerMessage::UpdatePlayersInRoom {
            players: room.roster(),
        };
        self.member_dispatches(room_name, None, &message)
    }

    fn room_list_message(&self) -> ServerMessage {
        ServerMessage::UpdateRoomList {
            rooms: self.room_list(),
        }
    }

    fn remove_member(
        &mut self,
        room_name: &str,
        username: &str,
        connection_id: ConnectionId,
    ) -> Result<Outbox, GameError> {
        let room = self.room_mut(room_name)?;
        let outcome = room.leave(username)?;
        info!("{} left room {}", username, room_name);

        if outcome.room_empty {
            self.rooms.remove(room_name);
            info!("Room {} removed", room_name);
            return Ok(vec![Dispatch::everyone(self.room_list_message())]);
        }

        // A departure can leave only finished members behind.
        if room.try_adjudicate().is_some() {
            info!("Round in {} settled after {} left", room_name, username);
        }

        let mut outbox = Vec::new();
        if let Some(new_leader) = outcome.new_leader {
            if let Some(id) = self.connection_for(&new_leader) {
                outbox.push(Dispatch::to(id, ServerMessage::SetUserAsLeader));
            }
        }
        outbox.push(Dispatch::to(connection_id, self.room_list_message()));
        outbox.extend(self.roster_dispatches(room_name));
        Ok(outbox)
    }
}
