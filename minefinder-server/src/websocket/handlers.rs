use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session_directory::{Outbox, Recipient, SharedDirectory};
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use minefinder_types::{ClientMessage, ErrorKind, GameError, ServerMessage};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    directory: SharedDirectory,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        directory: SharedDirectory,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            directory,
        }
    }

    /// Applies one event and delivers its outbox before the directory is
    /// released. Rejected events are logged; only a duplicate username is
    /// answered.
    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        let event = message.event_name();
        let id = self.connection_id;
        let mut directory = self.directory.lock().await;

        let result = match message {
            ClientMessage::UserCreated { username } => directory.register_user(&username, id),
            ClientMessage::UserDeleted { username } => directory.unregister_user(&username, id),
            ClientMessage::RoomCreated {
                room_name,
                username,
            } => directory.create_room(&room_name, &username, id),
            ClientMessage::UserJoinedRoom {
                room_name,
                username,
            } => directory.join_room(&room_name, &username, id),
            ClientMessage::UserLeftRoom {
                room_name,
                username,
            } => directory.leave_room(&room_name, &username, id),
            ClientMessage::GameBoardCreated {
                username,
                room_name,
                placement,
            } => directory.on_board_created(&room_name, &username, id, placement),
            ClientMessage::GameBoardReset {
                username,
                room_name,
                mode,
            } => directory.on_board_reset(&room_name, &username, id, mode),
            ClientMessage::GameCellFlagged {
                username,
                room_name,
                mines_remaining,
            } => directory.on_cell_flagged(&room_name, &username, id, mines_remaining),
            ClientMessage::GameFinished {
                username,
                room_name,
                won,
                mines_remaining,
                elapsed_seconds,
            } => directory.on_game_finished(
                &room_name,
                &username,
                id,
                won,
                mines_remaining,
                elapsed_seconds,
            ),
            ClientMessage::RequestResync {
                username,
                room_name,
            } => directory.resync(&room_name, &username, id),
            ClientMessage::Heartbeat => Ok(Vec::new()),
        };

        let outcome = match result {
            Ok(outbox) => {
                self.deliver(outbox).await;
                Ok(())
            }
            Err(e) => self.handle_rejection(event, e).await,
        };
        drop(directory);
        outcome
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);

        let mut directory = self.directory.lock().await;
        let outbox = directory.disconnect(self.connection_id);
        self.deliver(outbox).await;
    }

    pub async fn send_error(&self, error_message: &str) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(
                self.connection_id,
                ServerMessage::Error {
                    message: error_message.to_string(),
                },
            )
            .await
    }

    async fn handle_rejection(&self, event: &str, error: GameError) -> Result<(), String> {
        match error.kind() {
            ErrorKind::DuplicateIdentity => {
                warn!("Rejected {} from {}: {}", event, self.connection_id, error);
                self.send_error(&error.to_string()).await
            }
            ErrorKind::ProtocolViolation => {
                warn!("Ignored {} from {}: {}", event, self.connection_id, error);
                Ok(())
            }
            ErrorKind::DesyncState => {
                debug!("Stale {} from {}: {}", event, self.connection_id, error);
                Ok(())
            }
        }
    }

    async fn deliver(&self, outbox: Outbox) {
        for dispatch in outbox {
            match dispatch.recipient {
                Recipient::Connection(id) => {
                    if let Err(e) = self
                        .connection_manager
                        .send_to_connection(id, dispatch.message)
                        .await
                    {
                        debug!("Dropped message for {}: {}", id, e);
                    }
                }
                Recipient::Everyone => self.connection_manager.send_to_all(dispatch.message).await,
            }
        }
    }
}
