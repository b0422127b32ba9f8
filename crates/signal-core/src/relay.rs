//! Signaling relay: routes typed messages to live connections.
//!
//! The hub composes the presence registry, the room coordinator and the
//! table of every live connection, mirroring how the connection loop
//! drives it: register on accept, identify on the client's say-so,
//! route/broadcast while connected, disconnect on close. Routing itself
//! is stateless; address resolution is the registry's job.

use dashmap::DashMap;

use crate::events::ServerMessage;
use crate::presence::PresenceRegistry;
use crate::room::RoomCoordinator;
use crate::types::{ConnectionHandle, ConnectionId};

#[derive(Default)]
pub struct SignalHub {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    presence: PresenceRegistry,
    rooms: RoomCoordinator,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly accepted connection. Presence stays unknown until
    /// the client identifies.
    pub fn register(&self, handle: ConnectionHandle) {
        tracing::debug!(connection = %handle.id(), "connection registered");
        self.connections.insert(handle.id().clone(), handle);
    }

    /// Bind an identity to a connection and broadcast the presence
    /// transition to every live connection.
    ///
    /// Returns `false` for an unknown connection or an empty identity
    /// (both no-ops). A displaced connection is told its identity was
    /// re-bound; it is not disconnected.
    pub async fn identify(&self, connection: &ConnectionId, identity: &str) -> bool {
        let Some(handle) = self.connections.get(connection).map(|h| h.clone()) else {
            return false;
        };
        let outcome = self.presence.identify(identity, handle).await;
        if !outcome.registered {
            return false;
        }
        if let Some(displaced) = outcome.displaced {
            displaced.send(ServerMessage::PresenceReplaced {
                user_id: identity.to_string(),
            });
        }
        self.broadcast(ServerMessage::Presence {
            user_id: identity.to_string(),
            online: true,
        });
        true
    }

    /// Identity bound to a connection, if it has identified.
    pub async fn identity_of(&self, connection: &ConnectionId) -> Option<String> {
        self.presence.identity_of(connection).await
    }

    /// Route a message to the connection bound to `target`.
    ///
    /// `false` means the target is unreachable (never identified, or its
    /// channel already closed); the caller decides whether that is worth
    /// surfacing.
    pub async fn route(&self, target: &str, message: ServerMessage) -> bool {
        match self.presence.resolve(target).await {
            Some(handle) => handle.send(message),
            None => {
                tracing::debug!(target, "route target not online");
                false
            }
        }
    }

    /// Fire-and-forget delivery to every live connection.
    pub fn broadcast(&self, message: ServerMessage) {
        for entry in self.connections.iter() {
            entry.value().send(message.clone());
        }
    }

    /// Fire-and-forget delivery to every room member except `exclude`
    /// (normally the sender).
    pub async fn broadcast_to_room(
        &self,
        room_id: &str,
        exclude: Option<&ConnectionId>,
        message: ServerMessage,
    ) {
        for member in self.rooms.members(room_id).await {
            if exclude.is_some_and(|id| id == member.handle.id()) {
                continue;
            }
            member.handle.send(message.clone());
        }
    }

    /// Join a room under an appointment reference. Joining identifies
    /// the connection, notifies the members already present and confirms
    /// to the joiner only.
    pub async fn join_room(&self, connection: &ConnectionId, room_id: &str, identity: &str) -> bool {
        let Some(handle) = self.connections.get(connection).map(|h| h.clone()) else {
            return false;
        };
        if !self.identify(connection, identity).await {
            return false;
        }

        let existing = self.rooms.join(room_id, identity, handle.clone()).await;
        let peers: Vec<String> = existing.iter().map(|m| m.identity.clone()).collect();
        for member in &existing {
            member.handle.send(ServerMessage::PeerJoined {
                appointment_id: room_id.to_string(),
                user_id: identity.to_string(),
            });
        }
        handle.send(ServerMessage::RoomJoined {
            appointment_id: room_id.to_string(),
            peers,
        });
        true
    }

    /// Connection teardown: leave every room, drop the presence binding
    /// and broadcast offline if the connection had identified.
    pub async fn disconnect(&self, connection: &ConnectionId) {
        self.connections.remove(connection);
        self.rooms.remove_connection(connection).await;
        if let Some(identity) = self.presence.remove(connection).await {
            self.broadcast(ServerMessage::Presence {
                user_id: identity,
                online: false,
            });
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomCoordinator {
        &self.rooms
    }
}
