//! Room coordinator: connections grouped under an appointment reference.
//!
//! Rooms come into being on first join and are reaped as soon as their
//! last member disconnects; nothing has to tear them down explicitly,
//! though `leave` and `close` are exposed for deterministic cleanup.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::types::{ConnectionHandle, ConnectionId};

/// A room member: the joining identity plus its connection handle.
#[derive(Debug, Clone)]
pub struct RoomMember {
    pub identity: String,
    pub handle: ConnectionHandle,
}

#[derive(Default)]
struct Room {
    members: HashMap<ConnectionId, RoomMember>,
}

/// Per-appointment grouping of live connections.
#[derive(Default)]
pub struct RoomCoordinator {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room on first join.
    ///
    /// Returns the members that were already present, so the caller can
    /// notify them of the new joiner.
    pub async fn join(
        &self,
        room_id: &str,
        identity: &str,
        handle: ConnectionHandle,
    ) -> Vec<RoomMember> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_string()).or_default();
        let existing: Vec<RoomMember> = room
            .members
            .values()
            .filter(|m| m.handle.id() != handle.id())
            .cloned()
            .collect();
        room.members.insert(
            handle.id().clone(),
            RoomMember {
                identity: identity.to_string(),
                handle,
            },
        );
        tracing::debug!(room = room_id, identity, members = room.members.len(), "joined room");
        existing
    }

    /// Current members of a room; empty when the room does not exist.
    pub async fn members(&self, room_id: &str) -> Vec<RoomMember> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(|room| room.members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove one connection from one room, reaping it when empty.
    pub async fn leave(&self, room_id: &str, connection: &ConnectionId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };
        let removed = room.members.remove(connection).is_some();
        if room.members.is_empty() {
            rooms.remove(room_id);
            tracing::debug!(room = room_id, "room reaped");
        }
        removed
    }

    /// Remove a connection from every room it belongs to (disconnect
    /// path). Returns the rooms it left.
    pub async fn remove_connection(&self, connection: &ConnectionId) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|room_id, room| {
            if room.members.remove(connection).is_some() {
                left.push(room_id.clone());
            }
            !room.members.is_empty()
        });
        left
    }

    /// Deterministic teardown for tests and administrative cleanup.
    pub async fn close(&self, room_id: &str) -> bool {
        self.rooms.write().await.remove(room_id).is_some()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ServerMessage;
    use tokio::sync::mpsc;

    fn handle() -> (
        ConnectionHandle,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(tx), rx)
    }

    #[tokio::test]
    async fn join_reports_existing_members_only() {
        let rooms = RoomCoordinator::new();
        let (a, _ra) = handle();
        let (b, _rb) = handle();

        let existing = rooms.join("appt-1", "alice", a.clone()).await;
        assert!(existing.is_empty());

        let existing = rooms.join("appt-1", "bob", b.clone()).await;
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].identity, "alice");

        assert_eq!(rooms.members("appt-1").await.len(), 2);
    }

    #[tokio::test]
    async fn room_created_on_first_join_and_reaped_when_empty() {
        let rooms = RoomCoordinator::new();
        let (a, _ra) = handle();

        assert_eq!(rooms.room_count().await, 0);
        rooms.join("appt-1", "alice", a.clone()).await;
        assert_eq!(rooms.room_count().await, 1);

        assert!(rooms.leave("appt-1", a.id()).await);
        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn disconnect_leaves_all_rooms() {
        let rooms = RoomCoordinator::new();
        let (a, _ra) = handle();
        let (b, _rb) = handle();

        rooms.join("appt-1", "alice", a.clone()).await;
        rooms.join("appt-2", "alice", a.clone()).await;
        rooms.join("appt-2", "bob", b.clone()).await;

        let mut left = rooms.remove_connection(a.id()).await;
        left.sort();
        assert_eq!(left, vec!["appt-1", "appt-2"]);

        // appt-1 is reaped, appt-2 still holds bob.
        assert_eq!(rooms.room_count().await, 1);
        assert_eq!(rooms.members("appt-2").await.len(), 1);
    }

    #[tokio::test]
    async fn explicit_close() {
        let rooms = RoomCoordinator::new();
        let (a, _ra) = handle();
        rooms.join("appt-1", "alice", a).await;
        assert!(rooms.close("appt-1").await);
        assert!(!rooms.close("appt-1").await);
    }
}
