//! Presence registry: who is online, and on which connection.
//!
//! Two maps kept consistent as a unit: identity -> connection handle and
//! connection -> identity. Both live behind a single `RwLock` so every
//! registry operation updates the pair inside one exclusive scope; no
//! caller can observe one map updated without the other.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::types::{ConnectionHandle, ConnectionId};

/// Result of binding an identity to a connection.
#[derive(Debug, Default)]
pub struct IdentifyOutcome {
    /// The binding was recorded (false for an empty identity no-op).
    pub registered: bool,
    /// A different live connection previously held this identity and was
    /// silently displaced.
    pub displaced: Option<ConnectionHandle>,
}

#[derive(Default)]
struct PresenceMaps {
    by_identity: HashMap<String, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, String>,
}

/// Bidirectional identity <-> connection mapping.
///
/// The registry records connections, it does not own them: displacing or
/// removing a binding never closes the underlying channel.
#[derive(Default)]
pub struct PresenceRegistry {
    inner: RwLock<PresenceMaps>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) the binding for `identity`.
    ///
    /// An empty identity is a no-op. Re-identifying from a new connection
    /// silently steals the identity (last identify wins); the displaced
    /// handle is returned so the caller can notify it. Re-identifying the
    /// same connection under a new identity drops its old binding first,
    /// keeping the two maps paired.
    pub async fn identify(&self, identity: &str, handle: ConnectionHandle) -> IdentifyOutcome {
        if identity.is_empty() {
            return IdentifyOutcome::default();
        }

        let mut maps = self.inner.write().await;

        // Drop any previous binding this connection held.
        if let Some(old_identity) = maps.by_connection.remove(handle.id()) {
            if old_identity != identity {
                maps.by_identity.remove(&old_identity);
            }
        }

        let displaced = maps
            .by_identity
            .insert(identity.to_string(), handle.clone())
            .filter(|old| old.id() != handle.id());
        if let Some(old) = &displaced {
            maps.by_connection.remove(old.id());
            tracing::debug!(identity, old_connection = %old.id(), "identity re-bound to a new connection");
        }
        maps.by_connection
            .insert(handle.id().clone(), identity.to_string());

        tracing::debug!(identity, connection = %handle.id(), "user identified");
        IdentifyOutcome {
            registered: true,
            displaced,
        }
    }

    /// Pure lookup; `None` means "target unreachable", never an error.
    pub async fn resolve(&self, identity: &str) -> Option<ConnectionHandle> {
        self.inner.read().await.by_identity.get(identity).cloned()
    }

    /// Reverse lookup of the identity bound to a connection.
    pub async fn identity_of(&self, connection: &ConnectionId) -> Option<String> {
        self.inner.read().await.by_connection.get(connection).cloned()
    }

    /// Remove both directions of the binding held by `connection`.
    ///
    /// Returns the identity that went offline, or `None` if the
    /// connection never identified (silent no-op).
    pub async fn remove(&self, connection: &ConnectionId) -> Option<String> {
        let mut maps = self.inner.write().await;
        let identity = maps.by_connection.remove(connection)?;
        // Only unbind the forward entry if it still points at us; the
        // identity may have been stolen by a newer connection since.
        if maps
            .by_identity
            .get(&identity)
            .is_some_and(|h| h.id() == connection)
        {
            maps.by_identity.remove(&identity);
        }
        tracing::debug!(identity, connection = %connection, "user went offline");
        Some(identity)
    }

    /// Identities currently online.
    pub async fn online_identities(&self) -> Vec<String> {
        self.inner.read().await.by_identity.keys().cloned().collect()
    }
}
