//! Core identifiers and call-session data types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::ServerMessage;

/// Opaque handle naming one live bidirectional channel.
///
/// Generated at accept time; never reused within a process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-owning reference to a live connection: an id plus the sender half
/// of that connection's outbound event channel.
///
/// Cloning or dropping a handle never affects the socket itself; the
/// connection loop owns the receiver and the socket. A send to a closed
/// channel simply reports non-delivery.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Deliver an event to this connection, best-effort.
    ///
    /// Returns `false` when the connection has already gone away. That
    /// race (resolve succeeds, target disconnects before delivery) is
    /// expected and never escalated.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Unique key for one call attempt's lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Compose a session key from the two parties and the creation
    /// instant. Millisecond resolution keeps keys unique within the
    /// process for any realistic call rate.
    pub fn compose(caller: &str, callee: &str, at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}-{}", caller, callee, at.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Initiated,
    Active,
    Ended,
    Rejected,
}

impl CallStatus {
    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Ended | CallStatus::Rejected)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallStatus::Initiated => "initiated",
            CallStatus::Active => "active",
            CallStatus::Ended => "ended",
            CallStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// One call attempt between two identified users.
///
/// Owned exclusively by the session store; everything else refers to it
/// by `SessionId` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub id: SessionId,
    pub caller: String,
    pub callee: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl CallSession {
    pub fn new(caller: String, callee: String, appointment_id: Option<String>) -> Self {
        let started_at = Utc::now();
        Self {
            id: SessionId::compose(&caller, &callee, started_at),
            caller,
            callee,
            appointment_id,
            status: CallStatus::Initiated,
            started_at,
            accepted_at: None,
            ended_at: None,
            duration_secs: None,
        }
    }
}

/// Outcome written back to an appointment record when a call ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    pub ended_at: DateTime<Utc>,
}

impl CallOutcome {
    pub fn completed(duration_secs: Option<u64>, ended_at: DateTime<Utc>) -> Self {
        Self {
            status: "completed".to_string(),
            duration_secs,
            ended_at,
        }
    }
}
