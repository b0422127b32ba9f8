//! Wire messages exchanged over the signaling channel.
//!
//! JSON text frames, internally tagged by `type`. The vocabulary mirrors
//! the client event names: `sendOffer` from a client becomes an
//! `incomingOffer` at its peer, and so on. Payloads (SDP blobs, ICE
//! candidates, notifications) are opaque JSON; the relay never inspects
//! them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::SessionId;

/// Client -> server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Announce identity; required before call-control events that carry
    /// the sender's identity to the peer.
    Identify { user_id: String },

    /// Join the room grouped under an appointment. Also identifies.
    JoinRoom {
        appointment_id: String,
        user_id: String,
    },

    /// Generic best-effort relay of an opaque payload.
    Signal { to_user_id: String, payload: Value },

    /// Generic best-effort notification relay.
    Notify {
        to_user_id: String,
        notification: Value,
    },

    // WebRTC negotiation
    SendOffer { remote_user_id: String, offer: Value },
    SendAnswer {
        remote_user_id: String,
        answer: Value,
    },
    SendIceCandidate {
        remote_user_id: String,
        candidate: Value,
    },
    RenegotiateOffer { remote_user_id: String, offer: Value },
    RenegotiateAnswer {
        remote_user_id: String,
        answer: Value,
    },
    /// Ask the peer to (re)send an offer.
    RequestOffer { remote_user_id: String },

    // Call control
    IncomingVideoCall {
        remote_user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caller_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        appointment_id: Option<String>,
    },
    CallAccepted {
        remote_user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        appointment_id: Option<String>,
    },
    RejectCall { remote_user_id: String },
    CallEnded { remote_user_id: String },
}

/// Server -> client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Presence transition broadcast to every live connection.
    Presence { user_id: String, online: bool },

    /// Sent to a connection whose identity was re-bound elsewhere.
    PresenceReplaced { user_id: String },

    /// Confirmation to a room joiner, with the peers already present.
    RoomJoined {
        appointment_id: String,
        peers: Vec<String>,
    },

    /// Notification to existing room members about a new joiner.
    PeerJoined {
        appointment_id: String,
        user_id: String,
    },

    Signal { payload: Value },
    Notification { notification: Value },

    IncomingOffer { offer: Value },
    IncomingAnswer { answer: Value },
    IncomingIceCandidate { candidate: Value },
    RenegotiationOffer { offer: Value },
    RenegotiationAnswer { answer: Value },
    OfferRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        from_user_id: Option<String>,
    },

    IncomingVideoCall {
        caller_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caller_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        appointment_id: Option<String>,
    },
    CallAccepted {
        peer_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        appointment_id: Option<String>,
    },
    CallRejected,
    CallEnded,

    /// A call-specific action could not reach the named party.
    CallError {
        remote_user_id: String,
        message: String,
    },

    /// Protocol-level error back to the sender (e.g. a call action
    /// arriving before `identify`).
    Error { message: String },
}
