//! Presence, call sessions and signaling relay for telemedicine video
//! calls.
//!
//! Two parties (a caller and a callee) discover each other's live
//! presence and exchange WebRTC negotiation messages through a relay,
//! while a call-session ledger tracks the call lifecycle independently
//! of the transient connection carrying the signaling. Everything is
//! in-memory and single-process; persistence, authentication and media
//! transport live outside this crate.
//!
//! The pieces:
//!
//! - [`PresenceRegistry`] — identity <-> connection mapping.
//! - [`CallSessionManager`] — initiated/active/ended/rejected lifecycle
//!   with a grace-period purge of ended sessions.
//! - [`RoomCoordinator`] — connections grouped under an appointment.
//! - [`SignalHub`] — the relay wiring those together for the
//!   connection loop.

pub mod appointments;
pub mod error;
pub mod events;
pub mod ice;
pub mod presence;
pub mod relay;
pub mod room;
pub mod session;
pub mod types;

pub use appointments::{AppointmentDirectory, AppointmentRef, InMemoryAppointments};
pub use error::{Result, SignalingError};
pub use events::{ClientMessage, ServerMessage};
pub use ice::{IceConfig, IceServer};
pub use presence::PresenceRegistry;
pub use relay::SignalHub;
pub use room::RoomCoordinator;
pub use session::{CallSessionManager, DEFAULT_GRACE_PERIOD};
pub use types::{
    CallOutcome, CallSession, CallStatus, ConnectionHandle, ConnectionId, SessionId,
};
