//! Shared gateway state threaded through every handler.

use std::sync::Arc;

use telemed_signal_core::{CallSessionManager, IceConfig, SignalHub};

/// Everything the HTTP and WebSocket handlers need.
///
/// The hub is optional so the fallback signal endpoint can answer
/// "unavailable" when the gateway runs without a real-time channel; the
/// server binary always wires one in.
#[derive(Clone)]
pub struct AppState {
    pub hub: Option<Arc<SignalHub>>,
    pub sessions: Arc<CallSessionManager>,
    pub ice: Arc<IceConfig>,
}

impl AppState {
    pub fn new(
        hub: Option<Arc<SignalHub>>,
        sessions: Arc<CallSessionManager>,
        ice: Arc<IceConfig>,
    ) -> Self {
        Self { hub, sessions, ice }
    }
}
