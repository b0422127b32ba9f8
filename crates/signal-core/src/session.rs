//! Call-session store and lifecycle state machine.
//!
//! Sessions are created on initiate and move through
//! initiated -> active -> ended, with reject reachable from any state
//! and end permitted straight from initiated (a call can be torn down
//! before it is answered). Ended sessions linger for a grace period so
//! late duplicate requests stay idempotent; rejected sessions are
//! dropped immediately since they carry no duration worth keeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::AbortHandle;

use crate::appointments::AppointmentDirectory;
use crate::error::{Result, SignalingError};
use crate::types::{CallOutcome, CallSession, CallStatus, SessionId};

/// How long an ended session stays resolvable after termination.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Owner of all call-session records.
///
/// Every mutation is a single map-entry operation; the appointment
/// collaborator is only awaited after the entry guard has been dropped,
/// so no lock is ever held across I/O.
pub struct CallSessionManager {
    sessions: Arc<DashMap<SessionId, CallSession>>,
    purge_timers: Arc<DashMap<SessionId, AbortHandle>>,
    appointments: Arc<dyn AppointmentDirectory>,
    grace_period: Duration,
}

impl CallSessionManager {
    pub fn new(appointments: Arc<dyn AppointmentDirectory>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            purge_timers: Arc::new(DashMap::new()),
            appointments,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Override the post-termination retention window.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Create a session in the `initiated` state.
    ///
    /// When an appointment reference is supplied it must exist; otherwise
    /// the initiate fails with not-found and no session is created.
    pub async fn initiate(
        &self,
        caller: &str,
        callee: &str,
        appointment_id: Option<String>,
    ) -> Result<CallSession> {
        if caller.is_empty() || callee.is_empty() {
            return Err(SignalingError::validation(
                "caller and callee identities are required",
            ));
        }

        if let Some(appointment) = &appointment_id {
            if self.appointments.find(appointment).await?.is_none() {
                return Err(SignalingError::not_found(format!(
                    "appointment {}",
                    appointment
                )));
            }
        }

        let session = CallSession::new(caller.to_string(), callee.to_string(), appointment_id);
        tracing::info!(session = %session.id, caller, callee, "call initiated");
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Look a session up by key.
    pub fn get(&self, session_id: &SessionId) -> Option<CallSession> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    /// `initiated -> active`; records the accepted time.
    ///
    /// Accepting an already-active session is idempotent. A session in a
    /// terminal state is no longer joinable and reports not-found.
    pub fn accept(&self, session_id: &SessionId) -> Result<CallSession> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SignalingError::not_found(format!("session {}", session_id)))?;

        match session.status {
            CallStatus::Initiated => {
                session.status = CallStatus::Active;
                session.accepted_at = Some(Utc::now());
                tracing::info!(session = %session.id, "call accepted");
            }
            CallStatus::Active => {}
            CallStatus::Ended | CallStatus::Rejected => {
                return Err(SignalingError::not_found(format!("session {}", session_id)));
            }
        }
        Ok(session.clone())
    }

    /// Unconditional termination from `initiated` or `active`.
    ///
    /// Records end time and duration, writes the outcome back to the
    /// associated appointment (best-effort; failures are logged and
    /// swallowed) and schedules the grace-period purge. A duplicate end
    /// is idempotent: the first recorded end time and duration stand and
    /// the appointment is not written again.
    pub async fn end(&self, session_id: &SessionId, duration_secs: Option<u64>) -> Result<CallSession> {
        let (session, first_end) = {
            let mut session = self
                .sessions
                .get_mut(session_id)
                .ok_or_else(|| SignalingError::not_found(format!("session {}", session_id)))?;

            let first_end = session.status != CallStatus::Ended;
            if first_end {
                session.status = CallStatus::Ended;
                session.ended_at = Some(Utc::now());
                session.duration_secs = duration_secs;
                tracing::info!(session = %session.id, duration = ?duration_secs, "call ended");
            }
            (session.clone(), first_end)
        };

        if first_end {
            if let Some(appointment) = &session.appointment_id {
                let outcome = CallOutcome::completed(
                    session.duration_secs,
                    session.ended_at.unwrap_or_else(Utc::now),
                );
                if let Err(err) = self
                    .appointments
                    .record_call_outcome(appointment, outcome)
                    .await
                {
                    tracing::warn!(session = %session.id, appointment, %err, "appointment update failed");
                }
            }
        }

        self.schedule_purge(session.id.clone());
        Ok(session)
    }

    /// `* -> rejected`; the session is deleted immediately.
    pub fn reject(&self, session_id: &SessionId) -> Result<CallSession> {
        let (_, mut session) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| SignalingError::not_found(format!("session {}", session_id)))?;
        if let Some((_, timer)) = self.purge_timers.remove(session_id) {
            timer.abort();
        }
        session.status = CallStatus::Rejected;
        tracing::info!(session = %session.id, "call rejected");
        Ok(session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Arm (or re-arm) the deferred deletion for an ended session. The
    /// previous timer, if any, is aborted first so duplicate terminal
    /// transitions never leak tasks.
    fn schedule_purge(&self, session_id: SessionId) {
        let sessions = Arc::clone(&self.sessions);
        let timers = Arc::clone(&self.purge_timers);
        let grace = self.grace_period;
        let key = session_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            sessions.remove(&key);
            timers.remove(&key);
            tracing::debug!(session = %key, "ended session purged");
        });
        if let Some(previous) = self.purge_timers.insert(session_id, task.abort_handle()) {
            previous.abort();
        }
    }
}
