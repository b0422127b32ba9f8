//! Appointment collaborator seam.
//!
//! The signaling core never owns appointment data; it validates a
//! reference on call initiation and writes the call outcome back on end.
//! Both go through this narrow trait so the real directory (a database
//! elsewhere in the deployment) stays out of this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalingError};
use crate::types::CallOutcome;

/// Minimal view of an appointment record as this crate sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_call_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_call_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_call_ended_at: Option<DateTime<Utc>>,
}

impl AppointmentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            video_call_status: None,
            video_call_duration: None,
            video_call_ended_at: None,
        }
    }
}

/// Lookup and best-effort update of appointment records.
#[async_trait]
pub trait AppointmentDirectory: Send + Sync {
    /// Look an appointment up by reference.
    async fn find(&self, appointment_id: &str) -> Result<Option<AppointmentRef>>;

    /// Record the outcome of a finished call. Callers treat failures as
    /// best-effort: logged, never retried.
    async fn record_call_outcome(&self, appointment_id: &str, outcome: CallOutcome) -> Result<()>;
}

/// In-memory directory for tests and standalone runs.
#[derive(Default)]
pub struct InMemoryAppointments {
    records: DashMap<String, AppointmentRef>,
}

impl InMemoryAppointments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: AppointmentRef) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, appointment_id: &str) -> Option<AppointmentRef> {
        self.records.get(appointment_id).map(|r| r.clone())
    }

    pub fn remove(&self, appointment_id: &str) -> Option<AppointmentRef> {
        self.records.remove(appointment_id).map(|(_, r)| r)
    }
}

#[async_trait]
impl AppointmentDirectory for InMemoryAppointments {
    async fn find(&self, appointment_id: &str) -> Result<Option<AppointmentRef>> {
        Ok(self.records.get(appointment_id).map(|r| r.clone()))
    }

    async fn record_call_outcome(&self, appointment_id: &str, outcome: CallOutcome) -> Result<()> {
        let mut record = self
            .records
            .get_mut(appointment_id)
            .ok_or_else(|| SignalingError::not_found(format!("appointment {}", appointment_id)))?;
        record.video_call_status = Some(outcome.status);
        record.video_call_duration = outcome.duration_secs;
        record.video_call_ended_at = Some(outcome.ended_at);
        Ok(())
    }
}
