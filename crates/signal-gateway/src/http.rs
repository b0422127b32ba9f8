//! Call-control HTTP endpoints and the fallback signal relay.
//!
//! Mirrors the client-facing surface under `/api/video`: ICE
//! configuration, call initiate/accept/end/reject, and an HTTP fallback
//! for clients that cannot hold a WebSocket open.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use telemed_signal_core::{ServerMessage, SessionId, SignalingError};

use crate::auth::AuthUser;
use crate::state::AppState;
use crate::ws;

/// HTTP projection of [`SignalingError`].
#[derive(Debug)]
pub struct ApiError(pub SignalingError);

impl From<SignalingError> for ApiError {
    fn from(err: SignalingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SignalingError::Validation(_) => StatusCode::BAD_REQUEST,
            SignalingError::NotFound(_) => StatusCode::NOT_FOUND,
            SignalingError::Unavailable => StatusCode::NOT_IMPLEMENTED,
            SignalingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "message": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/api/video/ice-config", get(ice_config))
        .route("/api/video/signal", post(signal))
        .route("/api/video/initiate", post(initiate))
        .route("/api/video/accept", post(accept))
        .route("/api/video/end", post(end))
        .route("/api/video/reject", post(reject))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}

async fn ice_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "iceServers": state.ice.ice_servers(),
        "configuration": {
            "bundlePolicy": "max-bundle",
            "rtcpMuxPolicy": "require",
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRequest {
    pub to_user_id: String,
    pub payload: Value,
}

/// HTTP fallback for signaling when the client cannot use the socket
/// directly. Best-effort: an unreachable target is reported through
/// `delivered`, never as an error. Without a real-time hub the endpoint
/// answers `unavailable` so callers can tell "accepted" from "delivered".
async fn signal(
    State(state): State<AppState>,
    AuthUser(sender): AuthUser,
    Json(request): Json<SignalRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.to_user_id.is_empty() {
        return Err(SignalingError::validation("toUserId is required").into());
    }
    let hub = state.hub.as_ref().ok_or(SignalingError::Unavailable)?;
    let delivered = hub
        .route(
            &request.to_user_id,
            ServerMessage::Signal {
                payload: request.payload,
            },
        )
        .await;
    tracing::debug!(from = sender, to = request.to_user_id, delivered, "fallback signal");
    Ok(Json(json!({ "ok": true, "delivered": delivered })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub to_user_id: String,
    #[serde(default)]
    pub appointment_id: Option<String>,
}

async fn initiate(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(request): Json<InitiateRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.to_user_id.is_empty() {
        return Err(SignalingError::validation("toUserId is required").into());
    }

    let session = state
        .sessions
        .initiate(&caller, &request.to_user_id, request.appointment_id)
        .await?;

    // Ring the callee over the real-time channel; the initiate itself
    // succeeds whether or not the callee is reachable right now.
    let delivered = match &state.hub {
        Some(hub) => {
            hub.route(
                &session.callee,
                ServerMessage::IncomingVideoCall {
                    caller_id: session.caller.clone(),
                    caller_name: None,
                    session_id: Some(session.id.clone()),
                    appointment_id: session.appointment_id.clone(),
                },
            )
            .await
        }
        None => false,
    };

    Ok(Json(json!({
        "ok": true,
        "sessionId": session.id,
        "delivered": delivered,
        "iceServers": state.ice.ice_servers(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: String,
}

async fn accept(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(request): Json<SessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .sessions
        .accept(&SessionId::from(request.session_id))?;
    Ok(Json(json!({
        "ok": true,
        "sessionId": session.id,
        "iceServers": state.ice.ice_servers(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRequest {
    pub session_id: String,
    #[serde(default)]
    pub duration: Option<u64>,
}

async fn end(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(request): Json<EndRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .sessions
        .end(&SessionId::from(request.session_id), request.duration)
        .await?;
    Ok(Json(json!({
        "ok": true,
        "sessionId": session.id,
        "duration": session.duration_secs,
    })))
}

async fn reject(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(request): Json<SessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .sessions
        .reject(&SessionId::from(request.session_id))?;
    Ok(Json(json!({ "ok": true, "sessionId": session.id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use telemed_signal_core::{
        AppointmentRef, CallSessionManager, CallStatus, IceConfig, InMemoryAppointments,
        SignalHub,
    };

    fn state(hub: Option<Arc<SignalHub>>) -> (AppState, Arc<InMemoryAppointments>) {
        let appointments = Arc::new(InMemoryAppointments::new());
        let sessions = Arc::new(CallSessionManager::new(appointments.clone()));
        (
            AppState::new(hub, sessions, Arc::new(IceConfig::default())),
            appointments,
        )
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (
                ApiError(SignalingError::validation("bad")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError(SignalingError::not_found("session s1")),
                StatusCode::NOT_FOUND,
            ),
            (ApiError(SignalingError::Unavailable), StatusCode::NOT_IMPLEMENTED),
            (
                ApiError(SignalingError::internal("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn signal_without_a_hub_is_unavailable() {
        let (state, _) = state(None);
        let result = signal(
            State(state),
            AuthUser("u1".into()),
            Json(SignalRequest {
                to_user_id: "u2".into(),
                payload: json!({}),
            }),
        )
        .await;
        assert!(matches!(
            result.map(|_| ()),
            Err(ApiError(SignalingError::Unavailable))
        ));
    }

    #[tokio::test]
    async fn signal_to_an_unknown_user_reports_undelivered() {
        let (state, _) = state(Some(Arc::new(SignalHub::new())));
        let Json(body) = signal(
            State(state),
            AuthUser("u1".into()),
            Json(SignalRequest {
                to_user_id: "u9".into(),
                payload: json!({"k": "v"}),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["delivered"], json!(false));
    }

    #[tokio::test]
    async fn initiate_accept_end_round_trip() {
        let (state, appointments) = state(Some(Arc::new(SignalHub::new())));
        appointments.insert(AppointmentRef::new("a123"));

        let Json(initiated) = initiate(
            State(state.clone()),
            AuthUser("dr-u1".into()),
            Json(InitiateRequest {
                to_user_id: "pt-u2".into(),
                appointment_id: Some("a123".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(initiated["ok"], json!(true));
        assert_eq!(initiated["delivered"], json!(false));
        let session_id = initiated["sessionId"].as_str().unwrap().to_string();

        let Json(accepted) = accept(
            State(state.clone()),
            AuthUser("pt-u2".into()),
            Json(SessionRequest {
                session_id: session_id.clone(),
            }),
        )
        .await
        .unwrap();
        assert!(accepted["iceServers"].as_array().is_some());

        let Json(ended) = end(
            State(state.clone()),
            AuthUser("dr-u1".into()),
            Json(EndRequest {
                session_id: session_id.clone(),
                duration: Some(42),
            }),
        )
        .await
        .unwrap();
        assert_eq!(ended["duration"], json!(42));

        let session = state
            .sessions
            .get(&SessionId::from(session_id))
            .unwrap();
        assert_eq!(session.status, CallStatus::Ended);
        assert_eq!(
            appointments.get("a123").unwrap().video_call_duration,
            Some(42)
        );
    }

    #[tokio::test]
    async fn initiate_with_unknown_appointment_is_not_found() {
        let (state, _) = state(None);
        let result = initiate(
            State(state),
            AuthUser("dr-u1".into()),
            Json(InitiateRequest {
                to_user_id: "pt-u2".into(),
                appointment_id: Some("missing".into()),
            }),
        )
        .await;
        assert!(matches!(
            result.map(|_| ()),
            Err(ApiError(SignalingError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn reject_then_accept_is_not_found() {
        let (state, _) = state(None);
        let session = state
            .sessions
            .initiate("dr-u1", "pt-u2", None)
            .await
            .unwrap();

        reject(
            State(state.clone()),
            AuthUser("pt-u2".into()),
            Json(SessionRequest {
                session_id: session.id.to_string(),
            }),
        )
        .await
        .unwrap();

        let result = accept(
            State(state),
            AuthUser("pt-u2".into()),
            Json(SessionRequest {
                session_id: session.id.to_string(),
            }),
        )
        .await;
        assert!(matches!(
            result.map(|_| ()),
            Err(ApiError(SignalingError::NotFound(_)))
        ));
    }
}
