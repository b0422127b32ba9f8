//! WebSocket connection loop.
//!
//! One task per connection reads client frames and dispatches them into
//! the hub; a writer task drains the connection's outbound channel into
//! the socket, which also serializes deliveries from other connections
//! in arrival order. Disconnect, clean or abrupt, funnels into
//! `SignalHub::disconnect`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use telemed_signal_core::{ClientMessage, ConnectionHandle, ServerMessage, SignalHub};

use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let Some(hub) = state.hub.clone() else {
        // No real-time hub attached; nothing to serve on this socket.
        return;
    };

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn = ConnectionHandle::new(tx);
    hub.register(conn.clone());
    tracing::debug!(connection = %conn.id(), "websocket open");

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%err, "failed to encode outbound event");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => dispatch(&hub, &conn, message).await,
                Err(err) => {
                    tracing::debug!(connection = %conn.id(), %err, "ignoring unparseable frame");
                }
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames carry no
            // signaling here.
            _ => {}
        }
    }

    hub.disconnect(conn.id()).await;
    writer.abort();
    tracing::debug!(connection = %conn.id(), "websocket closed");
}

/// Route one client message through the hub.
async fn dispatch(hub: &SignalHub, conn: &ConnectionHandle, message: ClientMessage) {
    match message {
        ClientMessage::Identify { user_id } => {
            hub.identify(conn.id(), &user_id).await;
        }
        ClientMessage::JoinRoom {
            appointment_id,
            user_id,
        } => {
            hub.join_room(conn.id(), &appointment_id, &user_id).await;
        }

        // Generic best-effort relays: an unreachable target is dropped
        // silently.
        ClientMessage::Signal { to_user_id, payload } => {
            hub.route(&to_user_id, ServerMessage::Signal { payload }).await;
        }
        ClientMessage::Notify {
            to_user_id,
            notification,
        } => {
            hub.route(&to_user_id, ServerMessage::Notification { notification })
                .await;
        }

        // WebRTC negotiation: addressed by identity, fire-and-forget.
        ClientMessage::SendOffer {
            remote_user_id,
            offer,
        } => {
            hub.route(&remote_user_id, ServerMessage::IncomingOffer { offer })
                .await;
        }
        ClientMessage::SendAnswer {
            remote_user_id,
            answer,
        } => {
            hub.route(&remote_user_id, ServerMessage::IncomingAnswer { answer })
                .await;
        }
        ClientMessage::SendIceCandidate {
            remote_user_id,
            candidate,
        } => {
            hub.route(&remote_user_id, ServerMessage::IncomingIceCandidate { candidate })
                .await;
        }
        ClientMessage::RenegotiateOffer {
            remote_user_id,
            offer,
        } => {
            hub.route(&remote_user_id, ServerMessage::RenegotiationOffer { offer })
                .await;
        }
        ClientMessage::RenegotiateAnswer {
            remote_user_id,
            answer,
        } => {
            hub.route(&remote_user_id, ServerMessage::RenegotiationAnswer { answer })
                .await;
        }
        ClientMessage::RequestOffer { remote_user_id } => {
            let from_user_id = hub.identity_of(conn.id()).await;
            hub.route(&remote_user_id, ServerMessage::OfferRequest { from_user_id })
                .await;
        }

        // Call control that carries the sender's identity to the peer:
        // requires identification first, and an unreachable party is
        // surfaced back to the sender.
        ClientMessage::IncomingVideoCall {
            remote_user_id,
            caller_name,
            appointment_id,
        } => {
            let Some(caller_id) = hub.identity_of(conn.id()).await else {
                conn.send(ServerMessage::Error {
                    message: "identify before placing a call".to_string(),
                });
                return;
            };
            let delivered = hub
                .route(
                    &remote_user_id,
                    ServerMessage::IncomingVideoCall {
                        caller_id,
                        caller_name,
                        session_id: None,
                        appointment_id,
                    },
                )
                .await;
            if !delivered {
                conn.send(ServerMessage::CallError {
                    message: format!("{} is not reachable", remote_user_id),
                    remote_user_id,
                });
            }
        }
        ClientMessage::CallAccepted {
            remote_user_id,
            appointment_id,
        } => {
            let Some(peer_id) = hub.identity_of(conn.id()).await else {
                conn.send(ServerMessage::Error {
                    message: "identify before accepting a call".to_string(),
                });
                return;
            };
            let delivered = hub
                .route(
                    &remote_user_id,
                    ServerMessage::CallAccepted {
                        peer_id,
                        appointment_id,
                    },
                )
                .await;
            if !delivered {
                conn.send(ServerMessage::CallError {
                    message: format!("{} is not reachable", remote_user_id),
                    remote_user_id,
                });
            }
        }

        // Teardown notifications stay best-effort.
        ClientMessage::RejectCall { remote_user_id } => {
            hub.route(&remote_user_id, ServerMessage::CallRejected).await;
        }
        ClientMessage::CallEnded { remote_user_id } => {
            hub.route(&remote_user_id, ServerMessage::CallEnded).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connect(hub: &SignalHub) -> (
        ConnectionHandle,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);
        hub.register(handle.clone());
        (handle, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn offer_is_routed_as_incoming_offer() {
        let hub = SignalHub::new();
        let (a, _rx_a) = connect(&hub);
        let (b, mut rx_b) = connect(&hub);
        hub.identify(a.id(), "alice").await;
        hub.identify(b.id(), "bob").await;
        drain(&mut rx_b);

        dispatch(
            &hub,
            &a,
            ClientMessage::SendOffer {
                remote_user_id: "bob".into(),
                offer: json!({"sdp": "v=0"}),
            },
        )
        .await;

        let got = drain(&mut rx_b);
        assert!(matches!(
            got.as_slice(),
            [ServerMessage::IncomingOffer { offer }] if offer["sdp"] == "v=0"
        ));
    }

    #[tokio::test]
    async fn call_before_identify_gets_an_error_back() {
        let hub = SignalHub::new();
        let (a, mut rx_a) = connect(&hub);

        dispatch(
            &hub,
            &a,
            ClientMessage::IncomingVideoCall {
                remote_user_id: "bob".into(),
                caller_name: None,
                appointment_id: None,
            },
        )
        .await;

        let got = drain(&mut rx_a);
        assert!(matches!(got.as_slice(), [ServerMessage::Error { .. }]));
    }

    #[tokio::test]
    async fn call_to_unreachable_party_surfaces_call_error() {
        let hub = SignalHub::new();
        let (a, mut rx_a) = connect(&hub);
        hub.identify(a.id(), "alice").await;
        drain(&mut rx_a);

        dispatch(
            &hub,
            &a,
            ClientMessage::IncomingVideoCall {
                remote_user_id: "bob".into(),
                caller_name: Some("Dr. Alice".into()),
                appointment_id: Some("a1".into()),
            },
        )
        .await;

        let got = drain(&mut rx_a);
        assert!(matches!(
            got.as_slice(),
            [ServerMessage::CallError { remote_user_id, .. }] if remote_user_id == "bob"
        ));
    }

    #[tokio::test]
    async fn generic_signal_to_unreachable_party_is_silent() {
        let hub = SignalHub::new();
        let (a, mut rx_a) = connect(&hub);
        hub.identify(a.id(), "alice").await;
        drain(&mut rx_a);

        dispatch(
            &hub,
            &a,
            ClientMessage::Signal {
                to_user_id: "nobody".into(),
                payload: json!({}),
            },
        )
        .await;

        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn accept_relays_the_accepting_identity() {
        let hub = SignalHub::new();
        let (doctor, mut rx_doctor) = connect(&hub);
        let (patient, _rx_patient) = connect(&hub);
        hub.identify(doctor.id(), "dr-u1").await;
        hub.identify(patient.id(), "pt-u2").await;
        drain(&mut rx_doctor);

        dispatch(
            &hub,
            &patient,
            ClientMessage::CallAccepted {
                remote_user_id: "dr-u1".into(),
                appointment_id: Some("a1".into()),
            },
        )
        .await;

        let got = drain(&mut rx_doctor);
        assert!(matches!(
            got.as_slice(),
            [ServerMessage::CallAccepted { peer_id, .. }] if peer_id == "pt-u2"
        ));
    }
}
