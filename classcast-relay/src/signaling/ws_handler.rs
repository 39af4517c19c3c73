use crate::RelayService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use classcast_core::{ParticipantId, SessionId, SignalEnvelope};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((session, participant)): Path<(String, String)>,
    State(service): State<RelayService>,
) -> Response {
    let participant = match participant.parse::<ParticipantId>() {
        Ok(id) => id,
        Err(e) => {
            warn!("Rejecting socket with bad participant id '{}': {}", participant, e);
            return (StatusCode::BAD_REQUEST, "invalid participant id").into_response();
        }
    };
    let session = SessionId::from(session);

    ws.on_upgrade(move |socket| handle_socket(socket, session, participant, service))
}

async fn handle_socket(
    socket: WebSocket,
    session: SessionId,
    participant: ParticipantId,
    service: RelayService,
) {
    info!("New WebSocket connection: {} in {}", participant, session);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.join(&session, participant, tx.clone());

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let session = session.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalEnvelope>(&text) {
                        Ok(envelope) => {
                            service.route(&session, participant, envelope);
                        }
                        Err(e) => warn!("Invalid envelope from {}: {}", participant, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.leave(&session, &participant, &tx);
    info!("WebSocket disconnected: {} from {}", participant, session);
}
