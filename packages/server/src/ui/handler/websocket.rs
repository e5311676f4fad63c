//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{ClientEvent, PusherChannel, RoomId},
    ui::state::AppState,
    usecase::{CommunityMessageRequest, DirectMessageRequest, EstablishedSession},
};

use serde::Deserialize;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let credential = bearer_credential(&query, &headers);

    // Create a channel for this connection to receive pushed events.
    // A clone is kept as the reply channel so acknowledgments always reach
    // this very connection, even if a newer session replaces it mid-request.
    let (tx, rx) = mpsc::unbounded_channel();
    let reply = tx.clone();

    // Authenticate and register before upgrading; a failed handshake leaves
    // no registry or room state behind
    match state
        .establish_session_usecase
        .execute(credential.as_deref(), tx)
        .await
    {
        Ok(session) => {
            tracing::info!(
                "User {} ({}) connected as session {}",
                session.principal.user_id,
                session.principal.display_name.as_str(),
                session.connection_id
            );
            Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, session, rx, reply)))
        }
        Err(e) => {
            tracing::warn!("WebSocket connection rejected: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Extract the bearer credential from the `token` query parameter or the
/// `Authorization: Bearer` header.
fn bearer_credential(query: &ConnectQuery, headers: &HeaderMap) -> Option<String> {
    query.token.clone().or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    session: EstablishedSession,
    mut rx: mpsc::UnboundedReceiver<String>,
    reply: PusherChannel,
) {
    let (mut sender, mut receiver) = socket.split();

    // Announce presence to everyone else now that the session is Active
    state
        .establish_session_usecase
        .announce_online(&session.principal)
        .await;

    // Single select loop instead of two spawned tasks: an inbound event that
    // is being processed (e.g. awaiting the persistence write) always runs to
    // completion before the next closure/branch is observed, so a racing
    // disconnect or eviction never cancels an accepted send mid-flight.
    loop {
        tokio::select! {
            pushed = rx.recv() => {
                match pushed {
                    Some(payload) => {
                        if sender.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    // Channel closed: this session was evicted by a newer one
                    None => {
                        tracing::info!(
                            "Session {} of user {} force-closed by newer session",
                            session.connection_id,
                            session.principal.user_id
                        );
                        break;
                    }
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_event(&state, &session, &reply, &text).await;
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Ping/pong is handled automatically by the WebSocket protocol
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(
                            "WebSocket error for user {}: {}",
                            session.principal.user_id,
                            e
                        );
                        break;
                    }
                }
            }
        }
    }

    // Only the current session removes the registry entry; a close arriving
    // after eviction leaves the newer entry untouched
    let removed = state
        .close_session_usecase
        .execute(session.principal.user_id, session.connection_id)
        .await;
    if removed {
        state
            .close_session_usecase
            .announce_offline(&session.principal)
            .await;
        tracing::info!(
            "User {} disconnected (session {})",
            session.principal.user_id,
            session.connection_id
        );
    } else {
        tracing::debug!(
            "Session {} of user {} was superseded; no offline announcement",
            session.connection_id,
            session.principal.user_id
        );
    }
}

/// Parse and dispatch one inbound frame.
///
/// The event set is closed; every variant is matched explicitly. Frames that
/// do not parse never reach validation and are dropped with a warning.
async fn dispatch_event(
    state: &Arc<AppState>,
    session: &EstablishedSession,
    reply: &PusherChannel,
    text: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                "Unparseable event from user {}: {}",
                session.principal.user_id,
                e
            );
            return;
        }
    };

    match event {
        ClientEvent::SendMessage {
            recipient_id,
            body,
            kind,
            client_temp_id,
        } => {
            let request = DirectMessageRequest {
                recipient_id,
                body,
                kind,
                client_temp_id,
            };
            if let Err(e) = state
                .send_direct_message_usecase
                .execute(&session.principal, request, reply)
                .await
            {
                tracing::warn!(
                    "send_message from user {} failed: {}",
                    session.principal.user_id,
                    e
                );
            }
        }
        ClientEvent::SendGroupMessage { body, kind } => {
            let request = CommunityMessageRequest { body, kind };
            if let Err(e) = state
                .send_community_message_usecase
                .execute(&session.principal, request, reply)
                .await
            {
                tracing::warn!(
                    "send_group_message from user {} failed: {}",
                    session.principal.user_id,
                    e
                );
            }
        }
        ClientEvent::TypingStart { recipient_id } => {
            state
                .typing_relay_usecase
                .execute(&session.principal, recipient_id, true)
                .await;
        }
        ClientEvent::TypingStop { recipient_id } => {
            state
                .typing_relay_usecase
                .execute(&session.principal, recipient_id, false)
                .await;
        }
        ClientEvent::Join { room_id } => match RoomId::parse(&room_id) {
            Ok(room) => {
                if state.establish_session_usecase.rejoin_room(session, room).await {
                    tracing::debug!(
                        "User {} re-affirmed membership of room {}",
                        session.principal.user_id,
                        room
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Invalid join from user {}: {}",
                    session.principal.user_id,
                    e
                );
            }
        },
    }
}
