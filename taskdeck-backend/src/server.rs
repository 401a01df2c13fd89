//! Store backend core: shared state, WebSocket handler, and the
//! request/response loop.
//!
//! The backend accepts WebSocket connections on `/ws`. The first binary
//! frame on a connection must be [`StoreRequest::Authenticate`]; the
//! resolved user scopes every subsequent request. After the handshake the
//! protocol is strictly sequential: one request frame in, one response
//! frame out.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use taskdeck_model::task::UserId;
use taskdeck_model::wire::{self, StoreFault, StoreRequest, StoreResponse};

use crate::collections::Collections;

/// Default maximum allowed request frame size in bytes (256 KB).
const DEFAULT_MAX_PAYLOAD_SIZE: usize = 256 * 1024;

/// Shared backend state holding the record collections.
pub struct BackendState {
    /// Owner-scoped task and habit collections.
    pub collections: Collections,
    /// Maximum allowed request frame size in bytes.
    max_payload_size: usize,
}

impl Default for BackendState {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendState {
    /// Creates backend state with empty collections and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: Collections::new(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Creates backend state with a custom frame size limit.
    #[must_use]
    pub fn with_config(max_payload_size: usize) -> Self {
        Self {
            collections: Collections::new(),
            max_payload_size,
        }
    }
}

/// Handles an upgraded WebSocket connection for a single client.
///
/// The connection lifecycle:
/// 1. Wait for an `Authenticate` frame and resolve the user.
/// 2. Acknowledge with `Authenticated`.
/// 3. Serve requests sequentially until the client disconnects.
pub async fn handle_socket(mut socket: WebSocket, state: Arc<BackendState>) {
    let Some(user) = wait_for_authenticate(&mut socket).await else {
        tracing::warn!("connection closed before authentication");
        return;
    };

    tracing::info!(user = %user.as_str(), "session opened");

    let ack = StoreResponse::Authenticated { user: user.clone() };
    if send_response(&mut socket, &ack).await.is_err() {
        tracing::warn!(user = %user.as_str(), "failed to send authentication ack");
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Binary(data) => {
                if data.len() > state.max_payload_size {
                    tracing::warn!(
                        user = %user.as_str(),
                        size = data.len(),
                        max = state.max_payload_size,
                        "request frame exceeds size limit"
                    );
                    let refusal = StoreResponse::Error {
                        fault: StoreFault::Rejected {
                            reason: format!(
                                "request too large: {} bytes (max {})",
                                data.len(),
                                state.max_payload_size
                            ),
                        },
                    };
                    if send_response(&mut socket, &refusal).await.is_err() {
                        break;
                    }
                    continue;
                }

                let response = match wire::decode_request(&data) {
                    Ok(request) => dispatch(&user, request, &state.collections).await,
                    Err(e) => {
                        tracing::warn!(
                            user = %user.as_str(),
                            error = %e,
                            "failed to decode request frame"
                        );
                        StoreResponse::Error {
                            fault: StoreFault::Rejected {
                                reason: "malformed request frame".to_string(),
                            },
                        }
                    }
                };

                if send_response(&mut socket, &response).await.is_err() {
                    tracing::warn!(user = %user.as_str(), "WebSocket write failed");
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {
                // Skip non-binary frames (ping/pong).
            }
        }
    }

    tracing::info!(user = %user.as_str(), "session closed");
}

/// Waits for the `Authenticate` frame and resolves the user.
///
/// Returns `None` if the connection closes first, the frame is malformed,
/// a different request arrives, or the token is empty. Refusals are
/// acknowledged with a `StoreResponse::Error` before the connection drops.
async fn wait_for_authenticate(socket: &mut WebSocket) -> Option<UserId> {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Binary(data) => match wire::decode_request(&data) {
                Ok(StoreRequest::Authenticate { token }) => {
                    if token.is_empty() {
                        tracing::warn!("received Authenticate with empty token");
                        refuse_unauthenticated(socket).await;
                        return None;
                    }
                    return Some(UserId::new(token));
                }
                Ok(other) => {
                    tracing::warn!(request = ?other, "expected Authenticate, got different request");
                    refuse_unauthenticated(socket).await;
                    return None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode handshake frame");
                    return None;
                }
            },
            Message::Close(_) => return None,
            _ => {
                // Skip non-binary frames (ping/pong) during the handshake.
            }
        }
    }
    None
}

async fn refuse_unauthenticated(socket: &mut WebSocket) {
    let refusal = StoreResponse::Error {
        fault: StoreFault::Unauthenticated,
    };
    let _ = send_response(socket, &refusal).await;
}

/// Serves one decoded request against the collections.
async fn dispatch(user: &UserId, request: StoreRequest, collections: &Collections) -> StoreResponse {
    match request {
        StoreRequest::Authenticate { .. } => {
            tracing::warn!(user = %user.as_str(), "duplicate Authenticate on open session");
            StoreResponse::Error {
                fault: StoreFault::Rejected {
                    reason: "already authenticated".to_string(),
                },
            }
        }
        StoreRequest::ListTasks { order } => StoreResponse::Tasks {
            tasks: collections.list_tasks(user, order).await,
        },
        StoreRequest::InsertTask { task } => match collections.insert_task(user, task).await {
            Ok(task) => {
                tracing::debug!(user = %user.as_str(), task_id = %task.id, "task inserted");
                StoreResponse::Task { task }
            }
            Err(e) => StoreResponse::Error {
                fault: StoreFault::Rejected {
                    reason: e.to_string(),
                },
            },
        },
        StoreRequest::UpdateTask { id, patch } => {
            match collections.update_task(user, &id, &patch).await {
                Some(task) => StoreResponse::Task { task },
                None => StoreResponse::Error {
                    fault: StoreFault::NotFound {
                        what: "task".to_string(),
                    },
                },
            }
        }
        StoreRequest::DeleteTasks { ids } => {
            collections.delete_tasks(user, &ids).await;
            tracing::debug!(user = %user.as_str(), count = ids.len(), "tasks deleted");
            StoreResponse::Deleted
        }
        StoreRequest::ListHabits => StoreResponse::Habits {
            habits: collections.list_habits(user).await,
        },
        StoreRequest::InsertHabit { habit } => match collections.insert_habit(user, habit).await {
            Ok(habit) => StoreResponse::Habit { habit },
            Err(e) => StoreResponse::Error {
                fault: StoreFault::Rejected {
                    reason: e.to_string(),
                },
            },
        },
        StoreRequest::UpdateHabit { id, patch } => {
            match collections.update_habit(user, &id, &patch).await {
                Some(habit) => StoreResponse::Habit { habit },
                None => StoreResponse::Error {
                    fault: StoreFault::NotFound {
                        what: "habit".to_string(),
                    },
                },
            }
        }
        StoreRequest::DeleteHabit { id } => {
            if collections.delete_habit(user, &id).await {
                StoreResponse::Deleted
            } else {
                StoreResponse::Error {
                    fault: StoreFault::NotFound {
                        what: "habit".to_string(),
                    },
                }
            }
        }
    }
}

/// Encodes and sends one response frame.
async fn send_response(socket: &mut WebSocket, response: &StoreResponse) -> Result<(), axum::Error> {
    let bytes = wire::encode_response(response)
        .map_err(|e| axum::Error::new(std::io::Error::other(e.to_string())))?;
    socket.send(Message::Binary(bytes.into())).await
}

/// Starts the backend server.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(BackendState::new())).await
}

/// Starts the backend server with a pre-configured [`BackendState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<BackendState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "backend server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<BackendState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
