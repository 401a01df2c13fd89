//! WebSocket store client implementing the [`RemoteStore`] trait.
//!
//! Connects to a store backend over WebSocket, authenticates with an
//! opaque token, then speaks a strictly sequential request/response
//! protocol: each operation sends one postcard-encoded binary frame and
//! waits for one response frame. The socket is held under a mutex so
//! concurrent callers serialize at the request boundary.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use taskdeck_model::habit::{Habit, HabitId, HabitPatch, NewHabit};
use taskdeck_model::task::{NewTask, Task, TaskId, TaskOrder, TaskPatch};
use taskdeck_model::wire::{self, StoreRequest, StoreResponse};

use super::{RemoteStore, Session, StoreError};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Default timeout for connecting to the store backend.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for waiting on the authentication acknowledgment.
const AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for any single request/response exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket-backed store client.
///
/// Created via [`WsStore::connect`], which establishes the connection
/// and performs the `Authenticate` handshake before the store is handed
/// to any controller.
#[derive(Debug)]
pub struct WsStore {
    /// The backend URL (ws:// or wss://).
    url: String,
    /// Session resolved by the handshake.
    session: Session,
    /// The socket; locked for the duration of each exchange.
    stream: Mutex<WsStream>,
}

impl WsStore {
    /// Connect to a store backend and authenticate.
    ///
    /// Performs the following steps:
    /// 1. Establishes a WebSocket connection to `url` (10s timeout)
    /// 2. Sends an `Authenticate` frame carrying the token
    /// 3. Waits for an `Authenticated` acknowledgment (5s timeout)
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if connection or authentication times out.
    /// - [`StoreError::Unauthenticated`] if the backend refuses the token.
    /// - [`StoreError::Io`] for connection failures.
    pub async fn connect(url: &str, token: &str) -> Result<Self, StoreError> {
        let (ws_stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "store WebSocket connect timed out");
                StoreError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "store WebSocket connect failed");
                StoreError::Io(std::io::Error::other(e))
            })?;

        let mut stream = ws_stream;

        let hello = StoreRequest::Authenticate {
            token: token.to_string(),
        };
        stream
            .send(Message::Binary(wire::encode_request(&hello)?.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "failed to send Authenticate frame");
                StoreError::ConnectionClosed
            })?;

        let ack = tokio::time::timeout(AUTH_TIMEOUT, next_response(&mut stream))
            .await
            .map_err(|_| {
                tracing::warn!(url, "store authentication timed out");
                StoreError::Timeout
            })??;

        let session = match ack {
            StoreResponse::Authenticated { user } => {
                tracing::info!(user = %user, url, "authenticated with store backend");
                Session { user }
            }
            StoreResponse::Error { fault } => {
                tracing::warn!(?fault, "store authentication refused");
                return Err(fault.into());
            }
            other => {
                tracing::warn!(?other, "unexpected response during authentication");
                return Err(StoreError::Codec(
                    "unexpected response during authentication".to_string(),
                ));
            }
        };

        Ok(Self {
            url: url.to_string(),
            session,
            stream: Mutex::new(stream),
        })
    }

    /// Returns the backend URL this store is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// One request/response exchange under the socket lock.
    async fn request(&self, req: &StoreRequest) -> Result<StoreResponse, StoreError> {
        let bytes = wire::encode_request(req)?;
        let mut stream = self.stream.lock().await;
        stream
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "store request send failed");
                StoreError::ConnectionClosed
            })?;
        tokio::time::timeout(REQUEST_TIMEOUT, next_response(&mut stream))
            .await
            .map_err(|_| {
                tracing::warn!("store response timed out");
                StoreError::Timeout
            })?
    }

    /// Sends a request and unwraps a [`StoreResponse::Task`] reply.
    async fn request_task(&self, req: &StoreRequest) -> Result<Task, StoreError> {
        match self.request(req).await? {
            StoreResponse::Task { task } => Ok(task),
            StoreResponse::Error { fault } => Err(fault.into()),
            other => Err(unexpected(&other)),
        }
    }

    /// Sends a request and unwraps a [`StoreResponse::Habit`] reply.
    async fn request_habit(&self, req: &StoreRequest) -> Result<Habit, StoreError> {
        match self.request(req).await? {
            StoreResponse::Habit { habit } => Ok(habit),
            StoreResponse::Error { fault } => Err(fault.into()),
            other => Err(unexpected(&other)),
        }
    }
}

/// Reads frames until a decodable [`StoreResponse`] arrives.
///
/// Ping/pong frames are skipped. A close frame or stream end maps to
/// [`StoreError::ConnectionClosed`].
async fn next_response(stream: &mut WsStream) -> Result<StoreResponse, StoreError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Binary(data))) => return Ok(wire::decode_response(&data)?),
            Some(Ok(Message::Close(_))) | None => return Err(StoreError::ConnectionClosed),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!(err = %e, "store WebSocket read error");
                return Err(StoreError::ConnectionClosed);
            }
        }
    }
}

fn unexpected(resp: &StoreResponse) -> StoreError {
    tracing::warn!(?resp, "unexpected store response variant");
    StoreError::Codec("unexpected store response variant".to_string())
}

impl RemoteStore for WsStore {
    fn current_session(&self) -> Option<Session> {
        Some(self.session.clone())
    }

    async fn list_tasks(&self, order: TaskOrder) -> Result<Vec<Task>, StoreError> {
        match self.request(&StoreRequest::ListTasks { order }).await? {
            StoreResponse::Tasks { tasks } => Ok(tasks),
            StoreResponse::Error { fault } => Err(fault.into()),
            other => Err(unexpected(&other)),
        }
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.request_task(&StoreRequest::InsertTask { task }).await
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        self.request_task(&StoreRequest::UpdateTask {
            id: id.clone(),
            patch,
        })
        .await
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), StoreError> {
        match self
            .request(&StoreRequest::DeleteTasks { ids: ids.to_vec() })
            .await?
        {
            StoreResponse::Deleted => Ok(()),
            StoreResponse::Error { fault } => Err(fault.into()),
            other => Err(unexpected(&other)),
        }
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StoreError> {
        match self.request(&StoreRequest::ListHabits).await? {
            StoreResponse::Habits { habits } => Ok(habits),
            StoreResponse::Error { fault } => Err(fault.into()),
            other => Err(unexpected(&other)),
        }
    }

    async fn insert_habit(&self, habit: NewHabit) -> Result<Habit, StoreError> {
        self.request_habit(&StoreRequest::InsertHabit { habit })
            .await
    }

    async fn update_habit(&self, id: &HabitId, patch: HabitPatch) -> Result<Habit, StoreError> {
        self.request_habit(&StoreRequest::UpdateHabit {
            id: id.clone(),
            patch,
        })
        .await
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        match self
            .request(&StoreRequest::DeleteHabit { id: id.clone() })
            .await?
        {
            StoreResponse::Deleted => Ok(()),
            StoreResponse::Error { fault } => Err(fault.into()),
            other => Err(unexpected(&other)),
        }
    }
}
