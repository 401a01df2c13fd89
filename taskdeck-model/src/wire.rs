//! Wire protocol for the remote store.
//!
//! Defines the [`StoreRequest`] and [`StoreResponse`] enums that are
//! postcard-encoded and carried as WebSocket binary frames between the
//! client and the store backend. Frame boundaries come from the
//! transport, so no length framing is added here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::habit::{Habit, HabitId, HabitPatch, NewHabit};
use crate::task::{NewTask, Task, TaskId, TaskOrder, TaskPatch, UserId};

/// Requests sent from a client to the store backend.
///
/// `Authenticate` must be the first frame on a fresh connection; every
/// other request on an unauthenticated connection is refused. After the
/// handshake the protocol is strictly sequential: one request, one
/// response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreRequest {
    /// Opens the session. The token is an opaque identity; the backend
    /// derives the owning [`UserId`] from it.
    Authenticate {
        token: String,
    },
    ListTasks {
        order: TaskOrder,
    },
    InsertTask {
        task: NewTask,
    },
    UpdateTask {
        id: TaskId,
        patch: TaskPatch,
    },
    /// Single batch request; all-or-nothing per connection semantics are
    /// not promised, each id is deleted independently.
    DeleteTasks {
        ids: Vec<TaskId>,
    },
    ListHabits,
    InsertHabit {
        habit: NewHabit,
    },
    UpdateHabit {
        id: HabitId,
        patch: HabitPatch,
    },
    DeleteHabit {
        id: HabitId,
    },
}

/// Responses sent from the store backend to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreResponse {
    /// Acknowledges [`StoreRequest::Authenticate`] with the resolved user.
    Authenticated { user: UserId },
    Tasks { tasks: Vec<Task> },
    Task { task: Task },
    Habits { habits: Vec<Habit> },
    Habit { habit: Habit },
    /// Acknowledges a delete.
    Deleted,
    /// The request was refused.
    Error { fault: StoreFault },
}

/// Machine-readable refusal categories carried in [`StoreResponse::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreFault {
    /// No session, or the handshake was skipped.
    Unauthenticated,
    /// The record does not exist or belongs to another owner.
    NotFound { what: String },
    /// The request was understood but rejected (validation, bad payload).
    Rejected { reason: String },
}

/// Errors raised by wire encoding and decoding.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("wire encode failed: {0}")]
    Encode(#[source] postcard::Error),
    #[error("wire decode failed: {0}")]
    Decode(#[source] postcard::Error),
}

/// Encodes a request into postcard bytes.
///
/// # Errors
///
/// Returns [`WireError::Encode`] if serialization fails.
pub fn encode_request(req: &StoreRequest) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(req).map_err(WireError::Encode)
}

/// Decodes a request from postcard bytes.
///
/// # Errors
///
/// Returns [`WireError::Decode`] on malformed or truncated input.
pub fn decode_request(bytes: &[u8]) -> Result<StoreRequest, WireError> {
    postcard::from_bytes(bytes).map_err(WireError::Decode)
}

/// Encodes a response into postcard bytes.
///
/// # Errors
///
/// Returns [`WireError::Encode`] if serialization fails.
pub fn encode_response(resp: &StoreResponse) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(resp).map_err(WireError::Encode)
}

/// Decodes a response from postcard bytes.
///
/// # Errors
///
/// Returns [`WireError::Decode`] on malformed or truncated input.
pub fn decode_response(bytes: &[u8]) -> Result<StoreResponse, WireError> {
    postcard::from_bytes(bytes).map_err(WireError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, TaskStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn round_trip_authenticate() {
        let req = StoreRequest::Authenticate {
            token: "user-abc".to_string(),
        };
        let bytes = encode_request(&req).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), req);
    }

    #[test]
    fn round_trip_list_tasks() {
        let req = StoreRequest::ListTasks {
            order: TaskOrder::DueAsc,
        };
        let bytes = encode_request(&req).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), req);
    }

    #[test]
    fn round_trip_update_with_nullable_patch() {
        let req = StoreRequest::UpdateTask {
            id: TaskId::new(),
            patch: TaskPatch {
                description: Some(None),
                status: Some(TaskStatus::Completed),
                completed_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single()),
                completion_percentage: Some(100),
                ..TaskPatch::default()
            },
        };
        let bytes = encode_request(&req).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), req);
    }

    #[test]
    fn round_trip_delete_batch() {
        let req = StoreRequest::DeleteTasks {
            ids: vec![TaskId::new(), TaskId::new(), TaskId::new()],
        };
        let bytes = encode_request(&req).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), req);
    }

    #[test]
    fn round_trip_task_response() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap();
        let resp = StoreResponse::Task {
            task: Task {
                id: TaskId::new(),
                owner: UserId::new("user-1"),
                title: "wire task".to_string(),
                description: Some("[{\"type\":\"heading\"}]".to_string()),
                status: TaskStatus::Active,
                priority: Priority::High,
                category: Some("work".to_string()),
                due_date: Some(now),
                completion_percentage: 40,
                created_at: now,
                updated_at: now,
                completed_at: None,
            },
        };
        let bytes = encode_response(&resp).unwrap();
        assert_eq!(decode_response(&bytes).unwrap(), resp);
    }

    #[test]
    fn round_trip_error_response() {
        let resp = StoreResponse::Error {
            fault: StoreFault::NotFound {
                what: "task".to_string(),
            },
        };
        let bytes = encode_response(&resp).unwrap();
        assert_eq!(decode_response(&bytes).unwrap(), resp);
    }

    #[test]
    fn decode_corrupted_bytes_fails() {
        assert!(decode_request(&[0xFF, 0xFE, 0xFD, 0xFC]).is_err());
    }

    #[test]
    fn decode_empty_bytes_fails() {
        assert!(decode_response(&[]).is_err());
    }
}
