//! Session and owner-scoping tests against a live backend.
//!
//! Verifies the authentication handshake and that records never leak
//! between owners, whichever operation probes for them.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskdeck::store::remote::WsStore;
use taskdeck::store::{RemoteStore, StoreError};
use taskdeck_model::task::{NewTask, Priority, TaskOrder, TaskPatch, TaskStatus};

async fn start_backend() -> String {
    let (addr, _handle) = taskdeck_backend::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start test backend");
    format!("ws://{addr}/ws")
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        priority: Priority::Medium,
        category: None,
        due_date: None,
    }
}

#[tokio::test]
async fn handshake_resolves_session_user() {
    let url = start_backend().await;
    let store = WsStore::connect(&url, "alice").await.unwrap();
    let session = store.current_session().expect("session after handshake");
    assert_eq!(session.user.as_str(), "alice");
}

#[tokio::test]
async fn empty_token_is_refused() {
    let url = start_backend().await;
    let err = WsStore::connect(&url, "").await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthenticated));
}

#[tokio::test]
async fn tasks_never_leak_between_owners() {
    let url = start_backend().await;
    let alice = WsStore::connect(&url, "alice").await.unwrap();
    let bob = WsStore::connect(&url, "bob").await.unwrap();

    let secret = alice.insert_task(new_task("secret")).await.unwrap();

    // Invisible to list.
    assert!(bob.list_tasks(TaskOrder::default()).await.unwrap().is_empty());

    // Indistinguishable from missing on update.
    let err = bob
        .update_task(
            &secret.id,
            TaskPatch {
                status: Some(TaskStatus::Completed),
                ..TaskPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    // Cross-owner delete is skipped silently.
    bob.delete_tasks(std::slice::from_ref(&secret.id))
        .await
        .unwrap();
    let remaining = alice.list_tasks(TaskOrder::default()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, secret.id);
}

#[tokio::test]
async fn list_honors_requested_order() {
    let url = start_backend().await;
    let alice = WsStore::connect(&url, "alice").await.unwrap();

    let mut low = new_task("low");
    low.priority = Priority::Low;
    let mut high = new_task("high");
    high.priority = Priority::High;

    alice.insert_task(low).await.unwrap();
    alice.insert_task(high).await.unwrap();

    let by_priority = alice.list_tasks(TaskOrder::PriorityDesc).await.unwrap();
    assert_eq!(by_priority[0].title, "high");
    assert_eq!(by_priority[1].title, "low");
}
