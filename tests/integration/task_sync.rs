//! End-to-end task synchronization tests against a live backend.
//!
//! Spins up the store backend in-process, connects `WsStore` clients,
//! and drives `TaskController` operations over the wire: create, list,
//! optimistic completion toggles, rollback on refused writes, and batch
//! delete.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskdeck::store::RemoteStore;
use taskdeck::store::remote::WsStore;
use taskdeck::tasks::controller::TaskController;
use taskdeck::tasks::{TaskDraft, TaskError, TaskEvent};
use taskdeck_model::checklist::{Checklist, DraftEntry, Section};
use taskdeck_model::task::{Priority, TaskStatus};

async fn start_backend() -> String {
    let (addr, _handle) = taskdeck_backend::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start test backend");
    format!("ws://{addr}/ws")
}

async fn connect(url: &str, token: &str) -> WsStore {
    WsStore::connect(url, token)
        .await
        .expect("failed to connect")
}

fn checklist_draft(name: &str) -> TaskDraft {
    TaskDraft {
        name: name.to_string(),
        entries: vec![
            DraftEntry::Heading("Prep".to_string()),
            DraftEntry::Subtask("read notes".to_string()),
            DraftEntry::Subtask("draft outline".to_string()),
        ],
        priority: Priority::High,
        category: Some("work".to_string()),
        due_date: None,
    }
}

#[tokio::test]
async fn create_and_list_round_trip() {
    let url = start_backend().await;
    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);

    let created = controller
        .create_task(checklist_draft("write report"))
        .await
        .unwrap();
    assert_eq!(created.title, "write report");
    assert_eq!(created.status, TaskStatus::Active);
    assert_eq!(created.completion_percentage, 0);

    let checklist = Checklist::decode(created.description.as_deref());
    let Section::Heading { content, subtasks } = &checklist.sections()[0] else {
        panic!("expected a heading section");
    };
    assert_eq!(content, "Prep");
    assert_eq!(subtasks.len(), 2);

    // A second client with the same token sees the stored record.
    let (other, _other_events) = TaskController::new(connect(&url, "alice").await, 8);
    other.refresh().await.unwrap();
    let visible = other.snapshot().await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, created.id);
}

#[tokio::test]
async fn toggle_completion_end_to_end() {
    let url = start_backend().await;
    let (controller, mut events) = TaskController::new(connect(&url, "alice").await, 8);

    let created = controller
        .create_task(checklist_draft("ship release"))
        .await
        .unwrap();
    while events.try_recv().is_ok() {}

    controller.toggle_completion(&created.id).await.unwrap();

    let local = controller.get(&created.id).await.unwrap();
    assert_eq!(local.status, TaskStatus::Completed);
    assert!(local.completed_at.is_some());
    assert!(local.completed_at_matches_status());

    // The completion event fired exactly once.
    assert_eq!(
        events.try_recv().unwrap(),
        TaskEvent::TaskCompleted {
            id: created.id.clone()
        }
    );
    assert!(!matches!(
        events.try_recv(),
        Ok(TaskEvent::TaskCompleted { .. })
    ));

    // The write landed on the server.
    let (other, _other_events) = TaskController::new(connect(&url, "alice").await, 8);
    other.refresh().await.unwrap();
    let remote = other.get(&created.id).await.unwrap();
    assert_eq!(remote.status, TaskStatus::Completed);
    assert!(remote.completed_at_matches_status());

    // Toggling back emits no completion event.
    controller.toggle_completion(&created.id).await.unwrap();
    let reverted = controller.get(&created.id).await.unwrap();
    assert_eq!(reverted.status, TaskStatus::Active);
    assert!(reverted.completed_at.is_none());
    assert!(!matches!(
        events.try_recv(),
        Ok(TaskEvent::TaskCompleted { .. })
    ));
}

#[tokio::test]
async fn toggle_rolls_back_when_store_refuses() {
    let url = start_backend().await;
    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);

    let created = controller
        .create_task(checklist_draft("doomed"))
        .await
        .unwrap();

    // Another session deletes the task behind the controller's back, so
    // the next update is refused with not-found.
    let saboteur = connect(&url, "alice").await;
    saboteur
        .delete_tasks(std::slice::from_ref(&created.id))
        .await
        .unwrap();

    let err = controller.toggle_completion(&created.id).await.unwrap_err();
    assert!(matches!(err, TaskError::Store(_)));

    // The optimistic flip was rolled back exactly.
    let local = controller.get(&created.id).await.unwrap();
    assert_eq!(local.status, TaskStatus::Active);
    assert!(local.completed_at.is_none());
    assert_eq!(local.updated_at, created.updated_at);
}

#[tokio::test]
async fn batch_delete_removes_selected() {
    let url = start_backend().await;
    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);

    let mut ids = Vec::new();
    for name in ["one", "two", "three"] {
        let task = controller
            .create_task(TaskDraft {
                name: name.to_string(),
                ..TaskDraft::default()
            })
            .await
            .unwrap();
        ids.push(task.id);
    }

    controller.delete_selected(&ids[..2]).await.unwrap();
    let remaining = controller.snapshot().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ids[2]);

    // Deleting nothing is a no-op that never touches the store.
    controller.delete_selected(&[]).await.unwrap();
    assert_eq!(controller.snapshot().await.len(), 1);
}

#[tokio::test]
async fn create_rejects_invalid_titles_before_any_write() {
    let url = start_backend().await;
    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);

    let err = controller
        .create_task(TaskDraft {
            name: "   ".to_string(),
            ..TaskDraft::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Validation(_)));

    controller.refresh().await.unwrap();
    assert!(controller.snapshot().await.is_empty());
}
