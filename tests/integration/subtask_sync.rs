//! End-to-end subtask toggle tests against a live backend.
//!
//! Covers checklist re-encoding over the wire, aggregate percentage
//! recomputation, rollback of refused subtask writes, and the plain-text
//! fallback path.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskdeck::store::RemoteStore;
use taskdeck::store::remote::WsStore;
use taskdeck::tasks::controller::TaskController;
use taskdeck::tasks::{TaskDraft, TaskError};
use taskdeck_model::checklist::{Checklist, DraftEntry, Section, SubtaskId};
use taskdeck_model::task::{NewTask, Priority, Task};

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

fn subtask_ids(task: &Task) -> Vec<SubtaskId> {
    Checklist::decode(task.description.as_deref())
        .sections()
        .iter()
        .filter_map(|section| match section {
            Section::Heading { subtasks, .. } => {
                Some(subtasks.iter().map(|s| s.id.clone()).collect::<Vec<_>>())
            }
            Section::Unknown(_) => None,
        })
        .flatten()
        .collect()
}

fn two_step_draft(name: &str) -> TaskDraft {
    TaskDraft {
        name: name.to_string(),
        entries: vec![
            DraftEntry::Subtask("first".to_string()),
            DraftEntry::Subtask("second".to_string()),
        ],
        priority: Priority::Medium,
        category: None,
        due_date: None,
    }
}

#[tokio::test]
async fn subtask_toggle_updates_percentage_end_to_end() {
    let url = start_backend().await;
    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);

    let created = controller.create_task(two_step_draft("pack bags")).await.unwrap();
    let ids = subtask_ids(&created);
    assert_eq!(ids.len(), 2);

    controller
        .toggle_subtask(&created.id, &ids[0], true)
        .await
        .unwrap();

    let local = controller.get(&created.id).await.unwrap();
    assert_eq!(local.completion_percentage, 50);
    let checklist = Checklist::decode(local.description.as_deref());
    let Some(subtask) = checklist.find_subtask(&ids[0]) else {
        panic!("subtask survived the round trip");
    };
    assert!(subtask.completed);

    // The re-encoded checklist landed on the server.
    let (other, _other_events) = TaskController::new(connect(&url, "alice").await, 8);
    other.refresh().await.unwrap();
    let remote = other.get(&created.id).await.unwrap();
    assert_eq!(remote.completion_percentage, 50);

    controller
        .toggle_subtask(&created.id, &ids[1], true)
        .await
        .unwrap();
    assert_eq!(
        controller.get(&created.id).await.unwrap().completion_percentage,
        100
    );
}

#[tokio::test]
async fn subtask_toggle_rolls_back_when_store_refuses() {
    let url = start_backend().await;
    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);

    let created = controller.create_task(two_step_draft("doomed")).await.unwrap();
    let ids = subtask_ids(&created);
    let before = controller.get(&created.id).await.unwrap();

    let saboteur = connect(&url, "alice").await;
    saboteur
        .delete_tasks(std::slice::from_ref(&created.id))
        .await
        .unwrap();

    let err = controller
        .toggle_subtask(&created.id, &ids[0], true)
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Store(_)));

    // Description, percentage, and timestamp restored exactly.
    let local = controller.get(&created.id).await.unwrap();
    assert_eq!(local.description, before.description);
    assert_eq!(local.completion_percentage, before.completion_percentage);
    assert_eq!(local.updated_at, before.updated_at);
}

#[tokio::test]
async fn unknown_subtask_id_is_refused_without_state_change() {
    let url = start_backend().await;
    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);

    let created = controller.create_task(two_step_draft("stable")).await.unwrap();
    let before = controller.get(&created.id).await.unwrap();

    let err = controller
        .toggle_subtask(&created.id, &SubtaskId::new(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Checklist(_)));

    let after = controller.get(&created.id).await.unwrap();
    assert_eq!(after.description, before.description);
    assert_eq!(after.completion_percentage, before.completion_percentage);
}

#[tokio::test]
async fn plain_text_description_degrades_to_single_section() {
    let url = start_backend().await;
    let store = connect(&url, "alice").await;

    // A record written by an older client: free-form text, no checklist.
    let legacy = store
        .insert_task(NewTask {
            title: "legacy".to_string(),
            description: Some("just a note".to_string()),
            priority: Priority::Low,
            category: None,
            due_date: None,
        })
        .await
        .unwrap();

    let (controller, _events) = TaskController::new(connect(&url, "alice").await, 8);
    controller.refresh().await.unwrap();

    let task = controller.get(&legacy.id).await.unwrap();
    let ids = subtask_ids(&task);
    assert_eq!(ids.len(), 1);

    // The degraded subtask is addressable and toggling completes it.
    controller.toggle_subtask(&legacy.id, &ids[0], true).await.unwrap();
    let toggled = controller.get(&legacy.id).await.unwrap();
    assert_eq!(toggled.completion_percentage, 100);

    let checklist = Checklist::decode(toggled.description.as_deref());
    let Section::Heading { content, subtasks } = &checklist.sections()[0] else {
        panic!("expected the fallback heading");
    };
    assert_eq!(content, "Tasks");
    assert_eq!(subtasks[0].content, "just a note");
    assert!(subtasks[0].completed);
}
