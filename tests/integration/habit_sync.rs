//! End-to-end habit lifecycle tests against a live backend.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{NaiveDate, NaiveTime};
use taskdeck::habits::{HabitController, HabitError, NewHabitDraft};
use taskdeck::store::remote::WsStore;
use taskdeck_model::habit::{HabitPatch, RecurrencePattern};
use taskdeck_model::task::Priority;

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

fn morning_draft(name: &str) -> NewHabitDraft {
    NewHabitDraft {
        name: name.to_string(),
        description: Some("before breakfast".to_string()),
        category: Some("health".to_string()),
        priority: Priority::Medium,
        reminder_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        recurrence: RecurrencePattern::Daily,
        start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
    }
}

#[tokio::test]
async fn habit_lifecycle_end_to_end() {
    let url = start_backend().await;
    let controller = HabitController::new(connect(&url, "alice").await);

    let created = controller.create(morning_draft("stretch")).await.unwrap();
    assert_eq!(created.title, "stretch");
    assert!(created.active);
    assert_eq!(created.recurrence, RecurrencePattern::Daily);

    // Pause, then rename.
    controller.set_active(&created.id, false).await.unwrap();
    let renamed = controller
        .update(
            &created.id,
            HabitPatch {
                title: Some("morning stretch".to_string()),
                ..HabitPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.title, "morning stretch");
    assert!(!renamed.active);

    // A second client sees the stored state.
    let other = HabitController::new(connect(&url, "alice").await);
    other.refresh().await.unwrap();
    let visible = other.snapshot().await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "morning stretch");
    assert!(!visible[0].active);

    controller.delete(&created.id).await.unwrap();
    other.refresh().await.unwrap();
    assert!(other.snapshot().await.is_empty());
}

#[tokio::test]
async fn create_rejects_invalid_names_before_any_write() {
    let url = start_backend().await;
    let controller = HabitController::new(connect(&url, "alice").await);

    let err = controller
        .create(NewHabitDraft {
            name: "  ".to_string(),
            ..morning_draft("ignored")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HabitError::Validation(_)));

    controller.refresh().await.unwrap();
    assert!(controller.snapshot().await.is_empty());
}

#[tokio::test]
async fn deleting_missing_habit_surfaces_not_found() {
    let url = start_backend().await;
    let controller = HabitController::new(connect(&url, "alice").await);

    let created = controller.create(morning_draft("floss")).await.unwrap();
    controller.delete(&created.id).await.unwrap();

    let err = controller.delete(&created.id).await.unwrap_err();
    assert!(matches!(err, HabitError::Store(_)));
}
