//! `TaskDeck` — task and habit tracking client.
//!
//! Connects to a store backend and prints the current task and habit
//! snapshot. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/taskdeck/config.toml`).
//!
//! ```bash
//! # Offline mode over the in-memory store
//! cargo run --bin taskdeck
//!
//! # Connect to a backend
//! cargo run --bin taskdeck -- --backend-url ws://127.0.0.1:9000/ws \
//!     --token alice
//!
//! # Or via environment variables
//! TASKDECK_BACKEND_URL=ws://127.0.0.1:9000/ws TASKDECK_TOKEN=alice cargo run
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::config::{CliArgs, ClientConfig};
use taskdeck::habits::HabitController;
use taskdeck::store::memory::MemoryStore;
use taskdeck::store::remote::WsStore;
use taskdeck::store::retry::RetryingStore;
use taskdeck::store::RemoteStore;
use taskdeck::tasks::controller::TaskController;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("taskdeck starting");

    let result = match config.backend_url {
        Some(ref url) => {
            let token = config.token.clone().unwrap_or_default();
            match WsStore::connect(url, &token).await {
                Ok(store) => run_session(store, &config).await,
                Err(e) => {
                    eprintln!("Could not connect to backend: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            tracing::info!("no backend configured, running offline");
            let store = MemoryStore::new("local");
            run_session(store, &config).await
        }
    };

    tracing::info!("taskdeck exiting");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging to stderr, plus a file when `--log-file` is given.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some(log_path) = file_path {
        let log_dir = log_path.parent()?;
        let file_name = log_path.file_name()?.to_str()?;

        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();

        None
    }
}

/// Fetch and print the current task and habit snapshot.
async fn run_session<S: RemoteStore>(
    store: S,
    config: &ClientConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = std::sync::Arc::new(RetryingStore::new(store, config.retry_config()));

    let (tasks, _events) = TaskController::new(store.clone(), config.event_buffer);
    tasks.refresh().await?;
    print_tasks(&tasks.snapshot().await);

    let habits = HabitController::new(store);
    habits.refresh().await?;
    print_habits(&habits.snapshot().await);

    Ok(())
}

fn print_tasks(tasks: &[taskdeck_model::task::Task]) {
    println!("Tasks ({}):", tasks.len());
    for task in tasks {
        let mark = match task.status {
            taskdeck_model::task::TaskStatus::Completed => 'x',
            taskdeck_model::task::TaskStatus::Active => ' ',
        };
        let due = task
            .due_date
            .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        println!(
            "  [{mark}] {} — {}%{due}",
            task.title, task.completion_percentage
        );
    }
}

fn print_habits(habits: &[taskdeck_model::habit::Habit]) {
    println!("Habits ({}):", habits.len());
    for habit in habits {
        let state = if habit.active { "active" } else { "paused" };
        println!("  {} [{:?}, {state}]", habit.title, habit.recurrence);
    }
}
