//! `TaskDeck` store backend -- owner-scoped task and habit persistence.
//!
//! An axum WebSocket server that authenticates clients by token and serves
//! the `tasks` and `habits` collections over a sequential binary protocol.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9100
//! cargo run --bin taskdeck-backend
//!
//! # Run on custom address
//! cargo run --bin taskdeck-backend -- --bind 127.0.0.1:8080
//!
//! # Or via environment variable
//! TASKDECK_BACKEND_ADDR=127.0.0.1:8080 cargo run --bin taskdeck-backend
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdeck_backend::config::{BackendCliArgs, BackendConfig};
use taskdeck_backend::server::{self, BackendState};

#[tokio::main]
async fn main() {
    let cli = BackendCliArgs::parse();

    let config = match BackendConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskdeck backend");

    let state = Arc::new(BackendState::with_config(config.max_payload_size));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "backend listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "backend server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start backend");
            std::process::exit(1);
        }
    }
}
