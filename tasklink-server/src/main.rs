//! `tasklink` API server -- task and user CRUD with assignment
//! reconciliation.
//!
//! An axum HTTP server exposing `/api/tasks` and `/api/users`. Tasks and
//! users are stored independently; after every mutation an association
//! reconciler repairs the two-way link between `Task.assignedUser` and
//! `User.pendingTasks`.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:3000
//! cargo run --bin tasklink-server
//!
//! # Run on custom address
//! cargo run --bin tasklink-server -- --bind 127.0.0.1:8080
//!
//! # Or via environment variable
//! TASKLINK_ADDR=127.0.0.1:8080 cargo run --bin tasklink-server
//! ```

use std::sync::Arc;

use clap::Parser;
use tasklink_server::api::{self, AppState};
use tasklink_server::config::{CliArgs, ServerConfig};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting tasklink api server");

    let state = Arc::new(AppState::with_task_limit(config.default_task_limit));

    match api::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "api server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "api server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start api server");
            std::process::exit(1);
        }
    }
}
