use std::sync::Arc;

use tokio::signal;

use crate::server::AppState;
use crate::workflow::RunState;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Report runs that will be dropped with the process.
///
/// There is no persistence layer: a run suspended on a clarification lives
/// only in the in-memory store, so shutting down abandons it. Log which
/// ones so operators know what was lost.
pub async fn graceful_shutdown(state: &Arc<AppState>) {
    tracing::info!("Starting graceful shutdown...");

    let runs = state.runs.list().await;
    let suspended: Vec<_> = runs
        .iter()
        .filter(|run| run.state == RunState::NeedsClarification)
        .collect();

    if suspended.is_empty() {
        tracing::info!("No suspended runs to abandon");
        return;
    }

    tracing::warn!(
        count = suspended.len(),
        "Abandoning suspended runs (no persistence layer)"
    );

    for run in suspended {
        tracing::warn!(
            run_id = %run.id,
            outstanding = run.outstanding_clarifications().len(),
            "Run suspended on clarification will not survive restart"
        );
    }

    tracing::info!("Graceful shutdown complete");
}
