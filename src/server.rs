use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::prediction::poller::{Poller, StatusFetcher};
use crate::prediction::replicate::ReplicateClient;
use crate::worker::WorkerPool;
use crate::workflow::remote::RemoteEngine;
use crate::workflow::store::RunStore;
use crate::workflow::WorkflowEngine;

pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<dyn WorkflowEngine>,
    pub fetcher: Arc<dyn StatusFetcher>,
    pub poller: Poller,
    pub runs: RunStore,
    pub worker: WorkerPool,
}

impl AppState {
    pub fn new(config: AppConfig) -> crate::error::Result<Self> {
        let engine = Arc::new(RemoteEngine::new(
            &config.engine.base_url,
            &config.engine.api_key,
            std::time::Duration::from_secs(config.engine.timeout_secs),
        )?);
        let fetcher = Arc::new(ReplicateClient::new(
            &config.prediction.base_url,
            &config.prediction.api_token,
        ));
        let poller = Poller::new(config.poll.max_attempts, config.poll_delay());
        let worker = WorkerPool::new(config.worker.max_blocking);

        Ok(Self {
            config,
            engine,
            fetcher,
            poller,
            runs: RunStore::new(),
            worker,
        })
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/runs",
            post(crate::api::handler::start_run).get(crate::api::handler::list_runs),
        )
        .route("/runs/stream", post(crate::api::stream::stream_run))
        .route(
            "/runs/:run_id",
            get(crate::api::handler::get_run).delete(crate::api::handler::delete_run),
        )
        .route(
            "/runs/:run_id/clarifications",
            post(crate::api::handler::resolve_clarification),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
