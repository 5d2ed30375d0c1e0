use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, Result};
use crate::prediction::extract::extract_id_and_status;
use crate::server::AppState;
use crate::workflow::{RunState, WorkflowRun};

use super::types::{
    ResolveClarificationRequest, RunResponse, RunSummary, StartRunRequest,
};

type HandlerResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

fn into_http(e: AppError) -> (StatusCode, String) {
    let status = match &e {
        AppError::RunNotFound(_) | AppError::ClarificationNotFound(_) => StatusCode::NOT_FOUND,
        AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// Start a plan run and wait for it to complete, fail, or pause.
///
/// When the finished run's final output carries a prediction id, the job is
/// polled to completion and its artifact URLs are included in the response.
/// A paused run is held in the store for later clarification resolution.
pub async fn start_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRunRequest>,
) -> HandlerResult<RunResponse> {
    if request.prompt.trim().is_empty() {
        return Err(into_http(AppError::InvalidRequest(
            "prompt must not be empty".to_string(),
        )));
    }

    tracing::info!(prompt = %request.prompt, "Starting plan run");

    let engine = Arc::clone(&state.engine);
    let prompt = request.prompt;
    let inputs = request.inputs;
    let run = state
        .worker
        .run(move || engine.run_plan(&prompt, &inputs))
        .await
        .map_err(into_http)?;

    tracing::info!(run_id = %run.id, state = run.state.as_str(), "Plan run returned");

    state.runs.put(run.clone()).await;

    let artifacts = poll_run_artifacts(&state, &run).await.map_err(into_http)?;
    Ok(Json(RunResponse::from_run(&run, artifacts)))
}

/// Resolve one clarification on a suspended run and resume it.
///
/// The pause is durable across requests: the run sits in the store between
/// the request that surfaced the clarification and this one. Resuming may
/// surface further clarifications; callers loop until the state is terminal.
pub async fn resolve_clarification(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Json(request): Json<ResolveClarificationRequest>,
) -> HandlerResult<RunResponse> {
    let run = state
        .runs
        .get(&run_id)
        .await
        .ok_or_else(|| into_http(AppError::RunNotFound(run_id.clone())))?;

    let clarification = run
        .find_clarification(&request.clarification_id)
        .cloned()
        .ok_or_else(|| {
            into_http(AppError::ClarificationNotFound(
                request.clarification_id.clone(),
            ))
        })?;

    if clarification.resolved {
        return Err(into_http(AppError::InvalidRequest(format!(
            "clarification {} is already resolved",
            clarification.id
        ))));
    }

    tracing::info!(
        run_id = %run.id,
        clarification_id = %clarification.id,
        "Resolving clarification"
    );

    let engine = Arc::clone(&state.engine);
    let response = request.response;
    let paused = run.clone();
    let resumed = state
        .worker
        .run(move || engine.resolve_and_resume(&paused, &clarification, &response))
        .await
        .map_err(into_http)?;

    tracing::info!(
        run_id = %resumed.id,
        state = resumed.state.as_str(),
        "Plan run resumed"
    );

    // The resumed run keeps the original registry key even if the engine
    // reassigned its id, so follow-up requests keep working.
    let mut stored = resumed.clone();
    stored.id = run_id;
    state.runs.put(stored.clone()).await;

    let artifacts = poll_run_artifacts(&state, &resumed)
        .await
        .map_err(into_http)?;
    Ok(Json(RunResponse::from_run(&stored, artifacts)))
}

pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> HandlerResult<RunSummary> {
    let run = state
        .runs
        .get(&run_id)
        .await
        .ok_or_else(|| into_http(AppError::RunNotFound(run_id)))?;
    Ok(Json(RunSummary::from(&run)))
}

pub async fn list_runs(State(state): State<Arc<AppState>>) -> Json<Vec<RunSummary>> {
    let runs = state.runs.list().await;
    Json(runs.iter().map(RunSummary::from).collect())
}

pub async fn delete_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    match state.runs.remove(&run_id).await {
        Some(run) => {
            tracing::info!(run_id = %run.id, "Removed run from registry");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(into_http(AppError::RunNotFound(run_id))),
    }
}

/// Poll the prediction named by a completed run's final output.
///
/// Returns `None` when the run is not complete or its final output carries
/// no recognizable prediction id (extraction failure is soft). Poll
/// failures and timeouts are hard errors and surface to the caller.
pub async fn poll_run_artifacts(
    state: &AppState,
    run: &WorkflowRun,
) -> Result<Option<Vec<String>>> {
    if run.state != RunState::Complete {
        return Ok(None);
    }
    let Some(final_output) = &run.final_output else {
        return Ok(None);
    };

    let Some(handle) = extract_id_and_status(final_output).into_handle() else {
        tracing::debug!(run_id = %run.id, "No prediction id in final output");
        return Ok(None);
    };

    tracing::info!(
        run_id = %run.id,
        prediction_id = %handle.id,
        status = %handle.status,
        "Polling prediction from run output"
    );

    let result = state.poller.poll(state.fetcher.as_ref(), &handle.id).await?;
    Ok(Some(result.output))
}
