use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::error::Result;
use crate::prediction::extract::extract_id_and_status;
use crate::server::AppState;
use crate::workflow::RunState;

use super::types::{ClarificationInfo, StartRunRequest};

/// One execution event on the SSE feed.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        run_id: String,
    },
    StepOutput {
        run_id: String,
        step_name: String,
        output: Value,
    },
    ClarificationNeeded {
        run_id: String,
        clarifications: Vec<ClarificationInfo>,
    },
    PollingStarted {
        run_id: String,
        prediction_id: String,
    },
    ArtifactsReady {
        run_id: String,
        artifacts: Vec<String>,
    },
    Completed {
        run_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        final_output: Option<Value>,
    },
    Error {
        message: String,
    },
}

/// Execute a plan run and stream its progress as Server-Sent Events.
///
/// The stream terminates after `completed`, `error`, or
/// `clarification_needed` (at which point the run is suspended in the store
/// and control returns to the caller, who resolves via the REST endpoint).
pub async fn stream_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRunRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<RunEvent>(32);

    tokio::spawn(async move {
        if let Err(e) = execute_streaming(&state, request, &tx).await {
            tracing::error!(error = %e, "Streaming run failed");
            send(&tx, RunEvent::Error {
                message: e.to_string(),
            })
            .await;
        }
    });

    let stream = ReceiverStream::new(rx).filter_map(|event| {
        match Event::default().json_data(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode SSE event");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn execute_streaming(
    state: &Arc<AppState>,
    request: StartRunRequest,
    tx: &mpsc::Sender<RunEvent>,
) -> Result<()> {
    let engine = Arc::clone(&state.engine);
    let prompt = request.prompt;
    let inputs = request.inputs;
    let run = state
        .worker
        .run(move || engine.run_plan(&prompt, &inputs))
        .await?;

    send(tx, RunEvent::Started {
        run_id: run.id.clone(),
    })
    .await;

    state.runs.put(run.clone()).await;

    for step in &run.step_outputs {
        send(tx, RunEvent::StepOutput {
            run_id: run.id.clone(),
            step_name: step.name.clone(),
            output: step.value.clone(),
        })
        .await;
    }

    match run.state {
        RunState::NeedsClarification => {
            // Suspend: the run stays in the store, the client resolves via
            // the REST endpoint, possibly much later.
            send(tx, RunEvent::ClarificationNeeded {
                run_id: run.id.clone(),
                clarifications: run
                    .outstanding_clarifications()
                    .into_iter()
                    .map(ClarificationInfo::from)
                    .collect(),
            })
            .await;
            Ok(())
        }
        RunState::Failed => Err(crate::error::AppError::Engine(
            "plan execution failed".to_string(),
        )),
        RunState::InProgress => {
            tracing::warn!(run_id = %run.id, "Engine returned a run still in progress");
            send(tx, RunEvent::Completed {
                run_id: run.id.clone(),
                final_output: run.final_output.clone(),
            })
            .await;
            Ok(())
        }
        RunState::Complete => {
            if let Some(handle) = run
                .final_output
                .as_ref()
                .map(extract_id_and_status)
                .and_then(|s| s.into_handle())
            {
                send(tx, RunEvent::PollingStarted {
                    run_id: run.id.clone(),
                    prediction_id: handle.id.clone(),
                })
                .await;

                // A dropped stream (client disconnect) abandons the poll.
                let result = state
                    .poller
                    .poll_with_cancel(state.fetcher.as_ref(), &handle.id, || {
                        std::future::ready(tx.is_closed())
                    })
                    .await?;

                send(tx, RunEvent::ArtifactsReady {
                    run_id: run.id.clone(),
                    artifacts: result.output,
                })
                .await;
            }

            send(tx, RunEvent::Completed {
                run_id: run.id.clone(),
                final_output: run.final_output.clone(),
            })
            .await;
            Ok(())
        }
    }
}

async fn send(tx: &mpsc::Sender<RunEvent>, event: RunEvent) {
    // A closed channel just means the client went away
    let _ = tx.send(event).await;
}
