use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::{Clarification, ClarificationKind, RunState, StepOutput, WorkflowEngine, WorkflowRun};

/// HTTP client for the remote plan-run engine.
///
/// The engine executes multi-step plans, pausing runs that need human
/// input. Its API is blocking from our perspective: a `run_plan` call does
/// not return until the run completes, fails, or pauses. Always invoke this
/// through the worker pool from async contexts.
pub struct RemoteEngine {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl RemoteEngine {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<RunPayload> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppError::Engine(format!("API returned {status}: {body}")));
        }

        let payload = response.json::<RunPayload>()?;
        Ok(payload)
    }
}

impl WorkflowEngine for RemoteEngine {
    fn run_plan(&self, prompt: &str, inputs: &Value) -> Result<WorkflowRun> {
        let payload = self.post(
            "/plan-runs",
            &serde_json::json!({
                "prompt": prompt,
                "inputs": inputs,
            }),
        )?;
        payload.into_run()
    }

    fn resolve_and_resume(
        &self,
        run: &WorkflowRun,
        clarification: &Clarification,
        response: &str,
    ) -> Result<WorkflowRun> {
        // Two engine calls, atomic from the caller's perspective. If the
        // resume fails after the resolve applied, we surface the error and
        // let the engine's state win.
        self.post(
            &format!(
                "/plan-runs/{}/clarifications/{}",
                run.id, clarification.id
            ),
            &serde_json::json!({ "response": response }),
        )
        .map_err(|e| AppError::Resume(e.to_string()))?;

        let payload = self
            .post(
                &format!("/plan-runs/{}/resume", run.id),
                &serde_json::json!({}),
            )
            .map_err(|e| AppError::Resume(e.to_string()))?;
        payload.into_run()
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct RunPayload {
    // Older engine builds omit the run id on freshly started runs
    id: Option<String>,
    state: String,
    #[serde(default)]
    clarifications: Vec<ClarificationPayload>,
    #[serde(default)]
    step_outputs: Vec<StepPayload>,
    #[serde(default)]
    final_output: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ClarificationPayload {
    id: String,
    category: String,
    guidance: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    resolved: bool,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StepPayload {
    name: String,
    value: Value,
}

impl RunPayload {
    fn into_run(self) -> Result<WorkflowRun> {
        let state = parse_state(&self.state)?;
        Ok(WorkflowRun {
            id: self
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            state,
            clarifications: self
                .clarifications
                .into_iter()
                .map(ClarificationPayload::into_clarification)
                .collect(),
            step_outputs: self
                .step_outputs
                .into_iter()
                .map(|step| StepOutput {
                    name: step.name,
                    value: step.value,
                })
                .collect(),
            final_output: self.final_output,
            created_at: Utc::now(),
        })
    }
}

impl ClarificationPayload {
    fn into_clarification(self) -> Clarification {
        let kind = match self.category.as_str() {
            "multiple_choice" => ClarificationKind::MultipleChoice {
                options: self.options,
            },
            "user_verification" | "verification" => ClarificationKind::Verification,
            "input" | "free_text" => ClarificationKind::FreeText,
            other => {
                tracing::warn!(
                    clarification_id = %self.id,
                    category = other,
                    "Unknown clarification category, treating as free text"
                );
                ClarificationKind::FreeText
            }
        };
        Clarification {
            id: self.id,
            kind,
            guidance: self.guidance,
            resolved: self.resolved,
            response: self.response,
        }
    }
}

fn parse_state(raw: &str) -> Result<RunState> {
    match raw.to_ascii_lowercase().as_str() {
        "in_progress" => Ok(RunState::InProgress),
        "needs_clarification" | "need_clarification" => Ok(RunState::NeedsClarification),
        "complete" | "completed" => Ok(RunState::Complete),
        "failed" => Ok(RunState::Failed),
        other => Err(AppError::Engine(format!("Unknown run state: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_variants() {
        assert_eq!(parse_state("COMPLETE").unwrap(), RunState::Complete);
        assert_eq!(
            parse_state("need_clarification").unwrap(),
            RunState::NeedsClarification
        );
        assert!(parse_state("paused").is_err());
    }

    #[test]
    fn test_clarification_category_mapping() {
        let payload = ClarificationPayload {
            id: "c1".to_string(),
            category: "multiple_choice".to_string(),
            guidance: "pick a platform".to_string(),
            options: vec!["instagram".to_string(), "twitter".to_string()],
            resolved: false,
            response: None,
        };
        let clarification = payload.into_clarification();
        assert!(matches!(
            clarification.kind,
            ClarificationKind::MultipleChoice { ref options } if options.len() == 2
        ));
    }

    #[test]
    fn test_unknown_category_falls_back_to_free_text() {
        let payload = ClarificationPayload {
            id: "c1".to_string(),
            category: "oauth".to_string(),
            guidance: "authenticate".to_string(),
            options: Vec::new(),
            resolved: false,
            response: None,
        };
        assert_eq!(
            payload.into_clarification().kind,
            ClarificationKind::FreeText
        );
    }

    #[test]
    fn test_payload_without_id_gets_local_one() {
        let payload = RunPayload {
            id: None,
            state: "complete".to_string(),
            clarifications: Vec::new(),
            step_outputs: Vec::new(),
            final_output: None,
        };
        let run = payload.into_run().unwrap();
        assert!(!run.id.is_empty());
        assert_eq!(run.state, RunState::Complete);
    }
}
