use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::{Clarification, ClarificationKind, WorkflowRun};

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    pub prompt: String,
    /// Optional structured inputs forwarded to the plan as-is.
    #[serde(default)]
    pub inputs: Value,
}

#[derive(Debug, Deserialize)]
pub struct ResolveClarificationRequest {
    pub clarification_id: String,
    pub response: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClarificationInfo {
    pub id: String,
    pub kind: &'static str,
    pub guidance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub resolved: bool,
}

impl From<&Clarification> for ClarificationInfo {
    fn from(clarification: &Clarification) -> Self {
        let (kind, options) = match &clarification.kind {
            ClarificationKind::FreeText => ("free_text", None),
            ClarificationKind::MultipleChoice { options } => {
                ("multiple_choice", Some(options.clone()))
            }
            ClarificationKind::Verification => ("verification", None),
        };
        Self {
            id: clarification.id.clone(),
            kind,
            guidance: clarification.guidance.clone(),
            options,
            resolved: clarification.resolved,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepOutputInfo {
    pub step_index: usize,
    pub step_name: String,
    pub output: Value,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run_id: String,
    pub state: &'static str,
    pub steps: Vec<StepOutputInfo>,
    pub clarifications: Vec<ClarificationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    /// Artifact URLs from a polled prediction, when the run produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<String>>,
}

impl RunResponse {
    pub fn from_run(run: &WorkflowRun, artifacts: Option<Vec<String>>) -> Self {
        Self {
            run_id: run.id.clone(),
            state: run.state.as_str(),
            steps: run
                .step_outputs
                .iter()
                .enumerate()
                .map(|(step_index, step)| StepOutputInfo {
                    step_index,
                    step_name: step.name.clone(),
                    output: step.value.clone(),
                })
                .collect(),
            clarifications: run
                .outstanding_clarifications()
                .into_iter()
                .map(ClarificationInfo::from)
                .collect(),
            final_output: run.final_output.clone(),
            artifacts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub state: &'static str,
    pub created_at: DateTime<Utc>,
    pub outstanding_clarifications: usize,
}

impl From<&WorkflowRun> for RunSummary {
    fn from(run: &WorkflowRun) -> Self {
        Self {
            run_id: run.id.clone(),
            state: run.state.as_str(),
            created_at: run.created_at,
            outstanding_clarifications: run.outstanding_clarifications().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{RunState, StepOutput};
    use serde_json::json;

    #[test]
    fn test_run_response_keeps_step_order() {
        let run = WorkflowRun {
            id: "r1".to_string(),
            state: RunState::Complete,
            clarifications: Vec::new(),
            step_outputs: vec![
                StepOutput {
                    name: "generate".to_string(),
                    value: json!("a"),
                },
                StepOutput {
                    name: "upload".to_string(),
                    value: json!("b"),
                },
            ],
            final_output: Some(json!({"id": "p1"})),
            created_at: Utc::now(),
        };

        let response = RunResponse::from_run(&run, Some(vec!["u1".to_string()]));

        assert_eq!(response.state, "complete");
        assert_eq!(response.steps[0].step_name, "generate");
        assert_eq!(response.steps[1].step_index, 1);
        assert_eq!(response.artifacts, Some(vec!["u1".to_string()]));
    }

    #[test]
    fn test_only_unresolved_clarifications_are_reported() {
        let run = WorkflowRun {
            id: "r1".to_string(),
            state: RunState::NeedsClarification,
            clarifications: vec![
                Clarification {
                    id: "c1".to_string(),
                    kind: ClarificationKind::FreeText,
                    guidance: "done".to_string(),
                    resolved: true,
                    response: Some("yes".to_string()),
                },
                Clarification {
                    id: "c2".to_string(),
                    kind: ClarificationKind::MultipleChoice {
                        options: vec!["A".to_string()],
                    },
                    guidance: "pick".to_string(),
                    resolved: false,
                    response: None,
                },
            ],
            step_outputs: Vec::new(),
            final_output: None,
            created_at: Utc::now(),
        };

        let response = RunResponse::from_run(&run, None);

        assert_eq!(response.clarifications.len(), 1);
        assert_eq!(response.clarifications[0].id, "c2");
        assert_eq!(response.clarifications[0].kind, "multiple_choice");
    }
}
