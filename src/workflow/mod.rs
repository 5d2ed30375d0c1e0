pub mod remote;
pub mod responder;
pub mod resume;
pub mod store;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;

/// State machine of one plan-run execution, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    InProgress,
    NeedsClarification,
    Complete,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::InProgress => "in_progress",
            RunState::NeedsClarification => "needs_clarification",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        }
    }
}

/// What kind of human input a clarification asks for.
///
/// Closed variant on purpose: every dispatch site matches exhaustively
/// instead of probing for optional fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarificationKind {
    /// Prompt for an arbitrary string.
    FreeText,
    /// Pick one of the listed options.
    MultipleChoice { options: Vec<String> },
    /// Approve pending content as-is, or supply an edit instruction.
    /// Any non-affirmative answer is passed through unchanged; applying
    /// the edit is the engine's job.
    Verification,
}

/// A pause point raised by the engine when a step needs human input.
/// Resolved exactly once; a later pause on the same step produces a new
/// clarification rather than reusing this one.
#[derive(Debug, Clone)]
pub struct Clarification {
    pub id: String,
    pub kind: ClarificationKind,
    pub guidance: String,
    pub resolved: bool,
    pub response: Option<String>,
}

/// Output of one completed plan step. Kept as a list to preserve
/// step-declaration order.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub name: String,
    pub value: Value,
}

/// One execution instance of a plan. Owned and mutated by the engine; we
/// only read its state and feed clarification responses back through
/// [`WorkflowEngine::resolve_and_resume`].
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub id: String,
    pub state: RunState,
    pub clarifications: Vec<Clarification>,
    pub step_outputs: Vec<StepOutput>,
    pub final_output: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRun {
    /// Clarifications still awaiting a human answer. Re-derived from run
    /// state each time; a resume may surface new ones.
    pub fn outstanding_clarifications(&self) -> Vec<&Clarification> {
        self.clarifications.iter().filter(|c| !c.resolved).collect()
    }

    pub fn find_clarification(&self, id: &str) -> Option<&Clarification> {
        self.clarifications.iter().find(|c| c.id == id)
    }
}

/// The external plan-run engine, reached over whatever transport it
/// exposes. Calls are blocking (mirroring the SDK they wrap) and must be
/// dispatched through the worker pool from async contexts.
pub trait WorkflowEngine: Send + Sync {
    /// Execute a plan from a natural-language prompt, returning once the
    /// run completes, fails, or pauses for clarification.
    fn run_plan(&self, prompt: &str, inputs: &Value) -> Result<WorkflowRun>;

    /// Attach a human response to a clarification and continue execution
    /// from the paused step. Atomic from the caller's perspective.
    fn resolve_and_resume(
        &self,
        run: &WorkflowRun,
        clarification: &Clarification,
        response: &str,
    ) -> Result<WorkflowRun>;
}
