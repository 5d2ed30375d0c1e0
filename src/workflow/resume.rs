use crate::error::Result;

use super::responder::Responder;
use super::{RunState, WorkflowEngine, WorkflowRun};

/// Drain a run's outstanding clarifications until it leaves
/// `needs_clarification` or the cycle bound is hit.
///
/// Each cycle re-fetches the outstanding set from the latest run snapshot,
/// since resuming one step can surface new clarifications for a later one
/// (platform choice, then caption edit, then schedule time). No ordering is
/// guaranteed across clarifications within a cycle.
///
/// Hitting `max_cycles` is a soft give-up: the run is returned in whatever
/// state it is in and callers must inspect `state` to notice. Errors from
/// `resolve_and_resume` propagate unchanged; a resolution may have partially
/// applied and only the engine knows.
pub fn drive_clarifications<E, R>(
    engine: &E,
    mut run: WorkflowRun,
    responder: &mut R,
    max_cycles: u32,
) -> Result<WorkflowRun>
where
    E: WorkflowEngine + ?Sized,
    R: Responder + ?Sized,
{
    for cycle in 0..max_cycles {
        if run.state != RunState::NeedsClarification {
            return Ok(run);
        }

        let pending: Vec<_> = run
            .outstanding_clarifications()
            .into_iter()
            .cloned()
            .collect();
        if pending.is_empty() {
            // Engine says it needs clarification but reports none pending;
            // nothing we can answer, so hand the run back.
            tracing::warn!(run_id = %run.id, "Run needs clarification but none outstanding");
            return Ok(run);
        }

        tracing::info!(
            run_id = %run.id,
            cycle,
            pending = pending.len(),
            "Resolving clarifications"
        );

        for clarification in &pending {
            let response = responder.respond(clarification)?;
            run = engine.resolve_and_resume(&run, clarification, &response)?;
        }
    }

    if run.state == RunState::NeedsClarification {
        tracing::warn!(
            run_id = %run.id,
            max_cycles,
            "Clarification loop exceeded cycle bound, giving up"
        );
    }
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::workflow::{Clarification, ClarificationKind};
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn clarification(id: &str, kind: ClarificationKind) -> Clarification {
        Clarification {
            id: id.to_string(),
            kind,
            guidance: format!("answer {id}"),
            resolved: false,
            response: None,
        }
    }

    fn run_with(state: RunState, clarifications: Vec<Clarification>) -> WorkflowRun {
        WorkflowRun {
            id: "run-1".to_string(),
            state,
            clarifications,
            step_outputs: Vec::new(),
            final_output: None,
            created_at: Utc::now(),
        }
    }

    struct CannedResponder(&'static str);

    impl Responder for CannedResponder {
        fn respond(&mut self, _clarification: &Clarification) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Engine that pauses for a fixed sequence of clarifications, one per
    /// resume, then completes. Models cascading clarifications.
    struct CascadeEngine {
        resumes: AtomicU32,
        total_pauses: u32,
    }

    impl CascadeEngine {
        fn new(total_pauses: u32) -> Self {
            Self {
                resumes: AtomicU32::new(0),
                total_pauses,
            }
        }
    }

    impl WorkflowEngine for CascadeEngine {
        fn run_plan(&self, _prompt: &str, _inputs: &serde_json::Value) -> Result<WorkflowRun> {
            Ok(run_with(
                RunState::NeedsClarification,
                vec![clarification("c0", ClarificationKind::FreeText)],
            ))
        }

        fn resolve_and_resume(
            &self,
            _run: &WorkflowRun,
            _clarification: &Clarification,
            _response: &str,
        ) -> Result<WorkflowRun> {
            let resumed = self.resumes.fetch_add(1, Ordering::SeqCst) + 1;
            if resumed < self.total_pauses {
                let id = format!("c{resumed}");
                Ok(run_with(
                    RunState::NeedsClarification,
                    vec![clarification(&id, ClarificationKind::FreeText)],
                ))
            } else {
                Ok(run_with(RunState::Complete, Vec::new()))
            }
        }
    }

    #[test]
    fn test_two_sequential_clarifications_complete() {
        let engine = CascadeEngine::new(2);
        let run = engine.run_plan("post it", &serde_json::Value::Null).unwrap();
        let mut responder = CannedResponder("ok");

        let finished = drive_clarifications(&engine, run, &mut responder, 10).unwrap();

        assert_eq!(finished.state, RunState::Complete);
        assert_eq!(engine.resumes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cycle_bound_returns_run_without_error() {
        // Never leaves needs_clarification
        let engine = CascadeEngine::new(u32::MAX);
        let run = engine.run_plan("post it", &serde_json::Value::Null).unwrap();
        let mut responder = CannedResponder("ok");

        let stuck = drive_clarifications(&engine, run, &mut responder, 2).unwrap();

        assert_eq!(stuck.state, RunState::NeedsClarification);
        assert_eq!(engine.resumes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_already_terminal_run_is_untouched() {
        let engine = CascadeEngine::new(1);
        let run = run_with(RunState::Complete, Vec::new());
        let mut responder = CannedResponder("ok");

        let finished = drive_clarifications(&engine, run, &mut responder, 10).unwrap();

        assert_eq!(finished.state, RunState::Complete);
        assert_eq!(engine.resumes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_needs_clarification_with_none_pending_returns() {
        let engine = CascadeEngine::new(1);
        let run = run_with(RunState::NeedsClarification, Vec::new());
        let mut responder = CannedResponder("ok");

        let out = drive_clarifications(&engine, run, &mut responder, 10).unwrap();

        assert_eq!(out.state, RunState::NeedsClarification);
        assert_eq!(engine.resumes.load(Ordering::SeqCst), 0);
    }

    struct FailingEngine;

    impl WorkflowEngine for FailingEngine {
        fn run_plan(&self, _prompt: &str, _inputs: &serde_json::Value) -> Result<WorkflowRun> {
            unreachable!()
        }

        fn resolve_and_resume(
            &self,
            _run: &WorkflowRun,
            _clarification: &Clarification,
            _response: &str,
        ) -> Result<WorkflowRun> {
            Err(AppError::Resume("engine exploded".to_string()))
        }
    }

    #[test]
    fn test_resume_error_propagates() {
        let run = run_with(
            RunState::NeedsClarification,
            vec![clarification("c0", ClarificationKind::FreeText)],
        );
        let mut responder = CannedResponder("ok");

        let err = drive_clarifications(&FailingEngine, run, &mut responder, 10).unwrap_err();

        assert!(matches!(err, AppError::Resume(_)));
    }
}
