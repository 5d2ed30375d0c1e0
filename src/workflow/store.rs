use std::collections::HashMap;

use tokio::sync::RwLock;

use super::WorkflowRun;

/// In-memory registry of live plan runs, keyed by run id.
///
/// This is how a paused run survives between the HTTP request that started
/// it and the later request that resolves its clarification. Lock-guarded
/// because handlers run on arbitrary tasks; there is no persistence, so a
/// process restart drops every suspended run.
pub struct RunStore {
    runs: RwLock<HashMap<String, WorkflowRun>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, run_id: &str) -> Option<WorkflowRun> {
        self.runs.read().await.get(run_id).cloned()
    }

    pub async fn put(&self, run: WorkflowRun) {
        self.runs.write().await.insert(run.id.clone(), run);
    }

    pub async fn remove(&self, run_id: &str) -> Option<WorkflowRun> {
        self.runs.write().await.remove(run_id)
    }

    /// All stored runs, oldest first.
    pub async fn list(&self) -> Vec<WorkflowRun> {
        let mut runs: Vec<_> = self.runs.read().await.values().cloned().collect();
        runs.sort_by_key(|run| run.created_at);
        runs
    }
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::RunState;
    use chrono::Utc;

    fn run(id: &str) -> WorkflowRun {
        WorkflowRun {
            id: id.to_string(),
            state: RunState::NeedsClarification,
            clarifications: Vec::new(),
            step_outputs: Vec::new(),
            final_output: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = RunStore::new();
        store.put(run("r1")).await;

        assert!(store.get("r1").await.is_some());
        assert!(store.get("missing").await.is_none());

        let removed = store.remove("r1").await;
        assert_eq!(removed.unwrap().id, "r1");
        assert!(store.get("r1").await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_run() {
        let store = RunStore::new();
        store.put(run("r1")).await;

        let mut updated = run("r1");
        updated.state = RunState::Complete;
        store.put(updated).await;

        assert_eq!(store.get("r1").await.unwrap().state, RunState::Complete);
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let store = RunStore::new();
        for id in ["a", "b", "c"] {
            store.put(run(id)).await;
        }

        let listed = store.list().await;
        assert_eq!(listed.len(), 3);
        assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
