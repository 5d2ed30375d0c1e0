pub mod extract;
pub mod poller;
pub mod replicate;

/// Status reported by the remote prediction API.
///
/// The set is open: services add statuses over time, so anything
/// unrecognized is carried through as `Other` and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "starting" => JobStatus::Starting,
            "processing" => JobStatus::Processing,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            // Both spellings occur in the wild
            "canceled" | "cancelled" => JobStatus::Canceled,
            _ => JobStatus::Other(raw.to_string()),
        }
    }

    /// No further transitions occur from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
            JobStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted asynchronous job, as recovered from a submission result.
/// Never mutated locally; status changes only come from re-fetching.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: String,
    pub status: JobStatus,
}

/// One status fetch from the remote API.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    pub output: Option<Vec<String>>,
}

/// Outcome of a completed poll cycle. `output` is only ever populated for
/// `Succeeded`; an empty list on success is legal and callers must check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    pub status: JobStatus,
    pub output: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_statuses() {
        assert_eq!(JobStatus::parse("starting"), JobStatus::Starting);
        assert_eq!(JobStatus::parse("Processing"), JobStatus::Processing);
        assert_eq!(JobStatus::parse("SUCCEEDED"), JobStatus::Succeeded);
        assert_eq!(JobStatus::parse("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("canceled"), JobStatus::Canceled);
        assert_eq!(JobStatus::parse("cancelled"), JobStatus::Canceled);
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let status = JobStatus::parse("queued");
        assert_eq!(status, JobStatus::Other("queued".to_string()));
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_terminal_set() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(!JobStatus::Starting.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
