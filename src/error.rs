//! User-facing failure taxonomy. None of these end a session; they are logged
//! or surfaced and the controller stays in its current state.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    /// Expected race with generation: the chunk has no audio yet.
    #[error("chunk {index} audio is not ready yet")]
    NotReady { index: usize },
    #[error("request failed: {0}")]
    Transport(String),
    /// The backend reported the job itself as failed.
    #[error("job failed: {0}")]
    Job(String),
    #[error("{action} failed: {message}")]
    Mutation {
        action: &'static str,
        message: String,
    },
    #[error("audio output failed: {0}")]
    Output(String),
}

impl ViewerError {
    /// Whether the user should be told, rather than the failure only logged.
    pub fn is_surfaced(&self) -> bool {
        matches!(
            self,
            ViewerError::Job(_) | ViewerError::Mutation { .. } | ViewerError::Output(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ViewerError;

    #[test]
    fn only_job_mutation_and_output_errors_are_surfaced() {
        assert!(!ViewerError::NotReady { index: 3 }.is_surfaced());
        assert!(!ViewerError::Transport("timeout".into()).is_surfaced());
        assert!(ViewerError::Job("boom".into()).is_surfaced());
        assert!(
            ViewerError::Mutation {
                action: "rename",
                message: "Missing data".into()
            }
            .is_surfaced()
        );
    }

    #[test]
    fn messages_name_the_failing_piece() {
        assert_eq!(
            ViewerError::NotReady { index: 3 }.to_string(),
            "chunk 3 audio is not ready yet"
        );
        assert_eq!(
            ViewerError::Mutation {
                action: "delete",
                message: "Unknown".into()
            }
            .to_string(),
            "delete failed: Unknown"
        );
    }
}
