use thiserror::Error;

/// Failures raised by the session tracker.
///
/// None of these are fatal to the dispatcher: validation failures become a
/// toast, state failures are logged, malformed notifications are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("{name} is not a video file (media type {mime_type:?})")]
    Validation { name: String, mime_type: String },
    #[error("{operation} is not valid in phase {phase}")]
    State {
        operation: &'static str,
        phase: String,
    },
    #[error("{status} notification for {remote_id} is missing {field}")]
    Malformed {
        remote_id: String,
        status: &'static str,
        field: &'static str,
    },
}
