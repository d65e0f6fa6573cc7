use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid task id pattern {pattern:?}: {reason}")]
    Invalid { pattern: String, reason: String },

    #[error("task id pattern {0:?} has no capture group")]
    NoCaptureGroup(String),
}
