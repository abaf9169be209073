use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid report {report_id}: {reason}")]
    InvalidReport { report_id: Uuid, reason: String },

    #[error("Recommendation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EngineError {
    pub fn invalid(report_id: Uuid, reason: impl Into<String>) -> Self {
        Self::InvalidReport {
            report_id,
            reason: reason.into(),
        }
    }
}
