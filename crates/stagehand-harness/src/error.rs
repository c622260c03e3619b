use std::time::Duration;

use stagehand::{ConfigError, Stage};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("walkthrough stalled in {stage:?} waiting for {waiting_for} ({waited:?})")]
    Stalled {
        stage: Stage,
        waiting_for: &'static str,
        waited: Duration,
    },
}

impl From<stagehand::Error> for HarnessError {
    fn from(err: stagehand::Error) -> Self {
        match err {
            stagehand::Error::Io(e) => Self::Io(e),
            stagehand::Error::Config(e) => Self::Config(e),
            stagehand::Error::Color(e) => Self::invalid(e.to_string()),
        }
    }
}

impl HarnessError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidArgument { .. } => 2,
            Self::Stalled { .. } => 3,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_kind() {
        assert_eq!(HarnessError::invalid("frame").exit_code(), 2);
        let stalled = HarnessError::Stalled {
            stage: Stage::Booting,
            waiting_for: "unlock",
            waited: Duration::from_secs(30),
        };
        assert_eq!(stalled.exit_code(), 3);
        assert!(stalled.to_string().contains("Booting"));
        let io = HarnessError::from(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn facade_errors_map_through() {
        let err = HarnessError::from(stagehand::Error::Config(ConfigError::Validation(vec![
            "hold.duration_ms must be > 0".into(),
        ])));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("hold.duration_ms"));
    }
}
