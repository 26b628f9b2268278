//! Step status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The build tool exited with status 0.
    Ok,
    /// The step's prerequisite was missing, so nothing ran.
    Skip,
    /// The build tool exited non-zero or was killed by a signal.
    Fail,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl StepStatus {
    /// Returns true if the pipeline may continue past this status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_display() {
        assert_eq!(StepStatus::Ok.to_string(), "ok");
        assert_eq!(StepStatus::Skip.to_string(), "skip");
        assert_eq!(StepStatus::Fail.to_string(), "fail");
    }

    #[test]
    fn test_step_status_is_success() {
        assert!(StepStatus::Ok.is_success());
        assert!(StepStatus::Skip.is_success());
        assert!(!StepStatus::Fail.is_success());
    }

    #[test]
    fn test_step_status_serialize() {
        let json = serde_json::to_string(&StepStatus::Skip).unwrap();
        assert_eq!(json, r#""skip""#);

        let deserialized: StepStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StepStatus::Skip);
    }
}
