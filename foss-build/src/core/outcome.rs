//! Step outcomes and the overall run result.

use super::{ProcessExit, Step, StepStatus};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// The result of running one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// The step that ran.
    pub step: Step,
    /// The status of the step.
    pub status: StepStatus,
    /// The exit code reported for the step (0 for skipped steps).
    pub exit_code: i32,
    /// How the subprocess terminated, if one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<ProcessExit>,
    /// Directory holding the `raw` and `txt` logs, if one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Why the step was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Wall-clock duration of the step.
    pub duration: Duration,
}

impl StepOutcome {
    /// Creates an outcome from a finished subprocess.
    #[must_use]
    pub fn finished(step: Step, exit: ProcessExit, log_dir: PathBuf, duration: Duration) -> Self {
        Self {
            step,
            status: if exit.success() {
                StepStatus::Ok
            } else {
                StepStatus::Fail
            },
            exit_code: exit.exit_code(),
            exit: Some(exit),
            log_dir: Some(log_dir),
            skip_reason: None,
            duration,
        }
    }

    /// Creates a skipped outcome. Skipped steps report exit code 0.
    #[must_use]
    pub fn skipped(step: Step, reason: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skip,
            exit_code: 0,
            exit: None,
            log_dir: None,
            skip_reason: Some(reason.into()),
            duration: Duration::ZERO,
        }
    }

    /// Returns true if the pipeline may continue.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The result of a whole pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    /// Outcomes of the steps that ran, in execution order.
    pub outcomes: Vec<StepOutcome>,
}

impl RunResult {
    /// Records a step outcome.
    pub fn push(&mut self, outcome: StepOutcome) {
        self.outcomes.push(outcome);
    }

    /// Returns the first failed step, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<Step> {
        self.outcomes
            .iter()
            .find(|o| !o.is_success())
            .map(|o| o.step)
    }

    /// Returns the run's exit code: the first non-zero step code, else 0.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.outcomes
            .iter()
            .find(|o| !o.is_success())
            .map_or(0, |o| o.exit_code)
    }

    /// Returns true if every step succeeded or was skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_step().is_none()
    }

    /// Returns the steps that ran, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        self.outcomes.iter().map(|o| o.step).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_outcome_status() {
        let ok = StepOutcome::finished(
            Step::Build,
            ProcessExit::exited(0),
            PathBuf::from("log/2.build"),
            Duration::from_millis(5),
        );
        assert_eq!(ok.status, StepStatus::Ok);
        assert_eq!(ok.exit_code, 0);

        let failed = StepOutcome::finished(
            Step::Build,
            ProcessExit::exited(2),
            PathBuf::from("log/2.build"),
            Duration::from_millis(5),
        );
        assert_eq!(failed.status, StepStatus::Fail);
        assert_eq!(failed.exit_code, 2);
    }

    #[test]
    fn test_skipped_outcome() {
        let outcome = StepOutcome::skipped(Step::Autoconf, "configure.ac not found");
        assert!(outcome.is_success());
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.log_dir.is_none());
    }

    #[test]
    fn test_run_result_exit_code() {
        let mut result = RunResult::default();
        assert_eq!(result.exit_code(), 0);

        result.push(StepOutcome::skipped(Step::Autoconf, "missing"));
        result.push(StepOutcome::finished(
            Step::Configure,
            ProcessExit::exited(0),
            PathBuf::from("log/1.configure"),
            Duration::ZERO,
        ));
        assert!(result.is_success());

        result.push(StepOutcome::finished(
            Step::Build,
            ProcessExit::signaled(2),
            PathBuf::from("log/2.build"),
            Duration::ZERO,
        ));
        assert_eq!(result.exit_code(), 130);
        assert_eq!(result.failed_step(), Some(Step::Build));
        assert_eq!(
            result.steps(),
            vec![Step::Autoconf, Step::Configure, Step::Build]
        );
    }
}
