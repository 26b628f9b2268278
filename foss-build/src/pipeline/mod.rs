//! Sequential step execution.
//!
//! Steps run one at a time in the order requested. The first step whose
//! build tool exits non-zero stops the pipeline; completed steps are never
//! rolled back.


use crate::config::Config;
use crate::core::{RunResult, Step, StepStatus};
use crate::errors::Result;
use crate::events::{PIPELINE_COMPLETED, PIPELINE_FAILED, PIPELINE_STARTED};
use crate::steps::StepExecutor;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info};

/// Returns the steps to run: the requested ones verbatim, or all steps in
/// canonical order when none were requested.
///
/// Repeated steps are kept and run once per mention.
#[must_use]
pub fn plan(requested: &[Step]) -> Vec<Step> {
    if requested.is_empty() {
        Step::ALL.to_vec()
    } else {
        requested.to_vec()
    }
}

/// Runs a list of steps through a [`StepExecutor`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    executor: StepExecutor,
}

impl Pipeline {
    /// Creates a pipeline over `executor`.
    #[must_use]
    pub fn new(executor: StepExecutor) -> Self {
        Self { executor }
    }

    /// Runs `steps` in order under `config`.
    ///
    /// # Errors
    ///
    /// Returns the first launch or I/O error. A step that runs and exits
    /// non-zero is not an error: it ends the run and is reported through
    /// [`RunResult::exit_code`].
    pub async fn run(&self, steps: &[Step], config: &Config) -> Result<RunResult> {
        let start = Instant::now();
        let mut result = RunResult::default();
        self.executor.emit(
            PIPELINE_STARTED,
            json!({
                "steps": steps,
                "prefix": config.prefix,
                "parallelism": config.parallelism.get(),
                "use_sudo": config.use_sudo,
            }),
        );

        for &step in steps {
            let outcome = match self.executor.run(step, config).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(step = %step, error = %e, "Step could not run");
                    self.executor.emit(
                        PIPELINE_FAILED,
                        json!({ "step": step, "exit_code": e.exit_code() }),
                    );
                    return Err(e);
                }
            };

            info!(
                step = %step,
                status = %outcome.status,
                exit_code = outcome.exit_code,
                duration_ms = outcome.duration.as_secs_f64() * 1000.0,
                "Step finished"
            );

            let failed = outcome.status == StepStatus::Fail;
            result.push(outcome);
            if failed {
                let exit_code = result.exit_code();
                error!(step = %step, exit_code, "Build stopped");
                self.executor.emit(
                    PIPELINE_FAILED,
                    json!({
                        "step": step,
                        "exit_code": exit_code,
                        "duration_ms": start.elapsed().as_secs_f64() * 1000.0,
                    }),
                );
                return Ok(result);
            }
        }

        self.executor.emit(
            PIPELINE_COMPLETED,
            json!({
                "steps": result.steps(),
                "duration_ms": start.elapsed().as_secs_f64() * 1000.0,
            }),
        );
        Ok(result)
    }
}
