//! Step execution.
//!
//! A [`StepExecutor`] turns one [`Step`] into a subprocess run: it checks
//! the step's prerequisite, builds the command line from the resolved
//! [`Config`], hands it to a [`CommandRunner`] along with the step's log
//! artifact, and reports the result as a [`StepOutcome`].

mod invocation;
mod runner;

pub use invocation::Invocation;
pub use runner::{CommandRunner, ProcessRunner};

use crate::config::Config;
use crate::core::{Step, StepOutcome};
use crate::errors::Result;
use crate::events::{
    EventSink, NoOpEventSink, RunIdentity, STEP_COMPLETED, STEP_FAILED, STEP_SKIPPED,
    STEP_STARTED,
};
use crate::tee::LogArtifact;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runs individual steps in a project directory.
#[derive(Clone)]
pub struct StepExecutor {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    events: Arc<dyn EventSink>,
    identity: RunIdentity,
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("root", &self.root)
            .field("runner", &self.runner)
            .field("run_id", &self.identity.run_id)
            .finish_non_exhaustive()
    }
}

impl StepExecutor {
    /// Creates an executor for the project at `root`.
    ///
    /// `root` is both the subprocess working directory and the parent of
    /// the `log/` directory.
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
            events: Arc::new(NoOpEventSink),
            identity: RunIdentity::new(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the run identity attached to emitted events.
    #[must_use]
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> RunIdentity {
        self.identity
    }

    /// Emits an event with the run's identity attached.
    pub fn emit(&self, event_type: &str, fields: serde_json::Value) {
        self.events
            .emit(event_type, Some(self.identity.payload(fields)));
    }

    /// Runs `step` under `config`.
    ///
    /// A step whose prerequisite file is missing is skipped: no subprocess
    /// is started and no log directory is created. A subprocess that exits
    /// non-zero is reported through the outcome, not as an error.
    ///
    /// # Errors
    ///
    /// Returns a launch error if the program cannot be started, or an I/O
    /// error if the step's logs cannot be written.
    pub async fn run(&self, step: Step, config: &Config) -> Result<StepOutcome> {
        if let Some(required) = step.prerequisite() {
            if !self.root.join(required).exists() {
                let reason = format!("{required} not found");
                info!(step = %step, reason = %reason, "Skipping step");
                self.emit(STEP_SKIPPED, json!({ "step": step, "reason": reason }));
                return Ok(StepOutcome::skipped(step, reason));
            }
        }

        let invocation = Invocation::for_step(step, config);
        let artifact = LogArtifact::for_step(&self.root, step);
        info!(step = %step, command = %invocation, "Running step");
        self.emit(
            STEP_STARTED,
            json!({
                "step": step,
                "command": invocation.argv(),
                "log_dir": artifact.dir(),
            }),
        );

        let start = Instant::now();
        let exit = match self
            .runner
            .run(step, &invocation, &self.root, &artifact)
            .await
        {
            Ok(exit) => exit,
            Err(e) => {
                self.emit(
                    STEP_FAILED,
                    json!({
                        "step": step,
                        "error": e.to_string(),
                        "exit_code": e.exit_code(),
                    }),
                );
                return Err(e);
            }
        };
        let outcome = StepOutcome::finished(step, exit, artifact.dir().to_path_buf(), start.elapsed());
        let duration_ms = outcome.duration.as_secs_f64() * 1000.0;

        if outcome.is_success() {
            self.emit(
                STEP_COMPLETED,
                json!({ "step": step, "exit_code": 0, "duration_ms": duration_ms }),
            );
        } else {
            warn!(step = %step, exit = %exit, "Step failed");
            self.emit(
                STEP_FAILED,
                json!({
                    "step": step,
                    "exit_code": outcome.exit_code,
                    "signal": exit.signal,
                    "duration_ms": duration_ms,
                }),
            );
        }
        Ok(outcome)
    }
}
