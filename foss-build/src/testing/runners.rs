//! Command runners for testing.

use crate::core::{ProcessExit, Step};
use crate::errors::{FossBuildError, Result};
use crate::steps::{CommandRunner, Invocation};
use crate::tee::{ConsoleSink, LogArtifact, TeeLogger};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// A runner that records invocations and replays scripted output.
///
/// Output goes through a real [`TeeLogger`], so log files are written
/// exactly as for a subprocess. Steps default to no output and exit 0.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outputs: HashMap<Step, Vec<u8>>,
    exits: HashMap<Step, ProcessExit>,
    missing: HashSet<Step>,
    calls: Mutex<Vec<(Step, Invocation, PathBuf)>>,
}

impl ScriptedRunner {
    /// Creates a runner where every step succeeds silently.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output a step writes.
    #[must_use]
    pub fn with_output(mut self, step: Step, output: &[u8]) -> Self {
        self.outputs.insert(step, output.to_vec());
        self
    }

    /// Sets how a step's process exits.
    #[must_use]
    pub fn with_exit(mut self, step: Step, exit: ProcessExit) -> Self {
        self.exits.insert(step, exit);
        self
    }

    /// Makes a step fail to launch as if its program did not exist.
    #[must_use]
    pub fn with_missing(mut self, step: Step) -> Self {
        self.missing.insert(step);
        self
    }

    /// Returns every invocation, in call order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().iter().map(|(_, inv, _)| inv.clone()).collect()
    }

    /// Returns the steps that were run, in call order.
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        self.calls.lock().iter().map(|(step, _, _)| *step).collect()
    }

    /// Returns the working directories used, in call order.
    #[must_use]
    pub fn workdirs(&self) -> Vec<PathBuf> {
        self.calls.lock().iter().map(|(_, _, dir)| dir.clone()).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        step: Step,
        invocation: &Invocation,
        workdir: &Path,
        artifact: &LogArtifact,
    ) -> Result<ProcessExit> {
        self.calls
            .lock()
            .push((step, invocation.clone(), workdir.to_path_buf()));

        let logger = TeeLogger::open(artifact, ConsoleSink::disabled())?;
        if self.missing.contains(&step) {
            return Err(FossBuildError::launch(
                step,
                invocation.program.clone(),
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }

        let output = self.outputs.get(&step).map_or(&[][..], Vec::as_slice);
        logger.capture(output)?;
        Ok(self
            .exits
            .get(&step)
            .copied()
            .unwrap_or(ProcessExit::exited(0)))
    }
}
