//! Running build tools as subprocesses.

use super::Invocation;
use crate::core::{ProcessExit, Step};
use crate::errors::{FossBuildError, Result};
use crate::tee::{ConsoleSink, LogArtifact, TeeLogger};
use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Trait for launching a step's command and capturing its output.
#[async_trait]
pub trait CommandRunner: Send + Sync + Debug {
    /// Runs `invocation` in `workdir`, capturing output into `artifact`.
    ///
    /// # Errors
    ///
    /// Returns a launch error if the program cannot be started, or an I/O
    /// error if the logs cannot be written.
    async fn run(
        &self,
        step: Step,
        invocation: &Invocation,
        workdir: &Path,
        artifact: &LogArtifact,
    ) -> Result<ProcessExit>;
}

/// Runs commands as real child processes.
///
/// The child's stdout and stderr share one pipe, so their interleaving is
/// exactly what the child wrote. The pipe is drained on a blocking thread
/// by a [`TeeLogger`] while the child is awaited.
///
/// Capture ends when every holder of the pipe's write end has closed it,
/// not when the child exits. A background process the step leaves behind
/// with its output still attached keeps the step running until it exits
/// or closes that output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    echo: bool,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    /// Creates a runner that echoes output to the console.
    #[must_use]
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Creates a runner that only writes the log files.
    #[must_use]
    pub fn silent() -> Self {
        Self { echo: false }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        step: Step,
        invocation: &Invocation,
        workdir: &Path,
        artifact: &LogArtifact,
    ) -> Result<ProcessExit> {
        let console = if self.echo {
            ConsoleSink::stdout()
        } else {
            ConsoleSink::disabled()
        };
        let logger = TeeLogger::open(artifact, console)?;

        let pipe_error = |e: io::Error| FossBuildError::io(artifact.dir(), e);
        let (reader, writer) = io::pipe().map_err(pipe_error)?;
        let stderr = writer.try_clone().map_err(pipe_error)?;

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(workdir)
            .stdout(writer)
            .stderr(stderr);

        let spawned = command.spawn();
        // The command keeps the parent's copies of the write end; the
        // reader only sees end of stream once they are closed.
        drop(command);
        let mut child =
            spawned.map_err(|e| FossBuildError::launch(step, invocation.program.clone(), e))?;
        debug!(step = %step, pid = ?child.id(), "Spawned build tool");

        let capture = tokio::task::spawn_blocking(move || logger.capture(reader));

        let status = child.wait().await.map_err(|e| FossBuildError::io(workdir, e))?;
        let stats = capture
            .await
            .map_err(|e| FossBuildError::io(artifact.dir(), io::Error::other(e)))??;

        let exit = ProcessExit::from(status);
        debug!(step = %step, %exit, bytes = stats.bytes, "Build tool finished");
        Ok(exit)
    }
}
