//! Per-step log files and the capture loop.

use super::sink::{FanOutWriter, FilteredWriter, LogSink};
use crate::core::Step;
use crate::errors::{FossBuildError, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the project root that holds step logs.
pub const LOG_DIR: &str = "log";

/// Name of the verbatim log file.
pub const RAW_LOG: &str = "raw";

/// Name of the filtered log file.
pub const TXT_LOG: &str = "txt";

/// Size of the copy buffer. This bounds how much output is held in memory.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// The pair of log files for one step: `log/<ordinal>.<name>/{raw,txt}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogArtifact {
    dir: PathBuf,
}

impl LogArtifact {
    /// Returns the artifact for `step` under the project root.
    #[must_use]
    pub fn for_step(root: &Path, step: Step) -> Self {
        Self {
            dir: root.join(LOG_DIR).join(step.log_dir_name()),
        }
    }

    /// Returns the step's log directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the verbatim log.
    #[must_use]
    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(RAW_LOG)
    }

    /// Returns the path of the filtered log.
    #[must_use]
    pub fn txt_path(&self) -> PathBuf {
        self.dir.join(TXT_LOG)
    }
}

/// Statistics from one capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Bytes read from the subprocess.
    pub bytes: u64,
    /// Number of chunks read.
    pub chunks: u64,
}

/// Copies a subprocess's output to the console, the raw log and the
/// filtered log.
#[derive(Debug)]
pub struct TeeLogger {
    artifact: LogArtifact,
    writer: FanOutWriter,
}

impl TeeLogger {
    /// Opens the log files for `artifact`, creating its directory if needed.
    ///
    /// Both files are opened in append mode. Output is written to `console`
    /// first, then the raw log, then the filtered log.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or either file cannot be
    /// created.
    pub fn open(artifact: &LogArtifact, console: impl LogSink + 'static) -> Result<Self> {
        fs::create_dir_all(artifact.dir()).map_err(|e| FossBuildError::io(artifact.dir(), e))?;
        let raw = open_append(&artifact.raw_path())?;
        let txt = open_append(&artifact.txt_path())?;

        debug!(dir = %artifact.dir().display(), "Opened step logs");
        Ok(Self {
            artifact: artifact.clone(),
            writer: FanOutWriter::new(vec![
                Box::new(console),
                Box::new(raw),
                Box::new(FilteredWriter::new(txt)),
            ]),
        })
    }

    /// Returns the artifact being written.
    #[must_use]
    pub fn artifact(&self) -> &LogArtifact {
        &self.artifact
    }

    /// Copies `reader` to every sink until end of stream.
    ///
    /// Each chunk reaches all sinks before the next one is read, so a slow
    /// sink slows the reader instead of growing a buffer. The sinks are
    /// finished when the stream ends, whatever the reason the writer side
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing fails.
    pub fn capture<R: Read>(mut self, mut reader: R) -> Result<CaptureStats> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut stats = CaptureStats::default();

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            };
            stats.bytes += n as u64;
            stats.chunks += 1;
            self.writer
                .write_all(&buf[..n])
                .map_err(|e| self.io_error(e))?;
        }

        self.writer.finish().map_err(|e| self.io_error(e))?;
        debug!(
            dir = %self.artifact.dir().display(),
            bytes = stats.bytes,
            chunks = stats.chunks,
            "Captured step output"
        );
        Ok(stats)
    }

    fn io_error(&self, source: io::Error) -> FossBuildError {
        FossBuildError::io(self.artifact.dir(), source)
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FossBuildError::io(path, e))
}
