//! Error types for foss-build.
//!
//! Errors fall into three categories, each with its own process exit code:
//! input errors detected before anything runs, launch errors for build tools
//! that could not be started, and I/O errors on logs or trigger markers.
//! A build tool that runs and exits non-zero is not an error here; its exit
//! code is carried by [`crate::core::StepOutcome`].

use crate::core::Step;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for input errors, matching clap's usage error code.
pub const EXIT_INPUT: i32 = 2;

/// Exit code for a launch failure where the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code for a launch failure where the program could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Exit code for I/O failures (`EX_IOERR` from sysexits.h).
pub const EXIT_IO: i32 = 74;

/// Convenience result alias.
pub type Result<T, E = FossBuildError> = std::result::Result<T, E>;

/// The main error type for foss-build operations.
#[derive(Debug, Error)]
pub enum FossBuildError {
    /// Invalid command line or environment.
    #[error(transparent)]
    Input(#[from] InputError),

    /// A build tool could not be started.
    #[error("failed to launch `{program}` for step {step}: {source}")]
    Launch {
        /// The step being executed.
        step: Step,
        /// The program that failed to start.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// A log file, log directory or trigger marker could not be written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

impl FossBuildError {
    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a launch error.
    pub fn launch(step: Step, program: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            step,
            program: program.into(),
            source,
        }
    }

    /// Returns the process exit code for this error category.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => EXIT_INPUT,
            Self::Launch { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                EXIT_NOT_FOUND
            }
            Self::Launch { .. } => EXIT_NOT_EXECUTABLE,
            Self::Io { .. } => EXIT_IO,
        }
    }

    /// Returns a short remediation hint, if one applies.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self.exit_code() {
            EXIT_NOT_FOUND => Some(
                "Command not found. Check that the build tool is installed and in PATH, \
                 or run the step that generates it first.",
            ),
            EXIT_NOT_EXECUTABLE => {
                Some("Permission denied. Check the file permissions on the build script.")
            }
            _ => None,
        }
    }

    /// Returns true if this is an input error.
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

/// Errors in the command line or environment, raised before any step runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// A positional argument is not a known step.
    #[error("unknown step '{0}' (expected one of: autoconf, configure, build, test, install)")]
    UnknownStep(String),

    /// `PARALLEL` is not a positive integer.
    #[error("PARALLEL must be a positive integer, got '{0}'")]
    InvalidParallel(String),

    /// `PREFIX` is empty or not absolute.
    #[error("PREFIX must be a non-empty absolute path, got '{0}'")]
    InvalidPrefix(String),

    /// The working directory has no name to derive a stow prefix from.
    #[error("cannot derive a stow prefix from working directory {0}")]
    NoProjectName(String),
}
