//! # foss-build
//!
//! Unattended build and install of source packages that use the standard
//! autoconf sequence:
//!
//! ```text
//! autoconf -> ./configure -> make -> make test -> make install
//! ```
//!
//! Each step runs as a subprocess in the project root. Its merged output is
//! shown live and kept under `log/<ordinal>.<step>/` both verbatim (`raw`)
//! and with terminal escapes stripped (`txt`). The first failing step stops
//! the run and its exit code becomes the tool's exit code, so a build can
//! be resumed by naming the remaining steps on the command line.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use foss_build::prelude::*;
//!
//! let code = Controller::new(std::env::current_dir()?)
//!     .execute(std::env::args_os(), &Environment::from_process())
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod filter;
pub mod observability;
pub mod pipeline;
pub mod steps;
pub mod tee;
pub mod testing;
pub mod triggers;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cli::{exit_code_to_u8, Cli, Controller};
    pub use crate::config::{Config, ConfigFlags, ConfigResolver, Environment};
    pub use crate::core::{ProcessExit, RunResult, Step, StepOutcome, StepStatus};
    pub use crate::errors::{FossBuildError, InputError, Result};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::filter::{filter_bytes, StreamFilter};
    pub use crate::pipeline::{plan, Pipeline};
    pub use crate::steps::{CommandRunner, Invocation, ProcessRunner, StepExecutor};
    pub use crate::tee::{LogArtifact, TeeLogger};
    pub use crate::triggers::{FileTriggerStore, Trigger, TriggerStore};
}
