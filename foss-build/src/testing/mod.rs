//! Testing utilities for foss-build.
//!
//! This module provides:
//! - A scripted [`CommandRunner`](crate::steps::CommandRunner) that writes
//!   canned output through the real log pipeline
//! - A shared in-memory sink for inspecting captured output

mod buffers;
mod runners;

pub use buffers::SharedBuffer;
pub use runners::ScriptedRunner;
