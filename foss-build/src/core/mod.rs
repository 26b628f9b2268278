//! Core domain model types for foss-build.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The fixed set of build steps and their ordinals
//! - Step status and per-step outcomes
//! - Subprocess exit reports and the overall run result

mod exit;
mod outcome;
mod status;
mod step;

pub use exit::ProcessExit;
pub use outcome::{RunResult, StepOutcome};
pub use status::StepStatus;
pub use step::Step;
