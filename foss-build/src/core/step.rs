//! The five build steps.

use crate::errors::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stage of the autoconf/configure/make sequence.
///
/// The discriminant is the step's fixed ordinal, used for log directory
/// naming and for the canonical order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Runs autoconf to generate the configure if configure.ac is present.
    Autoconf = 0,
    /// Runs the ./configure script with the specified prefix.
    Configure = 1,
    /// Compiles the source code using make with parallel jobs.
    Build = 2,
    /// Runs tests to verify the build using make test.
    Test = 3,
    /// Installs the built software to the specified prefix, using sudo
    /// unless --no-sudo is given.
    Install = 4,
}

impl Step {
    /// All steps in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Autoconf,
        Self::Configure,
        Self::Build,
        Self::Test,
        Self::Install,
    ];

    /// Returns the fixed ordinal of the step (0-4).
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns the command-line name of the step.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Autoconf => "autoconf",
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Test => "test",
            Self::Install => "install",
        }
    }

    /// Returns the log subdirectory name, `<ordinal>.<name>`.
    #[must_use]
    pub fn log_dir_name(self) -> String {
        format!("{}.{}", self.ordinal(), self.name())
    }

    /// Returns a file that must exist in the project root for the step to run.
    ///
    /// Steps without a prerequisite always run.
    #[must_use]
    pub const fn prerequisite(self) -> Option<&'static str> {
        match self {
            Self::Autoconf => Some("configure.ac"),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.name() == s)
            .ok_or_else(|| InputError::UnknownStep(s.to_string()))
    }
}
