//! Per-invocation configuration.
//!
//! The configuration is resolved once from command-line flags, environment
//! variables and trigger markers, and is read-only afterwards.

mod environment;

pub use environment::Environment;

use crate::errors::{InputError, Result};
use crate::triggers::{Trigger, TriggerStore};
use serde::Serialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default number of parallel make jobs.
pub const DEFAULT_PARALLEL: u32 = 8;

/// Default install prefix.
pub const DEFAULT_PREFIX: &str = "/usr/local";

/// Base directory for large (stowed) installs.
pub const STOW_PREFIX_BASE: &str = "/opt/stow";

/// Environment variable overriding the parallel job count.
pub const PARALLEL_VAR: &str = "PARALLEL";

/// Environment variable overriding the install prefix.
pub const PREFIX_VAR: &str = "PREFIX";

/// Flags given on the command line that affect configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigFlags {
    /// `--large` was given.
    pub large: bool,
    /// `--no-sudo` was given.
    pub no_sudo: bool,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Install prefix passed to `./configure --prefix`.
    pub prefix: PathBuf,
    /// Job count passed to `make -j`.
    pub parallelism: NonZeroU32,
    /// Whether `make install` runs under sudo.
    pub use_sudo: bool,
    /// Whether the install goes to a per-project stow directory.
    pub large_install: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from(DEFAULT_PREFIX),
            parallelism: NonZeroU32::new(DEFAULT_PARALLEL).unwrap_or(NonZeroU32::MIN),
            use_sudo: true,
            large_install: false,
        }
    }
}

impl Config {
    /// Sets the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the parallel job count.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: NonZeroU32) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets whether sudo is used for install.
    #[must_use]
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }
}

/// Resolves a [`Config`] from flags, environment and triggers.
#[derive(Debug)]
pub struct ConfigResolver<'a> {
    env: &'a Environment,
    triggers: &'a dyn TriggerStore,
    root: &'a Path,
}

impl<'a> ConfigResolver<'a> {
    /// Creates a resolver for the project rooted at `root`.
    pub fn new(env: &'a Environment, triggers: &'a dyn TriggerStore, root: &'a Path) -> Self {
        Self {
            env,
            triggers,
            root,
        }
    }

    /// Resolves the configuration.
    ///
    /// Environment values are validated before any trigger marker is
    /// written, so an input error leaves the project directory untouched.
    ///
    /// # Errors
    ///
    /// Returns an input error for a malformed `PARALLEL` or `PREFIX`, or an
    /// I/O error if a trigger marker cannot be created.
    pub fn resolve(&self, flags: ConfigFlags) -> Result<Config> {
        let parallelism = self.parallelism()?;
        let mut prefix = self.prefix()?;

        let large_install = flags.large || self.triggers.is_set(Trigger::Stow);
        if large_install {
            prefix = stow_prefix(self.root)?;
        }
        let use_sudo = !(flags.no_sudo || self.triggers.is_set(Trigger::NoSudo));

        if flags.large {
            self.triggers.set(Trigger::Stow)?;
        }
        if flags.no_sudo {
            self.triggers.set(Trigger::NoSudo)?;
        }

        let config = Config {
            prefix,
            parallelism,
            use_sudo,
            large_install,
        };
        debug!(config = ?config, "Resolved configuration");
        Ok(config)
    }

    fn parallelism(&self) -> Result<NonZeroU32> {
        match self.env.get(PARALLEL_VAR) {
            None => Ok(NonZeroU32::new(DEFAULT_PARALLEL).unwrap_or(NonZeroU32::MIN)),
            Some(raw) => raw
                .trim()
                .parse::<NonZeroU32>()
                .map_err(|_| InputError::InvalidParallel(raw.to_string()).into()),
        }
    }

    fn prefix(&self) -> Result<PathBuf> {
        match self.env.get(PREFIX_VAR) {
            None => Ok(PathBuf::from(DEFAULT_PREFIX)),
            Some(raw) if !raw.is_empty() && Path::new(raw).is_absolute() => Ok(PathBuf::from(raw)),
            Some(raw) => Err(InputError::InvalidPrefix(raw.to_string()).into()),
        }
    }
}

/// Returns the stow prefix for a project root, `/opt/stow/<basename>`.
///
/// # Errors
///
/// Returns an input error if `root` has no final component.
pub fn stow_prefix(root: &Path) -> Result<PathBuf> {
    let name = root
        .file_name()
        .ok_or_else(|| InputError::NoProjectName(root.display().to_string()))?;
    Ok(Path::new(STOW_PREFIX_BASE).join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FossBuildError;
    use crate::triggers::{InMemoryTriggerStore, MockTriggerStore};
    use pretty_assertions::assert_eq;

    fn resolve(env: &Environment, triggers: &dyn TriggerStore, flags: ConfigFlags) -> Result<Config> {
        ConfigResolver::new(env, triggers, Path::new("/src/hello-2.12")).resolve(flags)
    }

    #[test]
    fn test_defaults() {
        let triggers = InMemoryTriggerStore::new();
        let config = resolve(&Environment::new(), &triggers, ConfigFlags::default()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.parallelism.get(), 8);
        assert_eq!(config.prefix, PathBuf::from("/usr/local"));
        assert!(config.use_sudo);
    }

    #[test]
    fn test_environment_overrides() {
        let env = Environment::new().with("PARALLEL", " 4 ").with("PREFIX", "/tmp/x");
        let triggers = InMemoryTriggerStore::new();
        let config = resolve(&env, &triggers, ConfigFlags::default()).unwrap();
        assert_eq!(config.parallelism.get(), 4);
        assert_eq!(config.prefix, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_invalid_parallel() {
        let triggers = InMemoryTriggerStore::new();
        for value in ["abc", "0", "-3", ""] {
            let env = Environment::new().with("PARALLEL", value);
            let err = resolve(&env, &triggers, ConfigFlags::default()).unwrap_err();
            assert!(
                matches!(err, FossBuildError::Input(InputError::InvalidParallel(ref v)) if v == value),
                "unexpected error for {value:?}: {err}"
            );
        }
    }

    #[test]
    fn test_invalid_prefix() {
        let triggers = InMemoryTriggerStore::new();
        for value in ["", "relative/path"] {
            let env = Environment::new().with("PREFIX", value);
            let err = resolve(&env, &triggers, ConfigFlags::default()).unwrap_err();
            assert!(matches!(err, FossBuildError::Input(InputError::InvalidPrefix(_))));
        }
    }

    #[test]
    fn test_large_flag_sets_stow_prefix_and_trigger() {
        let env = Environment::new().with("PREFIX", "/tmp/x");
        let triggers = InMemoryTriggerStore::new();
        let flags = ConfigFlags {
            large: true,
            no_sudo: false,
        };
        let config = resolve(&env, &triggers, flags).unwrap();
        assert_eq!(config.prefix, PathBuf::from("/opt/stow/hello-2.12"));
        assert!(config.large_install);
        assert!(triggers.is_set(Trigger::Stow));

        // Second invocation with the marker present resolves identically.
        let again = resolve(&env, &triggers, flags).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_stow_trigger_alone_does_not_rewrite_marker() {
        let mut triggers = MockTriggerStore::new();
        triggers
            .expect_is_set()
            .returning(|trigger| trigger == Trigger::Stow);
        triggers.expect_set().never();

        let config = resolve(&Environment::new(), &triggers, ConfigFlags::default()).unwrap();
        assert_eq!(config.prefix, PathBuf::from("/opt/stow/hello-2.12"));
        assert!(config.use_sudo);
    }

    #[test]
    fn test_no_sudo_flag_sets_trigger() {
        let mut triggers = MockTriggerStore::new();
        triggers.expect_is_set().returning(|_| false);
        triggers
            .expect_set()
            .withf(|trigger| *trigger == Trigger::NoSudo)
            .times(1)
            .returning(|_| Ok(()));

        let flags = ConfigFlags {
            large: false,
            no_sudo: true,
        };
        let config = resolve(&Environment::new(), &triggers, flags).unwrap();
        assert!(!config.use_sudo);
    }

    #[test]
    fn test_no_sudo_trigger_disables_sudo() {
        let triggers = InMemoryTriggerStore::with(&[Trigger::NoSudo]);
        let config = resolve(&Environment::new(), &triggers, ConfigFlags::default()).unwrap();
        assert!(!config.use_sudo);
    }

    #[test]
    fn test_input_error_writes_no_trigger() {
        let env = Environment::new().with("PARALLEL", "many");
        let triggers = InMemoryTriggerStore::new();
        let flags = ConfigFlags {
            large: true,
            no_sudo: true,
        };
        assert!(resolve(&env, &triggers, flags).is_err());
        assert!(!triggers.is_set(Trigger::Stow));
        assert!(!triggers.is_set(Trigger::NoSudo));
    }

    #[test]
    fn test_stow_prefix_requires_project_name() {
        assert_eq!(
            stow_prefix(Path::new("/home/me/zlib-1.3")).unwrap(),
            PathBuf::from("/opt/stow/zlib-1.3")
        );
        assert!(stow_prefix(Path::new("/")).is_err());
    }
}
