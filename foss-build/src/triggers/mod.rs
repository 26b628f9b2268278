//! Persistent boolean flags stored as marker files.
//!
//! A trigger is set when a zero-byte marker file exists in the project root.
//! Markers are only ever created, never removed; the user deletes them by
//! hand to turn a trigger off again.

use crate::errors::{FossBuildError, Result};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// A persisted flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Install into a per-project stow directory (`--large`).
    Stow,
    /// Install without sudo (`--no-sudo`).
    NoSudo,
}

impl Trigger {
    /// Returns the marker file name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Stow => ".stow",
            Self::NoSudo => ".no-sudo",
        }
    }

    /// Returns the trigger's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stow => "stow",
            Self::NoSudo => "no-sudo",
        }
    }
}

/// Trait for trigger persistence.
#[cfg_attr(test, mockall::automock)]
pub trait TriggerStore: Send + Sync + Debug {
    /// Returns true if the trigger has been set.
    fn is_set(&self, trigger: Trigger) -> bool;

    /// Sets the trigger. Setting an already-set trigger is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the marker cannot be created.
    fn set(&self, trigger: Trigger) -> Result<()>;
}

/// Trigger store backed by marker files in a directory.
#[derive(Debug, Clone)]
pub struct FileTriggerStore {
    root: PathBuf,
}

impl FileTriggerStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the marker path for a trigger.
    #[must_use]
    pub fn marker_path(&self, trigger: Trigger) -> PathBuf {
        self.root.join(trigger.file_name())
    }
}

impl TriggerStore for FileTriggerStore {
    fn is_set(&self, trigger: Trigger) -> bool {
        self.marker_path(trigger).exists()
    }

    fn set(&self, trigger: Trigger) -> Result<()> {
        let path = self.marker_path(trigger);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                info!(trigger = trigger.name(), path = %path.display(), "Created trigger marker");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(trigger = trigger.name(), "Trigger marker already present");
                Ok(())
            }
            Err(e) => Err(FossBuildError::io(path, e)),
        }
    }
}

/// In-memory trigger store for tests.
#[derive(Debug, Default)]
pub struct InMemoryTriggerStore {
    set: RwLock<HashSet<Trigger>>,
}

impl InMemoryTriggerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given triggers already set.
    #[must_use]
    pub fn with(triggers: &[Trigger]) -> Self {
        Self {
            set: RwLock::new(triggers.iter().copied().collect()),
        }
    }
}

impl TriggerStore for InMemoryTriggerStore {
    fn is_set(&self, trigger: Trigger) -> bool {
        self.set.read().contains(&trigger)
    }

    fn set(&self, trigger: Trigger) -> Result<()> {
        self.set.write().insert(trigger);
        Ok(())
    }
}
