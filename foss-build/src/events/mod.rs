//! Event emission for pipeline observability.
//!
//! The pipeline and step executor report lifecycle events through an
//! [`EventSink`]. Every payload carries the run id and a timestamp so the
//! events of one invocation can be correlated.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Pipeline started.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Every step succeeded or was skipped.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A step failed and the pipeline stopped.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// A step's subprocess is about to be launched.
pub const STEP_STARTED: &str = "step.started";
/// A step's prerequisite was missing.
pub const STEP_SKIPPED: &str = "step.skipped";
/// A step's subprocess exited with status 0.
pub const STEP_COMPLETED: &str = "step.completed";
/// A step's subprocess exited non-zero or could not be launched.
pub const STEP_FAILED: &str = "step.failed";

/// Identifies one invocation of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunIdentity {
    /// Unique id for this run.
    pub run_id: Uuid,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a random id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }

    /// Builds an event payload from `fields`, adding the run id and an
    /// RFC 3339 timestamp.
    #[must_use]
    pub fn payload(&self, fields: Value) -> Value {
        let mut map = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        map.insert("run_id".to_string(), Value::String(self.run_id.to_string()));
        map.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Value::Object(map)
    }
}
