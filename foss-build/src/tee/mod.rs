//! Live output capture.
//!
//! A step's merged stdout/stderr is copied to three places as it arrives:
//! the console, the verbatim `raw` log and the filtered `txt` log. The copy
//! is a single synchronous loop over a fixed-size buffer, which keeps the
//! order identical across sinks and leaves backpressure to the OS pipe.

mod logger;
mod sink;

pub use logger::{
    CaptureStats, LogArtifact, TeeLogger, CHUNK_SIZE, LOG_DIR, RAW_LOG, TXT_LOG,
};
pub use sink::{ConsoleSink, FanOutWriter, FilteredWriter, LogSink};
