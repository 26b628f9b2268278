//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing`. Build tool output is written
//! to stdout by the tee, so the two never share a stream.

use crate::config::Environment;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting the diagnostic level.
pub const LOG_LEVEL_VAR: &str = "FOSS_BUILD_LOG";

/// Environment variable selecting the diagnostic format (`json` or `text`).
pub const LOG_FORMAT_VAR: &str = "FOSS_BUILD_LOG_FORMAT";

static INIT: Once = Once::new();

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// `-q`: errors only.
    Quiet,
    /// Informational messages.
    #[default]
    Normal,
    /// `-v`: debug messages.
    Verbose,
}

/// Logging settings derived from the command line and environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set.
    pub level: Level,
    /// Emit JSON lines instead of human-readable text.
    pub use_json: bool,
}

impl LoggingConfig {
    /// Resolves the settings.
    ///
    /// `FOSS_BUILD_LOG` wins over the command-line verbosity; `RUST_LOG`
    /// wins over both when the subscriber is installed.
    #[must_use]
    pub fn resolve(env: &Environment, verbosity: Verbosity) -> Self {
        let level = env
            .get(LOG_LEVEL_VAR)
            .and_then(parse_level)
            .unwrap_or(match verbosity {
                Verbosity::Quiet => Level::ERROR,
                Verbosity::Normal => Level::INFO,
                Verbosity::Verbose => Level::DEBUG,
            });
        let use_json = env
            .get(LOG_FORMAT_VAR)
            .is_some_and(|format| format.eq_ignore_ascii_case("json"));
        Self { level, use_json }
    }
}

/// Parses a level name, case-insensitively.
#[must_use]
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(config.level).into())
            .from_env_lossy();

        let registry = tracing_subscriber::registry().with(filter);
        let installed = if config.use_json {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init()
        };
        if let Err(e) = installed {
            eprintln!("foss-build: logging unavailable: {e}");
        }
    });
}
