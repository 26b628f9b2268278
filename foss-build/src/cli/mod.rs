//! Command-line entry point.
//!
//! [`Controller::execute`] is the whole program minus process setup: it
//! parses argv, resolves configuration, runs the planned steps and returns
//! the exit code.

use crate::config::{ConfigFlags, ConfigResolver, Environment};
use crate::core::Step;
use crate::errors::{FossBuildError, EXIT_INPUT};
use crate::events::{EventSink, LoggingEventSink};
use crate::observability::Verbosity;
use crate::pipeline::{plan, Pipeline};
use crate::steps::{CommandRunner, ProcessRunner, StepExecutor};
use crate::triggers::{FileTriggerStore, TriggerStore};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Unattended build and install of FOSS packages.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "foss-build")]
#[command(version)]
#[command(about = "Unattended build and install of FOSS packages")]
#[command(
    long_about = "Unattended build and install of FOSS packages which use the standard sequence:\n    autoconf, configure, make, make test, make install\n\nWhen steps are given, only those run, in the order given. This lets a failed build be resumed from the failing step without starting over.\n\nMust be executed in the project source root. Output of every step is kept in log/<n>.<step>/raw and a cleaned-up copy in log/<n>.<step>/txt."
)]
#[command(
    after_help = "Environment:\n  PARALLEL  Parallel make jobs (default 8)\n  PREFIX    Install prefix (default /usr/local)"
)]
pub struct Cli {
    /// Install to /opt/stow/<project directory name>.
    ///
    /// Creates a .stow trigger so later runs in this directory are stowed
    /// automatically.
    #[arg(long)]
    pub large: bool,

    /// Run the install step without sudo.
    ///
    /// Creates a .no-sudo trigger so later runs in this directory skip sudo
    /// automatically.
    #[arg(long)]
    pub no_sudo: bool,

    /// Show debug diagnostics.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Steps to run, in order. Runs every step when omitted.
    #[arg(value_enum, value_name = "STEP")]
    pub steps: Vec<Step>,
}

impl Cli {
    /// Returns the configuration flags.
    #[must_use]
    pub fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            large: self.large,
            no_sudo: self.no_sudo,
        }
    }

    /// Returns the requested diagnostic verbosity.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }
}

/// Parses argv, program name first.
///
/// # Errors
///
/// Returns clap's error for unknown flags or steps, and for `--help` and
/// `--version`.
pub fn parse<I, T>(argv: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(argv)
}

/// Wires the pipeline to its collaborators for one project directory.
#[derive(Clone)]
pub struct Controller {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    triggers: Arc<dyn TriggerStore>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("root", &self.root)
            .field("runner", &self.runner)
            .field("triggers", &self.triggers)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a controller that runs real build tools in `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            triggers: Arc::new(FileTriggerStore::new(root.clone())),
            root,
            runner: Arc::new(ProcessRunner::new()),
            events: Arc::new(LoggingEventSink::default()),
        }
    }

    /// Sets the command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Sets the trigger store.
    #[must_use]
    pub fn with_triggers(mut self, triggers: Arc<dyn TriggerStore>) -> Self {
        self.triggers = triggers;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Parses `argv` and runs it. Returns the process exit code.
    ///
    /// `--help` and `--version` print and return 0; usage errors print
    /// clap's message and return 2.
    pub async fn execute<I, T>(&self, argv: I, env: &Environment) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match parse(argv) {
            Ok(cli) => self.run(&cli, env).await,
            Err(e) => {
                let _ = e.print();
                e.exit_code()
            }
        }
    }

    /// Runs an already parsed command line. Returns the process exit code.
    ///
    /// The code is 0 on success, the failing build tool's own code if a
    /// step fails, or the error category's code otherwise.
    pub async fn run(&self, cli: &Cli, env: &Environment) -> i32 {
        let config = match ConfigResolver::new(env, self.triggers.as_ref(), &self.root)
            .resolve(cli.flags())
        {
            Ok(config) => config,
            Err(e) => return report(&e),
        };
        let steps = plan(&cli.steps);
        debug!(steps = ?steps, root = %self.root.display(), "Planned steps");

        let executor = StepExecutor::new(self.root.clone(), self.runner.clone())
            .with_events(self.events.clone());
        match Pipeline::new(executor).run(&steps, &config).await {
            Ok(result) => result.exit_code(),
            Err(e) => report(&e),
        }
    }
}

/// Prints an error for the user and returns its exit code.
fn report(err: &FossBuildError) -> i32 {
    if err.is_input() {
        let _ = Cli::command()
            .error(ErrorKind::ValueValidation, err.to_string())
            .print();
        return EXIT_INPUT;
    }

    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("  hint: {hint}");
    }
    err.exit_code()
}

/// Converts an exit code into the byte the OS reports.
///
/// Negative codes become 1; codes above 255 saturate.
#[must_use]
pub fn exit_code_to_u8(code: i32) -> u8 {
    if code < 0 {
        1
    } else {
        u8::try_from(code).unwrap_or(u8::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProcessExit;
    use crate::errors::{EXIT_IO, EXIT_NOT_FOUND};
    use crate::events::{CollectingEventSink, PIPELINE_COMPLETED};
    use crate::testing::ScriptedRunner;
    use crate::triggers::{InMemoryTriggerStore, Trigger};
    use crate::steps::Invocation;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn controller(root: &Path, runner: &Arc<ScriptedRunner>) -> (Controller, Arc<InMemoryTriggerStore>) {
        let triggers = Arc::new(InMemoryTriggerStore::new());
        let controller = Controller::new(root)
            .with_runner(runner.clone())
            .with_triggers(triggers.clone())
            .with_events(Arc::new(CollectingEventSink::new()));
        (controller, triggers)
    }

    #[test]
    fn test_parse_flags_and_steps() {
        let cli = parse(["foss-build", "--no-sudo", "build", "install", "build"]).unwrap();
        assert!(cli.no_sudo);
        assert!(!cli.large);
        assert_eq!(cli.steps, vec![Step::Build, Step::Install, Step::Build]);
        assert_eq!(cli.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_parse_flags_after_steps() {
        let cli = parse(["foss-build", "configure", "--large", "-v"]).unwrap();
        assert!(cli.large);
        assert_eq!(cli.steps, vec![Step::Configure]);
        assert_eq!(cli.verbosity(), Verbosity::Verbose);
    }

    #[test]
    fn test_parse_rejects_unknown_tokens() {
        let err = parse(["foss-build", "compile"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), EXIT_INPUT);

        let err = parse(["foss-build", "--fast"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_parse_rejects_verbose_with_quiet() {
        let err = parse(["foss-build", "-v", "-q"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_help_and_version_exit_zero() {
        for flag in ["--help", "--version"] {
            let err = parse(["foss-build", flag]).unwrap_err();
            assert_eq!(err.exit_code(), 0);
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_long_help_describes_each_step() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Compiles the source code using make with parallel jobs"));
        assert!(help.contains("Runs tests to verify the build using make test"));
    }

    #[tokio::test]
    async fn test_unknown_step_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (controller, _) = controller(dir.path(), &runner);

        let code = controller
            .execute(["foss-build", "build", "deploy"], &Environment::new())
            .await;

        assert_eq!(code, EXIT_INPUT);
        assert!(runner.steps().is_empty());
        assert!(!dir.path().join("log").exists());
    }

    #[tokio::test]
    async fn test_invalid_parallel_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (controller, triggers) = controller(dir.path(), &runner);
        let env = Environment::new().with("PARALLEL", "lots");

        let code = controller
            .execute(["foss-build", "--large", "build"], &env)
            .await;

        assert_eq!(code, EXIT_INPUT);
        assert!(runner.steps().is_empty());
        assert!(!triggers.is_set(Trigger::Stow));
    }

    #[tokio::test]
    async fn test_full_run_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let events = Arc::new(CollectingEventSink::new());
        let (controller, _) = controller(dir.path(), &runner);
        let controller = controller.with_events(events.clone());

        let code = controller.execute(["foss-build"], &Environment::new()).await;

        assert_eq!(code, 0);
        assert_eq!(
            runner.steps(),
            vec![Step::Configure, Step::Build, Step::Test, Step::Install]
        );
        assert_eq!(
            runner.invocations().last(),
            Some(&Invocation::new("sudo", ["make", "-j", "8", "install"]))
        );
        assert_eq!(
            events.event_types().last().map(String::as_str),
            Some(PIPELINE_COMPLETED)
        );
    }

    #[tokio::test]
    async fn test_large_install_uses_stow_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("hello-2.12");
        std::fs::create_dir(&root).unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (controller, triggers) = controller(&root, &runner);

        let code = controller
            .execute(["foss-build", "--large", "configure"], &Environment::new())
            .await;

        assert_eq!(code, 0);
        assert!(triggers.is_set(Trigger::Stow));
        assert_eq!(
            runner.invocations(),
            vec![Invocation::new("./configure", ["--prefix=/opt/stow/hello-2.12"])]
        );
    }

    #[tokio::test]
    async fn test_failing_step_code_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().with_exit(Step::Test, ProcessExit::exited(42)));
        let (controller, _) = controller(dir.path(), &runner);

        let code = controller
            .execute(["foss-build", "test", "install"], &Environment::new())
            .await;

        assert_eq!(code, 42);
        assert_eq!(runner.steps(), vec![Step::Test]);
    }

    #[tokio::test]
    async fn test_launch_error_code() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().with_missing(Step::Configure));
        let (controller, _) = controller(dir.path(), &runner);

        let code = controller
            .execute(["foss-build", "configure", "build"], &Environment::new())
            .await;

        assert_eq!(code, EXIT_NOT_FOUND);
        assert_eq!(runner.steps(), vec![Step::Configure]);
    }

    #[tokio::test]
    async fn test_unwritable_log_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("log"), b"").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let (controller, _) = controller(dir.path(), &runner);

        let code = controller
            .execute(["foss-build", "build"], &Environment::new())
            .await;

        assert_eq!(code, EXIT_IO);
    }

    #[test]
    fn test_exit_code_to_u8() {
        assert_eq!(exit_code_to_u8(0), 0);
        assert_eq!(exit_code_to_u8(2), 2);
        assert_eq!(exit_code_to_u8(143), 143);
        assert_eq!(exit_code_to_u8(300), 255);
        assert_eq!(exit_code_to_u8(-1), 1);
    }
}
