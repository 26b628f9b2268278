use clap::Parser;
use foss_build::cli::{exit_code_to_u8, Cli, Controller};
use foss_build::config::Environment;
use foss_build::errors::EXIT_IO;
use foss_build::observability::{init_logging, LoggingConfig};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env = Environment::from_process();
    init_logging(LoggingConfig::resolve(&env, cli.verbosity()));

    let root = match std::env::current_dir() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: cannot determine the working directory: {e}");
            return ExitCode::from(exit_code_to_u8(EXIT_IO));
        }
    };

    let code = Controller::new(root).run(&cli, &env).await;
    ExitCode::from(exit_code_to_u8(code))
}
