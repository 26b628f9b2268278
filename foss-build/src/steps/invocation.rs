//! Command lines for each step.

use crate::config::Config;
use crate::core::Step;
use serde::Serialize;
use std::fmt;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// The program to execute, resolved through `PATH` unless it contains a slash.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the command line for `step` under `config`.
    #[must_use]
    pub fn for_step(step: Step, config: &Config) -> Self {
        let jobs = config.parallelism.to_string();
        match step {
            Step::Autoconf => Self::new("autoconf", Vec::<String>::new()),
            Step::Configure => Self::new(
                "./configure",
                [format!("--prefix={}", config.prefix.display())],
            ),
            Step::Build => Self::new("make", ["-j".to_string(), jobs]),
            Step::Test => Self::new("make", ["-j".to_string(), jobs, "test".to_string()]),
            Step::Install => {
                let make = Self::new("make", ["-j".to_string(), jobs, "install".to_string()]);
                if config.use_sudo {
                    make.wrapped("sudo")
                } else {
                    make
                }
            }
        }
    }

    /// Returns this invocation run through a wrapper program such as `sudo`.
    #[must_use]
    pub fn wrapped(self, wrapper: impl Into<String>) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: wrapper.into(),
            args,
        }
    }

    /// Returns the full argument vector, program first.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.argv().into_iter().map(quote_arg).collect();
        f.write_str(&rendered.join(" "))
    }
}

/// Quotes an argument for display if it contains shell metacharacters.
fn quote_arg(arg: &str) -> String {
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if arg.is_empty() {
        "''".to_string()
    } else if arg.contains(SHELL_META) {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_string()
    }
}
