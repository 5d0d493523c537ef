use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use class_reducer_core::{RestartPolicy, DEFAULT_OUT, DEFAULT_TEMP, DEFAULT_TIMEOUT_SECS};

use crate::logging::LogFormat;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Restart {
    /// Go back to the first module after every accepted candidate.
    FromFirst,
    /// Keep going with the current module; rescan only if a pass made progress.
    Continue,
}

impl From<Restart> for RestartPolicy {
    fn from(restart: Restart) -> Self {
        match restart {
            Restart::FromFirst => RestartPolicy::FromFirst,
            Restart::Continue => RestartPolicy::Continue,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Class file to reduce, relative to the working directory. Can be provided multiple
    /// times. When omitted, every `*.class` under the working directory is used.
    #[arg(long = "class", short = 'c', value_name = "PATH")]
    pub classes: Vec<String>,

    /// Interestingness test script. Can be provided multiple times. When omitted, every
    /// `*.sh` (`*.bat` on Windows) directly inside the working directory is used.
    #[arg(long = "test", short = 'i', value_name = "PATH")]
    pub tests: Vec<String>,

    /// Directory that relative paths are resolved against (default: current directory).
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Where reduced classes are written, relative to the working directory.
    #[arg(long = "out", short = 'o', value_name = "DIR", default_value = DEFAULT_OUT)]
    pub out_dir: PathBuf,

    /// Root for per-test scratch directories, relative to the working directory.
    #[arg(long = "temp", value_name = "DIR", default_value = DEFAULT_TEMP)]
    pub temp_dir: PathBuf,

    /// Keep scratch directories after their test has run.
    #[arg(long, default_value_t = false)]
    pub keep_temp: bool,

    /// Per-script timeout in seconds.
    #[arg(
        long,
        short = 't',
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Only use the named module (case-insensitive). Can be provided multiple times.
    #[arg(long = "module", short = 'm', value_name = "NAME")]
    pub modules: Vec<String>,

    /// Where the module scan resumes after an accepted candidate.
    #[arg(long, value_enum, default_value_t = Restart::FromFirst)]
    pub restart: Restart,

    /// Skip checking that the unmodified input is interesting before reducing.
    #[arg(long, default_value_t = false)]
    pub no_seed_check: bool,

    /// Number of classes reduced in parallel.
    #[arg(long, short = 'j', value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Print the available modules and exit.
    #[arg(long, default_value_t = false)]
    pub list_modules: bool,

    /// Print results as JSON on stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write the session report as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}
