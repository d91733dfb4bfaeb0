//! Log flags and the tracing subscriber.

use crate::{CliError, CliResult};
use clap::{ArgAction, Args};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human readable lines.
    Text,
}

/// Log flags shared by the bridge binaries.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct LogArgs {
    /// Verbosity: `-v` warnings, `-vv` info, `-vvv` debug, `-vvvv` trace.
    /// Errors are always logged. `RUST_LOG` directives take precedence.
    #[arg(short = 'v', action = ArgAction::Count, global = true, default_value = "2")]
    pub verbosity: u8,
    /// Output format.
    #[arg(long = "logs-type", value_enum, global = true, default_value_t = LogFormat::Json, env = "IRIS_LOGS_TYPE")]
    pub format: LogFormat,
    /// Also append logs to this file.
    #[arg(long = "logs-writer-file", global = true, env = "IRIS_LOGS_WRITER_FILE")]
    pub file: Option<PathBuf>,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self { verbosity: 2, format: LogFormat::Json, file: None }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: LevelFilter,
    format: LogFormat,
    file: Option<PathBuf>,
}

impl LogConfig {
    /// Resolves the flags.
    pub fn new(args: LogArgs) -> Self {
        let level = match args.verbosity {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        Self { level, format: args.format, file: args.file }
    }

    /// The default level when `RUST_LOG` is unset.
    pub const fn level(&self) -> LevelFilter {
        self.level
    }

    /// Installs the global tracing subscriber.
    ///
    /// `filter` replaces the filter derived from the verbosity and
    /// `RUST_LOG`. The returned guard flushes the log file when dropped and
    /// must be held for the lifetime of the program.
    pub fn init_tracing_subscriber(&self, filter: Option<EnvFilter>) -> CliResult<Option<WorkerGuard>> {
        let filter = filter.unwrap_or_else(|| {
            EnvFilter::builder().with_default_directive(self.level.into()).from_env_lossy()
        });

        let (file_writer, guard) = match &self.file {
            Some(path) => {
                let name = path
                    .file_name()
                    .ok_or_else(|| CliError::InvalidLogFile(path.display().to_string()))?;
                let directory = path.parent().map(PathBuf::from).unwrap_or_default();
                let appender = RollingFileAppender::builder()
                    .rotation(Rotation::NEVER)
                    .filename_prefix(name.to_string_lossy())
                    .build(directory)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let registry = tracing_subscriber::registry().with(filter);
        match self.format {
            LogFormat::Json => {
                let file = file_writer.map(|writer| fmt::layer().json().with_ansi(false).with_writer(writer));
                registry.with(fmt::layer().json()).with(file).try_init()?;
            }
            LogFormat::Text => {
                let file = file_writer.map(|writer| fmt::layer().with_ansi(false).with_writer(writer));
                registry.with(fmt::layer()).with(file).try_init()?;
            }
        }
        Ok(guard)
    }
}
