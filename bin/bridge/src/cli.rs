//! Contains the bridge CLI.

use crate::{
    commands::{PurgeQueueCommand, StartCommand},
    flags::GlobalArgs,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use iris_cli::{LogConfig, cli_styles};

/// Subcommands of the bridge CLI.
#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Commands {
    /// Runs the bridge.
    Start(StartCommand),
    /// Removes every pending task from the durable queue.
    PurgeQueue(PurgeQueueCommand),
}

/// The iris bridge.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub(crate) struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
    /// The subcommand to run.
    #[command(subcommand)]
    pub(crate) subcommand: Commands,
}

impl Cli {
    /// Runs the CLI.
    pub(crate) fn run(self) -> Result<()> {
        let _guard = LogConfig::new(self.global.log_args.clone()).init_tracing_subscriber(None)?;

        match self.subcommand {
            Commands::Start(start) => {
                self.global.metrics.init_metrics()?;
                Self::tokio_runtime()?.block_on(start.run(&self.global))
            }
            Commands::PurgeQueue(purge) => purge.run(&self.global),
        }
    }

    /// Creates a new multi-thread [Runtime](tokio::runtime::Runtime) with all features enabled.
    fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["iris-bridge", "start"]).unwrap();
        assert!(matches!(cli.subcommand, Commands::Start(_)));

        let cli = Cli::try_parse_from(["iris-bridge", "-vvv", "purge-queue", "--home", "/data"]).unwrap();
        assert!(matches!(cli.subcommand, Commands::PurgeQueue(_)));
        assert_eq!(cli.global.log_args.verbosity, 3);
        assert_eq!(cli.global.home, std::path::PathBuf::from("/data"));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["iris-bridge"]).is_err());
    }
}
