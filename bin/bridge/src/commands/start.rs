//! The `start` subcommand.

use crate::flags::GlobalArgs;
use clap::Parser;
use iris_bridge_service::BridgeService;
use tracing::info;

/// Runs the bridge until SIGINT or SIGTERM.
#[derive(Parser, Default, PartialEq, Eq, Debug, Clone)]
pub(crate) struct StartCommand {}

impl StartCommand {
    /// Runs the subcommand.
    pub(crate) async fn run(self, args: &GlobalArgs) -> anyhow::Result<()> {
        let config = args.load_config()?;
        info!(
            target: "bridge::cli",
            home = %args.home.display(),
            eth_rpc_url = %config.eth_rpc_url,
            zena_rpc_url = %config.zena_rpc_url,
            iris_rest_server = %config.iris_rest_server,
            "Starting iris bridge"
        );
        BridgeService::builder(config).build()?.start().await?;
        Ok(())
    }
}
