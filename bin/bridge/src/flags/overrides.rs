//! Flags overriding values of the configuration file.

use clap::Args;
use iris_bridge_core::{BridgeConfig, ProposerPolicyKind};
use std::path::PathBuf;
use url::Url;

/// Configuration overrides. Unset flags keep the file's value.
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct OverrideArgs {
    /// Root chain JSON-RPC endpoint.
    #[arg(long = "eth-rpc-url", global = true, env = "IRIS_ETH_RPC_URL")]
    pub(crate) eth_rpc_url: Option<Url>,
    /// Child chain JSON-RPC endpoint.
    #[arg(long = "zena-rpc-url", global = true, env = "IRIS_ZENA_RPC_URL")]
    pub(crate) zena_rpc_url: Option<Url>,
    /// Tendermint JSON-RPC endpoint of the sidechain node.
    #[arg(long = "tendermint-rpc-url", global = true, env = "IRIS_TENDERMINT_RPC_URL")]
    pub(crate) tendermint_rpc_url: Option<Url>,
    /// REST endpoint of the sidechain node.
    #[arg(long = "iris-rest-server", global = true, env = "IRIS_REST_SERVER")]
    pub(crate) iris_rest_server: Option<Url>,
    /// Directory of the bridge database.
    #[arg(long = "bridge-db", global = true, env = "IRIS_BRIDGE_DB")]
    pub(crate) bridge_db: Option<PathBuf>,
    /// Number of concurrent task consumers.
    #[arg(long = "queue-workers", global = true, env = "IRIS_QUEUE_WORKERS")]
    pub(crate) queue_workers: Option<usize>,
    /// Validator ordering used for responsibility checks.
    #[arg(long = "proposer-policy", global = true, env = "IRIS_PROPOSER_POLICY")]
    pub(crate) proposer_policy: Option<ProposerPolicyKind>,
}

impl OverrideArgs {
    /// Applies the set flags to `config`.
    pub(crate) fn apply(&self, mut config: BridgeConfig) -> BridgeConfig {
        if let Some(url) = &self.eth_rpc_url {
            config.eth_rpc_url = url.to_string();
        }
        if let Some(url) = &self.zena_rpc_url {
            config.zena_rpc_url = url.to_string();
        }
        if let Some(url) = &self.tendermint_rpc_url {
            config.tendermint_rpc_url = url.to_string();
        }
        if let Some(url) = &self.iris_rest_server {
            config.iris_rest_server = url.to_string();
        }
        if let Some(path) = &self.bridge_db {
            config.bridge_db = path.clone();
        }
        if let Some(workers) = self.queue_workers {
            config.queue_workers = workers;
        }
        if let Some(policy) = self.proposer_policy {
            config.proposer_policy = policy;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_overrides_keep_config() {
        let config = BridgeConfig::default();
        assert_eq!(OverrideArgs::default().apply(config.clone()), config);
    }

    #[test]
    fn test_endpoint_override() {
        let overrides = OverrideArgs {
            zena_rpc_url: Some(Url::parse("http://zena.internal:8545").unwrap()),
            ..Default::default()
        };
        let config = overrides.apply(BridgeConfig::default());
        assert_eq!(config.zena_rpc().unwrap().host_str(), Some("zena.internal"));
        assert_eq!(config.eth_rpc_url, BridgeConfig::default().eth_rpc_url);
    }
}
