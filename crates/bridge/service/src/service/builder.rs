use crate::{BridgeService, ServiceError};
use iris_bridge_core::{
    BridgeConfig, BridgeIdentity,
    clients::{AlloyChainClient, EvmChainClient, HttpSidechainClient, SidechainClient},
    responsibility::{ProposerPolicy, proposer_policy},
};
use iris_bridge_storage::{DiskKeyValueStore, KeyValueStore};
use std::sync::Arc;

/// Builds a [`BridgeService`].
///
/// Every component left unset is created from the [`BridgeConfig`]: the
/// identity from `priv_validator_key`, the store from `bridge_db` and the
/// clients from the configured endpoints.
#[derive(Debug)]
pub struct BridgeServiceBuilder {
    config: BridgeConfig,
    identity: Option<BridgeIdentity>,
    store: Option<Arc<dyn KeyValueStore>>,
    sidechain: Option<Arc<dyn SidechainClient>>,
    root_chain: Option<Arc<dyn EvmChainClient>>,
    child_chain: Option<Arc<dyn EvmChainClient>>,
    policy: Option<Arc<dyn ProposerPolicy>>,
}

impl BridgeServiceBuilder {
    /// Creates a builder over `config`.
    pub const fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            identity: None,
            store: None,
            sidechain: None,
            root_chain: None,
            child_chain: None,
            policy: None,
        }
    }

    /// Signs with `identity` instead of loading the configured key file.
    pub fn with_identity(mut self, identity: BridgeIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Uses `store` instead of opening the configured database.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `client` to reach the sidechain.
    pub fn with_sidechain(mut self, client: Arc<dyn SidechainClient>) -> Self {
        self.sidechain = Some(client);
        self
    }

    /// Uses `client` to reach the root chain.
    pub fn with_root_chain(mut self, client: Arc<dyn EvmChainClient>) -> Self {
        self.root_chain = Some(client);
        self
    }

    /// Uses `client` to reach the child chain.
    pub fn with_child_chain(mut self, client: Arc<dyn EvmChainClient>) -> Self {
        self.child_chain = Some(client);
        self
    }

    /// Uses `policy` instead of the configured proposer policy.
    pub fn with_proposer_policy(mut self, policy: Arc<dyn ProposerPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Builds the service. Failing to load the key, to parse an endpoint or
    /// to open the database is fatal.
    pub fn build(self) -> Result<BridgeService, ServiceError> {
        let config = self.config;

        let identity = match self.identity {
            Some(identity) => identity,
            None => BridgeIdentity::from_key_file(&config.priv_validator_key)?,
        };
        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(DiskKeyValueStore::open(&config.bridge_db)?),
        };
        let sidechain: Arc<dyn SidechainClient> = match self.sidechain {
            Some(client) => client,
            None => Arc::new(HttpSidechainClient::new(
                config.iris_rest()?,
                config.tendermint_rpc()?,
                config.http_timeout,
            )?),
        };
        let root_chain: Arc<dyn EvmChainClient> = match self.root_chain {
            Some(client) => client,
            None => Arc::new(AlloyChainClient::new_http(config.eth_rpc()?, config.eth_rpc_timeout)?),
        };
        let child_chain: Arc<dyn EvmChainClient> = match self.child_chain {
            Some(client) => client,
            None => Arc::new(AlloyChainClient::new_http(config.zena_rpc()?, config.zena_rpc_timeout)?),
        };
        let policy = self
            .policy
            .unwrap_or_else(|| proposer_policy(config.proposer_policy, sidechain.clone()));

        Ok(BridgeService {
            config: Arc::new(config),
            identity: Arc::new(identity),
            store,
            sidechain,
            root_chain,
            child_chain,
            policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_bridge_core::IdentityError;

    #[test]
    fn test_missing_key_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default().with_home(dir.path());

        let err = BridgeServiceBuilder::new(config).build().unwrap_err();
        assert!(matches!(err, ServiceError::Identity(IdentityError::Io { .. })));
    }

    #[test]
    fn test_malformed_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default().with_home(dir.path());
        std::fs::create_dir_all(config.priv_validator_key.parent().unwrap()).unwrap();
        std::fs::write(&config.priv_validator_key, "not a key").unwrap();

        let err = BridgeServiceBuilder::new(config).build().unwrap_err();
        assert!(matches!(err, ServiceError::Identity(IdentityError::InvalidKey(_))));
    }

    #[test]
    fn test_defaults_open_database_under_home() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default().with_home(dir.path());
        std::fs::create_dir_all(config.priv_validator_key.parent().unwrap()).unwrap();
        std::fs::write(&config.priv_validator_key, crate::service::bridge::tests::TEST_KEY).unwrap();

        let service = BridgeServiceBuilder::new(config).build().unwrap();
        assert!(dir.path().join("bridge/storage").exists());
        assert_eq!(service.config().queue_workers, 4);
    }
}
