use super::{ClientError, EvmChainClient};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, B256, Bytes};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::ClientBuilder;
use alloy_rpc_types_eth::{Filter, Log, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use iris_bridge_types::BlockHeader;
use std::time::Duration;
use url::Url;

/// An [`EvmChainClient`] over an alloy HTTP provider.
#[derive(Debug, Clone)]
pub struct AlloyChainClient {
    provider: RootProvider,
}

impl AlloyChainClient {
    /// Creates a client of the chain at `url` whose requests time out after
    /// `timeout`.
    pub fn new_http(url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let client = ClientBuilder::default().transport(Http::with_client(http, url), false);
        Ok(Self { provider: RootProvider::new(client) })
    }

    /// Wraps an existing provider.
    pub const fn new(provider: RootProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl EvmChainClient for AlloyChainClient {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn header(&self, number: Option<u64>) -> Result<Option<BlockHeader>, ClientError> {
        let tag = number.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);
        let block = self.provider.get_block_by_number(tag).await?;
        Ok(block.map(|block| BlockHeader::from(&block.header)))
    }

    async fn logs(
        &self,
        from: u64,
        to: u64,
        addresses: Vec<Address>,
        topics: Vec<B256>,
    ) -> Result<Vec<Log>, ClientError> {
        let filter =
            Filter::new().from_block(from).to_block(to).address(addresses).event_signature(topics);
        Ok(self.provider.get_logs(&filter).await?)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ClientError> {
        let request = TransactionRequest::default().to(to).input(data.into());
        Ok(self.provider.call(request).await?)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ClientError> {
        Ok(self.provider.get_transaction_count(address).await?)
    }

    async fn gas_price(&self) -> Result<u128, ClientError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<u64, ClientError> {
        let request = TransactionRequest::default().from(from).to(to).input(data.into());
        Ok(self.provider.estimate_gas(request).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, ClientError> {
        let pending = self.provider.send_raw_transaction(&raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn root_hash(&self, start: u64, end: u64) -> Result<B256, ClientError> {
        let raw: String =
            self.provider.raw_request("zena_getRootHash".into(), (start, end)).await?;
        raw.parse().map_err(|_| ClientError::Malformed(format!("root hash `{raw}`")))
    }

    async fn vote_on_hash(
        &self,
        start: u64,
        end: u64,
        hash: B256,
        milestone_id: String,
    ) -> Result<bool, ClientError> {
        Ok(self
            .provider
            .raw_request("zena_getVoteOnHash".into(), (start, end, hash, milestone_id))
            .await?)
    }
}
