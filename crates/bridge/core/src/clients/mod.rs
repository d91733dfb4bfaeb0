//! Clients of the three chains the bridge talks to.

mod error;
pub use error::ClientError;

mod evm;
pub use evm::AlloyChainClient;

mod root_chain;
pub use root_chain::RootChainContracts;

mod sidechain;
pub use sidechain::HttpSidechainClient;

use alloy_primitives::{Address, B256, Bytes};
use alloy_rpc_types_eth::Log;
use async_trait::async_trait;
use iris_bridge_types::{
    Account, BlockEvent, BlockHeader, ChainManagerParams, Checkpoint, CheckpointParams,
    EventCategory, Milestone, NodeStatus, SidechainTx, Span, SpanSeed, StdTx, TxResponse,
    Validator, ValidatorNonce, ValidatorSet, ValidatorSlashingInfo,
};
use std::fmt::Debug;

/// Read and submit access to the sidechain node.
///
/// Queries go to the node's REST server, consensus level data (status, block
/// events, mempool, committed transactions) to its Tendermint RPC.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SidechainClient: Debug + Send + Sync {
    /// Sync status of the node.
    async fn node_status(&self) -> Result<NodeStatus, ClientError>;

    /// The account of `address`, if it exists.
    async fn account(&self, address: Address) -> Result<Option<Account>, ClientError>;

    /// Submits an encoded transaction and waits for its mempool check.
    async fn broadcast_tx_sync(&self, tx: Vec<u8>) -> Result<TxResponse, ClientError>;

    /// Begin-block events emitted at `height`.
    async fn block_events(&self, height: u64) -> Result<Vec<BlockEvent>, ClientError>;

    /// Decodable transactions pending in the mempool.
    async fn unconfirmed_txs(&self) -> Result<Vec<StdTx>, ClientError>;

    /// Number of transactions pending in the mempool.
    async fn unconfirmed_tx_count(&self) -> Result<u64, ClientError>;

    /// A committed transaction.
    async fn tx(&self, hash: B256) -> Result<SidechainTx, ClientError>;

    /// Validator signatures over the side-tx committed at `height`.
    async fn side_tx_signatures(&self, height: u64, tx_hash: B256)
    -> Result<Vec<Bytes>, ClientError>;

    /// Whether the root chain event identified by `tx_hash` and `log_index`
    /// has already been applied under `category`.
    async fn is_old_tx(
        &self,
        category: EventCategory,
        tx_hash: B256,
        log_index: u64,
    ) -> Result<bool, ClientError>;

    /// Chain manager parameters.
    async fn chain_manager_params(&self) -> Result<ChainManagerParams, ClientError>;

    /// Checkpoint parameters.
    async fn checkpoint_params(&self) -> Result<CheckpointParams, ClientError>;

    /// Current validator set.
    async fn validator_set(&self) -> Result<ValidatorSet, ClientError>;

    /// Validator with the staking id `id`.
    async fn validator(&self, id: u64) -> Result<Option<Validator>, ClientError>;

    /// Staking nonce of validator `id` and the height it was read at.
    async fn validator_nonce(&self, id: u64) -> Result<ValidatorNonce, ClientError>;

    /// Number of staking transactions of validator `id` committed above
    /// `height`.
    async fn staking_tx_count(&self, id: u64, height: u64) -> Result<u64, ClientError>;

    /// The next `count` checkpoint proposers.
    async fn proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError>;

    /// The current checkpoint proposer.
    async fn current_proposer(&self) -> Result<Option<Validator>, ClientError>;

    /// The next `count` milestone proposers.
    async fn milestone_proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError>;

    /// The latest acknowledged checkpoint.
    async fn latest_checkpoint(&self) -> Result<Option<Checkpoint>, ClientError>;

    /// The checkpoint awaiting acknowledgement.
    async fn buffered_checkpoint(&self) -> Result<Option<Checkpoint>, ClientError>;

    /// Root hash of the dividend accounts.
    async fn account_root_hash(&self) -> Result<B256, ClientError>;

    /// The latest milestone.
    async fn latest_milestone(&self) -> Result<Option<Milestone>, ClientError>;

    /// Number of milestones.
    async fn milestone_count(&self) -> Result<u64, ClientError>;

    /// The latest span.
    async fn latest_span(&self) -> Result<Option<Span>, ClientError>;

    /// The span the sidechain would accept next.
    async fn next_span(
        &self,
        id: u64,
        start_block: u64,
        chain_id: String,
        proposer: Address,
    ) -> Result<Span, ClientError>;

    /// Seed of span `id`.
    async fn next_span_seed(&self, id: u64) -> Result<SpanSeed, ClientError>;

    /// Encoded slashing information accumulated since the last tick.
    async fn latest_slash_info_bytes(&self) -> Result<Bytes, ClientError>;

    /// Number of ticks.
    async fn tick_count(&self) -> Result<u64, ClientError>;

    /// Slashing information of the latest tick.
    async fn tick_slash_infos(&self) -> Result<Vec<ValidatorSlashingInfo>, ClientError>;
}

/// Access to an EVM chain.
///
/// [`root_hash`](Self::root_hash) and [`vote_on_hash`](Self::vote_on_hash) are
/// only served by the child chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvmChainClient: Debug + Send + Sync {
    /// Chain id.
    async fn chain_id(&self) -> Result<u64, ClientError>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64, ClientError>;

    /// Header of block `number`, or of the latest block.
    async fn header(&self, number: Option<u64>) -> Result<Option<BlockHeader>, ClientError>;

    /// Logs in `from..=to` emitted by `addresses` with one of `topics` as
    /// first topic.
    async fn logs(
        &self,
        from: u64,
        to: u64,
        addresses: Vec<Address>,
        topics: Vec<B256>,
    ) -> Result<Vec<Log>, ClientError>;

    /// Executes a read only call.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ClientError>;

    /// Transaction count, and so the next nonce, of `address`.
    async fn transaction_count(&self, address: Address) -> Result<u64, ClientError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, ClientError>;

    /// Estimates the gas of a call.
    async fn estimate_gas(&self, from: Address, to: Address, data: Bytes)
    -> Result<u64, ClientError>;

    /// Submits a signed transaction and returns its hash.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, ClientError>;

    /// Merkle root of the block hashes in `start..=end`.
    async fn root_hash(&self, start: u64, end: u64) -> Result<B256, ClientError>;

    /// Whether the chain agrees that `hash` ends the range `start..=end`.
    async fn vote_on_hash(
        &self,
        start: u64,
        end: u64,
        hash: B256,
        milestone_id: String,
    ) -> Result<bool, ClientError>;
}
