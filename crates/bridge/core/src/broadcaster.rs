//! The transaction broadcaster.
//!
//! Every outbound transaction of the bridge goes through [`TxBroadcaster`].
//! Submissions to the same destination are serialized by a per destination
//! lock, so the sidechain account sequence and the EVM account nonces are
//! never used twice concurrently.

use crate::{
    BridgeConfig, BridgeIdentity, IdentityError,
    clients::{ClientError, EvmChainClient, SidechainClient},
};
use alloy_consensus::TxLegacy;
use alloy_primitives::{Address, B256, Bytes, TxKind, U256};
use backon::{ExponentialBuilder, Retryable};
use iris_bridge_types::{ChainEvent, Msg, MsgError, SidechainMsg, StdSignDoc, StdTx, TxResponse};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// An error submitting a transaction.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The message failed its stateless checks.
    #[error(transparent)]
    InvalidMsg(#[from] MsgError),
    /// The chain could not be reached or rejected the request.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Signing failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// The transaction could not be encoded.
    #[error(transparent)]
    Encoding(#[from] serde_json::Error),
    /// The bridge's account does not exist on the sidechain.
    #[error("sidechain account {0} not found")]
    AccountNotFound(Address),
    /// The root chain gas price exceeds the configured ceiling.
    #[error("gas price {price} exceeds the maximum of {max}")]
    GasPriceTooHigh {
        /// Current gas price.
        price: u128,
        /// Configured ceiling.
        max: u128,
    },
    /// The submission did not complete in time.
    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
}

impl BroadcastError {
    /// Returns whether submitting again later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Client(err) => err.is_transient(),
            Self::Timeout(_) | Self::GasPriceTooHigh { .. } => true,
            _ => false,
        }
    }
}

/// The cached sidechain account state of the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Sequence {
    account_number: u64,
    sequence: u64,
    loaded: bool,
}

/// Destination of an EVM transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
enum EvmDestination {
    #[display("root-chain")]
    RootChain,
    #[display("child-chain")]
    ChildChain,
}

/// Signs and submits transactions to the sidechain, the child chain and the
/// root chain.
#[derive(Debug)]
pub struct TxBroadcaster {
    config: Arc<BridgeConfig>,
    identity: Arc<BridgeIdentity>,
    sidechain: Arc<dyn SidechainClient>,
    root_chain: Arc<dyn EvmChainClient>,
    child_chain: Arc<dyn EvmChainClient>,
    sidechain_lock: Mutex<Sequence>,
    root_chain_lock: Mutex<()>,
    child_chain_lock: Mutex<()>,
}

impl TxBroadcaster {
    /// Creates a broadcaster. The sidechain sequence is loaded on first use.
    pub fn new(
        config: Arc<BridgeConfig>,
        identity: Arc<BridgeIdentity>,
        sidechain: Arc<dyn SidechainClient>,
        root_chain: Arc<dyn EvmChainClient>,
        child_chain: Arc<dyn EvmChainClient>,
    ) -> Self {
        Self {
            config,
            identity,
            sidechain,
            root_chain,
            child_chain,
            sidechain_lock: Mutex::new(Sequence::default()),
            root_chain_lock: Mutex::new(()),
            child_chain_lock: Mutex::new(()),
        }
    }

    /// Reads the bridge account from the sidechain, retrying transient
    /// failures.
    async fn fetch_sequence(&self) -> Result<Sequence, BroadcastError> {
        let address = self.identity.address();
        let account = (|| async { self.sidechain.account(address).await })
            .retry(ExponentialBuilder::default().with_max_times(3))
            .when(ClientError::is_transient)
            .await?
            .ok_or(BroadcastError::AccountNotFound(address))?;
        Ok(Sequence {
            account_number: account.account_number,
            sequence: account.sequence,
            loaded: true,
        })
    }

    /// Replaces the cached sequence with the sidechain's view. On failure the
    /// cache is marked stale and reloaded by the next broadcast.
    async fn refresh_sequence(&self, state: &mut Sequence) {
        match self.fetch_sequence().await {
            Ok(fresh) => *state = fresh,
            Err(err) => {
                warn!(target: "bridge::broadcaster", %err, "Failed to refresh sidechain sequence");
                state.loaded = false;
            }
        }
    }

    /// Signs `msg` with the cached account sequence and submits it to the
    /// sidechain.
    ///
    /// The sequence advances only when the node accepts the transaction. Any
    /// error or non-OK response re-reads the account from the sidechain so
    /// the next submission starts from the node's view; the response itself
    /// is returned unchanged for the caller to inspect.
    pub async fn broadcast_to_sidechain(
        &self,
        msg: Msg,
        event: Option<&ChainEvent>,
    ) -> Result<TxResponse, BroadcastError> {
        msg.validate_basic()?;
        let msg_type = msg.msg_type();
        let (tx_hash, log_index) =
            event.map(|event| (event.tx_hash, event.log_index)).unwrap_or_default();

        let mut state = self.sidechain_lock.lock().await;
        if !state.loaded {
            *state = self.fetch_sequence().await?;
        }

        let doc = StdSignDoc {
            chain_id: self.config.iris_chain_id.clone(),
            account_number: state.account_number,
            sequence: state.sequence,
            msgs: vec![msg],
            memo: String::new(),
        };
        let signature = self.identity.sign_hash(&doc.signing_hash()?)?;
        let tx = StdTx { msgs: doc.msgs, signature, memo: doc.memo }.encode()?;

        match self.sidechain.broadcast_tx_sync(tx).await {
            Ok(response) if response.is_ok() => {
                info!(
                    target: "bridge::broadcaster",
                    msg_type,
                    sequence = state.sequence,
                    txhash = %response.txhash,
                    %tx_hash,
                    log_index,
                    "Broadcast transaction to sidechain"
                );
                state.sequence += 1;
                #[cfg(feature = "metrics")]
                crate::Metrics::record_broadcast("sidechain", true);
                Ok(response)
            }
            Ok(response) => {
                warn!(
                    target: "bridge::broadcaster",
                    msg_type,
                    code = response.code,
                    raw_log = %response.raw_log,
                    %tx_hash,
                    log_index,
                    "Sidechain rejected transaction, refreshing sequence"
                );
                #[cfg(feature = "metrics")]
                crate::Metrics::record_broadcast("sidechain", false);
                self.refresh_sequence(&mut state).await;
                Ok(response)
            }
            Err(err) => {
                error!(
                    target: "bridge::broadcaster",
                    msg_type,
                    %err,
                    %tx_hash,
                    log_index,
                    "Failed to broadcast transaction to sidechain, refreshing sequence"
                );
                #[cfg(feature = "metrics")]
                crate::Metrics::record_broadcast("sidechain", false);
                self.refresh_sequence(&mut state).await;
                Err(err.into())
            }
        }
    }

    /// Submits a contract call to the child chain.
    pub async fn broadcast_to_child_chain(
        &self,
        to: Address,
        data: Bytes,
    ) -> Result<B256, BroadcastError> {
        let _guard = self.child_chain_lock.lock().await;
        self.send_evm_tx(EvmDestination::ChildChain, to, data).await
    }

    /// Submits a contract call to the root chain.
    pub async fn broadcast_to_root_chain(
        &self,
        to: Address,
        data: Bytes,
    ) -> Result<B256, BroadcastError> {
        let _guard = self.root_chain_lock.lock().await;
        self.send_evm_tx(EvmDestination::RootChain, to, data).await
    }

    async fn send_evm_tx(
        &self,
        destination: EvmDestination,
        to: Address,
        data: Bytes,
    ) -> Result<B256, BroadcastError> {
        let (client, timeout) = match destination {
            EvmDestination::RootChain => (&self.root_chain, self.config.eth_rpc_timeout),
            EvmDestination::ChildChain => (&self.child_chain, self.config.zena_rpc_timeout),
        };
        let from = self.identity.address();

        let submit = async {
            let chain_id = client.chain_id().await?;
            let nonce = client.transaction_count(from).await?;
            let gas_price = client.gas_price().await?;

            let gas_limit = match destination {
                EvmDestination::RootChain => {
                    let max = self.config.main_chain_max_gas_price;
                    if gas_price > max {
                        return Err(BroadcastError::GasPriceTooHigh { price: gas_price, max });
                    }
                    self.config.main_chain_gas_limit
                }
                EvmDestination::ChildChain => client.estimate_gas(from, to, data.clone()).await?,
            };

            let tx = TxLegacy {
                chain_id: Some(chain_id),
                nonce,
                gas_price,
                gas_limit,
                to: TxKind::Call(to),
                value: U256::ZERO,
                input: data,
            };
            let raw = self.identity.sign_legacy_tx(tx)?;
            Ok::<_, BroadcastError>((nonce, client.send_raw_transaction(raw).await?))
        };

        let result = tokio::time::timeout(timeout, submit)
            .await
            .map_err(|_| BroadcastError::Timeout(timeout))
            .and_then(|result| result);

        #[cfg(feature = "metrics")]
        crate::Metrics::record_broadcast(
            match destination {
                EvmDestination::RootChain => "root-chain",
                EvmDestination::ChildChain => "child-chain",
            },
            result.is_ok(),
        );

        match result {
            Ok((nonce, hash)) => {
                info!(target: "bridge::broadcaster", %destination, %to, nonce, %hash, "Submitted transaction");
                Ok(hash)
            }
            Err(err) => {
                error!(target: "bridge::broadcaster", %destination, %to, %err, "Failed to submit transaction");
                Err(err)
            }
        }
    }
}
