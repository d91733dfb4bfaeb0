use super::ListenerError;
use crate::{
    BridgeConfig, BridgeIdentity, Poller,
    clients::{EvmChainClient, SidechainClient},
    constants::{LISTENER_TASK_RETRY_COUNT, TASK_DELAY_BETWEEN_EACH_VAL},
    queue::TaskQueue,
    responsibility::Responsibility,
};
use alloy_primitives::U256;
use alloy_rpc_types_eth::Log;
use async_trait::async_trait;
use iris_bridge_storage::{KeyValueStore, OffsetStore, ROOT_CHAIN_LAST_BLOCK_KEY};
use iris_bridge_types::{
    ChainEvent, PubKey, SourceChain, TaskName, TaskSignature,
    abi::{self, ROOT_CHAIN_EVENTS},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Scans confirmed root chain blocks for staking, state-sync, fee, slashing
/// and checkpoint events.
#[derive(Debug)]
pub struct RootChainListener {
    config: Arc<BridgeConfig>,
    identity: Arc<BridgeIdentity>,
    root_chain: Arc<dyn EvmChainClient>,
    sidechain: Arc<dyn SidechainClient>,
    responsibility: Responsibility,
    store: Arc<dyn KeyValueStore>,
    queue: TaskQueue,
}

impl RootChainListener {
    /// Creates the listener.
    pub fn new(
        config: Arc<BridgeConfig>,
        identity: Arc<BridgeIdentity>,
        root_chain: Arc<dyn EvmChainClient>,
        sidechain: Arc<dyn SidechainClient>,
        responsibility: Responsibility,
        store: Arc<dyn KeyValueStore>,
        queue: TaskQueue,
    ) -> Self {
        Self { config, identity, root_chain, sidechain, responsibility, store, queue }
    }

    async fn handle_log(&self, log: &Log) -> Result<(), ListenerError> {
        let Some(name) = log.topics().first().and_then(abi::event_name) else {
            return Ok(());
        };
        let event = ChainEvent::from_log(SourceChain::RootChain, name, log)
            .ok_or_else(|| ListenerError::InvalidEvent("log is not mined".to_string()))?;

        let Some((task, delay)) = self.route(&event).await? else {
            debug!(
                target: "bridge::listener::root_chain",
                event = name,
                tx_hash = %event.tx_hash,
                log_index = event.log_index,
                "Not responsible for event"
            );
            return Ok(());
        };

        let signature = TaskSignature::for_event(task, &event)?
            .with_retry_count(LISTENER_TASK_RETRY_COUNT)
            .with_delay(delay);
        self.queue.enqueue(signature).await?;
        info!(
            target: "bridge::listener::root_chain",
            event = name,
            %task,
            ?delay,
            block_number = event.block_number,
            tx_hash = %event.tx_hash,
            log_index = event.log_index,
            "Queued root chain event"
        );
        Ok(())
    }

    /// Maps an event to its task and the delay after which this validator
    /// relays it, or `None` when another validator is responsible.
    async fn route(&self, event: &ChainEvent) -> Result<Option<(TaskName, Duration)>, ListenerError> {
        let routed = match event.name.as_str() {
            "Staked" => {
                let staked = event.decode::<abi::Staked>()?;
                let delay = if PubKey::from_signer_pubkey(&staked.signerPubkey) == *self.identity.pub_key() {
                    Some(TASK_DELAY_BETWEEN_EACH_VAL)
                } else {
                    // The signer's fee top up has to land first.
                    self.responsibility.task_delay().await?.map(|d| d + TASK_DELAY_BETWEEN_EACH_VAL)
                };
                delay.map(|d| (TaskName::SendValidatorJoinToIris, d))
            }
            "StakeUpdate" => {
                let id = validator_id(event.decode::<abi::StakeUpdate>()?.validatorId)?;
                self.sender_or_responsible(id).await?.map(|d| (TaskName::SendStakeUpdateToIris, d))
            }
            "UnstakeInit" => {
                let id = validator_id(event.decode::<abi::UnstakeInit>()?.validatorId)?;
                self.sender_or_responsible(id).await?.map(|d| (TaskName::SendUnstakeInitToIris, d))
            }
            "UnJailed" => {
                let id = validator_id(event.decode::<abi::UnJailed>()?.validatorId)?;
                self.sender_or_responsible(id).await?.map(|d| (TaskName::SendUnjailToIris, d))
            }
            "SignerChange" => {
                let change = event.decode::<abi::SignerChange>()?;
                let delay = if PubKey::from_signer_pubkey(&change.signerPubkey) == *self.identity.pub_key() {
                    Some(Duration::ZERO)
                } else {
                    self.responsibility.task_delay().await?
                };
                delay.map(|d| (TaskName::SendSignerChangeToIris, d))
            }
            "TopUpFee" => {
                let topup = event.decode::<abi::TopUpFee>()?;
                let delay = if topup.user == self.identity.address() {
                    Some(Duration::ZERO)
                } else {
                    self.responsibility.task_delay().await?
                };
                delay.map(|d| (TaskName::SendTopUpFeeToIris, d))
            }
            "StateSynced" => {
                event.decode::<abi::StateSynced>()?;
                self.responsibility.task_delay().await?.map(|d| (TaskName::SendStateSyncedToIris, d))
            }
            "NewHeaderBlock" => {
                event.decode::<abi::NewHeaderBlock>()?;
                self.responsibility.task_delay().await?.map(|d| (TaskName::SendCheckpointAckToIris, d))
            }
            "Slashed" => {
                event.decode::<abi::Slashed>()?;
                self.responsibility.task_delay().await?.map(|d| (TaskName::SendTickAckToIris, d))
            }
            other => return Err(ListenerError::InvalidEvent(format!("unrouted event {other}"))),
        };
        Ok(routed)
    }

    /// Events of our own validator are relayed at once, others after the
    /// responsibility delay.
    async fn sender_or_responsible(&self, validator_id: u64) -> Result<Option<Duration>, ListenerError> {
        if self.responsibility.is_event_sender(validator_id).await? {
            return Ok(Some(Duration::ZERO));
        }
        Ok(self.responsibility.task_delay().await?)
    }
}

fn validator_id(raw: U256) -> Result<u64, ListenerError> {
    u64::try_from(raw).map_err(|_| ListenerError::InvalidEvent(format!("validator id {raw} overflows")))
}

#[async_trait]
impl Poller for RootChainListener {
    type Error = ListenerError;

    fn name(&self) -> &'static str {
        "root-chain-listener"
    }

    fn interval(&self) -> Duration {
        self.config.syncer_poll_interval
    }

    async fn poll(&self) -> Result<(), ListenerError> {
        let params = self.sidechain.chain_manager_params().await?;
        let confirmations =
            self.config.root_chain_confirmations.unwrap_or(params.main_chain_tx_confirmations);
        let head = self.root_chain.block_number().await?;
        let Some(confirmed) = head.checked_sub(confirmations) else {
            return Ok(());
        };

        let from = match self.store.last_block(ROOT_CHAIN_LAST_BLOCK_KEY)? {
            Some(last) => last + 1,
            None => self.config.root_chain_start_block,
        };
        if from > confirmed {
            debug!(target: "bridge::listener::root_chain", from, confirmed, "No new confirmed blocks");
            return Ok(());
        }
        let to = confirmed.min(from.saturating_add(self.config.max_log_range.max(1) - 1));

        let chain = &params.chain_params;
        let addresses = vec![
            chain.root_chain_address,
            chain.staking_info_address,
            chain.state_sender_address,
            chain.slash_manager_address,
        ];
        let topics = ROOT_CHAIN_EVENTS.iter().map(|(_, topic)| *topic).collect();
        let mut logs = self.root_chain.logs(from, to, addresses, topics).await?;
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        debug!(target: "bridge::listener::root_chain", from, to, logs = logs.len(), "Scanning root chain");
        for log in &logs {
            if let Err(err) = self.handle_log(log).await {
                if !err.is_item_error() {
                    return Err(err);
                }
                warn!(
                    target: "bridge::listener::root_chain",
                    %err,
                    block_number = ?log.block_number,
                    tx_hash = ?log.transaction_hash,
                    log_index = ?log.log_index,
                    "Skipping root chain log"
                );
            }
        }

        self.store.set_last_block(ROOT_CHAIN_LAST_BLOCK_KEY, to)?;
        #[cfg(feature = "metrics")]
        crate::Metrics::record_blocks_scanned("root-chain", to - from + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clients::{ClientError, MockEvmChainClient, MockSidechainClient},
        identity::tests::test_identity,
        queue::TaskReceiver,
        responsibility::LedgerProposerPolicy,
    };
    use alloy_primitives::{Address, B256, Bytes};
    use alloy_sol_types::SolEvent;
    use iris_bridge_storage::{MemoryKeyValueStore, TaskStore};
    use iris_bridge_types::{ChainManagerParams, ChainParams, Validator, ValidatorSet};

    fn chain_manager_params() -> ChainManagerParams {
        ChainManagerParams {
            main_chain_tx_confirmations: 6,
            zena_chain_tx_confirmations: 10,
            chain_params: ChainParams {
                state_sender_address: Address::repeat_byte(0x55),
                ..Default::default()
            },
        }
    }

    fn log_of<E: SolEvent>(event: &E, block: u64, index: u64) -> Log {
        Log {
            inner: alloy_primitives::Log { address: Address::repeat_byte(0x55), data: event.encode_log_data() },
            block_number: Some(block),
            transaction_hash: Some(B256::with_last_byte(block as u8)),
            log_index: Some(index),
            ..Default::default()
        }
    }

    fn state_synced(id: u64) -> abi::StateSynced {
        abi::StateSynced {
            id: U256::from(id),
            contractAddress: Address::repeat_byte(0xaa),
            data: Bytes::from_static(&[0xde, 0xad]),
        }
    }

    /// A sidechain where we are second in the validator set.
    fn sidechain() -> MockSidechainClient {
        let us = test_identity().address();
        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_chain_manager_params().returning(|| Ok(chain_manager_params()));
        sidechain.expect_validator_set().returning(move || {
            Ok(ValidatorSet {
                validators: vec![
                    Validator { id: 4, signer: Address::repeat_byte(4), ..Default::default() },
                    Validator { id: 1, signer: us, ..Default::default() },
                ],
                proposer: None,
            })
        });
        sidechain.expect_unconfirmed_tx_count().returning(|| Ok(0));
        sidechain
    }

    fn listener(
        config: BridgeConfig,
        root_chain: MockEvmChainClient,
        sidechain: MockSidechainClient,
        store: Arc<dyn KeyValueStore>,
    ) -> (RootChainListener, TaskReceiver) {
        let identity = Arc::new(test_identity());
        let sidechain: Arc<dyn SidechainClient> = Arc::new(sidechain);
        let responsibility = Responsibility::new(
            identity.clone(),
            sidechain.clone(),
            Arc::new(LedgerProposerPolicy::new(sidechain.clone())),
        );
        let (queue, rx) = TaskQueue::channel(TaskStore::new(store.clone()), 64);
        let listener = RootChainListener::new(
            Arc::new(config),
            identity,
            Arc::new(root_chain),
            sidechain,
            responsibility,
            store,
            queue,
        );
        (listener, rx)
    }

    #[tokio::test]
    async fn test_scan_queues_events_and_advances_offset() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        store.set_last_block(ROOT_CHAIN_LAST_BLOCK_KEY, 99).unwrap();

        let mut root_chain = MockEvmChainClient::new();
        root_chain.expect_block_number().returning(|| Ok(126));
        root_chain
            .expect_logs()
            .withf(|from, to, addresses, topics| {
                *from == 100 && *to == 120 && addresses.contains(&Address::repeat_byte(0x55)) && topics.len() == 9
            })
            .returning(|_, _, _, _| Ok(vec![log_of(&state_synced(43), 110, 1), log_of(&state_synced(42), 105, 3)]));

        let (listener, mut rx) = listener(BridgeConfig::default(), root_chain, sidechain(), store.clone());
        listener.poll().await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.name, TaskName::SendStateSyncedToIris);
        assert_eq!(first.string_arg(0).unwrap(), "StateSynced");
        let event: ChainEvent = serde_json::from_str(first.string_arg(1).unwrap()).unwrap();
        assert_eq!((event.block_number, event.log_index), (105, 3));
        assert_eq!(event.decode::<abi::StateSynced>().unwrap().id, U256::from(42));
        assert_eq!(first.retry_count, LISTENER_TASK_RETRY_COUNT);
        assert!(second.eta >= first.eta);
        assert_eq!(store.last_block(ROOT_CHAIN_LAST_BLOCK_KEY).unwrap(), Some(120));
    }

    #[tokio::test]
    async fn test_scan_is_capped_by_max_log_range() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let mut root_chain = MockEvmChainClient::new();
        root_chain.expect_block_number().returning(|| Ok(10_000));
        root_chain
            .expect_logs()
            .withf(|from, to, _, _| *from == 500 && *to == 549)
            .returning(|_, _, _, _| Ok(vec![]));

        let config = BridgeConfig {
            root_chain_start_block: 500,
            max_log_range: 50,
            root_chain_confirmations: Some(12),
            ..Default::default()
        };
        let (listener, _rx) = listener(config, root_chain, sidechain(), store.clone());
        listener.poll().await.unwrap();
        assert_eq!(store.last_block(ROOT_CHAIN_LAST_BLOCK_KEY).unwrap(), Some(549));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_offset() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        store.set_last_block(ROOT_CHAIN_LAST_BLOCK_KEY, 10).unwrap();
        let mut root_chain = MockEvmChainClient::new();
        root_chain.expect_block_number().returning(|| Ok(100));
        root_chain.expect_logs().returning(|_, _, _, _| Err(ClientError::Timeout));

        let (listener, _rx) = listener(BridgeConfig::default(), root_chain, sidechain(), store.clone());
        assert!(matches!(listener.poll().await, Err(ListenerError::Client(ClientError::Timeout))));
        assert_eq!(store.last_block(ROOT_CHAIN_LAST_BLOCK_KEY).unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_undecodable_log_is_skipped() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let mut broken = log_of(&state_synced(1), 3, 0);
        // Drop the indexed topics so the payload no longer decodes.
        broken.inner.data = alloy_primitives::LogData::new_unchecked(
            vec![abi::StateSynced::SIGNATURE_HASH],
            Bytes::new(),
        );
        let good = log_of(&state_synced(2), 4, 0);

        let mut root_chain = MockEvmChainClient::new();
        root_chain.expect_block_number().returning(|| Ok(20));
        root_chain.expect_logs().returning(move |_, _, _, _| Ok(vec![broken.clone(), good.clone()]));

        let (listener, mut rx) = listener(BridgeConfig::default(), root_chain, sidechain(), store.clone());
        listener.poll().await.unwrap();

        let task = rx.recv().await.unwrap();
        let event: ChainEvent = serde_json::from_str(task.string_arg(1).unwrap()).unwrap();
        assert_eq!(event.block_number, 4);
        assert!(rx.try_recv().is_err());
        assert_eq!(store.last_block(ROOT_CHAIN_LAST_BLOCK_KEY).unwrap(), Some(14));
    }

    #[tokio::test]
    async fn test_own_stake_is_relayed_without_responsibility() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let identity = test_identity();
        let staked = abi::Staked {
            signer: identity.address(),
            validatorId: U256::from(1),
            nonce: U256::from(1),
            activationEpoch: U256::from(10),
            amount: U256::from(1000),
            total: U256::from(1000),
            signerPubkey: Bytes::copy_from_slice(&identity.pub_key().as_bytes()[1..]),
        };
        let log = log_of(&staked, 7, 0);
        let mut root_chain = MockEvmChainClient::new();
        root_chain.expect_block_number().returning(|| Ok(20));
        root_chain.expect_logs().returning(move |_, _, _, _| Ok(vec![log.clone()]));

        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_chain_manager_params().returning(|| Ok(chain_manager_params()));
        sidechain.expect_validator_set().never();

        let (listener, mut rx) = listener(BridgeConfig::default(), root_chain, sidechain, store);
        listener.poll().await.unwrap();

        let task = rx.recv().await.unwrap();
        assert_eq!(task.name, TaskName::SendValidatorJoinToIris);
        let now = iris_bridge_types::unix_millis(std::time::SystemTime::now());
        assert!(task.eta > now + 5_000);
    }

    #[tokio::test]
    async fn test_not_responsible_events_are_not_queued() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let log = log_of(&state_synced(9), 5, 0);
        let mut root_chain = MockEvmChainClient::new();
        root_chain.expect_block_number().returning(|| Ok(20));
        root_chain.expect_logs().returning(move |_, _, _, _| Ok(vec![log.clone()]));

        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_chain_manager_params().returning(|| Ok(chain_manager_params()));
        sidechain.expect_validator_set().returning(|| Ok(ValidatorSet::default()));

        let (listener, mut rx) = listener(BridgeConfig::default(), root_chain, sidechain, store.clone());
        listener.poll().await.unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(store.last_block(ROOT_CHAIN_LAST_BLOCK_KEY).unwrap(), Some(14));
    }

    #[tokio::test]
    async fn test_own_stake_update_is_relayed_immediately() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let update = abi::StakeUpdate {
            validatorId: U256::from(1),
            nonce: U256::from(2),
            newAmount: U256::from(5000),
        };
        let log = log_of(&update, 8, 2);
        let mut root_chain = MockEvmChainClient::new();
        root_chain.expect_block_number().returning(|| Ok(20));
        root_chain.expect_logs().returning(move |_, _, _, _| Ok(vec![log.clone()]));

        let us = test_identity().address();
        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_chain_manager_params().returning(|| Ok(chain_manager_params()));
        sidechain
            .expect_validator()
            .returning(move |id| Ok(Some(Validator { id, signer: us, ..Default::default() })));

        let (listener, mut rx) = listener(BridgeConfig::default(), root_chain, sidechain, store);
        listener.poll().await.unwrap();

        let task = rx.recv().await.unwrap();
        assert_eq!(task.name, TaskName::SendStakeUpdateToIris);
        assert!(task.is_due(std::time::SystemTime::now()));
    }
}
