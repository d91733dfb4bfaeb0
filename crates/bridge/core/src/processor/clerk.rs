use super::{ProcessorContext, ProcessorError, to_u64};
use crate::{
    constants::RETRY_STATE_SYNC_TASK_DELAY,
    queue::{TaskError, TaskHandler},
};
use alloy_primitives::Bytes;
use async_trait::async_trait;
use iris_bridge_types::{
    ChainEvent, EventCategory, LEGACY_MAX_STATE_SYNC_SIZE, MAX_STATE_SYNC_SIZE, SidechainMsg,
    TaskName, TaskSignature, abi, msgs::MsgEventRecord,
};
use tracing::{debug, info, warn};

/// Largest state-sync payload the sidechain accepts at `height`.
pub(crate) const fn max_state_sync_size(height: u64, span_override_height: u64) -> usize {
    if height > span_override_height { MAX_STATE_SYNC_SIZE } else { LEGACY_MAX_STATE_SYNC_SIZE }
}

/// Relays `StateSynced` deposits and state updates as event records.
#[derive(Debug, Clone)]
pub struct ClerkProcessor {
    ctx: ProcessorContext,
}

impl ClerkProcessor {
    /// Creates the processor.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    async fn send_state_synced(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let synced = event.decode::<abi::StateSynced>()?;
        if self.ctx.already_processed(EventCategory::Clerk, event).await? {
            return Ok(());
        }
        let id = to_u64(synced.id, "state id")?;
        debug!(
            target: "bridge::processor::clerk",
            id,
            contract = %synced.contractAddress,
            tx_hash = %event.tx_hash,
            log_index = event.log_index,
            block_number = event.block_number,
            "New state-sync event"
        );

        // Oversized payloads are relayed empty so the record id sequence has no gaps.
        let height = self.ctx.sidechain.node_status().await?.latest_block_height;
        let limit = max_state_sync_size(height, self.ctx.config.forks.span_override_height);
        let data = if synced.data.len() > limit {
            info!(target: "bridge::processor::clerk", id, size = synced.data.len(), limit, "State-sync data too large, relaying it empty");
            Bytes::new()
        } else {
            synced.data
        };

        if self.in_mempool(event).await {
            info!(
                target: "bridge::processor::clerk",
                id,
                tx_hash = %event.tx_hash,
                delay = ?RETRY_STATE_SYNC_TASK_DELAY,
                "Event record already pending in mempool, retrying later"
            );
            return Err(ProcessorError::retry_later("event record already in mempool", RETRY_STATE_SYNC_TASK_DELAY));
        }

        let chain_id = self.ctx.sidechain.chain_manager_params().await?.chain_params.zena_chain_id;
        let msg = MsgEventRecord {
            from: self.ctx.identity.address(),
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
            contract_address: synced.contractAddress,
            data,
            id,
            chain_id,
        };
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }

    /// Whether a transaction relaying the same event is waiting in the
    /// mempool. An unreadable mempool counts as not pending.
    async fn in_mempool(&self, event: &ChainEvent) -> bool {
        match self.ctx.sidechain.unconfirmed_txs().await {
            Ok(txs) => txs
                .iter()
                .flat_map(|tx| &tx.msgs)
                .any(|msg| msg.event_ref() == Some((event.tx_hash, event.log_index))),
            Err(err) => {
                warn!(target: "bridge::processor::clerk", %err, "Failed to read mempool");
                false
            }
        }
    }
}

#[async_trait]
impl TaskHandler for ClerkProcessor {
    fn task_names(&self) -> &'static [TaskName] {
        &[TaskName::SendStateSyncedToIris]
    }

    async fn handle(&self, task: &TaskSignature) -> Result<(), TaskError> {
        let event = ProcessorContext::chain_event(task)?;
        match task.name {
            TaskName::SendStateSyncedToIris => self.send_state_synced(&event).await,
            other => Err(ProcessorError::UnexpectedTask(other)),
        }
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clients::ClientError,
        processor::tests::{Mocks, event_task},
    };
    use alloy_primitives::{Address, B256, Bytes, U256};
    use iris_bridge_types::{
        ChainManagerParams, ChainParams, Msg, NodeStatus, StdTx, msgs::MsgEventRecord,
    };
    use rstest::rstest;

    fn state_synced(size: usize) -> abi::StateSynced {
        abi::StateSynced {
            id: U256::from(77),
            contractAddress: Address::repeat_byte(0xaa),
            data: Bytes::from(vec![1u8; size]),
        }
    }

    fn mocks(height: u64) -> Mocks {
        let mut mocks = Mocks::new();
        mocks.config.forks.span_override_height = 1000;
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(false));
        mocks
            .sidechain
            .expect_node_status()
            .returning(move || Ok(NodeStatus { latest_block_height: height, catching_up: false }));
        mocks.sidechain.expect_chain_manager_params().returning(|| {
            Ok(ChainManagerParams {
                chain_params: ChainParams { zena_chain_id: "15001".into(), ..Default::default() },
                ..Default::default()
            })
        });
        mocks
    }

    #[rstest]
    #[case(1000, LEGACY_MAX_STATE_SYNC_SIZE)]
    #[case(1001, MAX_STATE_SYNC_SIZE)]
    fn test_max_state_sync_size(#[case] height: u64, #[case] expected: usize) {
        assert_eq!(max_state_sync_size(height, 1000), expected);
    }

    #[rstest]
    #[case::small(2000, 64, 64)]
    #[case::legacy_limit(500, 40_000, 40_000)]
    #[case::new_limit(2000, 40_000, 0)]
    #[case::over_legacy_limit(500, 100_001, 0)]
    #[tokio::test]
    async fn test_state_sync_is_relayed(#[case] height: u64, #[case] size: usize, #[case] relayed: usize) {
        let mut mocks = mocks(height);
        mocks.sidechain.expect_unconfirmed_txs().returning(|| Ok(vec![]));
        let sent = mocks.accept_broadcasts();

        let processor = ClerkProcessor::new(mocks.build());
        processor.handle(&event_task(TaskName::SendStateSyncedToIris, &state_synced(size))).await.unwrap();

        let sent = sent.lock().unwrap();
        let [Msg::EventRecord(record)] = sent.as_slice() else { panic!("unexpected msgs {sent:?}") };
        assert_eq!(record.id, 77);
        assert_eq!(record.chain_id, "15001");
        assert_eq!(record.contract_address, Address::repeat_byte(0xaa));
        assert_eq!(record.data.len(), relayed);
        assert_eq!((record.tx_hash, record.log_index, record.block_number), (B256::repeat_byte(0xee), 3, 100));
    }

    #[tokio::test]
    async fn test_pending_record_retries_later() {
        let mut mocks = mocks(10);
        mocks.sidechain.expect_unconfirmed_txs().returning(|| {
            let pending = MsgEventRecord {
                from: Address::repeat_byte(1),
                tx_hash: B256::repeat_byte(0xee),
                log_index: 3,
                block_number: 100,
                contract_address: Address::repeat_byte(0xaa),
                data: Bytes::new(),
                id: 77,
                chain_id: "15001".into(),
            };
            Ok(vec![StdTx { msgs: vec![pending.into()], signature: Bytes::new(), memo: String::new() }])
        });
        mocks.sidechain.expect_broadcast_tx_sync().never();

        let processor = ClerkProcessor::new(mocks.build());
        let err = processor.handle(&event_task(TaskName::SendStateSyncedToIris, &state_synced(8))).await.unwrap_err();
        assert!(matches!(err, TaskError::RetryLater { delay, .. } if delay == RETRY_STATE_SYNC_TASK_DELAY));
    }

    #[tokio::test]
    async fn test_unreadable_mempool_does_not_block() {
        let mut mocks = mocks(10);
        mocks.sidechain.expect_unconfirmed_txs().returning(|| Err(ClientError::Timeout));
        let sent = mocks.accept_broadcasts();

        let processor = ClerkProcessor::new(mocks.build());
        processor.handle(&event_task(TaskName::SendStateSyncedToIris, &state_synced(8))).await.unwrap();
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_redelivered_state_sync_is_relayed_once() {
        let mut mocks = Mocks::new();
        mocks
            .sidechain
            .expect_node_status()
            .returning(|| Ok(NodeStatus { latest_block_height: 10, catching_up: false }));
        mocks.sidechain.expect_chain_manager_params().returning(|| {
            Ok(ChainManagerParams {
                chain_params: ChainParams { zena_chain_id: "15001".into(), ..Default::default() },
                ..Default::default()
            })
        });
        mocks.sidechain.expect_unconfirmed_txs().returning(|| Ok(vec![]));
        let sent = mocks.accept_broadcasts();
        // The sidechain records the event once its record is committed.
        let committed = sent.clone();
        mocks.sidechain.expect_is_old_tx().times(2).returning(move |category, tx_hash, log_index| {
            assert_eq!((category, tx_hash, log_index), (EventCategory::Clerk, B256::repeat_byte(0xee), 3));
            Ok(!committed.lock().unwrap().is_empty())
        });

        let synced = abi::StateSynced {
            id: U256::from(42),
            contractAddress: Address::repeat_byte(0xaa),
            data: Bytes::from_static(&[0xde, 0xad]),
        };
        let task = event_task(TaskName::SendStateSyncedToIris, &synced);
        let processor = ClerkProcessor::new(mocks.build());
        processor.handle(&task).await.unwrap();
        processor.handle(&task).await.unwrap();

        let sent = sent.lock().unwrap();
        let [Msg::EventRecord(record)] = sent.as_slice() else { panic!("unexpected msgs {sent:?}") };
        assert_eq!((record.id, record.log_index, record.block_number), (42, 3, 100));
        assert_eq!(record.data, Bytes::from_static(&[0xde, 0xad]));
    }

    #[tokio::test]
    async fn test_processed_state_sync_is_skipped() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|category, _, _| {
            assert_eq!(category, EventCategory::Clerk);
            Ok(true)
        });
        mocks.sidechain.expect_broadcast_tx_sync().never();

        let processor = ClerkProcessor::new(mocks.build());
        processor.handle(&event_task(TaskName::SendStateSyncedToIris, &state_synced(8))).await.unwrap();
    }
}
