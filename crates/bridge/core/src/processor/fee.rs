use super::{ProcessorContext, ProcessorError};
use crate::queue::{TaskError, TaskHandler};
use async_trait::async_trait;
use iris_bridge_types::{ChainEvent, EventCategory, TaskName, TaskSignature, abi, msgs::MsgTopup};
use tracing::info;

/// Relays fee top ups, which also create sidechain accounts.
#[derive(Debug, Clone)]
pub struct FeeProcessor {
    ctx: ProcessorContext,
}

impl FeeProcessor {
    /// Creates the processor.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    async fn send_top_up_fee(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let topup = event.decode::<abi::TopUpFee>()?;
        if self.ctx.already_processed(EventCategory::Topup, event).await? {
            return Ok(());
        }

        info!(
            target: "bridge::processor::fee",
            user = %topup.user,
            fee = %topup.fee,
            tx_hash = %event.tx_hash,
            log_index = event.log_index,
            block_number = event.block_number,
            "Sending topup to sidechain"
        );
        let msg = MsgTopup {
            from_address: self.ctx.identity.address(),
            user: topup.user,
            fee: topup.fee,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
        };
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskHandler for FeeProcessor {
    fn task_names(&self) -> &'static [TaskName] {
        &[TaskName::SendTopUpFeeToIris]
    }

    async fn handle(&self, task: &TaskSignature) -> Result<(), TaskError> {
        let event = ProcessorContext::chain_event(task)?;
        match task.name {
            TaskName::SendTopUpFeeToIris => self.send_top_up_fee(&event).await,
            other => Err(ProcessorError::UnexpectedTask(other)),
        }
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        identity::tests::test_identity,
        processor::tests::{Mocks, event_task},
    };
    use alloy_primitives::{Address, U256};
    use iris_bridge_types::Msg;

    fn topup() -> abi::TopUpFee {
        abi::TopUpFee { user: Address::repeat_byte(0x31), fee: U256::from(1_000_000_000_000_000_000u128) }
    }

    #[tokio::test]
    async fn test_topup_is_broadcast() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|category, _, _| {
            assert_eq!(category, EventCategory::Topup);
            Ok(false)
        });
        let sent = mocks.accept_broadcasts();

        let processor = FeeProcessor::new(mocks.build());
        processor.handle(&event_task(TaskName::SendTopUpFeeToIris, &topup())).await.unwrap();

        let sent = sent.lock().unwrap();
        let [Msg::Topup(msg)] = sent.as_slice() else { panic!("unexpected msgs {sent:?}") };
        assert_eq!(msg.from_address, test_identity().address());
        assert_eq!(msg.user, Address::repeat_byte(0x31));
        assert_eq!(msg.fee, topup().fee);
        assert_eq!((msg.log_index, msg.block_number), (3, 100));
    }

    #[tokio::test]
    async fn test_processed_topup_is_skipped() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(true));
        mocks.sidechain.expect_broadcast_tx_sync().never();

        let processor = FeeProcessor::new(mocks.build());
        processor.handle(&event_task(TaskName::SendTopUpFeeToIris, &topup())).await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_task_is_fatal() {
        let mocks = Mocks::new();
        let processor = FeeProcessor::new(mocks.build());
        let err = processor.handle(&event_task(TaskName::SendStateSyncedToIris, &topup())).await.unwrap_err();
        assert!(matches!(err, TaskError::Fatal(_)));
    }
}
