use super::{ProcessorContext, ProcessorError, to_u64};
use crate::{
    constants::{DEFAULT_NONCE_DELAY, MAX_NONCE_DELAY_FACTOR, RETRY_TASK_DELAY, STAKING_TX_LOOKBACK},
    queue::{TaskError, TaskHandler},
};
use async_trait::async_trait;
use iris_bridge_types::{
    ChainEvent, EventCategory, PubKey, TaskName, TaskSignature,
    abi,
    msgs::{MsgSignerUpdate, MsgStakeUpdate, MsgValidatorExit, MsgValidatorJoin},
};
use std::time::Duration;
use tracing::{info, warn};

/// Delay before an out of order staking event is retried, or `None` when
/// `tx_nonce` directly follows `current`.
///
/// Grows with the nonce gap, bounded by [`MAX_NONCE_DELAY_FACTOR`] steps.
pub(crate) fn nonce_delay(current: u64, tx_nonce: u64) -> Option<Duration> {
    if current.wrapping_add(1) == tx_nonce {
        return None;
    }
    let gap = tx_nonce.wrapping_sub(current).clamp(1, MAX_NONCE_DELAY_FACTOR);
    Some(Duration::from_secs(DEFAULT_NONCE_DELAY.as_secs() * gap))
}

/// Relays validator joins, exits, stake updates and signer changes.
#[derive(Debug, Clone)]
pub struct StakingProcessor {
    ctx: ProcessorContext,
}

impl StakingProcessor {
    /// Creates the processor.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    async fn send_validator_join(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let staked = event.decode::<abi::Staked>()?;
        if self.ctx.already_processed(EventCategory::Staking, event).await? {
            return Ok(());
        }

        // The signer's fee top up creates its account and has to land first.
        if self.ctx.sidechain.account(staked.signer).await?.is_none() {
            info!(
                target: "bridge::processor::staking",
                signer = %staked.signer,
                tx_hash = %event.tx_hash,
                "Signer account does not exist yet, retrying validator join later"
            );
            return Err(ProcessorError::retry_later("signer account does not exist", RETRY_TASK_DELAY));
        }

        let id = to_u64(staked.validatorId, "validator id")?;
        let msg = MsgValidatorJoin {
            from: self.ctx.identity.address(),
            id,
            activation_epoch: to_u64(staked.activationEpoch, "activation epoch")?,
            amount: staked.amount,
            pub_key: PubKey::from_signer_pubkey(&staked.signerPubkey),
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
            nonce: to_u64(staked.nonce, "nonce")?,
        };
        info!(
            target: "bridge::processor::staking",
            validator_id = id,
            signer = %staked.signer,
            tx_hash = %event.tx_hash,
            log_index = event.log_index,
            block_number = event.block_number,
            "Sending validator join to sidechain"
        );
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }

    async fn send_unstake_init(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let unstake = event.decode::<abi::UnstakeInit>()?;
        if self.ctx.already_processed(EventCategory::Staking, event).await? {
            return Ok(());
        }
        let id = to_u64(unstake.validatorId, "validator id")?;
        let nonce = to_u64(unstake.nonce, "nonce")?;
        self.check_nonce(id, nonce).await?;

        let msg = MsgValidatorExit {
            from: self.ctx.identity.address(),
            id,
            deactivation_epoch: to_u64(unstake.deactivationEpoch, "deactivation epoch")?,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
            nonce,
        };
        info!(target: "bridge::processor::staking", validator_id = id, nonce, tx_hash = %event.tx_hash, "Sending validator exit to sidechain");
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }

    async fn send_stake_update(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let update = event.decode::<abi::StakeUpdate>()?;
        if self.ctx.already_processed(EventCategory::Staking, event).await? {
            return Ok(());
        }
        let id = to_u64(update.validatorId, "validator id")?;
        let nonce = to_u64(update.nonce, "nonce")?;
        self.check_nonce(id, nonce).await?;

        let msg = MsgStakeUpdate {
            from: self.ctx.identity.address(),
            id,
            new_amount: update.newAmount,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
            nonce,
        };
        info!(target: "bridge::processor::staking", validator_id = id, nonce, tx_hash = %event.tx_hash, "Sending stake update to sidechain");
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }

    async fn send_signer_change(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let change = event.decode::<abi::SignerChange>()?;
        if self.ctx.already_processed(EventCategory::Staking, event).await? {
            return Ok(());
        }
        let id = to_u64(change.validatorId, "validator id")?;
        let nonce = to_u64(change.nonce, "nonce")?;
        self.check_nonce(id, nonce).await?;

        let msg = MsgSignerUpdate {
            from: self.ctx.identity.address(),
            id,
            new_signer_pub_key: PubKey::from_signer_pubkey(&change.signerPubkey),
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
            nonce,
        };
        info!(
            target: "bridge::processor::staking",
            validator_id = id,
            nonce,
            new_signer = %change.newSigner,
            tx_hash = %event.tx_hash,
            "Sending signer update to sidechain"
        );
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }

    /// Staking events of a validator must reach the sidechain in nonce order,
    /// and not while another staking transaction of the validator may still
    /// be in flight.
    async fn check_nonce(&self, validator_id: u64, tx_nonce: u64) -> Result<(), ProcessorError> {
        let current = self.ctx.sidechain.validator_nonce(validator_id).await?;
        if let Some(delay) = nonce_delay(current.nonce, tx_nonce) {
            warn!(
                target: "bridge::processor::staking",
                validator_id,
                current_nonce = current.nonce,
                tx_nonce,
                ?delay,
                "Staking event nonce out of order"
            );
            return Err(ProcessorError::retry_later("nonce out of order", delay));
        }

        let recent = self
            .ctx
            .sidechain
            .staking_tx_count(validator_id, current.height.saturating_sub(STAKING_TX_LOOKBACK))
            .await?;
        if recent > 0 {
            info!(
                target: "bridge::processor::staking",
                validator_id,
                current_nonce = current.nonce,
                height = current.height,
                "Recent staking transaction of validator, retrying later"
            );
            return Err(ProcessorError::retry_later("recent staking transaction", DEFAULT_NONCE_DELAY));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskHandler for StakingProcessor {
    fn task_names(&self) -> &'static [TaskName] {
        &[
            TaskName::SendValidatorJoinToIris,
            TaskName::SendUnstakeInitToIris,
            TaskName::SendStakeUpdateToIris,
            TaskName::SendSignerChangeToIris,
        ]
    }

    async fn handle(&self, task: &TaskSignature) -> Result<(), TaskError> {
        let event = ProcessorContext::chain_event(task)?;
        let result = match task.name {
            TaskName::SendValidatorJoinToIris => self.send_validator_join(&event).await,
            TaskName::SendUnstakeInitToIris => self.send_unstake_init(&event).await,
            TaskName::SendStakeUpdateToIris => self.send_stake_update(&event).await,
            TaskName::SendSignerChangeToIris => self.send_signer_change(&event).await,
            other => Err(ProcessorError::UnexpectedTask(other)),
        };
        result.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        identity::tests::test_identity,
        processor::tests::{Mocks, event_task},
    };
    use alloy_primitives::{Address, Bytes, U256};
    use iris_bridge_types::{Account, Msg, ValidatorNonce};
    use proptest::prelude::*;
    use rstest::rstest;

    fn stake_update(nonce: u64) -> abi::StakeUpdate {
        abi::StakeUpdate { validatorId: U256::from(7), nonce: U256::from(nonce), newAmount: U256::from(2000) }
    }

    proptest! {
        #[test]
        fn test_nonce_delay_is_bounded(current in any::<u64>(), tx_nonce in any::<u64>()) {
            let delay = nonce_delay(current, tx_nonce);
            if current.wrapping_add(1) == tx_nonce {
                prop_assert!(delay.is_none());
            } else {
                let gap = tx_nonce.wrapping_sub(current).clamp(1, MAX_NONCE_DELAY_FACTOR);
                prop_assert_eq!(delay, Some(DEFAULT_NONCE_DELAY * gap as u32));
                prop_assert!(delay.unwrap() <= DEFAULT_NONCE_DELAY * MAX_NONCE_DELAY_FACTOR as u32);
            }
        }
    }

    #[tokio::test]
    async fn test_stake_update_in_order_is_broadcast() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(false));
        mocks.sidechain.expect_validator_nonce().returning(|_| Ok(ValidatorNonce { nonce: 4, height: 100 }));
        mocks.sidechain.expect_staking_tx_count().withf(|id, height| *id == 7 && *height == 97).returning(|_, _| Ok(0));
        let sent = mocks.accept_broadcasts();

        let processor = StakingProcessor::new(mocks.build());
        processor.handle(&event_task(TaskName::SendStakeUpdateToIris, &stake_update(5))).await.unwrap();

        let sent = sent.lock().unwrap();
        let [Msg::StakeUpdate(msg)] = sent.as_slice() else { panic!("unexpected msgs {sent:?}") };
        assert_eq!((msg.id, msg.nonce, msg.new_amount), (7, 5, U256::from(2000)));
        assert_eq!(msg.from, test_identity().address());
        assert_eq!(msg.log_index, 3);
    }

    #[tokio::test]
    async fn test_out_of_order_nonce_retries_later() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(false));
        mocks.sidechain.expect_validator_nonce().returning(|_| Ok(ValidatorNonce { nonce: 4, height: 100 }));
        mocks.sidechain.expect_broadcast_tx_sync().never();

        let processor = StakingProcessor::new(mocks.build());
        let err = processor.handle(&event_task(TaskName::SendStakeUpdateToIris, &stake_update(8))).await.unwrap_err();
        assert_eq!(
            err,
            TaskError::RetryLater { reason: "nonce out of order".into(), delay: Duration::from_secs(60) }
        );
    }

    #[rstest]
    #[case::next(4, 5, None)]
    #[case::gap_of_four(4, 8, Some(60))]
    #[case::gap_of_ten(4, 14, Some(150))]
    #[case::gap_capped(4, 30, Some(150))]
    #[case::same_nonce(4, 4, Some(15))]
    #[case::behind(4, 2, Some(150))]
    fn test_nonce_delay(#[case] current: u64, #[case] tx_nonce: u64, #[case] secs: Option<u64>) {
        assert_eq!(nonce_delay(current, tx_nonce), secs.map(Duration::from_secs));
    }

    #[tokio::test]
    async fn test_recent_staking_tx_retries_later() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(false));
        mocks.sidechain.expect_validator_nonce().returning(|_| Ok(ValidatorNonce { nonce: 4, height: 2 }));
        mocks.sidechain.expect_staking_tx_count().withf(|_, height| *height == 0).returning(|_, _| Ok(1));

        let processor = StakingProcessor::new(mocks.build());
        let err = processor.handle(&event_task(TaskName::SendStakeUpdateToIris, &stake_update(5))).await.unwrap_err();
        assert!(matches!(err, TaskError::RetryLater { delay, .. } if delay == DEFAULT_NONCE_DELAY));
    }

    #[tokio::test]
    async fn test_already_processed_event_is_skipped() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().times(2).returning(|_, _, _| Ok(true));
        mocks.sidechain.expect_validator_nonce().never();
        mocks.sidechain.expect_broadcast_tx_sync().never();

        let processor = StakingProcessor::new(mocks.build());
        let task = event_task(TaskName::SendStakeUpdateToIris, &stake_update(5));
        processor.handle(&task).await.unwrap();
        processor.handle(&task).await.unwrap();
    }

    #[tokio::test]
    async fn test_validator_join_waits_for_signer_account() {
        let signer = Address::repeat_byte(0x42);
        let staked = abi::Staked {
            signer,
            validatorId: U256::from(3),
            nonce: U256::from(1),
            activationEpoch: U256::from(20),
            amount: U256::from(10),
            total: U256::from(10),
            signerPubkey: Bytes::from(vec![9u8; 64]),
        };
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(false));
        mocks.sidechain.expect_account().withf(move |address| *address == signer).returning(|_| Ok(None));
        mocks.sidechain.expect_broadcast_tx_sync().never();

        let processor = StakingProcessor::new(mocks.build());
        let err = processor.handle(&event_task(TaskName::SendValidatorJoinToIris, &staked)).await.unwrap_err();
        assert!(matches!(err, TaskError::RetryLater { delay, .. } if delay == RETRY_TASK_DELAY));
    }

    #[tokio::test]
    async fn test_validator_join_prefixes_pubkey() {
        let staked = abi::Staked {
            signer: Address::repeat_byte(0x42),
            validatorId: U256::from(3),
            nonce: U256::from(1),
            activationEpoch: U256::from(20),
            amount: U256::from(10),
            total: U256::from(10),
            signerPubkey: Bytes::from(vec![9u8; 64]),
        };
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(false));
        let sent = mocks.accept_broadcasts();

        let processor = StakingProcessor::new(mocks.build());
        processor.handle(&event_task(TaskName::SendValidatorJoinToIris, &staked)).await.unwrap();

        let sent = sent.lock().unwrap();
        let [Msg::ValidatorJoin(msg)] = sent.as_slice() else { panic!("unexpected msgs {sent:?}") };
        assert_eq!(msg.pub_key.as_bytes().len(), 65);
        assert_eq!(msg.pub_key.as_bytes()[0], 0x04);
        assert_eq!((msg.id, msg.activation_epoch, msg.nonce), (3, 20, 1));
    }

    #[tokio::test]
    async fn test_rejected_broadcast_is_fatal() {
        let mut mocks = Mocks::new();
        mocks.sidechain.expect_is_old_tx().returning(|_, _, _| Ok(false));
        mocks.sidechain.expect_validator_nonce().returning(|_| Ok(ValidatorNonce { nonce: 4, height: 100 }));
        mocks.sidechain.expect_staking_tx_count().returning(|_, _| Ok(0));
        mocks.sidechain.expect_account().returning(|address| {
            Ok(Some(Account { address, account_number: 1, sequence: 0 }))
        });
        mocks.sidechain.expect_broadcast_tx_sync().returning(|_| {
            Ok(iris_bridge_types::TxResponse { code: 5, raw_log: "insufficient funds".into(), ..Default::default() })
        });

        let processor = StakingProcessor::new(mocks.build());
        let err = processor.handle(&event_task(TaskName::SendStakeUpdateToIris, &stake_update(5))).await.unwrap_err();
        assert!(matches!(err, TaskError::Fatal(_)));
    }
}
