use super::{ProcessorContext, ProcessorError, attribute, to_u64};
use crate::{
    clients::RootChainContracts,
    queue::{TaskError, TaskHandler},
    validation::{RejectionCode, ValidationError},
};
use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use iris_bridge_types::{
    BlockEvent, ChainEvent, EventCategory, SidechainMsg, TaskName, TaskSignature, abi,
    encode_slashing_infos,
    msgs::{MsgTick, MsgTickAck, MsgUnjail},
};
use tracing::{debug, info};

/// Drives slashing ticks between the sidechain and the slash manager.
///
/// A reached slash limit on the sidechain starts a tick; once the tick is
/// confirmed the current proposer submits it to the root chain, whose
/// `Slashed` event is acknowledged back to the sidechain.
#[derive(Debug, Clone)]
pub struct SlashingProcessor {
    ctx: ProcessorContext,
}

impl SlashingProcessor {
    /// Creates the processor.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    async fn send_tick(&self, event: &BlockEvent, height: u64) -> Result<(), ProcessorError> {
        let slashing_info_bytes = self.ctx.sidechain.latest_slash_info_bytes().await?;
        let tick_count = self.ctx.sidechain.tick_count().await?;

        let msg = MsgTick {
            id: tick_count + 1,
            proposer: self.ctx.identity.address(),
            slashing_info_bytes,
        };
        info!(
            target: "bridge::processor::slashing",
            kind = %event.kind,
            height,
            id = msg.id,
            slash_info = %msg.slashing_info_bytes,
            "Sending tick to sidechain"
        );
        self.ctx.broadcast(msg, None).await?;
        Ok(())
    }

    async fn send_tick_to_root_chain(&self, event: &BlockEvent, height: u64) -> Result<(), ProcessorError> {
        let proposer: Address = attribute(event, "proposer")?;
        let slash_info: Bytes = attribute(event, "slash-info-bytes")?;
        let tx_hash: B256 = attribute(event, "txhash")?;
        debug!(target: "bridge::processor::slashing", %proposer, %slash_info, %tx_hash, height, "Processing tick confirmation");

        let infos = self.ctx.sidechain.tick_slash_infos().await?;
        if encode_slashing_infos(infos) != slash_info.as_ref() {
            return Err(ValidationError::new(
                RejectionCode::HashMismatch,
                format!("slash info of tick {tx_hash} differs from the sidechain's"),
            )
            .into());
        }

        if !self.ctx.responsibility.is_current_proposer().await? {
            info!(target: "bridge::processor::slashing", %tx_hash, "Not the current proposer, ignoring tick");
            return Ok(());
        }

        let tx = self.ctx.sidechain.tx(tx_hash).await?;
        let data = tx
            .tx
            .msgs
            .first()
            .and_then(|msg| msg.side_sign_bytes())
            .ok_or_else(|| ProcessorError::InvalidEvent(format!("tick transaction {tx_hash} has no side-tx msg")))?;
        let signatures = self.ctx.sidechain.side_tx_signatures(height, tx_hash).await?;
        let slash_manager =
            self.ctx.sidechain.chain_manager_params().await?.chain_params.slash_manager_address;

        info!(
            target: "bridge::processor::slashing",
            %tx_hash,
            height,
            signatures = signatures.len(),
            %slash_manager,
            "Submitting tick to root chain"
        );
        let calldata = RootChainContracts::update_slashed_amounts_calldata(data.into(), &signatures);
        self.ctx.broadcaster.broadcast_to_root_chain(slash_manager, calldata).await?;
        Ok(())
    }

    async fn send_tick_ack(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let slashed = event.decode::<abi::Slashed>()?;
        if self.ctx.already_processed(EventCategory::Slashing, event).await? {
            return Ok(());
        }
        let msg = MsgTickAck {
            from: self.ctx.identity.address(),
            id: to_u64(slashed.nonce, "tick id")?,
            amount: slashed.amount,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
        };
        info!(
            target: "bridge::processor::slashing",
            id = msg.id,
            amount = %msg.amount,
            tx_hash = %event.tx_hash,
            log_index = event.log_index,
            "Sending tick ack to sidechain"
        );
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }

    async fn send_unjail(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let unjailed = event.decode::<abi::UnJailed>()?;
        if self.ctx.already_processed(EventCategory::Slashing, event).await? {
            return Ok(());
        }
        let msg = MsgUnjail {
            from: self.ctx.identity.address(),
            id: to_u64(unjailed.validatorId, "validator id")?,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
        };
        info!(target: "bridge::processor::slashing", validator_id = msg.id, tx_hash = %event.tx_hash, "Sending unjail to sidechain");
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskHandler for SlashingProcessor {
    fn task_names(&self) -> &'static [TaskName] {
        &[
            TaskName::SendTickToIris,
            TaskName::SendTickToRootchain,
            TaskName::SendTickAckToIris,
            TaskName::SendUnjailToIris,
        ]
    }

    async fn handle(&self, task: &TaskSignature) -> Result<(), TaskError> {
        let result = match task.name {
            TaskName::SendTickToIris => {
                let (event, height) = ProcessorContext::block_event(task)?;
                self.send_tick(&event, height).await
            }
            TaskName::SendTickToRootchain => {
                let (event, height) = ProcessorContext::block_event(task)?;
                self.send_tick_to_root_chain(&event, height).await
            }
            TaskName::SendTickAckToIris => self.send_tick_ack(&ProcessorContext::chain_event(task)?).await,
            TaskName::SendUnjailToIris => self.send_unjail(&ProcessorContext::chain_event(task)?).await,
            other => Err(ProcessorError::UnexpectedTask(other)),
        };
        result.map_err(Into::into)
    }
}
