//! Checkpoints: proposing child chain ranges to the sidechain, submitting
//! confirmed checkpoints to the root chain, acknowledging them back, and
//! skipping a proposer that stays silent.

use super::{ProcessorContext, ProcessorError, attribute, to_u64};
use crate::{
    Poller,
    clients::RootChainContracts,
    queue::{TaskError, TaskHandler},
    validation::{check_continuity, validate_checkpoint},
};
use alloy_primitives::B256;
use async_trait::async_trait;
use iris_bridge_types::{
    BlockEvent, BlockHeader, BlockWindow, ChainEvent, ContractCheckpoint, EventCategory, HeaderBlock,
    SidechainMsg, TaskName, TaskSignature, abi,
    msgs::{MsgCheckpoint, MsgCheckpointAck, MsgCheckpointNoAck},
    unix_millis,
};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

fn unix_now() -> u64 {
    unix_millis(SystemTime::now()) / 1000
}

/// Whether a checkpoint starting at `start` is the next one the root chain
/// accepts, given the last child block it covers.
pub(crate) const fn should_send(last_child: u64, start: u64) -> bool {
    (last_child == 0 && start == 0) || last_child.wrapping_add(1) == start
}

/// Reads the root chain's latest header block.
async fn last_header_block(ctx: &ProcessorContext) -> Result<HeaderBlock, ProcessorError> {
    let root_chain = ctx.sidechain.chain_manager_params().await?.chain_params.root_chain_address;
    let interval = ctx.sidechain.checkpoint_params().await?.child_block_interval;
    let contracts = RootChainContracts::new(ctx.root_chain.clone());
    let number = contracts.current_header_block(root_chain, interval).await?;
    Ok(contracts.header_block(root_chain, number, interval).await?)
}

/// Handles the checkpoint tasks.
#[derive(Debug, Clone)]
pub struct CheckpointProcessor {
    ctx: ProcessorContext,
}

impl CheckpointProcessor {
    /// Creates the processor.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    /// Proposes the next checkpoint when a new child chain head arrives and
    /// this validator is the proposer.
    async fn send_checkpoint(&self, head: BlockHeader) -> Result<(), ProcessorError> {
        if !self.ctx.responsibility.is_proposer().await? {
            debug!(target: "bridge::processor::checkpoint", head = head.number, "Not the checkpoint proposer");
            return Ok(());
        }

        let chain = self.ctx.sidechain.chain_manager_params().await?;
        let Some(latest_confirmed) = head.number.checked_sub(chain.zena_chain_tx_confirmations) else {
            return Ok(());
        };
        let params = self.ctx.sidechain.checkpoint_params().await?;
        let now = unix_now();

        if let Some(buffered) = self.ctx.sidechain.buffered_checkpoint().await? {
            let age = Duration::from_secs(now.saturating_sub(buffered.timestamp));
            if age < params.buffer_time() {
                debug!(
                    target: "bridge::processor::checkpoint",
                    start = buffered.start_block,
                    end = buffered.end_block,
                    ?age,
                    "Checkpoint already buffered"
                );
                return Ok(());
            }
        }

        let current = last_header_block(&self.ctx).await?;
        let expected = ContractCheckpoint::next_expected(
            current,
            latest_confirmed,
            params.avg_checkpoint_length,
            params.max_checkpoint_length,
            now,
        );
        if !expected.is_proposable() {
            debug!(
                target: "bridge::processor::checkpoint",
                start = expected.start,
                end = expected.end,
                latest_confirmed,
                "No checkpoint range to propose"
            );
            return Ok(());
        }
        let last_end = (current.end > 0).then_some(current.end);
        check_continuity(last_end, expected.window())?;

        let root_hash = self.ctx.child_chain.root_hash(expected.start, expected.end).await?;
        let account_root_hash = self.ctx.sidechain.account_root_hash().await?;
        info!(
            target: "bridge::processor::checkpoint",
            start = expected.start,
            end = expected.end,
            %root_hash,
            %account_root_hash,
            "Proposing checkpoint"
        );
        let msg = MsgCheckpoint {
            proposer: self.ctx.identity.address(),
            start_block: expected.start,
            end_block: expected.end,
            root_hash,
            account_root_hash,
            zena_chain_id: chain.chain_params.zena_chain_id,
        };
        self.ctx.broadcast(msg, None).await?;
        Ok(())
    }

    /// Acknowledges a checkpoint that landed on the root chain.
    async fn send_checkpoint_ack(&self, event: &ChainEvent) -> Result<(), ProcessorError> {
        let header = event.decode::<abi::NewHeaderBlock>()?;
        if self.ctx.already_processed(EventCategory::CheckpointAck, event).await? {
            return Ok(());
        }
        let interval = self.ctx.sidechain.checkpoint_params().await?.child_block_interval.max(1);
        let number = to_u64(header.headerBlockId, "header block id")? / interval;
        let start = to_u64(header.start, "start block")?;
        let end = to_u64(header.end, "end block")?;

        if let Some(latest) = self.ctx.sidechain.latest_checkpoint().await? {
            if latest.end_block >= end {
                info!(target: "bridge::processor::checkpoint", number, end, latest_end = latest.end_block, "Checkpoint already acknowledged");
                return Ok(());
            }
        }

        info!(
            target: "bridge::processor::checkpoint",
            number,
            start,
            end,
            proposer = %header.proposer,
            tx_hash = %event.tx_hash,
            "Sending checkpoint ack to sidechain"
        );
        let msg = MsgCheckpointAck {
            from: self.ctx.identity.address(),
            number,
            proposer: header.proposer,
            start_block: start,
            end_block: end,
            root_hash: header.root,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
        };
        self.ctx.broadcast(msg, Some(event)).await?;
        Ok(())
    }

    /// Submits a checkpoint the sidechain voted on to the root chain.
    async fn send_checkpoint_to_root_chain(&self, event: &BlockEvent, height: u64) -> Result<(), ProcessorError> {
        let start: u64 = attribute(event, "start-block")?;
        let end: u64 = attribute(event, "end-block")?;
        let root_hash: B256 = attribute(event, "root-hash")?;
        let tx_hash: B256 = attribute(event, "txhash")?;

        if !self.ctx.responsibility.is_current_proposer().await? {
            debug!(target: "bridge::processor::checkpoint", start, end, "Not the current proposer, ignoring checkpoint");
            return Ok(());
        }

        let chain = self.ctx.sidechain.chain_manager_params().await?;
        let root_chain = chain.chain_params.root_chain_address;
        let contracts = RootChainContracts::new(self.ctx.root_chain.clone());
        let last_child = contracts.last_child_block(root_chain).await?;
        if !should_send(last_child, start) {
            info!(target: "bridge::processor::checkpoint", start, end, last_child, "Checkpoint already on the root chain");
            return Ok(());
        }

        let max_len = self.ctx.sidechain.checkpoint_params().await?.max_checkpoint_length;
        validate_checkpoint(
            BlockWindow::new(start, end),
            root_hash,
            max_len,
            self.ctx.child_chain.as_ref(),
            chain.zena_chain_tx_confirmations,
        )
        .await?;

        let tx = self.ctx.sidechain.tx(tx_hash).await?;
        let data = tx.tx.msgs.first().and_then(|msg| msg.side_sign_bytes()).ok_or_else(|| {
            ProcessorError::InvalidEvent(format!("checkpoint transaction {tx_hash} has no side-tx msg"))
        })?;
        let signatures = self.ctx.sidechain.side_tx_signatures(height, tx_hash).await?;
        info!(
            target: "bridge::processor::checkpoint",
            start,
            end,
            %root_hash,
            signatures = signatures.len(),
            "Submitting checkpoint to root chain"
        );
        let calldata = RootChainContracts::submit_checkpoint_calldata(data.into(), &signatures);
        self.ctx.broadcaster.broadcast_to_root_chain(root_chain, calldata).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskHandler for CheckpointProcessor {
    fn task_names(&self) -> &'static [TaskName] {
        &[
            TaskName::SendCheckpointToIris,
            TaskName::SendCheckpointAckToIris,
            TaskName::SendCheckpointToRootchain,
        ]
    }

    async fn handle(&self, task: &TaskSignature) -> Result<(), TaskError> {
        let result = match task.name {
            TaskName::SendCheckpointToIris => {
                let head: BlockHeader =
                    serde_json::from_str(task.string_arg(0).map_err(ProcessorError::from)?)
                        .map_err(ProcessorError::from)?;
                self.send_checkpoint(head).await
            }
            TaskName::SendCheckpointAckToIris => {
                self.send_checkpoint_ack(&ProcessorContext::chain_event(task)?).await
            }
            TaskName::SendCheckpointToRootchain => {
                let (event, height) = ProcessorContext::block_event(task)?;
                self.send_checkpoint_to_root_chain(&event, height).await
            }
            other => Err(ProcessorError::UnexpectedTask(other)),
        };
        result.map_err(Into::into)
    }
}

/// Sends a checkpoint no-ack when the root chain has not seen a checkpoint
/// for too long, so the sidechain moves on to the next proposer.
///
/// The longer the silence, the more validators down the proposer list are
/// allowed to send it.
#[derive(Debug, Clone)]
pub struct NoAckPoller {
    ctx: ProcessorContext,
}

impl NoAckPoller {
    /// Creates the poller.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Poller for NoAckPoller {
    type Error = ProcessorError;

    fn name(&self) -> &'static str {
        "checkpoint-no-ack"
    }

    fn interval(&self) -> Duration {
        self.ctx.config.noack_poll_interval
    }

    async fn poll(&self) -> Result<(), ProcessorError> {
        let last = last_header_block(&self.ctx).await?;
        let elapsed = unix_now().saturating_sub(last.created_at);
        let wait = self.ctx.config.no_ack_wait_time.as_secs().max(1);
        if elapsed < wait {
            debug!(target: "bridge::processor::checkpoint", elapsed, wait, "Last checkpoint is recent");
            return Ok(());
        }

        let index = usize::try_from(elapsed / wait).unwrap_or(usize::MAX);
        if !self.ctx.responsibility.is_in_proposer_list(index).await? {
            debug!(target: "bridge::processor::checkpoint", index, "Not among the proposers allowed to send a no-ack");
            return Ok(());
        }

        info!(target: "bridge::processor::checkpoint", elapsed, index, number = last.number, "Sending checkpoint no-ack");
        self.ctx.broadcast(MsgCheckpointNoAck { from: self.ctx.identity.address() }, None).await?;
        Ok(())
    }
}
