use super::{ProcessorContext, ProcessorError};
use crate::{
    Poller,
    validation::{check_continuity, validate_milestone},
};
use async_trait::async_trait;
use iris_bridge_types::{
    BlockWindow, CHILD_CHAIN_MILESTONE_CONFIRMATION, MILESTONE_BUFFER_LENGTH, MILESTONE_LENGTH,
    MILESTONE_PROPOSER_LIST_SIZE,
    msgs::{MilestoneId, MsgMilestone, MsgMilestoneTimeout},
};
use std::time::Duration;
use tracing::{debug, info};

/// Returns whether the sidechain passed the milestone fork.
async fn milestones_active(ctx: &ProcessorContext) -> Result<bool, ProcessorError> {
    let height = ctx.sidechain.node_status().await?.latest_block_height;
    if height < ctx.config.forks.aalborg_height {
        debug!(
            target: "bridge::processor::milestone",
            height,
            fork_height = ctx.config.forks.aalborg_height,
            "Milestones not active yet"
        );
        return Ok(false);
    }
    Ok(true)
}

/// Proposes milestones, finality votes on recent child chain ranges, while
/// this validator is the milestone proposer.
#[derive(Debug, Clone)]
pub struct MilestonePoller {
    ctx: ProcessorContext,
}

impl MilestonePoller {
    /// Creates the poller.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    /// Start of the next milestone and the end of the last one, if any.
    async fn next_start(&self) -> Result<(u64, Option<u64>), ProcessorError> {
        if self.ctx.sidechain.milestone_count().await? == 0 {
            return Ok((self.ctx.config.forks.milestone_start_block, None));
        }
        let last = self
            .ctx
            .sidechain
            .latest_milestone()
            .await?
            .ok_or_else(|| ProcessorError::InvalidEvent("milestones counted but none found".to_string()))?;
        Ok((last.end_block + 1, Some(last.end_block)))
    }
}

#[async_trait]
impl Poller for MilestonePoller {
    type Error = ProcessorError;

    fn name(&self) -> &'static str {
        "milestone"
    }

    fn interval(&self) -> Duration {
        self.ctx.config.milestone_poll_interval
    }

    async fn poll(&self) -> Result<(), ProcessorError> {
        if !milestones_active(&self.ctx).await? {
            return Ok(());
        }
        if !self.ctx.responsibility.is_milestone_proposer().await? {
            debug!(target: "bridge::processor::milestone", "Not the milestone proposer");
            return Ok(());
        }

        let (start, last_end) = self.next_start().await?;
        let latest = self.ctx.child_chain.block_number().await?;
        let required = start + MILESTONE_LENGTH + CHILD_CHAIN_MILESTONE_CONFIRMATION - 1;
        if latest < required {
            debug!(target: "bridge::processor::milestone", start, latest, required, "Not enough child blocks for a milestone");
            return Ok(());
        }

        let end = latest - CHILD_CHAIN_MILESTONE_CONFIRMATION;
        // The end block's hash is read from its successor, which commits to it.
        let Some(successor) = self.ctx.child_chain.header(Some(end + 1)).await? else {
            debug!(target: "bridge::processor::milestone", number = end + 1, "Child block not available yet");
            return Ok(());
        };
        let hash = successor.parent_hash;

        let window = BlockWindow::new(start, end);
        check_continuity(last_end, window)?;
        let milestone_id = MilestoneId::for_end_hash(hash).to_string();
        validate_milestone(
            window,
            hash,
            &milestone_id,
            self.ctx.child_chain.as_ref(),
            CHILD_CHAIN_MILESTONE_CONFIRMATION,
            MILESTONE_LENGTH,
        )
        .await?;

        let zena_chain_id = self.ctx.sidechain.chain_manager_params().await?.chain_params.zena_chain_id;
        info!(
            target: "bridge::processor::milestone",
            start,
            end,
            %hash,
            %milestone_id,
            "Proposing milestone"
        );
        let msg = MsgMilestone {
            proposer: self.ctx.identity.address(),
            start_block: start,
            end_block: end,
            hash,
            zena_chain_id,
            milestone_id,
        };
        self.ctx.broadcast(msg, None).await?;
        Ok(())
    }
}

/// Proposes a milestone timeout once the child chain ran too far ahead of the
/// last milestone.
#[derive(Debug, Clone)]
pub struct MilestoneTimeoutPoller {
    ctx: ProcessorContext,
}

impl MilestoneTimeoutPoller {
    /// Creates the poller.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Poller for MilestoneTimeoutPoller {
    type Error = ProcessorError;

    fn name(&self) -> &'static str {
        "milestone-timeout"
    }

    fn interval(&self) -> Duration {
        self.ctx.config.milestone_poll_interval.saturating_mul(2)
    }

    async fn poll(&self) -> Result<(), ProcessorError> {
        if !milestones_active(&self.ctx).await? {
            return Ok(());
        }
        let Some(last) = self.ctx.sidechain.latest_milestone().await? else {
            return Ok(());
        };
        let current = self.ctx.child_chain.block_number().await?;
        if current.saturating_sub(last.end_block) <= MILESTONE_BUFFER_LENGTH {
            return Ok(());
        }

        let list_size = MILESTONE_PROPOSER_LIST_SIZE as usize;
        if !self.ctx.responsibility.is_in_milestone_proposer_list(list_size).await? {
            return Ok(());
        }

        info!(
            target: "bridge::processor::milestone",
            last_end = last.end_block,
            current,
            "Proposing milestone timeout"
        );
        self.ctx.broadcast(MsgMilestoneTimeout { from: self.ctx.identity.address() }, None).await?;
        Ok(())
    }
}
