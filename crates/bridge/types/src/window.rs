//! Block windows covered by checkpoints, milestones and spans.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// An inclusive range of child-chain blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Constructor)]
pub struct BlockWindow {
    /// First block.
    pub start: u64,
    /// Last block.
    pub end: u64,
}

impl BlockWindow {
    /// Number of blocks in the window. Zero for inverted windows.
    pub const fn len(&self) -> u64 {
        if self.end < self.start { 0 } else { self.end - self.start + 1 }
    }

    /// Returns whether the window covers no blocks.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether this window starts right after `last_end`.
    ///
    /// Without a previously accepted window any start is a continuation.
    pub const fn continues(&self, last_end: Option<u64>) -> bool {
        match last_end {
            None => true,
            Some(end) => match end.checked_add(1) {
                Some(next) => next == self.start,
                None => false,
            },
        }
    }
}

/// A checkpoint as recorded by the root chain contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderBlock {
    /// Header block number (header block id / child block interval).
    pub number: u64,
    /// Root hash of the covered child headers.
    pub root: B256,
    /// First covered child block.
    pub start: u64,
    /// Last covered child block.
    pub end: u64,
    /// Unix time the checkpoint landed.
    pub created_at: u64,
    /// Proposer of the checkpoint.
    pub proposer: Address,
}

/// The checkpoint range the root chain expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContractCheckpoint {
    /// First block of the next checkpoint.
    pub start: u64,
    /// Last block of the next checkpoint.
    pub end: u64,
    /// The root chain's latest header block.
    pub current: HeaderBlock,
}

impl ContractCheckpoint {
    /// Computes the next expected checkpoint.
    ///
    /// The range starts right after the last checkpointed block, is trimmed to a
    /// multiple of `avg_len` and capped at `max_len` blocks. When nothing fits a
    /// full `avg_len` multiple and no checkpoint landed for `2 * max_len`
    /// seconds, everything available is pushed.
    pub fn next_expected(
        current: HeaderBlock,
        latest_child: u64,
        avg_len: u64,
        max_len: u64,
        now: u64,
    ) -> Self {
        let start = if current.end > 0 { current.end + 1 } else { 0 };
        let diff = (latest_child + 1).saturating_sub(start);

        let mut expected = if avg_len == 0 { diff } else { diff - diff % avg_len };
        expected = expected.saturating_sub(1);
        if max_len > 0 && expected + 1 > max_len {
            expected = max_len - 1;
        }

        let force_push_after = max_len.saturating_mul(2);
        if diff > 0 && expected == 0 && now.saturating_sub(current.created_at) > force_push_after {
            expected = diff - 1;
        }

        Self { start, end: start + expected, current }
    }

    /// Returns the window of the next checkpoint.
    pub const fn window(&self) -> BlockWindow {
        BlockWindow { start: self.start, end: self.end }
    }

    /// Returns whether the range is worth proposing.
    pub const fn is_proposable(&self) -> bool {
        self.end != 0 && self.start < self.end
    }
}
