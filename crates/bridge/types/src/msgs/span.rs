use super::{MsgError, SidechainMsg, require_address};
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

const ROUTE: &str = "zena";

/// Proposes the next producer span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgProposeSpan {
    /// Span id.
    #[serde(rename = "span_id")]
    pub id: u64,
    /// Proposer and signer.
    pub proposer: Address,
    /// First block of the span.
    pub start_block: u64,
    /// Last block of the span.
    pub end_block: u64,
    /// Child chain id.
    #[serde(rename = "zena_chain_id")]
    pub chain_id: String,
    /// Producer selection seed.
    pub seed: B256,
}

impl MsgProposeSpan {
    fn check(&self) -> Result<(), MsgError> {
        require_address(self.proposer, "proposer")?;
        if self.start_block > self.end_block {
            return Err(MsgError::InvalidRange { start: self.start_block, end: self.end_block });
        }
        Ok(())
    }
}

impl SidechainMsg for MsgProposeSpan {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "propose-span"
    }

    fn signer(&self) -> Address {
        self.proposer
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        self.check()
    }
}

/// Proposes the next producer span, naming the author of the seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgProposeSpanV2 {
    /// The span proposal.
    #[serde(flatten)]
    pub span: MsgProposeSpan,
    /// Validator whose block produced the seed.
    pub seed_author: Address,
}

impl SidechainMsg for MsgProposeSpanV2 {
    fn route(&self) -> &'static str {
        ROUTE
    }

    fn msg_type(&self) -> &'static str {
        "propose-span-v2"
    }

    fn signer(&self) -> Address {
        self.span.proposer
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        self.span.check()?;
        require_address(self.seed_author, "seed_author")
    }
}
