//! Sidechain messages submitted by the bridge.
//!
//! Every message has a deterministic [`Msg::sign_bytes`] encoding: the
//! message serialized as JSON with sorted keys. Messages voted on by the
//! sidechain validators additionally expose [`SidechainMsg::side_sign_bytes`],
//! the payload the votes sign over.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod checkpoint;
pub use checkpoint::{MsgCheckpoint, MsgCheckpointAck, MsgCheckpointNoAck};

mod clerk;
pub use clerk::MsgEventRecord;

mod milestone;
pub use milestone::{MilestoneId, MsgMilestone, MsgMilestoneTimeout};

mod slashing;
pub use slashing::{MsgTick, MsgTickAck, MsgUnjail};

mod span;
pub use span::{MsgProposeSpan, MsgProposeSpanV2};

mod staking;
pub use staking::{MsgSignerUpdate, MsgStakeUpdate, MsgValidatorExit, MsgValidatorJoin};

mod topup;
pub use topup::MsgTopup;

mod tx;
pub use tx::{StdSignDoc, StdTx};

/// Errors raised by [`SidechainMsg::validate_basic`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MsgError {
    /// A required address is zero.
    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),
    /// The block range is empty or inverted.
    #[error("invalid block range [{start}, {end}]")]
    InvalidRange {
        /// First block.
        start: u64,
        /// Last block.
        end: u64,
    },
    /// A required hash is zero.
    #[error("invalid hash: {0}")]
    InvalidHash(&'static str),
    /// The signer public key is malformed.
    #[error("invalid public key of length {0}")]
    InvalidPubKey(usize),
    /// The milestone id is malformed.
    #[error("invalid milestone id: {0}")]
    InvalidMilestoneId(String),
}

/// A message the bridge submits to the sidechain.
pub trait SidechainMsg: std::fmt::Debug + Send + Sync {
    /// Module the message is routed to.
    fn route(&self) -> &'static str;

    /// Message type, unique per route.
    fn msg_type(&self) -> &'static str;

    /// Account expected to sign the message.
    fn signer(&self) -> Address;

    /// Stateless validation.
    fn validate_basic(&self) -> Result<(), MsgError>;

    /// Payload signed by side-transaction votes, for voted messages.
    fn side_sign_bytes(&self) -> Option<Vec<u8>> {
        None
    }

    /// Root-chain event relayed by the message, for idempotent messages.
    fn event_ref(&self) -> Option<(B256, u64)> {
        None
    }
}

pub(crate) fn require_address(address: Address, field: &'static str) -> Result<(), MsgError> {
    if address.is_zero() { Err(MsgError::InvalidAddress(field)) } else { Ok(()) }
}

macro_rules! sidechain_msgs {
    ($($(#[$doc:meta])* $variant:ident($ty:ty) = $name:literal),+ $(,)?) => {
        /// Any message the bridge submits, tagged by its type.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(tag = "type", content = "value")]
        pub enum Msg {
            $(
                $(#[$doc])*
                #[serde(rename = $name)]
                $variant($ty),
            )+
        }

        impl Msg {
            /// Returns the inner message.
            pub fn as_sidechain_msg(&self) -> &dyn SidechainMsg {
                match self {
                    $(Self::$variant(msg) => msg,)+
                }
            }

            /// Canonical sign bytes of the inner message.
            pub fn sign_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
                match self {
                    $(Self::$variant(msg) => crate::sorted_json(msg),)+
                }
            }
        }

        $(
            impl From<$ty> for Msg {
                fn from(msg: $ty) -> Self {
                    Self::$variant(msg)
                }
            }
        )+
    };
}

sidechain_msgs! {
    /// Validator join.
    ValidatorJoin(MsgValidatorJoin) = "validator-join",
    /// Validator exit.
    ValidatorExit(MsgValidatorExit) = "validator-exit",
    /// Stake update.
    StakeUpdate(MsgStakeUpdate) = "validator-stake-update",
    /// Signer update.
    SignerUpdate(MsgSignerUpdate) = "signer-update",
    /// State-sync event record.
    EventRecord(MsgEventRecord) = "event-record",
    /// Fee top up.
    Topup(MsgTopup) = "topup",
    /// Slashing tick.
    Tick(MsgTick) = "tick",
    /// Slashing tick ack.
    TickAck(MsgTickAck) = "tick-ack",
    /// Unjail.
    Unjail(MsgUnjail) = "unjail",
    /// Checkpoint proposal.
    Checkpoint(MsgCheckpoint) = "checkpoint",
    /// Checkpoint ack.
    CheckpointAck(MsgCheckpointAck) = "checkpoint-ack",
    /// Checkpoint no-ack.
    CheckpointNoAck(MsgCheckpointNoAck) = "checkpoint-no-ack",
    /// Milestone proposal.
    Milestone(MsgMilestone) = "milestone",
    /// Milestone timeout.
    MilestoneTimeout(MsgMilestoneTimeout) = "milestone-timeout",
    /// Span proposal.
    ProposeSpan(MsgProposeSpan) = "propose-span",
    /// Span proposal with seed author.
    ProposeSpanV2(MsgProposeSpanV2) = "propose-span-v2",
}

impl SidechainMsg for Msg {
    fn route(&self) -> &'static str {
        self.as_sidechain_msg().route()
    }

    fn msg_type(&self) -> &'static str {
        self.as_sidechain_msg().msg_type()
    }

    fn signer(&self) -> Address {
        self.as_sidechain_msg().signer()
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        self.as_sidechain_msg().validate_basic()
    }

    fn side_sign_bytes(&self) -> Option<Vec<u8>> {
        self.as_sidechain_msg().side_sign_bytes()
    }

    fn event_ref(&self) -> Option<(B256, u64)> {
        self.as_sidechain_msg().event_ref()
    }
}
