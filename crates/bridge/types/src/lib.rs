//! Core types shared across the iris bridge components.
//!
//! This crate defines the data that flows through the bridge: normalized chain
//! events, the root-chain contract bindings, the durable task signatures passed
//! between listeners and processors, and the sidechain messages the bridge
//! submits together with their deterministic signing encodings.

pub mod abi;

mod constants;
pub use constants::{
    CHILD_CHAIN_MILESTONE_CONFIRMATION, LEGACY_MAX_STATE_SYNC_SIZE, MAX_STATE_SYNC_SIZE,
    MILESTONE_BUFFER_LENGTH, MILESTONE_LENGTH, MILESTONE_PROPOSER_LIST_SIZE,
};

mod encoding;
pub use encoding::{append_bytes32, sorted_json, trimmed_be_bytes, u64_or_string};

mod event;
pub use event::{ChainEvent, EventCategory, EventId, SourceChain};

mod header;
pub use header::BlockHeader;

pub mod msgs;
pub use msgs::{Msg, MsgError, SidechainMsg, StdSignDoc, StdTx};

mod sidechain;
pub use sidechain::{
    Account, BlockEvent, ChainManagerParams, ChainParams, Checkpoint, CheckpointParams,
    EventAttribute, Milestone, NodeStatus, SidechainTx, Span, SpanSeed, TxResponse,
};

mod slashing;
pub use slashing::{ValidatorSlashingInfo, encode_slashing_infos};

mod task;
pub use task::{TaskArg, TaskArgError, TaskName, TaskSignature, unix_millis};

mod validator;
pub use validator::{PubKey, Validator, ValidatorNonce, ValidatorSet};

mod window;
pub use window::{BlockWindow, ContractCheckpoint, HeaderBlock};
