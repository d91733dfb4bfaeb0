//! Root-chain contract bindings.
//!
//! Events emitted by the staking info, state sender, root chain and slash
//! manager contracts, plus the root chain calls the bridge makes.

use alloy_primitives::B256;
use alloy_sol_types::{SolEvent, sol};

sol! {
    /// Emitted when a validator stakes and joins the set.
    #[derive(Debug, PartialEq, Eq)]
    event Staked(
        address indexed signer,
        uint256 indexed validatorId,
        uint256 nonce,
        uint256 indexed activationEpoch,
        uint256 amount,
        uint256 total,
        bytes signerPubkey
    );

    /// Emitted when a validator starts unbonding.
    #[derive(Debug, PartialEq, Eq)]
    event UnstakeInit(
        address indexed user,
        uint256 indexed validatorId,
        uint256 nonce,
        uint256 deactivationEpoch,
        uint256 indexed amount
    );

    /// Emitted when a validator rotates its signer key.
    #[derive(Debug, PartialEq, Eq)]
    event SignerChange(
        uint256 indexed validatorId,
        uint256 nonce,
        address indexed oldSigner,
        address indexed newSigner,
        bytes signerPubkey
    );

    /// Emitted when a validator's stake changes.
    #[derive(Debug, PartialEq, Eq)]
    event StakeUpdate(
        uint256 indexed validatorId,
        uint256 indexed nonce,
        uint256 indexed newAmount
    );

    /// Emitted when a user funds their sidechain fee account.
    #[derive(Debug, PartialEq, Eq)]
    event TopUpFee(address indexed user, uint256 indexed fee);

    /// Emitted when a tick's slashed amounts are applied on the root chain.
    #[derive(Debug, PartialEq, Eq)]
    event Slashed(uint256 indexed nonce, uint256 indexed amount);

    /// Emitted when a jailed validator is released.
    #[derive(Debug, PartialEq, Eq)]
    event UnJailed(uint256 indexed validatorId, uint256 indexed epoch);

    /// Emitted by the state sender for every deposit or state update.
    #[derive(Debug, PartialEq, Eq)]
    event StateSynced(uint256 indexed id, address indexed contractAddress, bytes data);

    /// Emitted when a checkpoint lands on the root chain.
    #[derive(Debug, PartialEq, Eq)]
    event NewHeaderBlock(
        address indexed proposer,
        uint256 indexed headerBlockId,
        uint256 indexed reward,
        uint256 start,
        uint256 end,
        bytes32 root
    );

    /// The root chain contract.
    interface IRootChain {
        /// Submits a signed checkpoint.
        function submitCheckpoint(bytes calldata data, uint256[3][] calldata sigs) external;

        /// Id of the latest header block.
        function currentHeaderBlock() external view returns (uint256);

        /// Last child block covered by a checkpoint.
        function getLastChildBlock() external view returns (uint256);

        /// Details of a header block.
        function headerBlocks(uint256 headerBlockId)
            external
            view
            returns (bytes32 root, uint256 start, uint256 end, uint256 createdAt, address proposer);
    }

    /// The slash manager contract.
    interface ISlashManager {
        /// Applies a signed tick of slashed amounts.
        function updateSlashedAmounts(bytes calldata data, uint256[3][] calldata sigs) external;
    }
}

/// Names and topics of every root-chain event the bridge relays.
pub const ROOT_CHAIN_EVENTS: [(&str, B256); 9] = [
    ("Staked", Staked::SIGNATURE_HASH),
    ("UnstakeInit", UnstakeInit::SIGNATURE_HASH),
    ("SignerChange", SignerChange::SIGNATURE_HASH),
    ("StakeUpdate", StakeUpdate::SIGNATURE_HASH),
    ("TopUpFee", TopUpFee::SIGNATURE_HASH),
    ("Slashed", Slashed::SIGNATURE_HASH),
    ("UnJailed", UnJailed::SIGNATURE_HASH),
    ("StateSynced", StateSynced::SIGNATURE_HASH),
    ("NewHeaderBlock", NewHeaderBlock::SIGNATURE_HASH),
];

/// Returns the event name for a log's first topic, if the bridge relays it.
pub fn event_name(topic0: &B256) -> Option<&'static str> {
    ROOT_CHAIN_EVENTS.iter().find(|(_, topic)| topic == topic0).map(|(name, _)| *name)
}
