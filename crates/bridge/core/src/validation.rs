//! Acceptance checks for checkpoint and milestone windows.
//!
//! A failed check yields a [`ValidationError`] with a [`RejectionCode`], so
//! callers can tell a window that is invalid from one that cannot be judged
//! yet.

use crate::clients::EvmChainClient;
use alloy_primitives::B256;
use iris_bridge_types::{BlockWindow, msgs::MilestoneId};
use std::str::FromStr;
use thiserror::Error;

/// Why a window was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RejectionCode {
    /// The window is malformed, e.g. it ends before it starts.
    InvalidBlockInput,
    /// The child chain has not produced or confirmed the window yet.
    BlocksNotAvailable,
    /// The committed hash does not match the child chain.
    HashMismatch,
    /// The milestone id is not `"<uuid> - <hex address>"`.
    InvalidMilestoneId,
    /// The window does not continue the last accepted one, or is too long.
    OutOfRange,
    /// The window is shorter than required.
    TooShort,
    /// The child chain could not be queried.
    Unavailable,
}

impl RejectionCode {
    /// Returns whether the same window may pass later.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::BlocksNotAvailable | Self::Unavailable)
    }
}

/// A rejected window.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {reason}")]
pub struct ValidationError {
    /// Rejection code.
    pub code: RejectionCode,
    /// Details.
    pub reason: String,
}

impl ValidationError {
    /// Creates a rejection.
    pub fn new(code: RejectionCode, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into() }
    }
}

/// Checks that `window` starts right after the last accepted window ending at
/// `last_end`.
pub fn check_continuity(last_end: Option<u64>, window: BlockWindow) -> Result<(), ValidationError> {
    if window.is_empty() {
        return Err(ValidationError::new(
            RejectionCode::InvalidBlockInput,
            format!("window {}..={} is empty", window.start, window.end),
        ));
    }
    if !window.continues(last_end) {
        return Err(ValidationError::new(
            RejectionCode::OutOfRange,
            format!("start {} does not follow last end {last_end:?}", window.start),
        ));
    }
    Ok(())
}

/// Checks a milestone proposal against the child chain.
///
/// The window must cover at least `min_len` blocks, its end must be buried
/// under `confirmations` blocks, the child chain must agree on `hash`, and the
/// id must be a UUID and a hex address joined by `" - "`.
pub async fn validate_milestone(
    window: BlockWindow,
    hash: B256,
    milestone_id: &str,
    client: &dyn EvmChainClient,
    confirmations: u64,
    min_len: u64,
) -> Result<(), ValidationError> {
    if window.is_empty() {
        return Err(ValidationError::new(RejectionCode::InvalidBlockInput, "empty window"));
    }
    if window.len() < min_len {
        return Err(ValidationError::new(
            RejectionCode::TooShort,
            format!("{} blocks, need {min_len}", window.len()),
        ));
    }
    if let Err(err) = MilestoneId::from_str(milestone_id) {
        return Err(ValidationError::new(RejectionCode::InvalidMilestoneId, err.to_string()));
    }

    ensure_confirmed(window, client, confirmations).await?;

    let agreed = client
        .vote_on_hash(window.start, window.end, hash, milestone_id.to_string())
        .await
        .map_err(|err| ValidationError::new(RejectionCode::Unavailable, err.to_string()))?;
    if !agreed {
        return Err(ValidationError::new(
            RejectionCode::HashMismatch,
            format!("child chain rejects {hash} for {}..={}", window.start, window.end),
        ));
    }
    Ok(())
}

/// Checks a checkpoint against the child chain: at most `max_len` blocks,
/// confirmed under `confirmations` blocks, with a matching root hash.
pub async fn validate_checkpoint(
    window: BlockWindow,
    root_hash: B256,
    max_len: u64,
    client: &dyn EvmChainClient,
    confirmations: u64,
) -> Result<(), ValidationError> {
    if window.is_empty() {
        return Err(ValidationError::new(RejectionCode::InvalidBlockInput, "empty window"));
    }
    if max_len > 0 && window.len() > max_len {
        return Err(ValidationError::new(
            RejectionCode::OutOfRange,
            format!("{} blocks, at most {max_len} allowed", window.len()),
        ));
    }

    ensure_confirmed(window, client, confirmations).await?;

    let expected = client
        .root_hash(window.start, window.end)
        .await
        .map_err(|err| ValidationError::new(RejectionCode::Unavailable, err.to_string()))?;
    if expected != root_hash {
        return Err(ValidationError::new(
            RejectionCode::HashMismatch,
            format!("root hash {root_hash}, child chain has {expected}"),
        ));
    }
    Ok(())
}

async fn ensure_confirmed(
    window: BlockWindow,
    client: &dyn EvmChainClient,
    confirmations: u64,
) -> Result<(), ValidationError> {
    let latest = client
        .block_number()
        .await
        .map_err(|err| ValidationError::new(RejectionCode::Unavailable, err.to_string()))?;
    if latest < window.end.saturating_add(confirmations) {
        return Err(ValidationError::new(
            RejectionCode::BlocksNotAvailable,
            format!("latest block {latest}, need {} + {confirmations}", window.end),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, MockEvmChainClient};
    use proptest::prelude::*;
    use rstest::rstest;

    fn milestone_id() -> String {
        MilestoneId::for_end_hash(B256::repeat_byte(0x11)).to_string()
    }

    fn child_chain(latest: u64, agrees: bool) -> MockEvmChainClient {
        let mut client = MockEvmChainClient::new();
        client.expect_block_number().returning(move || Ok(latest));
        client.expect_vote_on_hash().returning(move |_, _, _, _| Ok(agrees));
        client.expect_root_hash().returning(|_, _| Ok(B256::repeat_byte(0xaa)));
        client
    }

    proptest! {
        #[test]
        fn test_continuity_requires_next_block(last in 0u64..1_000_000, start in 0u64..1_000_001, len in 1u64..100) {
            let window = BlockWindow::new(start, start + len - 1);
            let result = check_continuity(Some(last), window);
            if start == last + 1 {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result.unwrap_err().code, RejectionCode::OutOfRange);
            }
        }

        #[test]
        fn test_inverted_windows_are_rejected(start in 1u64..u64::MAX, back in 1u64..1000) {
            let window = BlockWindow::new(start, start.saturating_sub(back));
            prop_assume!(window.end < window.start);
            prop_assert_eq!(
                check_continuity(None, window).unwrap_err().code,
                RejectionCode::InvalidBlockInput
            );
        }
    }

    #[test]
    fn test_continuity_at_u64_max() {
        let window = BlockWindow::new(0, 10);
        assert_eq!(
            check_continuity(Some(u64::MAX), window).unwrap_err().code,
            RejectionCode::OutOfRange
        );
    }

    #[tokio::test]
    async fn test_valid_milestone() {
        let client = child_chain(200, true);
        let result = validate_milestone(
            BlockWindow::new(100, 120),
            B256::repeat_byte(1),
            &milestone_id(),
            &client,
            16,
            12,
        )
        .await;
        assert_eq!(result, Ok(()));
    }

    #[rstest]
    #[case(BlockWindow::new(100, 105), 200, true, RejectionCode::TooShort)]
    #[case(BlockWindow::new(100, 120), 130, true, RejectionCode::BlocksNotAvailable)]
    #[case(BlockWindow::new(100, 120), 200, false, RejectionCode::HashMismatch)]
    #[case(BlockWindow::new(120, 100), 200, true, RejectionCode::InvalidBlockInput)]
    #[tokio::test]
    async fn test_rejected_milestone(
        #[case] window: BlockWindow,
        #[case] latest: u64,
        #[case] agrees: bool,
        #[case] code: RejectionCode,
    ) {
        let client = child_chain(latest, agrees);
        let err = validate_milestone(window, B256::repeat_byte(1), &milestone_id(), &client, 16, 12)
            .await
            .unwrap_err();
        assert_eq!(err.code, code);
    }

    #[rstest]
    #[case("not-a-milestone-id")]
    #[case("3f2b8c1e-0000-4000-8000-000000000000 - 0x12")]
    #[case("0x2222222222222222222222222222222222222222 - 3f2b8c1e-0000-4000-8000-000000000000")]
    #[tokio::test]
    async fn test_invalid_milestone_id(#[case] id: &str) {
        let client = child_chain(200, true);
        let err = validate_milestone(BlockWindow::new(100, 120), B256::repeat_byte(1), id, &client, 16, 12)
            .await
            .unwrap_err();
        assert_eq!(err.code, RejectionCode::InvalidMilestoneId);
        assert!(!err.code.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_child_chain_is_transient() {
        let mut client = MockEvmChainClient::new();
        client.expect_block_number().returning(|| Err(ClientError::Timeout));
        let err = validate_checkpoint(BlockWindow::new(0, 255), B256::ZERO, 1024, &client, 0)
            .await
            .unwrap_err();
        assert_eq!(err.code, RejectionCode::Unavailable);
        assert!(err.code.is_transient());
    }

    #[rstest]
    #[case(B256::repeat_byte(0xaa), 1024, None)]
    #[case(B256::repeat_byte(0xbb), 1024, Some(RejectionCode::HashMismatch))]
    #[case(B256::repeat_byte(0xaa), 100, Some(RejectionCode::OutOfRange))]
    #[tokio::test]
    async fn test_validate_checkpoint(
        #[case] root_hash: B256,
        #[case] max_len: u64,
        #[case] code: Option<RejectionCode>,
    ) {
        let client = child_chain(1_000, true);
        let result = validate_checkpoint(BlockWindow::new(0, 255), root_hash, max_len, &client, 10).await;
        assert_eq!(result.err().map(|err| err.code), code);
    }
}
