//! Decides which validator relays an event and whose turn it is to propose.
//!
//! Every validator runs a bridge and sees the same events. To avoid all of
//! them submitting at once, a validator relays an event after a delay derived
//! from its position in a deterministic, stake-weighted validator ordering.
//! The ordering is pluggable through [`ProposerPolicy`].

use crate::{
    BridgeIdentity,
    clients::{ClientError, SidechainClient},
    config::ProposerPolicyKind,
    constants::{MEMPOOL_TX_COUNT_DIVISOR, TASK_DELAY_BETWEEN_EACH_VAL},
};
use alloy_primitives::Address;
use async_trait::async_trait;
use iris_bridge_types::Validator;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::warn;

/// A deterministic validator ordering.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProposerPolicy: Debug + Send + Sync {
    /// Validators in the order they take turns relaying events, each listed
    /// once.
    async fn relay_order(&self) -> Result<Vec<Validator>, ClientError>;

    /// The next `count` checkpoint proposers.
    async fn proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError>;

    /// The current checkpoint proposer.
    async fn current_proposer(&self) -> Result<Option<Validator>, ClientError>;

    /// The next `count` milestone proposers.
    async fn milestone_proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError>;
}

/// Uses the orderings the sidechain itself maintains.
#[derive(Debug, Clone)]
pub struct LedgerProposerPolicy {
    sidechain: Arc<dyn SidechainClient>,
}

impl LedgerProposerPolicy {
    /// Creates a policy querying `sidechain`.
    pub const fn new(sidechain: Arc<dyn SidechainClient>) -> Self {
        Self { sidechain }
    }
}

#[async_trait]
impl ProposerPolicy for LedgerProposerPolicy {
    async fn relay_order(&self) -> Result<Vec<Validator>, ClientError> {
        Ok(self.sidechain.validator_set().await?.validators)
    }

    async fn proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError> {
        self.sidechain.proposers(count).await
    }

    async fn current_proposer(&self) -> Result<Option<Validator>, ClientError> {
        self.sidechain.current_proposer().await
    }

    async fn milestone_proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError> {
        self.sidechain.milestone_proposers(count).await
    }
}

/// Derives every ordering locally by advancing the stake-weighted proposer
/// priorities of the current validator set.
#[derive(Debug, Clone)]
pub struct RoundRobinPolicy {
    sidechain: Arc<dyn SidechainClient>,
}

impl RoundRobinPolicy {
    /// Creates a policy reading the validator set from `sidechain`.
    pub const fn new(sidechain: Arc<dyn SidechainClient>) -> Self {
        Self { sidechain }
    }
}

#[async_trait]
impl ProposerPolicy for RoundRobinPolicy {
    async fn relay_order(&self) -> Result<Vec<Validator>, ClientError> {
        let set = self.sidechain.validator_set().await?;
        let mut order: Vec<Validator> = Vec::with_capacity(set.validators.len());
        // Higher stake shows up earlier and more often; keep first turns only.
        for validator in set.next_proposers(set.validators.len() * 2) {
            if !order.iter().any(|v| v.id == validator.id) {
                order.push(validator);
            }
        }
        for validator in set.validators {
            if !order.iter().any(|v| v.id == validator.id) {
                order.push(validator);
            }
        }
        Ok(order)
    }

    async fn proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError> {
        Ok(self.sidechain.validator_set().await?.next_proposers(count))
    }

    async fn current_proposer(&self) -> Result<Option<Validator>, ClientError> {
        Ok(self.sidechain.validator_set().await?.current_proposer().cloned())
    }

    async fn milestone_proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError> {
        self.proposers(count).await
    }
}

/// Builds the policy selected by `kind`.
pub fn proposer_policy(
    kind: ProposerPolicyKind,
    sidechain: Arc<dyn SidechainClient>,
) -> Arc<dyn ProposerPolicy> {
    match kind {
        ProposerPolicyKind::Ledger => Arc::new(LedgerProposerPolicy::new(sidechain)),
        ProposerPolicyKind::RoundRobin => Arc::new(RoundRobinPolicy::new(sidechain)),
    }
}

/// Answers "is this bridge responsible" questions for the local validator.
#[derive(Debug, Clone)]
pub struct Responsibility {
    identity: Arc<BridgeIdentity>,
    sidechain: Arc<dyn SidechainClient>,
    policy: Arc<dyn ProposerPolicy>,
}

impl Responsibility {
    /// Creates the checks for `identity`.
    pub fn new(
        identity: Arc<BridgeIdentity>,
        sidechain: Arc<dyn SidechainClient>,
        policy: Arc<dyn ProposerPolicy>,
    ) -> Self {
        Self { identity, sidechain, policy }
    }

    /// The signer address of the local validator.
    pub fn signer(&self) -> Address {
        self.identity.address()
    }

    /// The delay after which this validator relays an event, or `None` when
    /// it is not part of the validator set.
    ///
    /// The delay grows with the validator's turn and with mempool congestion.
    pub async fn task_delay(&self) -> Result<Option<Duration>, ClientError> {
        let signer = self.signer();
        let order = self.policy.relay_order().await?;
        let Some(position) = order.iter().position(|v| v.signer == signer) else {
            return Ok(None);
        };

        let turn = u32::try_from(position + 1).unwrap_or(u32::MAX);
        let mut delay = TASK_DELAY_BETWEEN_EACH_VAL.saturating_mul(turn);
        match self.sidechain.unconfirmed_tx_count().await {
            Ok(count) => {
                let congestion =
                    u32::try_from(count / MEMPOOL_TX_COUNT_DIVISOR).unwrap_or(u32::MAX);
                delay = delay.saturating_add(TASK_DELAY_BETWEEN_EACH_VAL.saturating_mul(congestion));
            }
            Err(err) => {
                warn!(target: "bridge::responsibility", %err, "Failed to read mempool size, ignoring congestion");
            }
        }
        Ok(Some(delay))
    }

    /// Returns whether the validator with staking id `validator_id` is us.
    pub async fn is_event_sender(&self, validator_id: u64) -> Result<bool, ClientError> {
        Ok(self
            .sidechain
            .validator(validator_id)
            .await?
            .is_some_and(|validator| validator.signer == self.signer()))
    }

    /// Returns whether we propose the next checkpoint.
    pub async fn is_proposer(&self) -> Result<bool, ClientError> {
        self.is_in_proposer_list(1).await
    }

    /// Returns whether we are among the next `count` checkpoint proposers.
    pub async fn is_in_proposer_list(&self, count: usize) -> Result<bool, ClientError> {
        let signer = self.signer();
        Ok(self.policy.proposers(count).await?.iter().any(|v| v.signer == signer))
    }

    /// Returns whether we are the current checkpoint proposer.
    pub async fn is_current_proposer(&self) -> Result<bool, ClientError> {
        let signer = self.signer();
        Ok(self.policy.current_proposer().await?.is_some_and(|v| v.signer == signer))
    }

    /// Returns whether we propose the next milestone.
    pub async fn is_milestone_proposer(&self) -> Result<bool, ClientError> {
        self.is_in_milestone_proposer_list(1).await
    }

    /// Returns whether we are among the next `count` milestone proposers.
    pub async fn is_in_milestone_proposer_list(&self, count: usize) -> Result<bool, ClientError> {
        let signer = self.signer();
        Ok(self.policy.milestone_proposers(count).await?.iter().any(|v| v.signer == signer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clients::MockSidechainClient, identity::tests::test_identity};
    use iris_bridge_types::ValidatorSet;
    use rstest::rstest;

    fn validator(id: u64, signer: Address, power: i64) -> Validator {
        Validator { id, signer, power, ..Default::default() }
    }

    fn set_with_us_at(position: usize) -> ValidatorSet {
        let us = test_identity().address();
        let mut validators = (0..3)
            .map(|i| validator(i + 10, Address::with_last_byte(i as u8 + 1), 1))
            .collect::<Vec<_>>();
        validators.insert(position, validator(1, us, 1));
        ValidatorSet { validators, proposer: None }
    }

    fn responsibility(sidechain: MockSidechainClient) -> Responsibility {
        let sidechain: Arc<dyn SidechainClient> = Arc::new(sidechain);
        Responsibility::new(
            Arc::new(test_identity()),
            sidechain.clone(),
            Arc::new(LedgerProposerPolicy::new(sidechain)),
        )
    }

    #[rstest]
    #[case(0, 0, 10)]
    #[case(2, 0, 30)]
    #[case(0, 2_500, 30)]
    #[case(3, 999, 40)]
    #[tokio::test]
    async fn test_task_delay(#[case] position: usize, #[case] pending: u64, #[case] secs: u64) {
        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_validator_set().returning(move || Ok(set_with_us_at(position)));
        sidechain.expect_unconfirmed_tx_count().returning(move || Ok(pending));

        let delay = responsibility(sidechain).task_delay().await.unwrap();
        assert_eq!(delay, Some(Duration::from_secs(secs)));
    }

    #[tokio::test]
    async fn test_not_in_set_is_not_responsible() {
        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_validator_set().returning(|| {
            Ok(ValidatorSet {
                validators: vec![validator(7, Address::repeat_byte(7), 1)],
                proposer: None,
            })
        });
        sidechain.expect_unconfirmed_tx_count().never();

        assert_eq!(responsibility(sidechain).task_delay().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mempool_error_is_ignored() {
        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_validator_set().returning(|| Ok(set_with_us_at(1)));
        sidechain
            .expect_unconfirmed_tx_count()
            .returning(|| Err(ClientError::Malformed("bad count".into())));

        let delay = responsibility(sidechain).task_delay().await.unwrap();
        assert_eq!(delay, Some(Duration::from_secs(20)));
    }

    #[tokio::test]
    async fn test_event_sender() {
        let us = test_identity().address();
        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_validator().returning(move |id| {
            Ok(match id {
                1 => Some(validator(1, us, 1)),
                2 => Some(validator(2, Address::repeat_byte(2), 1)),
                _ => None,
            })
        });

        let responsibility = responsibility(sidechain);
        assert!(responsibility.is_event_sender(1).await.unwrap());
        assert!(!responsibility.is_event_sender(2).await.unwrap());
        assert!(!responsibility.is_event_sender(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_proposer_checks() {
        let us = test_identity().address();
        let mut policy = MockProposerPolicy::new();
        policy.expect_proposers().returning(move |count| {
            Ok([validator(5, Address::repeat_byte(5), 1), validator(1, us, 1)]
                .into_iter()
                .take(count)
                .collect())
        });
        policy.expect_current_proposer().returning(move || Ok(Some(validator(1, us, 1))));
        policy.expect_milestone_proposers().returning(|_| Ok(vec![]));

        let responsibility = Responsibility::new(
            Arc::new(test_identity()),
            Arc::new(MockSidechainClient::new()),
            Arc::new(policy),
        );
        assert!(!responsibility.is_proposer().await.unwrap());
        assert!(responsibility.is_in_proposer_list(2).await.unwrap());
        assert!(responsibility.is_current_proposer().await.unwrap());
        assert!(!responsibility.is_milestone_proposer().await.unwrap());
    }

    #[tokio::test]
    async fn test_round_robin_relay_order_is_stake_weighted() {
        let mut sidechain = MockSidechainClient::new();
        sidechain.expect_validator_set().returning(|| {
            Ok(ValidatorSet {
                validators: vec![
                    validator(1, Address::repeat_byte(1), 1),
                    Validator {
                        proposer_priority: 5,
                        ..validator(2, Address::repeat_byte(2), 10)
                    },
                    validator(3, Address::repeat_byte(3), 0),
                ],
                proposer: None,
            })
        });

        let order = RoundRobinPolicy::new(Arc::new(sidechain)).relay_order().await.unwrap();
        assert_eq!(order.iter().map(|v| v.id).collect::<Vec<_>>(), vec![2, 1, 3]);
    }
}
