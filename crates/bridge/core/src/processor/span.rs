use super::{ProcessorContext, ProcessorError};
use crate::Poller;
use async_trait::async_trait;
use iris_bridge_types::{
    Msg,
    msgs::{MsgProposeSpan, MsgProposeSpanV2},
};
use std::time::Duration;
use tracing::{debug, info};

/// Proposes the next producer span while the current span is running and
/// this validator is among the next span's producers.
#[derive(Debug, Clone)]
pub struct SpanPoller {
    ctx: ProcessorContext,
}

impl SpanPoller {
    /// Creates the poller.
    pub const fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Poller for SpanPoller {
    type Error = ProcessorError;

    fn name(&self) -> &'static str {
        "span"
    }

    fn interval(&self) -> Duration {
        self.ctx.config.span_poll_interval
    }

    async fn poll(&self) -> Result<(), ProcessorError> {
        let Some(last) = self.ctx.sidechain.latest_span().await? else {
            return Ok(());
        };
        let danelaw = self.ctx.config.forks.danelaw_height;
        let height = self.ctx.sidechain.node_status().await?.latest_block_height;
        let current = self.ctx.child_chain.block_number().await?;
        if height >= danelaw && current < last.start_block {
            debug!(
                target: "bridge::processor::span",
                current,
                last_span_start = last.start_block,
                "Child chain behind last span start"
            );
            return Ok(());
        }

        let us = self.ctx.identity.address();
        let chain_id = self.ctx.sidechain.chain_manager_params().await?.chain_params.zena_chain_id;
        let next = self.ctx.sidechain.next_span(last.id + 1, last.end_block + 1, chain_id, us).await?;
        if !next.selected_producers.iter().any(|producer| producer.signer == us) {
            debug!(target: "bridge::processor::span", span_id = next.id, "Not a producer of the next span");
            return Ok(());
        }
        if !(last.start_block..=last.end_block).contains(&current) {
            debug!(
                target: "bridge::processor::span",
                current,
                start = last.start_block,
                end = last.end_block,
                "Child chain outside the last span"
            );
            return Ok(());
        }

        let seed = self.ctx.sidechain.next_span_seed(next.id).await?;
        let span = MsgProposeSpan {
            id: next.id,
            proposer: us,
            start_block: next.start_block,
            end_block: next.end_block,
            chain_id: next.zena_chain_id,
            seed: seed.seed,
        };
        info!(
            target: "bridge::processor::span",
            span_id = span.id,
            start = span.start_block,
            end = span.end_block,
            seed = %span.seed,
            "Proposing span"
        );

        // The fork height is re-read: the sidechain may have crossed it meanwhile.
        let height = self.ctx.sidechain.node_status().await?.latest_block_height;
        let msg: Msg = if height < danelaw {
            span.into()
        } else {
            MsgProposeSpanV2 { span, seed_author: seed.seed_author }.into()
        };
        self.ctx.broadcast(msg, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identity::tests::test_identity, processor::tests::Mocks};
    use alloy_primitives::{Address, B256};
    use iris_bridge_types::{ChainManagerParams, ChainParams, NodeStatus, Span, SpanSeed, Validator};

    fn last_span() -> Span {
        Span { id: 7, start_block: 1000, end_block: 1255, ..Default::default() }
    }

    fn mocks(height: u64, current: u64, producer: Address) -> Mocks {
        let mut mocks = Mocks::new();
        mocks.config.forks.danelaw_height = 500;
        mocks.sidechain.expect_latest_span().returning(|| Ok(Some(last_span())));
        mocks
            .sidechain
            .expect_node_status()
            .returning(move || Ok(NodeStatus { latest_block_height: height, catching_up: false }));
        mocks.child_chain.expect_block_number().returning(move || Ok(current));
        mocks.sidechain.expect_chain_manager_params().returning(|| {
            Ok(ChainManagerParams {
                chain_params: ChainParams { zena_chain_id: "15001".into(), ..Default::default() },
                ..Default::default()
            })
        });
        mocks.sidechain.expect_next_span().returning(move |id, start, chain_id, _| {
            Ok(Span {
                id,
                start_block: start,
                end_block: start + 255,
                selected_producers: vec![Validator { id: 1, signer: producer, ..Default::default() }],
                zena_chain_id: chain_id,
                ..Default::default()
            })
        });
        mocks.sidechain.expect_next_span_seed().returning(|_| {
            Ok(SpanSeed { seed: B256::repeat_byte(0x5e), seed_author: Address::repeat_byte(0xa7) })
        });
        mocks
    }

    #[tokio::test]
    async fn test_producer_proposes_v2_span_after_fork() {
        let mut mocks = mocks(600, 1100, test_identity().address());
        let sent = mocks.accept_broadcasts();

        SpanPoller::new(mocks.build()).poll().await.unwrap();

        let sent = sent.lock().unwrap();
        let [Msg::ProposeSpanV2(msg)] = sent.as_slice() else { panic!("unexpected msgs {sent:?}") };
        assert_eq!((msg.span.id, msg.span.start_block, msg.span.end_block), (8, 1256, 1511));
        assert_eq!(msg.span.chain_id, "15001");
        assert_eq!(msg.span.seed, B256::repeat_byte(0x5e));
        assert_eq!(msg.seed_author, Address::repeat_byte(0xa7));
    }

    #[tokio::test]
    async fn test_producer_proposes_legacy_span_before_fork() {
        let mut mocks = mocks(400, 1100, test_identity().address());
        let sent = mocks.accept_broadcasts();

        SpanPoller::new(mocks.build()).poll().await.unwrap();

        let sent = sent.lock().unwrap();
        assert!(matches!(sent.as_slice(), [Msg::ProposeSpan(msg)] if msg.id == 8));
    }

    #[tokio::test]
    async fn test_non_producer_does_not_propose() {
        let mut mocks = mocks(600, 1100, Address::repeat_byte(0x99));
        mocks.sidechain.expect_broadcast_tx_sync().never();

        SpanPoller::new(mocks.build()).poll().await.unwrap();
    }

    #[tokio::test]
    async fn test_child_chain_behind_span_start_is_skipped() {
        let mut mocks = mocks(600, 900, test_identity().address());
        mocks.sidechain.expect_broadcast_tx_sync().never();

        SpanPoller::new(mocks.build()).poll().await.unwrap();
    }

    #[tokio::test]
    async fn test_child_chain_past_span_end_is_skipped() {
        let mut mocks = mocks(600, 1300, test_identity().address());
        mocks.sidechain.expect_broadcast_tx_sync().never();

        SpanPoller::new(mocks.build()).poll().await.unwrap();
    }
}
