use super::{ClientError, EvmChainClient};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use iris_bridge_types::{
    HeaderBlock,
    abi::{IRootChain, ISlashManager},
};
use std::sync::Arc;

/// Calls into the root chain and slash manager contracts.
#[derive(Debug, Clone)]
pub struct RootChainContracts {
    client: Arc<dyn EvmChainClient>,
}

impl RootChainContracts {
    /// Creates the contract helpers on top of the root chain client.
    pub const fn new(client: Arc<dyn EvmChainClient>) -> Self {
        Self { client }
    }

    /// Number of the latest header block, i.e. its id divided by the child
    /// block interval.
    pub async fn current_header_block(
        &self,
        root_chain: Address,
        child_block_interval: u64,
    ) -> Result<u64, ClientError> {
        let raw = self
            .client
            .call(root_chain, IRootChain::currentHeaderBlockCall {}.abi_encode().into())
            .await?;
        let id = IRootChain::currentHeaderBlockCall::abi_decode_returns(&raw)?;
        Ok(to_u64(id)? / child_block_interval.max(1))
    }

    /// Details of header block `number`.
    pub async fn header_block(
        &self,
        root_chain: Address,
        number: u64,
        child_block_interval: u64,
    ) -> Result<HeaderBlock, ClientError> {
        let id = U256::from(number) * U256::from(child_block_interval.max(1));
        let raw = self
            .client
            .call(root_chain, IRootChain::headerBlocksCall { headerBlockId: id }.abi_encode().into())
            .await?;
        let ret = IRootChain::headerBlocksCall::abi_decode_returns(&raw)?;
        Ok(HeaderBlock {
            number,
            root: ret.root,
            start: to_u64(ret.start)?,
            end: to_u64(ret.end)?,
            created_at: to_u64(ret.createdAt)?,
            proposer: ret.proposer,
        })
    }

    /// Last child chain block covered by a checkpoint.
    pub async fn last_child_block(&self, root_chain: Address) -> Result<u64, ClientError> {
        let raw = self
            .client
            .call(root_chain, IRootChain::getLastChildBlockCall {}.abi_encode().into())
            .await?;
        to_u64(IRootChain::getLastChildBlockCall::abi_decode_returns(&raw)?)
    }

    /// Calldata of `RootChain.submitCheckpoint`.
    pub fn submit_checkpoint_calldata(data: Bytes, signatures: &[Bytes]) -> Bytes {
        IRootChain::submitCheckpointCall { data, sigs: signature_words(signatures) }
            .abi_encode()
            .into()
    }

    /// Calldata of `SlashManager.updateSlashedAmounts`.
    pub fn update_slashed_amounts_calldata(data: Bytes, signatures: &[Bytes]) -> Bytes {
        ISlashManager::updateSlashedAmountsCall { data, sigs: signature_words(signatures) }
            .abi_encode()
            .into()
    }
}

/// Splits 65 byte `r || s || v` signatures into `[r, s, v]` words. Malformed
/// signatures are skipped.
fn signature_words(signatures: &[Bytes]) -> Vec<[U256; 3]> {
    signatures
        .iter()
        .filter(|sig| sig.len() == 65)
        .map(|sig| {
            [
                U256::from_be_slice(&sig[..32]),
                U256::from_be_slice(&sig[32..64]),
                U256::from(sig[64]),
            ]
        })
        .collect()
}

fn to_u64(value: U256) -> Result<u64, ClientError> {
    u64::try_from(value).map_err(|_| ClientError::Malformed(format!("{value} overflows u64")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockEvmChainClient;
    use alloy_primitives::{B256, address};
    use alloy_sol_types::SolValue;

    const ROOT_CHAIN: Address = address!("0x00000000000000000000000000000000000000c0");

    #[tokio::test]
    async fn test_current_header_block_divides_by_interval() {
        let mut client = MockEvmChainClient::new();
        client
            .expect_call()
            .withf(|to, data| {
                *to == ROOT_CHAIN && data[..4] == IRootChain::currentHeaderBlockCall::SELECTOR
            })
            .returning(|_, _| Ok(U256::from(30_000).abi_encode().into()));

        let contracts = RootChainContracts::new(Arc::new(client));
        assert_eq!(contracts.current_header_block(ROOT_CHAIN, 10_000).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_header_block() {
        let root = B256::repeat_byte(7);
        let proposer = address!("0x00000000000000000000000000000000000000aa");
        let mut client = MockEvmChainClient::new();
        client.expect_call().returning(move |_, data| {
            let call = IRootChain::headerBlocksCall::abi_decode(&data).unwrap();
            assert_eq!(call.headerBlockId, U256::from(20_000));
            Ok((root, U256::from(100), U256::from(355), U256::from(1_700_000_000u64), proposer)
                .abi_encode_params()
                .into())
        });

        let contracts = RootChainContracts::new(Arc::new(client));
        let header = contracts.header_block(ROOT_CHAIN, 2, 10_000).await.unwrap();
        assert_eq!(
            header,
            HeaderBlock { number: 2, root, start: 100, end: 355, created_at: 1_700_000_000, proposer }
        );
    }

    #[test]
    fn test_submit_checkpoint_calldata_splits_signatures() {
        let mut sig = vec![1u8; 32];
        sig.extend([2u8; 32]);
        sig.push(28);
        let calldata = RootChainContracts::submit_checkpoint_calldata(
            Bytes::from_static(b"data"),
            &[sig.into(), Bytes::from_static(b"short")],
        );

        let call = IRootChain::submitCheckpointCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.data, Bytes::from_static(b"data"));
        assert_eq!(call.sigs.len(), 1);
        assert_eq!(call.sigs[0][0], U256::from_be_slice(&[1u8; 32]));
        assert_eq!(call.sigs[0][2], U256::from(28));
    }
}
