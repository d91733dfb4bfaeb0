use super::{ClientError, SidechainClient};
use alloy_primitives::{Address, B256, Bytes};
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_transport_http::Http;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use iris_bridge_types::{
    Account, BlockEvent, ChainManagerParams, Checkpoint, CheckpointParams, EventCategory,
    Milestone, NodeStatus, SidechainTx, Span, SpanSeed, StdTx, TxResponse, Validator,
    ValidatorNonce, ValidatorSet, ValidatorSlashingInfo, u64_or_string,
};
use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Staking message actions searched when checking for pending staking
/// transactions of a validator, with the event type indexing the validator id.
const STAKING_ACTIONS: [(&str, &str); 4] = [
    ("validator-stake-update", "stake-update"),
    ("validator-join", "validator-join"),
    ("signer-update", "signer-update"),
    ("validator-exit", "validator-exit"),
];

/// Tendermint `tx_search` query for staking transactions of validator `id`
/// committed above `height`.
fn staking_tx_query(action: &str, event_type: &str, id: u64, height: u64) -> String {
    format!("message.action='{action}' AND {event_type}.validator-id={id} AND tx.height>{height}")
}

/// Side-tx vote result meaning the validator approved the transaction.
const SIDE_TX_YES: i32 = 1;

/// Envelope of every REST response.
#[derive(Debug, Deserialize)]
struct RestResponse<T> {
    #[serde(with = "u64_or_string", default)]
    height: u64,
    result: T,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    sync_info: NodeStatus,
}

#[derive(Debug, Deserialize)]
struct BlockResults {
    #[serde(default)]
    begin_block_events: Option<Vec<BlockEvent>>,
}

#[derive(Debug, Deserialize)]
struct BroadcastResult {
    code: u32,
    #[serde(default)]
    log: String,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct UnconfirmedTxs {
    #[serde(with = "u64_or_string")]
    total: u64,
    #[serde(default)]
    txs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(with = "u64_or_string")]
    height: u64,
    tx: String,
}

#[derive(Debug, Deserialize)]
struct TxSearchResult {
    #[serde(with = "u64_or_string")]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct CommitResult {
    signed_header: SignedHeader,
}

#[derive(Debug, Deserialize)]
struct SignedHeader {
    commit: Commit,
}

#[derive(Debug, Deserialize)]
struct Commit {
    #[serde(default)]
    signatures: Vec<CommitSig>,
}

#[derive(Debug, Deserialize)]
struct CommitSig {
    #[serde(default)]
    side_tx_results: Option<Vec<SideTxResult>>,
}

#[derive(Debug, Deserialize)]
struct SideTxResult {
    tx_hash: B256,
    result: i32,
    #[serde(default)]
    sig: Bytes,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    #[serde(with = "u64_or_string")]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct RootHashResult {
    account_root_hash: B256,
}

/// A [`SidechainClient`] over the node's REST server and Tendermint RPC.
#[derive(Debug, Clone)]
pub struct HttpSidechainClient {
    rest_url: Url,
    http: reqwest::Client,
    rpc: RpcClient,
}

impl HttpSidechainClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(rest_url: Url, rpc_url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let rpc = ClientBuilder::default().transport(Http::with_client(http.clone(), rpc_url), false);
        Ok(Self { rest_url, http, rpc })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<RestResponse<T>>, ClientError> {
        let url = self
            .rest_url
            .join(path)
            .map_err(|err| ClientError::Malformed(format!("invalid path {path}: {err}")))?;
        trace!(target: "bridge::client::sidechain", %url, "Fetching");

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { path: path.to_string(), status: status.as_u16(), body });
        }
        let response: RestResponse<Option<T>> = response.json().await?;
        Ok(response.result.map(|result| RestResponse { height: response.height, result }))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.get_with(path, &[]).await
    }

    async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        self.fetch(path, query)
            .await?
            .map(|response| response.result)
            .ok_or_else(|| ClientError::NotFound(path.to_string()))
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        Ok(self.fetch(path, &[]).await?.map(|response| response.result))
    }
}

#[async_trait]
impl SidechainClient for HttpSidechainClient {
    async fn node_status(&self) -> Result<NodeStatus, ClientError> {
        let status: StatusResult = self.rpc.request_noparams("status").await?;
        Ok(status.sync_info)
    }

    async fn account(&self, address: Address) -> Result<Option<Account>, ClientError> {
        self.get_optional(&format!("/auth/accounts/{address}")).await
    }

    async fn broadcast_tx_sync(&self, tx: Vec<u8>) -> Result<TxResponse, ClientError> {
        let result: BroadcastResult =
            self.rpc.request("broadcast_tx_sync", json!({ "tx": STANDARD.encode(tx) })).await?;
        debug!(target: "bridge::client::sidechain", hash = %result.hash, code = result.code, "Broadcast transaction");
        Ok(TxResponse { height: 0, txhash: result.hash, code: result.code, raw_log: result.log })
    }

    async fn block_events(&self, height: u64) -> Result<Vec<BlockEvent>, ClientError> {
        let results: BlockResults =
            self.rpc.request("block_results", json!({ "height": height.to_string() })).await?;
        Ok(results.begin_block_events.unwrap_or_default())
    }

    async fn unconfirmed_txs(&self) -> Result<Vec<StdTx>, ClientError> {
        let result: UnconfirmedTxs =
            self.rpc.request("unconfirmed_txs", json!({ "limit": "100" })).await?;
        Ok(result
            .txs
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| STANDARD.decode(raw).ok())
            .filter_map(|bytes| StdTx::decode(&bytes).ok())
            .collect())
    }

    async fn unconfirmed_tx_count(&self) -> Result<u64, ClientError> {
        let result: UnconfirmedTxs = self.rpc.request_noparams("num_unconfirmed_txs").await?;
        Ok(result.total)
    }

    async fn tx(&self, hash: B256) -> Result<SidechainTx, ClientError> {
        let result: TxResult = self
            .rpc
            .request("tx", json!({ "hash": STANDARD.encode(hash), "prove": false }))
            .await?;
        let raw = STANDARD
            .decode(&result.tx)
            .map_err(|err| ClientError::Malformed(format!("tx {hash}: {err}")))?;
        Ok(SidechainTx { height: result.height, hash, tx: StdTx::decode(&raw)? })
    }

    async fn side_tx_signatures(
        &self,
        height: u64,
        tx_hash: B256,
    ) -> Result<Vec<Bytes>, ClientError> {
        // Votes on the side-tx of block `height` are committed two blocks later.
        let commit_height = height + 2;
        let result: CommitResult =
            self.rpc.request("commit", json!({ "height": commit_height.to_string() })).await?;
        Ok(result
            .signed_header
            .commit
            .signatures
            .into_iter()
            .flat_map(|sig| sig.side_tx_results.unwrap_or_default())
            .filter(|vote| vote.tx_hash == tx_hash && vote.result == SIDE_TX_YES && !vote.sig.is_empty())
            .map(|vote| vote.sig)
            .collect())
    }

    async fn is_old_tx(
        &self,
        category: EventCategory,
        tx_hash: B256,
        log_index: u64,
    ) -> Result<bool, ClientError> {
        self.get_with(
            category.is_old_tx_path(),
            &[("tx_hash", tx_hash.to_string()), ("log_index", log_index.to_string())],
        )
        .await
    }

    async fn chain_manager_params(&self) -> Result<ChainManagerParams, ClientError> {
        self.get("/chainmanager/params").await
    }

    async fn checkpoint_params(&self) -> Result<CheckpointParams, ClientError> {
        self.get("/checkpoints/params").await
    }

    async fn validator_set(&self) -> Result<ValidatorSet, ClientError> {
        self.get("/staking/validator-set").await
    }

    async fn validator(&self, id: u64) -> Result<Option<Validator>, ClientError> {
        self.get_optional(&format!("/staking/validator/{id}")).await
    }

    async fn validator_nonce(&self, id: u64) -> Result<ValidatorNonce, ClientError> {
        let response = self
            .fetch::<Validator>(&format!("/staking/validator/{id}"), &[])
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("validator {id}")))?;
        Ok(ValidatorNonce { nonce: response.result.nonce, height: response.height })
    }

    async fn staking_tx_count(&self, id: u64, height: u64) -> Result<u64, ClientError> {
        for (action, event_type) in STAKING_ACTIONS {
            let query = staking_tx_query(action, event_type, id, height);
            let result: TxSearchResult = self
                .rpc
                .request("tx_search", json!({ "query": query, "page": "1", "per_page": "30" }))
                .await?;
            if result.total_count != 0 {
                return Ok(result.total_count);
            }
        }
        Ok(0)
    }

    async fn proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError> {
        self.get(&format!("/staking/proposer/{count}")).await
    }

    async fn current_proposer(&self) -> Result<Option<Validator>, ClientError> {
        self.get_optional("/staking/current-proposer").await
    }

    async fn milestone_proposers(&self, count: usize) -> Result<Vec<Validator>, ClientError> {
        self.get(&format!("/staking/milestoneProposer/{count}")).await
    }

    async fn latest_checkpoint(&self) -> Result<Option<Checkpoint>, ClientError> {
        self.get_optional("/checkpoints/latest").await
    }

    async fn buffered_checkpoint(&self) -> Result<Option<Checkpoint>, ClientError> {
        self.get_optional("/checkpoints/buffer").await
    }

    async fn account_root_hash(&self) -> Result<B256, ClientError> {
        let result: RootHashResult = self.get("/topup/dividend-account-root").await?;
        Ok(result.account_root_hash)
    }

    async fn latest_milestone(&self) -> Result<Option<Milestone>, ClientError> {
        self.get_optional("/milestone/latest").await
    }

    async fn milestone_count(&self) -> Result<u64, ClientError> {
        let result: CountResult = self.get("/milestone/count").await?;
        Ok(result.count)
    }

    async fn latest_span(&self) -> Result<Option<Span>, ClientError> {
        self.get_optional("/zena/latest-span").await
    }

    async fn next_span(
        &self,
        id: u64,
        start_block: u64,
        chain_id: String,
        proposer: Address,
    ) -> Result<Span, ClientError> {
        self.get_with(
            "/zena/prepare-next-span",
            &[
                ("span_id", id.to_string()),
                ("start_block", start_block.to_string()),
                ("chain_id", chain_id),
                ("proposer", proposer.to_string()),
            ],
        )
        .await
    }

    async fn next_span_seed(&self, id: u64) -> Result<SpanSeed, ClientError> {
        self.get(&format!("/zena/span/seed/{id}")).await
    }

    async fn latest_slash_info_bytes(&self) -> Result<Bytes, ClientError> {
        self.get("/slashing/latest_slash_info_bytes").await
    }

    async fn tick_count(&self) -> Result<u64, ClientError> {
        let result: CountResult = self.get("/slashing/tick-count").await?;
        Ok(result.count)
    }

    async fn tick_slash_infos(&self) -> Result<Vec<ValidatorSlashingInfo>, ClientError> {
        self.get("/slashing/tick_slash_infos").await
    }
}
