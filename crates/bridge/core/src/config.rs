//! Configuration of the bridge.

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use thiserror::Error;
use url::Url;

/// A configured endpoint is not a valid URL.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {name} `{value}`: {source}")]
pub struct InvalidEndpoint {
    /// Configuration key of the endpoint.
    pub name: &'static str,
    /// Configured value.
    pub value: String,
    /// Parse failure.
    #[source]
    pub source: url::ParseError,
}

fn parse_endpoint(name: &'static str, value: &str) -> Result<Url, InvalidEndpoint> {
    Url::parse(value).map_err(|source| InvalidEndpoint { name, value: value.to_string(), source })
}

/// Which validator ordering drives relay responsibility and proposer checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::EnumString, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProposerPolicyKind {
    /// Ask the sidechain for its proposer ordering.
    #[default]
    Ledger,
    /// Derive the ordering locally from stake-weighted proposer priorities.
    RoundRobin,
}

/// Sidechain heights at which the bridge changes behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkHeights {
    /// Sidechain height from which milestones are proposed.
    pub aalborg_height: u64,
    /// Sidechain height from which the reduced state-sync size limit applies.
    pub span_override_height: u64,
    /// Sidechain height from which spans carry the seed author.
    pub danelaw_height: u64,
    /// First child chain block covered by milestones.
    pub milestone_start_block: u64,
}

/// Configuration of the bridge, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Root chain JSON-RPC endpoint.
    pub eth_rpc_url: String,
    /// Child chain JSON-RPC endpoint.
    pub zena_rpc_url: String,
    /// Tendermint JSON-RPC endpoint of the sidechain node.
    pub tendermint_rpc_url: String,
    /// REST endpoint of the sidechain node.
    pub iris_rest_server: String,

    /// Timeout of root chain requests and transactions.
    #[serde(with = "duration")]
    pub eth_rpc_timeout: Duration,
    /// Timeout of child chain requests and transactions.
    #[serde(with = "duration")]
    pub zena_rpc_timeout: Duration,
    /// Timeout of sidechain requests.
    #[serde(with = "duration")]
    pub http_timeout: Duration,

    /// Interval of the child chain listener and the checkpoint flow.
    #[serde(with = "duration")]
    pub checkpoint_poll_interval: Duration,
    /// Interval of the root chain and sidechain listeners.
    #[serde(with = "duration")]
    pub syncer_poll_interval: Duration,
    /// Interval of the checkpoint no-ack check.
    #[serde(with = "duration")]
    pub noack_poll_interval: Duration,
    /// Interval of the span proposal check.
    #[serde(with = "duration")]
    pub span_poll_interval: Duration,
    /// Interval of the milestone proposal check.
    #[serde(with = "duration")]
    pub milestone_poll_interval: Duration,
    /// Time without a root chain checkpoint after which a no-ack is proposed.
    #[serde(with = "duration")]
    pub no_ack_wait_time: Duration,

    /// Gas limit of root chain transactions.
    pub main_chain_gas_limit: u64,
    /// Highest gas price, in wei, the bridge pays on the root chain.
    pub main_chain_max_gas_price: u128,

    /// Tendermint chain id of the sidechain.
    pub iris_chain_id: String,
    /// Chain id of the child chain.
    pub zena_chain_id: String,
    /// Fork heights.
    pub forks: ForkHeights,

    /// Root chain confirmations before logs are scanned. Falls back to the
    /// sidechain's chain-manager parameter when unset.
    pub root_chain_confirmations: Option<u64>,
    /// Root chain block scanned first when no offset is stored.
    pub root_chain_start_block: u64,
    /// Largest block range of a single log query.
    pub max_log_range: u64,

    /// Directory of the bridge database.
    pub bridge_db: PathBuf,
    /// Number of concurrent task consumers.
    pub queue_workers: usize,
    /// File holding the hex encoded signing key.
    pub priv_validator_key: PathBuf,
    /// Validator ordering used for responsibility and proposer checks.
    pub proposer_policy: ProposerPolicyKind,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            eth_rpc_url: "http://localhost:9545".to_string(),
            zena_rpc_url: "http://localhost:8545".to_string(),
            tendermint_rpc_url: "http://0.0.0.0:26657".to_string(),
            iris_rest_server: "http://0.0.0.0:1317".to_string(),
            eth_rpc_timeout: Duration::from_secs(5),
            zena_rpc_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(5),
            checkpoint_poll_interval: Duration::from_secs(5 * 60),
            syncer_poll_interval: Duration::from_secs(60),
            noack_poll_interval: Duration::from_secs(1010),
            span_poll_interval: Duration::from_secs(60),
            milestone_poll_interval: Duration::from_secs(30),
            no_ack_wait_time: Duration::from_secs(1800),
            main_chain_gas_limit: 5_000_000,
            main_chain_max_gas_price: 400_000_000_000,
            iris_chain_id: "iris-15001".to_string(),
            zena_chain_id: "15001".to_string(),
            forks: ForkHeights::default(),
            root_chain_confirmations: None,
            root_chain_start_block: 0,
            max_log_range: 1000,
            bridge_db: PathBuf::from("bridge/storage"),
            queue_workers: 4,
            priv_validator_key: PathBuf::from("config/priv_validator_key.hex"),
            proposer_policy: ProposerPolicyKind::default(),
        }
    }
}

impl BridgeConfig {
    /// Interval of the sidechain listener: the faster of the syncer and
    /// checkpoint intervals.
    pub fn self_chain_poll_interval(&self) -> Duration {
        self.syncer_poll_interval.min(self.checkpoint_poll_interval)
    }

    /// Resolves relative paths against `home`.
    pub fn with_home(mut self, home: &std::path::Path) -> Self {
        if self.bridge_db.is_relative() {
            self.bridge_db = home.join(&self.bridge_db);
        }
        if self.priv_validator_key.is_relative() {
            self.priv_validator_key = home.join(&self.priv_validator_key);
        }
        self
    }
}

impl BridgeConfig {
    /// Root chain JSON-RPC endpoint.
    pub fn eth_rpc(&self) -> Result<Url, InvalidEndpoint> {
        parse_endpoint("eth_rpc_url", &self.eth_rpc_url)
    }

    /// Child chain JSON-RPC endpoint.
    pub fn zena_rpc(&self) -> Result<Url, InvalidEndpoint> {
        parse_endpoint("zena_rpc_url", &self.zena_rpc_url)
    }

    /// Tendermint JSON-RPC endpoint of the sidechain node.
    pub fn tendermint_rpc(&self) -> Result<Url, InvalidEndpoint> {
        parse_endpoint("tendermint_rpc_url", &self.tendermint_rpc_url)
    }

    /// REST endpoint of the sidechain node.
    pub fn iris_rest(&self) -> Result<Url, InvalidEndpoint> {
        parse_endpoint("iris_rest_server", &self.iris_rest_server)
    }

    /// Checks that every endpoint parses.
    pub fn validate(&self) -> Result<(), InvalidEndpoint> {
        self.eth_rpc()?;
        self.zena_rpc()?;
        self.tendermint_rpc()?;
        self.iris_rest()?;
        Ok(())
    }
}

/// (De)serializes a [`Duration`] as a string like `500ms`, `30s`, `5m` or `1h`.
///
/// Bare integers are read as seconds.
pub mod duration {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use std::time::Duration;

    /// Parses a duration string.
    pub fn parse(raw: &str) -> Result<Duration, String> {
        let raw = raw.trim();
        let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
        let (digits, unit) = raw.split_at(split);
        let value: u64 = digits.parse().map_err(|_| format!("invalid duration `{raw}`"))?;
        match unit.trim() {
            "ms" => Ok(Duration::from_millis(value)),
            "" | "s" => Ok(Duration::from_secs(value)),
            "m" => Ok(Duration::from_secs(value * 60)),
            "h" => Ok(Duration::from_secs(value * 3600)),
            other => Err(format!("unknown duration unit `{other}` in `{raw}`")),
        }
    }

    /// Formats a duration in the largest unit that represents it exactly.
    pub fn format(duration: &Duration) -> String {
        let millis = duration.as_millis();
        if millis % 1000 != 0 {
            format!("{millis}ms")
        } else {
            let secs = duration.as_secs();
            if secs != 0 && secs % 3600 == 0 {
                format!("{}h", secs / 3600)
            } else if secs != 0 && secs % 60 == 0 {
                format!("{}m", secs / 60)
            } else {
                format!("{secs}s")
            }
        }
    }

    /// Serializes a duration.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(duration))
    }

    /// Deserializes a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse(&text).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("500ms", Duration::from_millis(500))]
    #[case("30s", Duration::from_secs(30))]
    #[case("1010s", Duration::from_secs(1010))]
    #[case("5m", Duration::from_secs(300))]
    #[case("1h", Duration::from_secs(3600))]
    #[case("42", Duration::from_secs(42))]
    fn test_parse_duration(#[case] raw: &str, #[case] expected: Duration) {
        assert_eq!(duration::parse(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("5d")]
    #[case("ms")]
    fn test_parse_duration_rejects(#[case] raw: &str) {
        assert!(duration::parse(raw).is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(duration::format(&Duration::from_secs(300)), "5m");
        assert_eq!(duration::format(&Duration::from_secs(1010)), "1010s");
        assert_eq!(duration::format(&Duration::from_millis(1500)), "1500ms");
        assert_eq!(duration::format(&Duration::ZERO), "0s");
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.checkpoint_poll_interval, Duration::from_secs(300));
        assert_eq!(config.noack_poll_interval, Duration::from_secs(1010));
        assert_eq!(config.self_chain_poll_interval(), Duration::from_secs(60));
        assert_eq!(config.proposer_policy, ProposerPolicyKind::Ledger);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BridgeConfig = serde_json::from_str(
            r#"{"syncer_poll_interval":"10s","proposer_policy":"round-robin","forks":{"danelaw_height":7}}"#,
        )
        .unwrap();
        assert_eq!(config.syncer_poll_interval, Duration::from_secs(10));
        assert_eq!(config.proposer_policy, ProposerPolicyKind::RoundRobin);
        assert_eq!(config.forks.danelaw_height, 7);
        assert_eq!(config.forks.aalborg_height, 0);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_default_endpoints_parse() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.eth_rpc().unwrap().port(), Some(9545));
        assert_eq!(config.iris_rest().unwrap().as_str(), "http://0.0.0.0:1317/");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = BridgeConfig { zena_rpc_url: "not a url".into(), ..Default::default() };
        let err = config.validate().unwrap_err();
        assert_eq!(err.name, "zena_rpc_url");
        assert_eq!(err.value, "not a url");
        assert!(config.eth_rpc().is_ok());
    }

    #[test]
    fn test_with_home() {
        let config = BridgeConfig::default().with_home(std::path::Path::new("/var/iris"));
        assert_eq!(config.bridge_db, PathBuf::from("/var/iris/bridge/storage"));
    }
}
