//! Global arguments for the CLI.

use super::OverrideArgs;
use anyhow::Context;
use clap::Parser;
use iris_bridge_core::BridgeConfig;
use iris_cli::{LogArgs, MetricsArgs};
use std::path::PathBuf;
use tracing::info;

/// Name of the configuration file under `<home>/config`.
const CONFIG_FILE_NAME: &str = "iris-config.toml";

fn default_home() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".irisd")
}

/// Global arguments for the CLI.
#[derive(Parser, Clone, Debug)]
pub(crate) struct GlobalArgs {
    /// Logging arguments.
    #[command(flatten)]
    pub(crate) log_args: LogArgs,
    /// Prometheus CLI arguments.
    #[command(flatten)]
    pub(crate) metrics: MetricsArgs,
    /// Home directory of the bridge. Relative paths of the configuration are
    /// resolved against it.
    #[arg(long, global = true, default_value_os_t = default_home(), env = "IRIS_HOME")]
    pub(crate) home: PathBuf,
    /// Configuration file. Defaults to `<home>/config/iris-config.toml`.
    #[arg(long = "iris-config", global = true, env = "IRIS_CONFIG")]
    pub(crate) iris_config: Option<PathBuf>,
    /// Overrides of configuration values.
    #[command(flatten)]
    pub(crate) override_args: OverrideArgs,
}

impl GlobalArgs {
    /// Path of the configuration file.
    pub(crate) fn config_path(&self) -> PathBuf {
        self.iris_config.clone().unwrap_or_else(|| self.home.join("config").join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration file, falling back to the defaults when it
    /// does not exist, then applies the overrides.
    pub(crate) fn load_config(&self) -> anyhow::Result<BridgeConfig> {
        let path = self.config_path();
        let config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            info!(target: "bridge::cli", path = %path.display(), "No config file, using defaults");
            BridgeConfig::default()
        };
        let config = self.override_args.apply(config).with_home(&self.home);
        config.validate().with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_bridge_core::ProposerPolicyKind;
    use std::time::Duration;

    fn args(argv: &[&str]) -> GlobalArgs {
        GlobalArgs::try_parse_from(std::iter::once("iris-bridge").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let home = tempfile::tempdir().unwrap();
        let args = args(&["--home", home.path().to_str().unwrap()]);

        let config = args.load_config().unwrap();
        assert_eq!(config.syncer_poll_interval, Duration::from_secs(60));
        assert_eq!(config.bridge_db, home.path().join("bridge/storage"));
        assert_eq!(config.priv_validator_key, home.path().join("config/priv_validator_key.hex"));
    }

    #[test]
    fn test_config_file_and_overrides() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join("config")).unwrap();
        std::fs::write(
            home.path().join("config").join(CONFIG_FILE_NAME),
            r#"
eth_rpc_url = "http://eth.internal:8545"
syncer_poll_interval = "30s"
no_ack_wait_time = 900
queue_workers = 8

[forks]
aalborg_height = 100
"#,
        )
        .unwrap();

        let args = args(&[
            "--home",
            home.path().to_str().unwrap(),
            "--queue-workers",
            "2",
            "--proposer-policy",
            "round-robin",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.eth_rpc().unwrap().as_str(), "http://eth.internal:8545/");
        assert_eq!(config.syncer_poll_interval, Duration::from_secs(30));
        assert_eq!(config.no_ack_wait_time, Duration::from_secs(900));
        assert_eq!(config.forks.aalborg_height, 100);
        assert_eq!(config.queue_workers, 2);
        assert_eq!(config.proposer_policy, ProposerPolicyKind::RoundRobin);
    }

    #[test]
    fn test_invalid_endpoint_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let path = home.path().join("bridge.toml");
        std::fs::write(&path, "iris_rest_server = \"not a url\"").unwrap();

        let args = args(&["--iris-config", path.to_str().unwrap()]);
        let err = args.load_config().unwrap_err();
        assert!(err.root_cause().to_string().contains("relative URL without a base"), "{err:#}");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let path = home.path().join("bridge.toml");
        std::fs::write(&path, "syncer_poll_interval = \"soon\"").unwrap();

        let args = args(&["--iris-config", path.to_str().unwrap()]);
        assert!(args.load_config().is_err());
    }
}
