//! Prometheus exporter flags.

use crate::{CliResult, init_prometheus_server};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr};

/// Flags of the Prometheus metrics exporter.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct MetricsArgs {
    /// Serves Prometheus metrics.
    #[arg(long = "metrics.enabled", global = true, env = "IRIS_METRICS_ENABLED")]
    pub enabled: bool,
    /// Address the metrics server listens on.
    #[arg(long = "metrics.addr", global = true, default_value = "0.0.0.0", env = "IRIS_METRICS_ADDR")]
    pub addr: IpAddr,
    /// Port the metrics server listens on.
    #[arg(long = "metrics.port", global = true, default_value_t = 2112, env = "IRIS_METRICS_PORT")]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 2112 }
    }
}

impl MetricsArgs {
    /// Starts the exporter when metrics are enabled.
    pub fn init_metrics(&self) -> CliResult<()> {
        if self.enabled {
            init_prometheus_server(self.addr, self.port)?;
        }
        Ok(())
    }
}
