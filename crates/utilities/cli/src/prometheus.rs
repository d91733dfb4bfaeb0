//! Utilities for spinning up a prometheus metrics server.

use crate::PrometheusError;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr};
use tracing::info;

/// Installs the global Prometheus recorder and serves it on `addr:port`.
pub fn init_prometheus_server(addr: IpAddr, port: u16) -> Result<(), PrometheusError> {
    let listen = SocketAddr::from((addr, port));
    PrometheusBuilder::new().with_http_listener(listen).install()?;

    info!(target: "prometheus", "Serving metrics at: http://{}", listen);
    Ok(())
}
