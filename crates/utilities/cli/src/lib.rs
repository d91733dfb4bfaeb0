//! Utilities shared by the iris bridge binaries: log and metrics flags, the
//! tracing subscriber, the Prometheus exporter and CLI styling.

pub mod backtrace;

mod error;
pub use error::{CliError, CliResult, PrometheusError};

mod log;
pub use log::{LogArgs, LogConfig, LogFormat};

mod metrics_args;
pub use metrics_args::MetricsArgs;

mod prometheus;
pub use prometheus::init_prometheus_server;

mod styles;
pub use styles::cli_styles;
