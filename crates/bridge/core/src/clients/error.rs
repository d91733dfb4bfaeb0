use alloy_transport::{RpcError, TransportError};
use thiserror::Error;

/// An error talking to one of the chains.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,
    /// HTTP transport failure of a REST request.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// JSON-RPC failure.
    #[error(transparent)]
    Rpc(#[from] TransportError),
    /// The REST server answered with an error status.
    #[error("{path} returned status {status}: {body}")]
    Status {
        /// Requested path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// A response could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// A JSON payload could not be decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Contract return data could not be decoded.
    #[error(transparent)]
    Abi(#[from] alloy_sol_types::Error),
    /// A queried entity does not exist.
    #[error("{0} not found")]
    NotFound(String),
}

impl ClientError {
    /// Returns whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Rpc(RpcError::Transport(_)) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
