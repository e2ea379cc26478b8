//! Error types for the benji client.
//!
//! # Design
//! Every failure a caller can observe is one `ClientError` variant with a
//! structured payload. `status()` and `domain()` reproduce the synthetic
//! status/domain pairs callers already key on (412 "Request", 504 "Server",
//! 409 "Preparation"), so no information is lost by moving away from a
//! generic code-and-domain bag.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::http::{Headers, TransportError};

/// Why a request ended as a network error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCause {
    /// The transport reported a failure after the response head arrived.
    Transport(TransportError),
    /// The response body could not be decoded.
    Decode(String),
}

impl fmt::Display for NetworkCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkCause::Transport(err) => write!(f, "{err}"),
            NetworkCause::Decode(msg) => write!(f, "response body could not be decoded: {msg}"),
        }
    }
}

/// Errors delivered through a request's completion.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The resolved URL could not be turned into a valid absolute URL.
    #[error("url {url} could not be encoded: {reason}")]
    Encoding { url: String, reason: String },

    /// A header name or value is not valid HTTP.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The request body could not be encoded, or a body could not be decoded
    /// outside of a response.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// An upload attachment could not be read.
    #[error("could not prepare upload data from {}: {reason}", path.display())]
    FilePreparation { path: PathBuf, reason: String },

    /// The transport failed after a response arrived, or the body did not decode.
    #[error("network error: {cause}")]
    Network {
        cause: NetworkCause,
        status: Option<u16>,
        headers: Option<Headers>,
    },

    /// No HTTP response was received at all.
    #[error("no server response from {url}")]
    NoServerResponse { url: String, reason: Option<String> },

    /// The requested operation is not allowed, e.g. uploading with GET.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The client could not be constructed from its configuration.
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// The request was cancelled through its handle.
    #[error("request was cancelled")]
    Cancelled,
}

impl ClientError {
    /// Status code associated with this error, real or synthetic.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Encoding { .. }
            | ClientError::InvalidHeader { .. }
            | ClientError::UnsupportedOperation(_) => Some(412),
            ClientError::FilePreparation { .. } => Some(409),
            ClientError::NoServerResponse { .. } => Some(504),
            ClientError::Network { status, .. } => *status,
            ClientError::Serialization(_) | ClientError::Configuration(_) | ClientError::Cancelled => {
                None
            }
        }
    }

    /// Coarse label for the layer that produced the error.
    pub fn domain(&self) -> &'static str {
        match self {
            ClientError::Encoding { .. }
            | ClientError::InvalidHeader { .. }
            | ClientError::UnsupportedOperation(_) => "Request",
            ClientError::Serialization(_) => "Serialization",
            ClientError::FilePreparation { .. } => "Preparation",
            ClientError::Network { .. } => "Network",
            ClientError::NoServerResponse { .. } => "Server",
            ClientError::Configuration(_) => "Configuration",
            ClientError::Cancelled => "Cancelled",
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}
