//! Classification of what a transport observed.
//!
//! The checks run in a fixed order:
//! 1. no response head at all is `NoServerResponse`, whatever the error says;
//! 2. an error next to a response head is `NetworkError` with the partial
//!    status and headers attached;
//! 3. otherwise the body is decoded, and a decode failure is also a
//!    `NetworkError`.
//!
//! HTTP error statuses (4xx/5xx) are not errors here. They come back as
//! `HttpResult` like any other response.

use bytes::Bytes;
use serde_json::Value;

use crate::codec;
use crate::error::{ClientError, NetworkCause};
use crate::http::{Exchange, RawResponse};
use crate::types::Response;

/// The terminal classified result of one request.
#[derive(Debug, Clone)]
pub enum ResponseOutcome<B = Value> {
    HttpResult(Response<B>),
    NetworkError(ClientError),
    NoServerResponse { url: String, reason: Option<String> },
}

impl<B> ResponseOutcome<B> {
    /// Status code of the outcome; the synthetic 504 for a missing response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ResponseOutcome::HttpResult(response) => Some(response.status),
            ResponseOutcome::NetworkError(err) => err.status(),
            ResponseOutcome::NoServerResponse { .. } => Some(504),
        }
    }

    pub fn into_result(self) -> Result<Response<B>, ClientError> {
        match self {
            ResponseOutcome::HttpResult(response) => Ok(response),
            ResponseOutcome::NetworkError(err) => Err(err),
            ResponseOutcome::NoServerResponse { url, reason } => {
                Err(ClientError::NoServerResponse { url, reason })
            }
        }
    }
}

/// Classify an exchange and decode its body as JSON.
pub fn parse(url: &str, exchange: Exchange) -> ResponseOutcome<Value> {
    classify(url, exchange, |response| {
        codec::decode(&response.body).map_err(|err| ClientError::Network {
            cause: NetworkCause::Decode(err.to_string()),
            status: Some(response.status),
            headers: Some(response.headers.clone()),
        })
    })
}

/// Classify an exchange and keep its body as raw bytes.
pub fn parse_download(url: &str, exchange: Exchange) -> ResponseOutcome<Bytes> {
    classify(url, exchange, |response| Ok(response.body.clone()))
}

fn classify<B>(
    url: &str,
    exchange: Exchange,
    decode: impl FnOnce(&RawResponse) -> Result<B, ClientError>,
) -> ResponseOutcome<B> {
    let Some(response) = exchange.response else {
        return ResponseOutcome::NoServerResponse {
            url: url.to_string(),
            reason: exchange.error.map(|e| e.to_string()),
        };
    };

    if let Some(error) = exchange.error {
        return ResponseOutcome::NetworkError(ClientError::Network {
            cause: NetworkCause::Transport(error),
            status: Some(response.status),
            headers: Some(response.headers),
        });
    }

    match decode(&response) {
        Ok(body) => ResponseOutcome::HttpResult(Response {
            status: response.status,
            headers: response.headers,
            body,
        }),
        Err(err) => ResponseOutcome::NetworkError(err),
    }
}
