//! The transport collaborator and its default reqwest implementation.
//!
//! # Design
//! A `Transport` never fails with `Err`: it reports whatever it observed as
//! an `Exchange` (response head and body, transport error, or both) and the
//! parser decides what that means. This keeps classification in one place
//! and lets tests script any combination of outcomes.
//!
//! Progress is reported through a `ProgressReporter` that accumulates the
//! byte count itself, so every sample a transport produces is non-decreasing
//! no matter how the transport slices its I/O.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::stream::{self, Stream, StreamExt};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{Exchange, Headers, HttpRequest, RawResponse, TransportError};
use crate::types::ProgressSample;

/// Upload bodies are handed to the connection in slices of this size.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Executes descriptors against the network (or anything pretending to be).
pub trait Transport: Send + Sync {
    /// Execute `request`. When `progress` is set, report bytes moving in its
    /// direction.
    fn send(&self, request: HttpRequest, progress: Option<ProgressReporter>) -> BoxFuture<'_, Exchange>;
}

/// Which way the tracked bytes flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

struct ReporterState {
    transferred: AtomicU64,
    expected: AtomicU64,
    callback: Box<dyn Fn(ProgressSample) + Send + Sync>,
}

/// Accumulates transferred bytes for one request and emits samples.
#[derive(Clone)]
pub struct ProgressReporter {
    direction: Direction,
    state: Arc<ReporterState>,
}

impl ProgressReporter {
    pub fn new(direction: Direction, callback: impl Fn(ProgressSample) + Send + Sync + 'static) -> Self {
        Self {
            direction,
            state: Arc::new(ReporterState {
                transferred: AtomicU64::new(0),
                expected: AtomicU64::new(0),
                callback: Box::new(callback),
            }),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Set the total size; zero means unknown.
    pub fn set_expected(&self, expected: u64) {
        self.state.expected.store(expected, Ordering::SeqCst);
    }

    /// Record `bytes` more bytes and emit the resulting sample.
    pub fn advance(&self, bytes: u64) -> ProgressSample {
        let transferred = self.state.transferred.fetch_add(bytes, Ordering::SeqCst) + bytes;
        let sample = ProgressSample::new(transferred, self.state.expected.load(Ordering::SeqCst));
        tracing::trace!(
            target: "benji::transport",
            direction = ?self.direction,
            transferred = sample.bytes_transferred,
            expected = sample.bytes_expected,
            "progress"
        );
        (self.state.callback)(sample);
        sample
    }

    pub fn current(&self) -> ProgressSample {
        ProgressSample::new(
            self.state.transferred.load(Ordering::SeqCst),
            self.state.expected.load(Ordering::SeqCst),
        )
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("direction", &self.direction)
            .field("current", &self.current())
            .finish()
    }
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn perform(&self, request: HttpRequest, progress: Option<ProgressReporter>) -> Exchange {
        let mut headers = http::HeaderMap::new();
        for (name, value) in request.headers.iter() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        let mut builder = self
            .client
            .request(request.method.to_reqwest(), &request.url)
            .headers(headers);

        let upload = progress.clone().filter(|p| p.direction() == Direction::Send);
        let download = progress.filter(|p| p.direction() == Direction::Receive);

        if let Some(body) = request.body {
            builder = match upload {
                Some(reporter) => {
                    reporter.set_expected(body.len() as u64);
                    builder
                        .header(CONTENT_LENGTH, body.len())
                        .body(reqwest::Body::wrap_stream(chunked(body, reporter)))
                }
                None => builder.body(body),
            };
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(target: "benji::transport", url = %request.url, error = %err, "request failed before a response");
                return Exchange::failed(err.into());
            }
        };

        let status = response.status().as_u16();
        let headers = Headers::from_header_map(response.headers());
        let body = match download {
            Some(reporter) => read_with_progress(response, &reporter).await,
            None => response.bytes().await.map_err(TransportError::from),
        };

        match body {
            Ok(body) => Exchange::completed(RawResponse { status, headers, body }),
            Err(error) => {
                tracing::warn!(target: "benji::transport", url = %request.url, status, %error, "response body failed");
                Exchange {
                    response: Some(RawResponse {
                        status,
                        headers,
                        body: Bytes::new(),
                    }),
                    error: Some(error),
                }
            }
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest, progress: Option<ProgressReporter>) -> BoxFuture<'_, Exchange> {
        Box::pin(self.perform(request, progress))
    }
}

/// Split a materialized body into slices, reporting each one as it is handed
/// to the connection.
fn chunked(
    body: Bytes,
    reporter: ProgressReporter,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + Sync + 'static {
    let chunks: Vec<Bytes> = (0..body.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| body.slice(start..(start + UPLOAD_CHUNK_SIZE).min(body.len())))
        .collect();
    stream::iter(chunks).map(move |chunk| {
        reporter.advance(chunk.len() as u64);
        Ok(chunk)
    })
}

async fn read_with_progress(
    mut response: reqwest::Response,
    reporter: &ProgressReporter,
) -> Result<Bytes, TransportError> {
    reporter.set_expected(response.content_length().unwrap_or(0));
    let mut buf = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        buf.extend_from_slice(&chunk);
        reporter.advance(chunk.len() as u64);
    }
    Ok(buf.freeze())
}
