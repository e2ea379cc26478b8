//! Request-scoped execution against a transport.
//!
//! # Design
//! A `Session` is created for every call and dropped when the call ends, so
//! concurrent uploads or downloads never share progress state or observer
//! references. Every progress sample is emitted before the transport reports
//! the response, so the session always returns its outcome after the last
//! one.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::http::HttpRequest;
use crate::observer::Observers;
use crate::parser::{self, ResponseOutcome};
use crate::transport::{Direction, ProgressReporter, Transport};
use crate::types::TransferFinished;

pub struct Session {
    transport: Arc<dyn Transport>,
    observers: Observers,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, observers: Observers) -> Self {
        Self {
            transport,
            observers,
        }
    }

    /// Plain request and response, no progress reporting.
    pub async fn execute(&self, request: HttpRequest) -> ResponseOutcome<Value> {
        let url = request.url.clone();
        let exchange = self.transport.send(request, None).await;
        let outcome = parser::parse(&url, exchange);
        self.trace(&url, &outcome);
        outcome
    }

    /// Send `body` with send-progress reporting.
    pub async fn execute_upload(&self, mut request: HttpRequest, body: Bytes) -> ResponseOutcome<Value> {
        let url = request.url.clone();
        request.body = Some(body);
        let exchange = self
            .transport
            .send(request, Some(self.reporter(Direction::Send)))
            .await;
        let outcome = parser::parse(&url, exchange);
        self.trace(&url, &outcome);
        if let ResponseOutcome::HttpResult(_) = outcome {
            self.observers.finished(&TransferFinished::Upload);
        }
        outcome
    }

    /// Receive the whole body into memory with receive-progress reporting.
    pub async fn execute_download(&self, request: HttpRequest) -> ResponseOutcome<Bytes> {
        let url = request.url.clone();
        let exchange = self
            .transport
            .send(request, Some(self.reporter(Direction::Receive)))
            .await;
        let outcome = parser::parse_download(&url, exchange);
        self.trace(&url, &outcome);
        if let ResponseOutcome::HttpResult(response) = &outcome {
            self.observers
                .finished(&TransferFinished::Download(response.body.clone()));
        }
        outcome
    }

    fn reporter(&self, direction: Direction) -> ProgressReporter {
        let observers = self.observers.clone();
        ProgressReporter::new(direction, move |sample| observers.progress(&sample))
    }

    fn trace<B>(&self, url: &str, outcome: &ResponseOutcome<B>) {
        match outcome {
            ResponseOutcome::HttpResult(response) => {
                tracing::debug!(target: "benji::session", url, status = response.status, "request completed");
            }
            ResponseOutcome::NetworkError(err) => {
                tracing::warn!(target: "benji::session", url, error = %err, "network error");
            }
            ResponseOutcome::NoServerResponse { reason, .. } => {
                tracing::warn!(target: "benji::session", url, reason = reason.as_deref().unwrap_or("none"), "no server response");
            }
        }
    }
}
