//! Observer hooks for request logs, errors and transfer progress.
//!
//! # Design
//! Each capability is its own trait and each slot in `Observers` is
//! independently optional. A caller registers only what it needs; a missing
//! observer simply means the notification is skipped. The client keeps one
//! `Observers` set per request kind (fetch, upload, download) and snapshots
//! it when a request is issued.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::ClientError;
use crate::types::{ProgressSample, RequestLog, TransferFinished};

/// Receives one record per built request.
///
/// Logging is best-effort. Implementations should not panic; if one does,
/// the panic is caught, reported through `tracing`, and the request goes on.
pub trait LoggingObserver: Send + Sync {
    fn log_request(&self, log: &RequestLog);
}

/// Receives every error delivered to a caller.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, error: &ClientError);
}

/// Receives progress for uploads and downloads.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, sample: &ProgressSample);

    /// Called once after a transfer succeeded, after its last progress sample.
    fn on_finished(&self, _finished: &TransferFinished) {}
}

/// The observers attached to one kind of request.
#[derive(Clone, Default)]
pub struct Observers {
    pub logging: Option<Arc<dyn LoggingObserver>>,
    pub error: Option<Arc<dyn ErrorObserver>>,
    pub progress: Option<Arc<dyn ProgressObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logging(mut self, observer: Arc<dyn LoggingObserver>) -> Self {
        self.logging = Some(observer);
        self
    }

    pub fn with_error(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.error = Some(observer);
        self
    }

    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    pub(crate) fn log_request(&self, log: &RequestLog) {
        if let Some(observer) = &self.logging {
            let logged = panic::catch_unwind(AssertUnwindSafe(|| observer.log_request(log)));
            if logged.is_err() {
                tracing::warn!(target: "benji::request", url = %log.url, "logging observer panicked");
            }
        }
    }

    pub(crate) fn error(&self, error: &ClientError) {
        if let Some(observer) = &self.error {
            observer.on_error(error);
        }
    }

    pub(crate) fn progress(&self, sample: &ProgressSample) {
        if let Some(observer) = &self.progress {
            observer.on_progress(sample);
        }
    }

    pub(crate) fn finished(&self, finished: &TransferFinished) {
        if let Some(observer) = &self.progress {
            observer.on_finished(finished);
        }
    }

    /// Forward an error result to the error observer and hand it back.
    pub(crate) fn report<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(err) = &result {
            self.error(err);
        }
        result
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("logging", &self.logging.is_some())
            .field("error", &self.error.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
