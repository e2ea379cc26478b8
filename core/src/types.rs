//! Values handed back to callers and observers.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::http::{Headers, HttpMethod};

/// A classified HTTP response. `B` is the decoded JSON value for plain
/// requests and uploads, or the raw bytes for downloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<B = Value> {
    pub status: u16,
    pub headers: Headers,
    pub body: B,
}

impl<B> Response<B> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One progress notification for an upload or download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub bytes_transferred: u64,
    /// Zero when the total size is unknown.
    pub bytes_expected: u64,
}

impl ProgressSample {
    pub fn new(bytes_transferred: u64, bytes_expected: u64) -> Self {
        Self {
            bytes_transferred,
            bytes_expected,
        }
    }

    /// Fraction in `0.0..=1.0`, or `None` when the expected size is unknown.
    pub fn fraction(&self) -> Option<f32> {
        if self.bytes_expected == 0 {
            return None;
        }
        Some((self.bytes_transferred as f64 / self.bytes_expected as f64).min(1.0) as f32)
    }

    /// Whole percentage, truncated the same way as `fraction`.
    pub fn percentage(&self) -> Option<u8> {
        self.fraction().map(|f| (f * 100.0) as u8)
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_expected > 0 && self.bytes_transferred >= self.bytes_expected
    }
}

/// The record handed to a `LoggingObserver` for every built request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestLog {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
}

/// Terminal notification for a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFinished {
    Upload,
    Download(Bytes),
}
