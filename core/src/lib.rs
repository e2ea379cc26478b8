//! Async HTTP client facade: JSON verbs, multipart upload and
//! progress-tracked download, with pluggable observers.
//!
//! # Overview
//! A call flows through a fixed pipeline:
//! `RequestFactory` (descriptor) → `codec` or `multipart` (body) →
//! `Session` over a `Transport` (execution, progress) → `parser`
//! (classification and decoding). The `Client` facade wires these together
//! and delivers every outcome, success or failure, as a `Result`.
//!
//! # Design
//! - The transport is a trait. `ReqwestTransport` is the default; tests and
//!   hosts can plug in anything that produces an `Exchange`.
//! - Body encoding and header merging are synchronous and happen before the
//!   transport is touched; the transport call is the only suspension point.
//! - Every call gets its own `Session`, so concurrent transfers share no
//!   mutable state.
//! - Observers are split by capability (logging, error, progress) and each
//!   one is optional.
//!
//! ```ignore
//! use benji_core::{Client, Headers};
//!
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .base_header("Authorization", "Bearer token")
//!     .build()?;
//!
//! let user = client.get("/users/1", None).await?;
//! let created = client
//!     .post("/users", None, &serde_json::json!({"name": "Ada"}))
//!     .await?;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod observer;
pub mod parser;
pub mod request;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{Client, ClientObservers, RequestHandle, RequestId};
pub use config::{ClientBuilder, ClientConfig};
pub use error::{ClientError, NetworkCause};
pub use http::{Exchange, Headers, HttpMethod, HttpRequest, RawResponse, TransportError, TransportErrorKind};
pub use multipart::{FileField, MultipartForm, Part};
pub use observer::{ErrorObserver, LoggingObserver, Observers, ProgressObserver};
pub use parser::ResponseOutcome;
pub use request::{Payload, RequestFactory};
pub use session::Session;
pub use transport::{Direction, ProgressReporter, ReqwestTransport, Transport};
pub use types::{ProgressSample, RequestLog, Response, TransferFinished};
