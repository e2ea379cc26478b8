//! The public client facade.
//!
//! # Design
//! `Client` is a cheap handle (`Arc` inside) holding the immutable
//! configuration, the transport, and one observer set per request kind. Each
//! call snapshots the relevant observer set, builds its descriptor, encodes
//! its body, and runs a fresh `Session`; nothing mutable is shared between
//! in-flight calls. Replacing an observer set only affects calls issued
//! afterwards.
//!
//! A verb issues its request when it is called: it copies its arguments and
//! reads the observer set synchronously, then returns a `'static` future
//! resolving to a `Result`. `spawn` runs such a future on the tokio runtime
//! and delivers the result to a completion closure, returning immediately
//! with a cancellable `RequestHandle`.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::codec;
use crate::config::{ClientBuilder, ClientConfig};
use crate::error::ClientError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::multipart::{self, FileField, MultipartForm};
use crate::observer::Observers;
use crate::parser;
use crate::request::{resolve_url, Payload, RequestFactory};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::Response;

static SHARED: OnceLock<Client> = OnceLock::new();

/// Observer sets for the three request kinds.
#[derive(Debug, Clone, Default)]
pub struct ClientObservers {
    pub fetch: Observers,
    pub upload: Observers,
    pub download: Observers,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    observers: RwLock<ClientObservers>,
}

/// Async HTTP client with JSON verbs, multipart upload and download.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// A client with default configuration and the reqwest transport.
    pub fn new() -> Result<Self, ClientError> {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        ClientBuilder::new().base_url(base_url).build()
    }

    /// A process-wide default client, built on first use.
    ///
    /// Prefer constructing and passing a `Client` explicitly; this exists for
    /// callers that genuinely need one global instance.
    pub fn shared() -> Result<Self, ClientError> {
        if let Some(client) = SHARED.get() {
            return Ok(client.clone());
        }
        let client = Client::new()?;
        Ok(SHARED.get_or_init(|| client).clone())
    }

    pub(crate) fn from_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        observers: ClientObservers,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                observers: RwLock::new(observers),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn set_fetch_observers(&self, observers: Observers) {
        self.inner.observers.write().fetch = observers;
    }

    pub fn set_upload_observers(&self, observers: Observers) {
        self.inner.observers.write().upload = observers;
    }

    pub fn set_download_observers(&self, observers: Observers) {
        self.inner.observers.write().download = observers;
    }

    pub fn get(
        &self,
        path: &str,
        headers: Option<&Headers>,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static {
        self.dispatch_fetch(HttpMethod::Get, path, headers, Ok(None))
    }

    pub fn post<B>(
        &self,
        path: &str,
        headers: Option<&Headers>,
        body: &B,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static
    where
        B: Serialize + ?Sized,
    {
        self.fetch(HttpMethod::Post, path, headers, Some(body))
    }

    pub fn put<B>(
        &self,
        path: &str,
        headers: Option<&Headers>,
        body: &B,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static
    where
        B: Serialize + ?Sized,
    {
        self.fetch(HttpMethod::Put, path, headers, Some(body))
    }

    pub fn patch<B>(
        &self,
        path: &str,
        headers: Option<&Headers>,
        body: &B,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static
    where
        B: Serialize + ?Sized,
    {
        self.fetch(HttpMethod::Patch, path, headers, Some(body))
    }

    pub fn delete(
        &self,
        path: &str,
        headers: Option<&Headers>,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static {
        self.dispatch_fetch(HttpMethod::Delete, path, headers, Ok(None))
    }

    /// Issue any verb with an optional structured body.
    ///
    /// The body is form-encoded when the merged `Content-Type` is
    /// `application/x-www-form-urlencoded`, and JSON-encoded otherwise.
    ///
    /// The request is issued when this is called: arguments are copied and
    /// the fetch observer set is read right away, so the returned future
    /// borrows nothing and later observer replacements do not affect it.
    pub fn fetch<B>(
        &self,
        method: HttpMethod,
        path: &str,
        headers: Option<&Headers>,
        body: Option<&B>,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static
    where
        B: Serialize + ?Sized,
    {
        let body = body.map(codec::to_value).transpose();
        self.dispatch_fetch(method, path, headers, body)
    }

    /// Upload one file as multipart/form-data, preceded by `fields`.
    pub fn upload(
        &self,
        path: &str,
        method: HttpMethod,
        headers: Option<&Headers>,
        fields: Option<&Value>,
        file_field: &str,
        file_path: impl AsRef<Path>,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static {
        let file = FileField::new(file_field, file_path.as_ref());
        self.dispatch_upload(method, path, headers, fields, vec![file])
    }

    /// Upload any number of files as multipart/form-data.
    pub fn upload_files(
        &self,
        path: &str,
        method: HttpMethod,
        headers: Option<&Headers>,
        fields: Option<&Value>,
        files: &[FileField],
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static {
        self.dispatch_upload(method, path, headers, fields, files.to_vec())
    }

    /// GET `path` and return the whole body as bytes.
    pub fn download(
        &self,
        path: &str,
        headers: Option<&Headers>,
    ) -> impl Future<Output = Result<Response<Bytes>, ClientError>> + 'static {
        let client = self.clone();
        let observers = self.inner.observers.read().download.clone();
        let path = path.to_string();
        let headers = headers.cloned();
        async move {
            let result = client.run_download(&observers, &path, headers.as_ref()).await;
            observers.report(result)
        }
    }

    /// GET an absolute URL and return its raw body, bypassing the base URL,
    /// base headers, observers and decoding.
    pub async fn fetch_raw(&self, url: &str) -> Result<Bytes, ClientError> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: resolve_url(None, url)?,
            headers: Headers::new(),
            body: None,
        };
        let exchange = self.inner.transport.send(request, None).await;
        parser::parse_download(url, exchange)
            .into_result()
            .map(|response| response.body)
    }

    /// Run `call` on the tokio runtime and hand its result to `completion`.
    ///
    /// Returns at once. `completion` runs exactly once, on a runtime worker,
    /// with `ClientError::Cancelled` if the handle is cancelled first.
    ///
    /// `call` runs before `spawn` returns. Pass the verb's future straight
    /// through (`|c| c.get("/users", None)`) so the request is issued, and its
    /// observers fixed, at that point rather than when the task is first
    /// polled.
    ///
    /// # Panics
    /// Panics when called outside of a tokio runtime.
    pub fn spawn<T, Fut, C, F>(&self, call: C, completion: F) -> RequestHandle
    where
        C: FnOnce(Client) -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
        T: Send + 'static,
        F: FnOnce(Result<T, ClientError>) + Send + 'static,
    {
        let id = RequestId::next();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let cancel_tx = Arc::new(Mutex::new(Some(cancel_tx)));
        let pending = cancel_tx.clone();
        let future = call(self.clone());

        let task = tokio::spawn(async move {
            let result = tokio::select! {
                result = future => result,
                Ok(()) = cancel_rx => {
                    tracing::debug!(target: "benji::client", id = id.0, "request cancelled");
                    Err(ClientError::Cancelled)
                }
            };
            pending.lock().take();
            completion(result);
        });

        RequestHandle { id, cancel_tx, task }
    }

    fn dispatch_fetch(
        &self,
        method: HttpMethod,
        path: &str,
        headers: Option<&Headers>,
        body: Result<Option<Value>, ClientError>,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static {
        let client = self.clone();
        let observers = self.inner.observers.read().fetch.clone();
        let path = path.to_string();
        let headers = headers.cloned();
        async move {
            let result = client
                .run_fetch(&observers, method, &path, headers.as_ref(), body)
                .await;
            observers.report(result)
        }
    }

    fn dispatch_upload(
        &self,
        method: HttpMethod,
        path: &str,
        headers: Option<&Headers>,
        fields: Option<&Value>,
        files: Vec<FileField>,
    ) -> impl Future<Output = Result<Response, ClientError>> + 'static {
        let client = self.clone();
        let observers = self.inner.observers.read().upload.clone();
        let path = path.to_string();
        let headers = headers.cloned();
        let fields = fields.cloned();
        async move {
            let result = client
                .run_upload(&observers, method, &path, headers.as_ref(), fields.as_ref(), &files)
                .await;
            observers.report(result)
        }
    }

    fn factory<'a>(&'a self, observers: &'a Observers) -> RequestFactory<'a> {
        let config = &self.inner.config;
        RequestFactory::new(config.base_url.as_deref(), Some(&config.base_headers)).with_observers(observers)
    }

    async fn run_fetch(
        &self,
        observers: &Observers,
        method: HttpMethod,
        path: &str,
        headers: Option<&Headers>,
        body: Result<Option<Value>, ClientError>,
    ) -> Result<Response, ClientError> {
        let payload = match &body {
            Ok(None) => Payload::Empty,
            _ => Payload::Structured,
        };
        let mut request = self.factory(observers).build(method, path, headers, payload)?;
        if let Some(value) = body? {
            let media_type = request.headers.media_type();
            request.body = Some(codec::encode_body(&value, media_type.as_deref())?);
        }
        Session::new(self.inner.transport.clone(), observers.clone())
            .execute(request)
            .await
            .into_result()
    }

    async fn run_upload(
        &self,
        observers: &Observers,
        method: HttpMethod,
        path: &str,
        headers: Option<&Headers>,
        fields: Option<&Value>,
        files: &[FileField],
    ) -> Result<Response, ClientError> {
        if !matches!(method, HttpMethod::Post | HttpMethod::Put) {
            return Err(ClientError::UnsupportedOperation(format!(
                "uploading can only be executed with a POST or PUT request, not {method}"
            )));
        }
        let form = MultipartForm::new();
        let request = self.factory(observers).build(
            method,
            path,
            headers,
            Payload::Multipart {
                boundary: form.boundary(),
            },
        )?;
        let form = multipart::encode_with(form, fields, files).await?;
        Session::new(self.inner.transport.clone(), observers.clone())
            .execute_upload(request, form.build())
            .await
            .into_result()
    }

    async fn run_download(
        &self,
        observers: &Observers,
        path: &str,
        headers: Option<&Headers>,
    ) -> Result<Response<Bytes>, ClientError> {
        let request = self
            .factory(observers)
            .build(HttpMethod::Get, path, headers, Payload::Empty)?;
        Session::new(self.inner.transport.clone(), observers.clone())
            .execute_download(request)
            .await
            .into_result()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("observers", &*self.inner.observers.read())
            .finish()
    }
}

/// Identifier of a spawned request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a request started with `Client::spawn`.
///
/// Dropping the handle does not cancel the request.
pub struct RequestHandle {
    id: RequestId,
    cancel_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    task: JoinHandle<()>,
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Cancel the request. Returns `false` if it already completed or was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        match self.cancel_tx.lock().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Whether the completion has not run yet.
    pub fn is_pending(&self) -> bool {
        !self.task.is_finished()
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}
