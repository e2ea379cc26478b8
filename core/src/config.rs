//! Client configuration and builder.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{Client, ClientObservers};
use crate::error::ClientError;
use crate::http::Headers;
use crate::observer::Observers;
use crate::transport::{ReqwestTransport, Transport};

/// Settings fixed for the lifetime of a client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Prepended verbatim to every request path when set.
    pub base_url: Option<String>,
    /// Sent with every request; per-call headers override them.
    pub base_headers: Headers,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_headers: Headers::new(),
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: Some(format!("benji/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `BENJI_BASE_URL`, `BENJI_TIMEOUT_SECS` and
    /// `BENJI_USER_AGENT` when they are set.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("BENJI_BASE_URL") {
            config.base_url = Some(base_url);
        }
        if let Ok(secs) = std::env::var("BENJI_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ClientError::Configuration(format!("BENJI_TIMEOUT_SECS is not a number: {secs}")))?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Ok(user_agent) = std::env::var("BENJI_USER_AGENT") {
            config.user_agent = Some(user_agent);
        }
        Ok(config)
    }
}

/// Fluent construction of a `Client`.
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    observers: ClientObservers,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn base_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.base_headers.insert(name, value);
        self
    }

    pub fn base_headers(mut self, headers: Headers) -> Self {
        self.config.base_headers = headers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Use a custom transport instead of the reqwest default. Timeouts and
    /// user agent are then the transport's business.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn fetch_observers(mut self, observers: Observers) -> Self {
        self.observers.fetch = observers;
        self
    }

    pub fn upload_observers(mut self, observers: Observers) -> Self {
        self.observers.upload = observers;
        self
    }

    pub fn download_observers(mut self, observers: Observers) -> Self {
        self.observers.download = observers;
        self
    }

    pub fn build(self) -> Result<Client, ClientError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };
        Ok(Client::from_parts(self.config, transport, self.observers))
    }
}
