//! Request descriptor construction.
//!
//! # Design
//! `RequestFactory` turns a base URL, a path and two header layers into an
//! `HttpRequest`. The URL is the verbatim concatenation of base and path,
//! percent-encoded with the query-safe character set and then checked to be
//! absolute. Headers start from the client-wide set and the caller's set is
//! laid over it, so the caller wins on any key collision.
//!
//! Once a descriptor exists the factory emits exactly one request log. Body
//! encoding happens afterwards, so the log is emitted even when encoding the
//! body later fails.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::codec::JSON;
use crate::error::ClientError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::observer::Observers;
use crate::types::RequestLog;

/// Characters escaped when encoding a URL: everything outside the
/// query-allowed set, including `%` itself.
const QUERY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// What kind of body the request will carry. Drives content-type defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Empty,
    /// A structured value encoded by the codec.
    Structured,
    /// A multipart/form-data body delimited by `boundary`.
    Multipart { boundary: &'a str },
}

/// Builds `HttpRequest` values for one client configuration.
#[derive(Debug, Clone, Copy)]
pub struct RequestFactory<'a> {
    base_url: Option<&'a str>,
    client_headers: Option<&'a Headers>,
    observers: Option<&'a Observers>,
}

impl<'a> RequestFactory<'a> {
    pub fn new(base_url: Option<&'a str>, client_headers: Option<&'a Headers>) -> Self {
        Self {
            base_url,
            client_headers,
            observers: None,
        }
    }

    /// Send request logs to the logging observer of `observers`.
    pub fn with_observers(mut self, observers: &'a Observers) -> Self {
        self.observers = Some(observers);
        self
    }

    pub fn build(
        &self,
        method: HttpMethod,
        path: &str,
        caller_headers: Option<&Headers>,
        payload: Payload<'_>,
    ) -> Result<HttpRequest, ClientError> {
        let url = resolve_url(self.base_url, path)?;
        let mut headers = merge_headers(self.client_headers, caller_headers);

        match payload {
            Payload::Empty => {}
            Payload::Structured => {
                headers.insert_default("Content-Type", JSON);
                headers.insert_default("Accept", JSON);
            }
            Payload::Multipart { boundary } => {
                headers.insert(
                    "Content-Type",
                    format!("multipart/form-data; boundary={boundary}"),
                );
                headers.insert("Connection", "Keep-Alive");
            }
        }
        validate_headers(&headers)?;

        tracing::debug!(
            target: "benji::request",
            %method,
            %url,
            headers = headers.len(),
            "built request"
        );
        let request = HttpRequest {
            method,
            url,
            headers,
            body: None,
        };
        if let Some(observers) = self.observers {
            observers.log_request(&RequestLog {
                method: request.method,
                url: request.url.clone(),
                headers: request.headers.clone(),
            });
        }
        Ok(request)
    }
}

/// Concatenate base and path without normalization, percent-encode, and
/// require the result to be an absolute URL.
pub fn resolve_url(base_url: Option<&str>, path: &str) -> Result<String, ClientError> {
    let joined = match base_url {
        Some(base) => format!("{base}{path}"),
        None => path.to_string(),
    };
    let encoded = utf8_percent_encode(&joined, QUERY_ENCODE_SET).to_string();
    match url::Url::parse(&encoded) {
        Ok(_) => Ok(encoded),
        Err(err) => Err(ClientError::Encoding {
            url: joined,
            reason: err.to_string(),
        }),
    }
}

/// Client headers first, caller headers laid over them.
pub fn merge_headers(client: Option<&Headers>, caller: Option<&Headers>) -> Headers {
    let mut merged = client.cloned().unwrap_or_default();
    if let Some(caller) = caller {
        merged.extend_from(caller);
    }
    merged
}

fn validate_headers(headers: &Headers) -> Result<(), ClientError> {
    for (name, value) in headers.iter() {
        http::HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        http::HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
