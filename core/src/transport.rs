//! The HTTP transport seam.
//!
//! # Design
//! `Transport` performs exactly one round-trip: it puts a `RequestSpec` on the
//! wire and returns once the response stream has ended. It never looks at the
//! status code; classification and redirects belong to the executor. Any
//! failure before the stream ends is a `TransportError`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;

use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, RequestSpec, ResponseEnvelope};

/// Executes a single HTTP round-trip and buffers the whole response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` to `url` (origin plus `request.path`).
    ///
    /// Returns `ApiError::Transport` for connection-level failures and
    /// `ApiError::InvalidRequest` when the request cannot be encoded.
    async fn send(&self, url: &str, request: &RequestSpec) -> Result<ResponseEnvelope, ApiError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose client never follows redirects on its own;
    /// 303 handling belongs to the executor.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("dataapi-core/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Reuse an already configured `reqwest::Client`. It should not follow
    /// redirects itself.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, request: &RequestSpec) -> Result<ResponseEnvelope, ApiError> {
        let mut builder = self
            .client
            .request(to_reqwest(request.method), url)
            .headers(header_map(request)?);
        if let Some(body) = request.wire_body() {
            builder = builder.body(body.to_string());
        }

        let mut response = builder.send().await.map_err(TransportError::from)?;
        let mut envelope = ResponseEnvelope::new(response.status().as_u16());
        while let Some(chunk) = response.chunk().await.map_err(TransportError::from)? {
            trace!(len = chunk.len(), "received body chunk");
            envelope.push_chunk(&chunk);
        }
        Ok(envelope)
    }
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn header_map(request: &RequestSpec) -> Result<HeaderMap, ApiError> {
    let mut map = HeaderMap::new();
    for (name, value) in request.headers() {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| ApiError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| ApiError::InvalidRequest(format!("header {name} value: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
