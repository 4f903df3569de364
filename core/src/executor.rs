//! Request execution: one call in, one outcome out.
//!
//! # Design
//! `Executor::execute` sends a `RequestSpec` through the `Transport`, waits
//! for the complete body, then decides:
//!
//! - 400, 401, 403, 404 and 500 end the call with a classified `ApiError`.
//! - 303 carries a JSON body with a `location`; the same request is re-sent
//!   there and the final hop's outcome becomes the call's outcome. Hops are
//!   counted and the call fails with `TooManyRedirects` past
//!   `ClientConfig::max_redirects`.
//! - Every other status is a success carrying the decoded body, or `None`
//!   when the body was empty.
//!
//! The executor does not know any endpoint or payload shape; it hands back
//! raw `serde_json::Value`s and the facade decodes them.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, field, instrument, warn, Span};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{RequestSpec, ResponseEnvelope};
use crate::transport::{ReqwestTransport, Transport};

/// Status the Data API uses to send the client to another path.
pub const REDIRECT_STATUS: u16 = 303;

/// What to do with a fully received response.
#[derive(Debug, PartialEq)]
enum Decision {
    Done(Option<Value>),
    Redirect(String),
}

/// Issues requests against one configured Data API deployment.
#[derive(Clone)]
pub struct Executor {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Executor over the default `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute `request`, following 303 redirects.
    ///
    /// Resolves to the decoded JSON body (`None` for an empty body) or to
    /// exactly one `ApiError`.
    #[instrument(
        name = "dataapi_request",
        skip(self, request),
        fields(
            http.method = %request.method,
            http.path = %request.path,
            http.status_code = field::Empty,
            redirects = field::Empty,
        )
    )]
    pub async fn execute(&self, request: RequestSpec) -> Result<Option<Value>, ApiError> {
        let origin = self.config.origin();
        let mut current = request;
        let mut hops = 0usize;

        loop {
            let url = format!("{origin}{}", current.path);
            let response = match self.transport.send(&url, &current).await {
                Ok(response) => response,
                Err(e) => {
                    error!(url = %url, error = %e, "request failed");
                    return Err(e);
                }
            };
            Span::current().record("http.status_code", response.status);

            match decide(&response)? {
                Decision::Done(body) => return Ok(body),
                Decision::Redirect(location) => {
                    if hops >= self.config.max_redirects {
                        warn!(location = %location, max = self.config.max_redirects, "redirect limit reached");
                        return Err(ApiError::TooManyRedirects {
                            max: self.config.max_redirects,
                            location,
                        });
                    }
                    hops += 1;
                    Span::current().record("redirects", hops);
                    debug!(location = %location, hop = hops, "following redirect");
                    current = current.redirected(&location);
                }
            }
        }
    }
}

fn decide(response: &ResponseEnvelope) -> Result<Decision, ApiError> {
    let status = response.status;
    let parsed = response.json();

    // A rejecting status wins even when its body is not JSON.
    let error_body = parsed.as_ref().ok().and_then(Option::as_ref);
    if let Some(err) = ApiError::classify(status, error_body) {
        warn!(status, reason = %err, "request rejected");
        return Err(err);
    }

    let body = parsed.map_err(|e| ApiError::MalformedResponse {
        status,
        message: e.to_string(),
    })?;

    if status == REDIRECT_STATUS {
        let location = body
            .as_ref()
            .and_then(|b| b.get("location"))
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::MalformedResponse {
                status,
                message: "redirect without a location".to_string(),
            })?;
        return Ok(Decision::Redirect(location.to_string()));
    }

    Ok(Decision::Done(body))
}
