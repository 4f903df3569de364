//! Request and response values exchanged with the transport.
//!
//! # Design
//! `RequestSpec` describes one call to the Data API as plain data: method,
//! path, optional token, optional serialized body and any extra headers. It is
//! fully built before the executor dispatches it, and a redirect hop produces
//! a copy that differs only in its path.
//!
//! `ResponseEnvelope` is what the transport hands back once the response
//! stream has ended: the status code and every body chunk appended in arrival
//! order. JSON decoding happens once, through `ResponseEnvelope::json`.

use serde::Serialize;

use crate::error::ApiError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
pub const IF_MATCH: &str = "If-Match";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Only POST and PUT put the payload on the wire.
    pub fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single Data API call described as plain data.
///
/// Built by the `DataApiClient::build_*` methods and executed by
/// `Executor::execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub token: Option<String>,
    pub body: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            token: None,
            body: None,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Serialize `payload` as the JSON request body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// The headers sent on the wire.
    ///
    /// Always carries the JSON content type, plus `X-Auth-Token` when a token
    /// is set. Extra headers replace defaults of the same name (compared
    /// case-insensitively) and are appended otherwise.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string())];
        if let Some(token) = &self.token {
            headers.push((AUTH_TOKEN_HEADER.to_string(), token.clone()));
        }
        for (name, value) in &self.extra_headers {
            match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some(existing) => existing.1 = value.clone(),
                None => headers.push((name.clone(), value.clone())),
            }
        }
        headers
    }

    /// The body to write, if the method carries one.
    pub fn wire_body(&self) -> Option<&str> {
        if self.method.sends_body() {
            self.body.as_deref()
        } else {
            None
        }
    }

    /// Same method, token, body and headers against another path.
    pub fn redirected(&self, location: &str) -> Self {
        Self {
            path: location.to_string(),
            ..self.clone()
        }
    }
}

/// A fully received response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub raw_body: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            raw_body: Vec::new(),
        }
    }

    /// Convenience for tests and fakes that already hold the whole body.
    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            raw_body: body.into(),
        }
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.raw_body.extend_from_slice(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.raw_body.is_empty()
    }

    /// Decode the body as JSON. An empty body is `Ok(None)` and is never
    /// handed to the parser.
    pub fn json(&self) -> Result<Option<serde_json::Value>, serde_json::Error> {
        if self.raw_body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&self.raw_body).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_carry_json_content_type() {
        let req = RequestSpec::new(HttpMethod::Get, "/data-api/ws/search");
        assert_eq!(
            req.headers(),
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn token_adds_auth_header() {
        let req = RequestSpec::new(HttpMethod::Delete, "/x").with_token("abc");
        let headers = req.headers();
        assert!(headers.contains(&("X-Auth-Token".to_string(), "abc".to_string())));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn extra_headers_override_defaults_case_insensitively() {
        let req = RequestSpec::new(HttpMethod::Put, "/x")
            .with_header("content-type", "application/vnd.custom+json")
            .with_header("If-Match", "1.2.3");
        let headers = req.headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].1, "application/vnd.custom+json");
        assert_eq!(headers[1], ("If-Match".to_string(), "1.2.3".to_string()));
    }

    #[test]
    fn body_only_sent_for_post_and_put() {
        let payload = serde_json::json!({"a": 1});
        let post = RequestSpec::new(HttpMethod::Post, "/x").with_json(&payload).unwrap();
        assert_eq!(post.wire_body(), Some(r#"{"a":1}"#));

        let mut get = post.clone();
        get.method = HttpMethod::Get;
        assert_eq!(get.wire_body(), None);
    }

    #[test]
    fn redirected_keeps_everything_but_path() {
        let req = RequestSpec::new(HttpMethod::Put, "/old")
            .with_token("t")
            .with_header("If-Match", "1.2.3")
            .with_json(&serde_json::json!({"id": "1.2"}))
            .unwrap();
        let hop = req.redirected("/new");
        assert_eq!(hop.path, "/new");
        assert_eq!(hop.method, req.method);
        assert_eq!(hop.token, req.token);
        assert_eq!(hop.body, req.body);
        assert_eq!(hop.headers(), req.headers());
    }

    #[test]
    fn chunks_accumulate_in_order() {
        let mut resp = ResponseEnvelope::new(200);
        resp.push_chunk(br#"{"id":"#);
        resp.push_chunk(br#""1.0","version""#);
        resp.push_chunk(b":2}");
        let parsed = resp.json().unwrap().unwrap();
        assert_eq!(parsed, serde_json::json!({"id": "1.0", "version": 2}));
    }

    #[test]
    fn empty_body_is_not_parsed() {
        assert_eq!(ResponseEnvelope::new(204).json().unwrap(), None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ResponseEnvelope::with_body(200, "<html>").json().is_err());
    }
}
