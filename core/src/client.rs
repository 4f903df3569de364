//! Endpoint facade for the Data API.
//!
//! # Design
//! `DataApiClient` holds only the executor (and through it the immutable
//! `ClientConfig`). Each operation is split into a `build_*` method that
//! produces a `RequestSpec` and an async method that executes it and decodes
//! the typed record. All status handling lives in `Executor`.

use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::http::{HttpMethod, RequestSpec, IF_MATCH};
use crate::types::{Content, Credentials, SearchResults, Session};

const SESSION_PATH: &str = "/ws/security/token";
const CONTENT_ID_PATH: &str = "/ws/content/contentid/";
const EXTERNAL_ID_PATH: &str = "/ws/content/externalid/";
const CREATE_PATH: &str = "/ws/content";
const SEARCH_PATH: &str = "/ws/search";

/// Characters JavaScript's `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static CONTENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("content id pattern is valid"));

/// Returns true for numeric content ids such as `1.229`.
///
/// The whole id must match, so `article-2.5` and `1.229-draft` are treated as
/// external ids. The service's JavaScript client matches the pattern anywhere
/// in the id and would send both to the content-id path.
pub fn is_content_id(id: &str) -> bool {
    CONTENT_ID.is_match(id)
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// Optional query values that are empty are left off the URL.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Async client for the Data API.
#[derive(Debug, Clone)]
pub struct DataApiClient {
    executor: Executor,
}

impl DataApiClient {
    /// Client over the default `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_executor(Executor::new(config)?))
    }

    pub fn with_executor(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.executor.config().base_path)
    }

    /// Path of a content item, by content id or external id. External ids and
    /// `variant` are percent-encoded, so a `/` in an external id goes out as `%2F`.
    fn content_path(&self, id: &str, variant: Option<&str>) -> String {
        let mut path = if is_content_id(id) {
            format!("{}{id}", self.url(CONTENT_ID_PATH))
        } else {
            format!("{}{}", self.url(EXTERNAL_ID_PATH), encode(id))
        };
        if let Some(variant) = non_empty(variant) {
            path.push_str("?variant=");
            path.push_str(&encode(variant));
        }
        path
    }

    pub fn build_authenticate(&self, username: &str, password: &str) -> Result<RequestSpec, ApiError> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        RequestSpec::new(HttpMethod::Post, self.url(SESSION_PATH)).with_json(&credentials)
    }

    pub fn build_invalidate_token(&self, token: &str) -> RequestSpec {
        RequestSpec::new(HttpMethod::Delete, self.url(SESSION_PATH)).with_token(token)
    }

    pub fn build_search(
        &self,
        token: &str,
        index: &str,
        expression: &str,
        variant: Option<&str>,
        rows: Option<u32>,
    ) -> RequestSpec {
        let mut path = format!(
            "{}/{}/select?q={}&wt=json",
            self.url(SEARCH_PATH),
            encode(index),
            encode(expression)
        );
        if let Some(rows) = rows.filter(|&r| r > 0) {
            path.push_str(&format!("&rows={rows}"));
        }
        if let Some(variant) = non_empty(variant) {
            path.push_str(&format!("&variant={}", encode(variant)));
        }
        RequestSpec::new(HttpMethod::Get, path).with_token(token)
    }

    pub fn build_create(&self, token: &str, payload: &Content, variant: &str) -> Result<RequestSpec, ApiError> {
        let path = format!("{}?variant={}", self.url(CREATE_PATH), encode(variant));
        RequestSpec::new(HttpMethod::Post, path)
            .with_token(token)
            .with_json(payload)
    }

    pub fn build_read(&self, token: &str, content_id: &str, variant: Option<&str>) -> RequestSpec {
        RequestSpec::new(HttpMethod::Get, self.content_path(content_id, variant)).with_token(token)
    }

    pub fn build_update(&self, token: &str, payload: &Content, variant: Option<&str>) -> Result<RequestSpec, ApiError> {
        RequestSpec::new(HttpMethod::Put, self.content_path(&payload.id, variant))
            .with_token(token)
            .with_header(IF_MATCH, payload.if_match())
            .with_json(payload)
    }

    /// Open a session. The returned token is passed to every other call.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let request = self.build_authenticate(username, password)?;
        decode(self.executor.execute(request).await?)
    }

    /// Close the session identified by `token`.
    pub async fn invalidate_token(&self, token: &str) -> Result<(), ApiError> {
        self.executor.execute(self.build_invalidate_token(token)).await?;
        Ok(())
    }

    /// Run `expression` against the search `index`.
    pub async fn search(
        &self,
        token: &str,
        index: &str,
        expression: &str,
        variant: Option<&str>,
        rows: Option<u32>,
    ) -> Result<SearchResults, ApiError> {
        let request = self.build_search(token, index, expression, variant, rows);
        decode(self.executor.execute(request).await?)
    }

    pub async fn create(&self, token: &str, payload: &Content, variant: &str) -> Result<Content, ApiError> {
        let request = self.build_create(token, payload, variant)?;
        decode(self.executor.execute(request).await?)
    }

    /// Read a content item by content id (`1.229`) or external id. External
    /// ids are answered with a redirect to the content id, which the executor
    /// follows.
    pub async fn read(&self, token: &str, content_id: &str, variant: Option<&str>) -> Result<Content, ApiError> {
        let request = self.build_read(token, content_id, variant);
        decode(self.executor.execute(request).await?)
    }

    /// Write `payload` back, guarded by `If-Match: {id}.{version}`.
    pub async fn update(&self, token: &str, payload: &Content, variant: Option<&str>) -> Result<Content, ApiError> {
        let request = self.build_update(token, payload, variant)?;
        decode(self.executor.execute(request).await?)
    }
}

fn decode<T: DeserializeOwned>(body: Option<Value>) -> Result<T, ApiError> {
    let body = body.ok_or_else(|| ApiError::Deserialization("expected a response body, got none".to_string()))?;
    serde_json::from_value(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::executor::tests::ScriptedTransport;
    use crate::http::ResponseEnvelope;

    fn client() -> DataApiClient {
        DataApiClient::new(ClientConfig::new("localhost", 8080, "/data-api")).unwrap()
    }

    fn scripted(transport: Arc<ScriptedTransport>) -> DataApiClient {
        DataApiClient::with_executor(Executor::with_transport(
            ClientConfig::new("localhost", 8080, "/data-api"),
            transport,
        ))
    }

    fn article() -> Content {
        Content::new("1.229", 5, json!({"name": "Welcome"}))
    }

    #[test]
    fn build_authenticate_posts_credentials_without_token() {
        let req = client().build_authenticate("edmund", "secret").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/data-api/ws/security/token");
        assert!(req.token.is_none());
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"username": "edmund", "password": "secret"}));
    }

    #[test]
    fn build_invalidate_token_deletes_session() {
        let req = client().build_invalidate_token("tok");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "/data-api/ws/security/token");
        assert_eq!(req.token.as_deref(), Some("tok"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_search_escapes_query_parameters() {
        let req = client().build_search("tok", "public", "text:An updated article", Some("act"), Some(20));
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "/data-api/ws/search/public/select?q=text%3AAn%20updated%20article&wt=json&rows=20&variant=act"
        );
    }

    #[test]
    fn build_search_omits_absent_options() {
        let req = client().build_search("tok", "my index", "a&b", None, None);
        assert_eq!(req.path, "/data-api/ws/search/my%20index/select?q=a%26b&wt=json");
    }

    #[test]
    fn build_search_skips_zero_rows_and_empty_variant() {
        let req = client().build_search("tok", "public", "x", Some(""), Some(0));
        assert_eq!(req.path, "/data-api/ws/search/public/select?q=x&wt=json");
    }

    #[test]
    fn build_read_and_update_skip_empty_variant() {
        let req = client().build_read("tok", "1.229", Some(""));
        assert_eq!(req.path, "/data-api/ws/content/contentid/1.229");

        let req = client().build_update("tok", &article(), Some("")).unwrap();
        assert_eq!(req.path, "/data-api/ws/content/contentid/1.229");
    }

    #[test]
    fn build_create_posts_with_variant() {
        let req = client().build_create("tok", &article(), "act").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/data-api/ws/content?variant=act");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["contentData"]["name"], "Welcome");
    }

    #[test]
    fn build_read_uses_content_id_path_for_numeric_ids() {
        let req = client().build_read("tok", "1.2", None);
        assert_eq!(req.path, "/data-api/ws/content/contentid/1.2");
    }

    #[test]
    fn build_read_uses_external_id_path_otherwise() {
        let req = client().build_read("tok", "abc-123", None);
        assert_eq!(req.path, "/data-api/ws/content/externalid/abc-123");

        let req = client().build_read("tok", "article 2.5", Some("act"));
        assert_eq!(req.path, "/data-api/ws/content/externalid/article%202.5?variant=act");
    }

    #[test]
    fn build_update_sets_if_match() {
        let req = client().build_update("tok", &article(), Some("act")).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "/data-api/ws/content/contentid/1.229?variant=act");
        assert!(req.headers().contains(&("If-Match".to_string(), "1.229.5".to_string())));
        assert_eq!(req.token.as_deref(), Some("tok"));
    }

    #[test]
    fn content_id_detection() {
        assert!(is_content_id("1.229"));
        assert!(is_content_id("10.0"));
        assert!(!is_content_id("abc-123"));
        assert!(!is_content_id("1."));
        assert!(!is_content_id("v1.2"));
        assert!(!is_content_id("article-2.5"));
        assert!(!is_content_id("1.229-draft"));
    }

    #[test]
    fn external_id_with_slash_is_one_path_segment() {
        let req = client().build_read("tok", "news/2024", Some("act web"));
        assert_eq!(req.path, "/data-api/ws/content/externalid/news%2F2024?variant=act%20web");

        let req = client().build_read("tok", "1.229-draft", None);
        assert_eq!(req.path, "/data-api/ws/content/externalid/1.229-draft");
    }

    #[tokio::test]
    async fn read_decodes_content() {
        let transport = Arc::new(ScriptedTransport::replying(
            200,
            r#"{"id":"1.229","version":5,"contentData":{"name":"Welcome"}}"#,
        ));
        let content = scripted(transport.clone()).read("tok", "1.229", Some("act")).await.unwrap();
        assert_eq!(content, article());
        assert_eq!(
            transport.requests()[0].0,
            "http://localhost:8080/data-api/ws/content/contentid/1.229?variant=act"
        );
    }

    #[tokio::test]
    async fn invalidate_token_accepts_empty_body() {
        let transport = Arc::new(ScriptedTransport::replying(204, ""));
        scripted(transport).invalidate_token("tok").await.unwrap();
    }

    #[tokio::test]
    async fn typed_call_without_body_fails_to_decode() {
        let transport = Arc::new(ScriptedTransport::replying(200, ""));
        let err = scripted(transport).read("tok", "1.229", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[tokio::test]
    async fn mismatched_shape_is_a_deserialization_error() {
        let transport = Arc::new(ScriptedTransport::replying(200, r#"{"hits":3}"#));
        let err = scripted(transport)
            .search("tok", "public", "x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[tokio::test]
    async fn authenticate_failure_surfaces_classification() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(ResponseEnvelope::with_body(
            401,
            r#"{"message":"Invalid credentials"}"#,
        ))]));
        let err = scripted(transport).authenticate("edmund", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "401 Unauthorized");
        assert_eq!(err.server_message(), Some("Invalid credentials"));
    }
}
