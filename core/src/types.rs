//! Records exchanged with the Data API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! the integration tests catch drift. Fields the client does not interpret are
//! kept in `extra` so that a read-modify-update cycle sends back everything
//! the server returned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request body for opening a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A session opened by `authenticate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A content item as read, created or updated.
///
/// `id` is either a numeric content id (`1.229`) or an external id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub id: String,
    pub version: u64,
    #[serde(rename = "contentData", default)]
    pub content_data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Content {
    pub fn new(id: impl Into<String>, version: u64, content_data: Value) -> Self {
        Self {
            id: id.into(),
            version,
            content_data,
            extra: Map::new(),
        }
    }

    /// Value of the `If-Match` header guarding an update of this version.
    pub fn if_match(&self) -> String {
        format!("{}.{}", self.id, self.version)
    }
}

/// Solr-style search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub response: SearchResponse,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_keeps_unknown_fields() {
        let raw = json!({
            "id": "1.229",
            "version": 4,
            "contentData": {"name": "Welcome"},
            "externalId": "welcome-article"
        });
        let content: Content = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(content.id, "1.229");
        assert_eq!(content.extra["externalId"], "welcome-article");
        assert_eq!(serde_json::to_value(&content).unwrap(), raw);
    }

    #[test]
    fn content_data_defaults_to_null() {
        let content: Content = serde_json::from_str(r#"{"id":"1.0","version":2}"#).unwrap();
        assert_eq!(content.content_data, Value::Null);
    }

    #[test]
    fn if_match_joins_id_and_version() {
        assert_eq!(Content::new("1.229", 7, Value::Null).if_match(), "1.229.7");
    }

    #[test]
    fn search_results_read_solr_shape() {
        let results: SearchResults = serde_json::from_value(json!({
            "responseHeader": {"status": 0},
            "response": {"numFound": 2, "start": 0, "docs": [{"id": "1.1"}, {"id": "1.2"}]}
        }))
        .unwrap();
        assert_eq!(results.response.num_found, 2);
        assert_eq!(results.response.docs.len(), 2);
        assert!(results.extra.contains_key("responseHeader"));
    }

    #[test]
    fn session_requires_token() {
        assert!(serde_json::from_str::<Session>(r#"{"user":"edmund"}"#).is_err());
    }
}
