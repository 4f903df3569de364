use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const BASE_PATH: &str = "/data-api";
pub const SEEDED_ID: &str = "1.229";
pub const SEEDED_EXTERNAL_ID: &str = "welcome-article";
pub const SEARCH_INDEX: &str = "public";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContentRecord {
    pub id: String,
    pub version: u64,
    #[serde(rename = "contentData", default)]
    pub content_data: Value,
    #[serde(rename = "externalId", default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Body accepted by create and update. `id` and `version` in the body are
/// ignored; the path and `If-Match` header are authoritative.
#[derive(Deserialize)]
pub struct ContentInput {
    #[serde(rename = "contentData", default)]
    pub content_data: Value,
    #[serde(rename = "externalId")]
    pub external_id: Option<String>,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub rows: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub sessions: HashSet<String>,
    pub contents: BTreeMap<String, ContentRecord>,
    next_id: u64,
}

impl Store {
    /// One article, `1.229`, reachable as `welcome-article`.
    pub fn seeded() -> Self {
        let mut store = Store {
            next_id: 230,
            ..Store::default()
        };
        store.contents.insert(
            SEEDED_ID.to_string(),
            ContentRecord {
                id: SEEDED_ID.to_string(),
                version: 1,
                content_data: json!({
                    "name": "Welcome to the Data API",
                    "body": "This article is served by the mock server."
                }),
                external_id: Some(SEEDED_EXTERNAL_ID.to_string()),
            },
        );
        store
    }

    fn allocate_id(&mut self) -> String {
        let id = format!("1.{}", self.next_id);
        self.next_id += 1;
        id
    }
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, Json<Value>);

fn rejection(status: StatusCode, message: &str) -> Rejection {
    (status, Json(json!({ "message": message })))
}

/// 404 bodies use the nested `error.msg` shape.
fn not_found(message: &str) -> Rejection {
    (StatusCode::NOT_FOUND, Json(json!({ "error": { "msg": message } })))
}

fn authorize(store: &Store, headers: &HeaderMap) -> Result<String, Rejection> {
    let token = headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| rejection(StatusCode::UNAUTHORIZED, "missing X-Auth-Token"))?;
    if store.sessions.contains(token) {
        Ok(token.to_string())
    } else {
        Err(rejection(StatusCode::UNAUTHORIZED, "unknown or expired token"))
    }
}

pub fn app() -> Router {
    app_with(Arc::new(RwLock::new(Store::seeded())))
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route(
            &format!("{BASE_PATH}/ws/security/token"),
            post(create_token).delete(delete_token),
        )
        .route(&format!("{BASE_PATH}/ws/content"), post(create_content))
        .route(
            &format!("{BASE_PATH}/ws/content/contentid/{{id}}"),
            get(get_content).put(update_content),
        )
        .route(
            &format!("{BASE_PATH}/ws/content/externalid/{{external_id}}"),
            get(redirect_external).put(redirect_external),
        )
        .route(&format!("{BASE_PATH}/ws/search/{{index}}/select"), get(search))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn create_token(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<Json<Value>, Rejection> {
    if input.username.is_empty() || input.username != input.password {
        return Err(rejection(StatusCode::UNAUTHORIZED, "invalid username or password"));
    }
    let token = Uuid::new_v4().to_string();
    db.write().await.sessions.insert(token.clone());
    info!(user = %input.username, "session opened");
    Ok(Json(json!({ "token": token })))
}

async fn delete_token(State(db): State<Db>, headers: HeaderMap) -> Result<StatusCode, Rejection> {
    let mut store = db.write().await;
    let token = authorize(&store, &headers)?;
    store.sessions.remove(&token);
    Ok(StatusCode::NO_CONTENT)
}

async fn create_content(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ContentInput>,
) -> Result<(StatusCode, Json<ContentRecord>), Rejection> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let record = ContentRecord {
        id: store.allocate_id(),
        version: 1,
        content_data: input.content_data,
        external_id: input.external_id,
    };
    store.contents.insert(record.id.clone(), record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_content(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ContentRecord>, Rejection> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    store
        .contents
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(&format!("no content with id {id}")))
}

async fn update_content(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ContentInput>,
) -> Result<Json<ContentRecord>, Rejection> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let record = store
        .contents
        .get_mut(&id)
        .ok_or_else(|| not_found(&format!("no content with id {id}")))?;

    // Clients that addressed the item by external id send that id instead.
    let expected = format!("{}.{}", record.id, record.version);
    let by_external_id = record
        .external_id
        .as_ref()
        .map(|ext| format!("{ext}.{}", record.version));
    let if_match = headers.get("if-match").and_then(|v| v.to_str().ok());
    let matches = if_match.is_some_and(|m| m == expected || by_external_id.as_deref() == Some(m));
    if !matches {
        return Err(rejection(
            StatusCode::BAD_REQUEST,
            &format!("If-Match must be {expected}"),
        ));
    }

    record.content_data = input.content_data;
    if input.external_id.is_some() {
        record.external_id = input.external_id;
    }
    record.version += 1;
    Ok(Json(record.clone()))
}

/// External ids are answered with a 303 whose body points at the content id.
async fn redirect_external(
    State(db): State<Db>,
    Path(external_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), Rejection> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let record = store
        .contents
        .values()
        .find(|c| c.external_id.as_deref() == Some(external_id.as_str()))
        .ok_or_else(|| not_found(&format!("no content with external id {external_id}")))?;

    let mut location = format!("{BASE_PATH}/ws/content/contentid/{}", record.id);
    if let Some(query) = query {
        location.push('?');
        location.push_str(&query);
    }
    debug!(%external_id, %location, "redirecting external id");
    Ok((StatusCode::SEE_OTHER, Json(json!({ "location": location }))))
}

async fn search(
    State(db): State<Db>,
    Path(index): Path<String>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Json<Value>, Rejection> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    if index != SEARCH_INDEX {
        return Err(rejection(StatusCode::NOT_FOUND, &format!("no such index {index}")));
    }

    // "field:term" searches the whole document for "term".
    let term = params
        .q
        .split_once(':')
        .map_or(params.q.as_str(), |(_, term)| term)
        .to_lowercase();
    let hits: Vec<&ContentRecord> = store
        .contents
        .values()
        .filter(|c| c.content_data.to_string().to_lowercase().contains(&term))
        .collect();
    let docs: Vec<&ContentRecord> = hits
        .iter()
        .copied()
        .take(params.rows.unwrap_or(usize::MAX))
        .collect();

    Ok(Json(json!({
        "responseHeader": { "status": 0, "params": { "q": params.q } },
        "response": { "numFound": hits.len(), "start": 0, "docs": docs }
    })))
}
