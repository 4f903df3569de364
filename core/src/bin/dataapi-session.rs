//! Replays a typical editing session against a Data API deployment:
//! authenticate, read, update, create, search, then invalidate the token.
//!
//! Run with: cargo run -p dataapi-core --bin dataapi-session
//!
//! Connection settings come from `DATAAPI_HOST`, `DATAAPI_PORT`,
//! `DATAAPI_BASE_PATH`; credentials from `DATAAPI_USER` / `DATAAPI_PASSWORD`.

use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use dataapi_core::{ApiError, ClientConfig, DataApiClient};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CONTENT_ID: &str = "1.229";
const VARIANT: &str = "act";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let user = std::env::var("DATAAPI_USER").unwrap_or_else(|_| "edmund".to_string());
    let password = std::env::var("DATAAPI_PASSWORD").unwrap_or_else(|_| user.clone());

    info!(origin = %config.origin(), base_path = %config.base_path, "starting session");
    let client = match DataApiClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build client");
            return ExitCode::FAILURE;
        }
    };

    let session = match client.authenticate(&user, &password).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "failed to authenticate");
            return ExitCode::FAILURE;
        }
    };
    info!("authenticated");

    match run(&client, &session.token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "session failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &DataApiClient, token: &str) -> Result<(), ApiError> {
    let mut content = client.read(token, CONTENT_ID, Some(VARIANT)).await?;
    info!(id = %content.id, version = content.version, "read content");

    set_name(&mut content.content_data, format!("An updated article {}", now()));
    let updated = client.update(token, &content, Some(VARIANT)).await?;
    info!(id = %updated.id, version = updated.version, "updated content");

    set_name(&mut content.content_data, format!("A created article {}", now()));
    let created = client.create(token, &content, VARIANT).await?;
    info!(id = %created.id, version = created.version, "created content");

    let results = client
        .search(token, "public", "text:An updated article", Some(VARIANT), None)
        .await?;
    info!(hits = results.response.num_found, "searched content");

    client.invalidate_token(token).await?;
    info!("invalidated token");
    Ok(())
}

fn set_name(data: &mut Value, name: String) {
    if !data.is_object() {
        *data = Value::Object(Default::default());
    }
    if let Value::Object(map) = data {
        map.insert("name".to_string(), Value::String(name));
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
