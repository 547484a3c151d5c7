use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::api::jwt::JwtManager;
use server::api::{AppState, run_api_server};
use server::config::{Config, StorageBackend};
use server::db::dynamodb::DynamoStore;
use server::db::memory::MemoryStore;
use server::db::retry::RetryingStore;
use server::db::{Database, StorageClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let client: Arc<dyn StorageClient> = match config.storage {
        StorageBackend::DynamoDb => {
            let store = DynamoStore::connect(config.dynamodb_endpoint.as_deref())
                .await
                .context("Failed to connect to DynamoDB")?;
            store
                .ensure_table(&config.table_name)
                .await
                .context("Failed to prepare DynamoDB table")?;
            Arc::new(RetryingStore::new(store, config.max_retries))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    let db = Database::new(client, config.table_name.clone());

    let jwt_manager = JwtManager::new(&config.jwt_secret).with_ttl_hours(config.token_ttl_hours);
    let state = AppState::new(db, jwt_manager, config.scoring_concurrency)
        .with_admins(config.admin_usernames.iter().cloned());

    info!(
        "Starting pick'em API on {} (table {}, {:?} storage)",
        config.api_addr, config.table_name, config.storage
    );
    run_api_server(
        &config.api_addr,
        state,
        config.request_timeout,
        config.web_dir.as_deref(),
    )
    .await
}
