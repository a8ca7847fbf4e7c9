//! Test utilities for database and server testing.
//!
//! Provides in-memory SQLite databases with migrations applied, plus fixture
//! builders for connections and ad accounts.

use anyhow::Result;
use meta_gateway::config::AppConfig;
use meta_gateway::crypto::{VaultKey, encrypt};
use meta_gateway::graph::GraphClient;
use meta_gateway::models::connection;
use meta_gateway::rate_limit::RateLimitLedger;
use meta_gateway::repositories::{
    AdAccountRepository, ConnectionRepository, ad_account::AdAccountUpsert,
    connection::NewConnection,
};
use meta_gateway::server::{AppState, create_app};
use meta_gateway::services::NoopAccountant;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

/// Deterministic 32-byte vault key for tests.
#[allow(dead_code)]
pub fn test_vault_key() -> VaultKey {
    VaultKey::new((0u8..32).collect()).expect("32-byte key")
}

/// Inserts a connection holding the given plaintext token, encrypted with
/// the test vault key.
#[allow(dead_code)]
pub async fn seed_connection(
    db: Arc<DatabaseConnection>,
    app_id: &str,
    org_id: Option<&str>,
    meta_user_id: &str,
    plaintext_token: &str,
) -> Result<connection::Model> {
    let key = test_vault_key();
    let envelope = encrypt(&key, plaintext_token)?;
    let repo = ConnectionRepository::new(db);
    let model = repo
        .upsert_from_callback(
            NewConnection {
                app_id: app_id.to_string(),
                org_id: org_id.map(ToString::to_string),
                label: Some("Test Connection".to_string()),
                meta_user_id: meta_user_id.to_string(),
                meta_user_name: Some("Test User".to_string()),
                access_token: envelope,
                token_expires_at: None,
                scopes: Some(serde_json::json!(["ads_read"])),
            },
            false,
        )
        .await?;
    Ok(model)
}

/// Configuration suitable for integration tests: Meta app credentials,
/// service key, and webhook verify token all set.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        meta_app_id: Some("fb-app-id".to_string()),
        meta_app_secret: Some("fb-app-secret".to_string()),
        service_api_key: Some("service-key".to_string()),
        webhook_verify_token: Some("verify-token".to_string()),
        upsert_by_meta_user: true,
        ..AppConfig::default()
    }
}

/// Spawns the full application on a random port, pointing the Graph client
/// at `graph_base` (a wiremock server in tests). Returns the base URL.
#[allow(dead_code)]
pub async fn spawn_app(
    config: AppConfig,
    db: Arc<DatabaseConnection>,
    graph_base: &str,
) -> Result<String> {
    let graph = GraphClient::new(graph_base, Duration::from_secs(5))?;
    let state = AppState {
        config: Arc::new(config),
        db,
        vault_key: Arc::new(test_vault_key()),
        ledger: Arc::new(RateLimitLedger::new(Duration::from_secs(300))),
        graph: Arc::new(graph),
        accountant: Arc::new(NoopAccountant),
    };

    let app = create_app(state);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", addr))
}

/// Inserts an ad account under a connection.
#[allow(dead_code)]
pub async fn seed_ad_account(
    db: Arc<DatabaseConnection>,
    connection_id: Uuid,
    ad_account_id: &str,
) -> Result<()> {
    let repo = AdAccountRepository::new(db);
    repo.upsert_discovered(
        connection_id,
        AdAccountUpsert {
            ad_account_id: ad_account_id.to_string(),
            account_name: Some("Test Account".to_string()),
            currency: Some("USD".to_string()),
            timezone: Some("America/Los_Angeles".to_string()),
            account_status: Some(1),
        },
    )
    .await?;
    Ok(())
}
