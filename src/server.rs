//! # Server Configuration
//!
//! Server setup and routing for the Meta gateway.

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_service_key;
use crate::config::AppConfig;
use crate::crypto::VaultKey;
use crate::graph::GraphClient;
use crate::handlers;
use crate::rate_limit::RateLimitLedger;
use crate::services::{HttpRunsClient, NoopAccountant, UsageAccountant};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub vault_key: Arc<VaultKey>,
    pub ledger: Arc<RateLimitLedger>,
    pub graph: Arc<GraphClient>,
    pub accountant: Arc<dyn UsageAccountant>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/meta/authorize", get(handlers::auth::authorize))
        .route(
            "/auth/meta/connections/{connectionId}",
            delete(handlers::auth::disconnect),
        )
        .route("/connections", get(handlers::connections::list_connections))
        .route("/accounts", get(handlers::accounts::list_accounts))
        .route(
            "/accounts/{ad_account_id}",
            patch(handlers::accounts::patch_account),
        )
        .route(
            "/accounts/{ad_account_id}/sync",
            post(handlers::accounts::sync_account),
        )
        .route("/insights", get(handlers::insights::get_insights))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_service_key,
        ));

    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/meta/callback", get(handlers::auth::callback))
        .route(
            "/webhooks/meta",
            get(handlers::webhooks::verify).post(handlers::webhooks::receive),
        );

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Builds the shared application state from configuration.
pub fn build_state(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let key_bytes = config
        .crypto_key
        .clone()
        .ok_or("METAGW_CRYPTO_KEY must be set to serve requests")?;
    let vault_key = VaultKey::new(key_bytes).map_err(|e| format!("Invalid crypto key: {}", e))?;

    let graph = GraphClient::new(
        config.graph_api_base.clone(),
        Duration::from_secs(config.upstream_timeout_seconds),
    )?;

    let ledger = RateLimitLedger::new(Duration::from_secs(config.rate_limit_ttl_seconds));

    let accountant: Arc<dyn UsageAccountant> = match (
        config.runs_service_url.as_deref(),
        config.runs_service_api_key.as_deref(),
    ) {
        (Some(url), Some(key)) => Arc::new(HttpRunsClient::new(url, key)),
        _ => {
            tracing::info!("Runs service not configured, usage accounting disabled");
            Arc::new(NoopAccountant)
        }
    };

    Ok(AppState {
        config: Arc::new(config),
        db: Arc::new(db),
        vault_key: Arc::new(vault_key),
        ledger: Arc::new(ledger),
        graph: Arc::new(graph),
        accountant,
    })
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = build_state(config, db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on: {}", addr);
    tracing::info!("Running in profile: {}", profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::authorize,
        crate::handlers::auth::callback,
        crate::handlers::auth::disconnect,
        crate::handlers::connections::list_connections,
        crate::handlers::accounts::list_accounts,
        crate::handlers::accounts::patch_account,
        crate::handlers::accounts::sync_account,
        crate::handlers::insights::get_insights,
        crate::handlers::webhooks::verify,
        crate::handlers::webhooks::receive,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::auth::AuthorizeResponse,
            crate::handlers::connections::ConnectionView,
            crate::handlers::connections::AdAccountView,
            crate::handlers::connections::PageView,
            crate::handlers::accounts::AccountView,
            crate::handlers::accounts::PatchAccountBody,
            crate::handlers::accounts::SyncResponse,
            crate::insights::InsightsResponse,
            crate::rate_limit::UsageMetric,
            crate::breakdowns::BreakdownValidation,
            crate::graph::UpstreamError,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Meta Gateway API",
        description = "Credential management and reporting gateway for the Meta Ads Graph API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
