use medialab_crm::{
    AppState, DemoAuthenticator, FileKeyValueStore, HttpAuthenticator, MemoryKeyValueStore,
    RoleRule,
    authenticator::AuthenticatorState,
    config::{AppConfig, AuthBackend, Env},
    create_router,
    storage::StorageState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, collaborators, state and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and request summaries from tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "medialab_crm=debug,tower_http=info".into());

    // 3. Log format by environment: pretty locally, JSON for aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Authentication collaborator
    let authenticator: AuthenticatorState = match &config.auth_backend {
        AuthBackend::Demo => {
            tracing::warn!(
                marker = %config.admin_email_marker,
                "demo authenticator active: any password is accepted"
            );
            Arc::new(DemoAuthenticator::new(RoleRule::new(
                config.admin_email_marker.clone(),
            )))
        }
        AuthBackend::Http { url } => {
            tracing::info!(url = %url, "delegating authentication");
            Arc::new(HttpAuthenticator::new(url.clone()))
        }
    };

    // 5. Lock path storage
    let storage: StorageState = match &config.lock_store_path {
        Some(path) => Arc::new(
            FileKeyValueStore::open(path)
                .await
                .expect("FATAL: Failed to open LOCK_STORE_PATH."),
        ),
        None => Arc::new(MemoryKeyValueStore::new()),
    };

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, authenticator, storage)
        .expect("FATAL: Built-in navigation menus are invalid.");

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
