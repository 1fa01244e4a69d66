use axum::{
    extract::{FromRef, Request},
    http::HeaderName,
    Router,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access-control core.
pub mod session;
pub mod guard;
pub mod lock;
pub mod navigation;

// Collaborators and shared state.
pub mod authenticator;
pub mod dashboard;
pub mod storage;

// HTTP surface and ambient concerns.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use routes::{public, authenticated};
use auth::AuthUser;

// --- Public Re-exports ---

pub use authenticator::{AuthenticatorState, DemoAuthenticator, HttpAuthenticator, RoleRule};
pub use config::AppConfig;
pub use dashboard::SessionRegistry;
pub use guard::RouteState;
pub use navigation::NavigationState;
pub use storage::{FileKeyValueStore, MemoryKeyValueStore, StorageState};

use error::{ApiError, NavigationError};
use guard::RouteTable;
use navigation::Menus;

/// ApiDoc
///
/// Auto-generated OpenAPI document for the dashboard API, served at
/// `/api-docs/openapi.json` and browsable through the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::get_session, handlers::logout, handlers::clear_error,
        handlers::evaluate_route, handlers::get_me, handlers::get_lock, handlers::lock_session,
        handlers::unlock_session, handlers::get_navigation, handlers::toggle_navigation
    ),
    components(
        schemas(
            models::Role, models::User, models::Credentials, models::SessionView,
            models::SessionEnvelope, models::RouteDecision, models::RouteOutcome,
            models::PageView, models::ViewKind, models::LockStatus, models::LockRequest,
            models::UnlockRequest, models::UnlockResponse, models::RenderNode,
            models::NavigationView,
        )
    ),
    tags(
        (name = "medialab-crm", description = "Medialab CRM dashboard access-control API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Every browser's dashboard session, keyed by session id.
    pub registry: SessionRegistry,
    /// The injected authentication collaborator.
    pub authenticator: AuthenticatorState,
    /// Sidebar menus per role.
    pub navigation: NavigationState,
    /// The guarded page table derived from the menus.
    pub routes: RouteState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the standard menus and route table around the given collaborators.
    /// Fails only when the built-in menus are malformed.
    pub fn new(
        config: AppConfig,
        authenticator: AuthenticatorState,
        storage: StorageState,
    ) -> Result<Self, NavigationError> {
        let menus = Menus::standard()?;
        let routes = RouteTable::standard(&menus);

        Ok(Self {
            registry: SessionRegistry::new(storage, config.lock_store_prefix.clone()),
            authenticator,
            navigation: Arc::new(menus),
            routes: Arc::new(routes),
            config,
        })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(app_state: &AppState) -> SessionRegistry {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces a signed-in session on the authenticated routes. `AuthUser` rejects
/// with 401 before the handler runs when the caller has no session or is signed out.
async fn auth_middleware(
    _auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

/// unlocked_middleware
///
/// `auth_middleware` plus the lock gate: a locked session may only reach the lock
/// routes and sign out until it unlocks.
async fn unlocked_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if auth_user.handle.lock().await.lock.is_locked() {
        tracing::debug!(
            session_id = %auth_user.session_id,
            path = %request.uri().path(),
            "rejected while locked"
        );
        return Err(ApiError::Locked);
    }
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles the routing structure, applies scoped and global middleware and
/// registers the application state. Every path not claimed by the API falls
/// through to the guarded page handler.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::lock_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware
                ))
        )
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    unlocked_middleware
                ))
        )
        // Pages: landing, login, dashboards, menu sections and the catch-all.
        .fallback(handlers::serve_page)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
             ServiceBuilder::new()
                 .layer(SetRequestIdLayer::new(
                     x_request_id.clone(),
                     MakeRequestUuid,
                 ))
                 .layer(
                     TraceLayer::new_for_http()
                         .make_span_with(trace_span_logger)
                         .on_response(
                             DefaultOnResponse::new()
                                 .level(Level::INFO)
                                 .latency_unit(tower_http::LatencyUnit::Millis)
                         )
                 )
                 .layer(PropagateRequestIdLayer::new(x_request_id))
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` set above so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
