use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints any client may call, signed in or not. Handlers that act on a
/// session resolve it themselves and answer 401 when none is known.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/session/login
        // Signs in, creating a dashboard session when the caller has none.
        .route("/api/session/login", post(handlers::login))
        // GET /api/session
        .route("/api/session", get(handlers::get_session))
        // POST /api/session/logout
        .route("/api/session/logout", post(handlers::logout))
        // DELETE /api/session/error
        // Dismisses the sign-in error message.
        .route("/api/session/error", axum::routing::delete(handlers::clear_error))
        // GET /api/route?path=...
        // Route guard probe for client-side navigation.
        .route("/api/route", get(handlers::evaluate_route))
}
