use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for signed-in callers of either role whose session is not locked. The
/// `unlocked_middleware` layer in `create_router` rejects anonymous or signed-out
/// sessions with 401 and locked ones with 423 before any handler here runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/me
        .route("/api/me", get(handlers::get_me))
        // GET /api/navigation?path=...
        // The caller's role menu with active and expanded flags.
        .route("/api/navigation", get(handlers::get_navigation))
        // POST /api/navigation/{id}/toggle
        .route(
            "/api/navigation/{id}/toggle",
            post(handlers::toggle_navigation),
        )
}

/// Lock Screen Router Module
///
/// The lock gate itself, reachable by signed-in callers whether locked or not.
pub fn lock_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/POST /api/lock
        // Lock gate status, and locking with the path to restore later.
        .route("/api/lock", get(handlers::get_lock).post(handlers::lock_session))
        // POST /api/unlock
        // Any non-empty password clears the lock.
        .route("/api/unlock", post(handlers::unlock_session))
}
