use crate::{
    AppState,
    auth::{AuthUser, ClientSession, MaybeClientSession, session_cookie},
    config::SESSION_HEADER,
    error::ApiError,
    guard::{GuardDecision, normalize_path},
    models::{
        Credentials, LockRequest, LockStatus, NavigationView, Role, RouteDecision,
        SessionEnvelope, SessionView, UnlockRequest, UnlockResponse, User,
    },
    navigation::{ExpansionSet, Menus},
    session::SessionStore,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderName, StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

// --- Query Structs ---

/// RouteQuery
///
/// Query parameters of the guard probe (GET /api/route).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct RouteQuery {
    /// The path the front-end is about to navigate to.
    pub path: String,
}

/// NavigationQuery
///
/// Current location used to compute active sidebar entries. Defaults to the role home.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct NavigationQuery {
    pub path: Option<String>,
}

fn navigation_view(
    menus: &Menus,
    role: Role,
    current_path: &str,
    expanded: &ExpansionSet,
) -> NavigationView {
    NavigationView {
        role,
        nodes: menus.for_role(role).resolve(current_path, expanded),
        expanded: expanded.ids(),
    }
}

// --- Session Handlers ---

/// login
///
/// [Public Route] Signs the caller in. A caller without a session signs in against
/// a detached one that is registered only when the attempt succeeds. The session
/// lock is released while the authenticator runs; a second login for the same
/// session meanwhile is rejected with 409, and a logout meanwhile cancels the
/// attempt (also 409).
///
/// The body is always the session envelope with the error message to display.
/// The session id and cookie are sent only when the session is kept.
#[utoipa::path(
    post,
    path = "/api/session/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = SessionEnvelope),
        (status = 400, description = "Missing email or password", body = SessionEnvelope),
        (status = 401, description = "Credentials rejected", body = SessionEnvelope),
        (status = 409, description = "Login already pending, or cancelled by a logout", body = SessionEnvelope),
        (status = 502, description = "Authentication backend failed", body = SessionEnvelope)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    MaybeClientSession(existing): MaybeClientSession,
    Json(credentials): Json<Credentials>,
) -> Response {
    let (ClientSession { id, handle }, registered) = match existing {
        Some(client) => (client, true),
        None => {
            let (id, handle) = state.registry.detached();
            (ClientSession { id, handle }, false)
        }
    };

    let begun = handle.lock().await.session.begin_login(&credentials);

    let (status, session) = match begun {
        Ok(ticket) => {
            let outcome = state
                .authenticator
                .authenticate(credentials.email.trim(), &credentials.password)
                .await;

            let mut dashboard = handle.lock().await;
            let status = match dashboard.session.complete_login(ticket, outcome) {
                Ok(_) => {
                    dashboard.lock.reset();
                    dashboard.reset_navigation(&state.navigation);
                    StatusCode::OK
                }
                Err(err) => err.status_code(),
            };
            (status, dashboard.session.snapshot())
        }
        Err(err) => (err.status_code(), handle.lock().await.session.snapshot()),
    };

    if !registered && status == StatusCode::OK {
        state.registry.register(id, handle.clone()).await;
    }

    let kept = state.registry.get(id).await.is_some();
    let envelope = Json(SessionEnvelope {
        session_id: kept.then_some(id),
        session,
    });

    if kept {
        (
            status,
            [
                (header::SET_COOKIE, session_cookie(id)),
                (HeaderName::from_static(SESSION_HEADER), id.to_string()),
            ],
            envelope,
        )
            .into_response()
    } else {
        (status, envelope).into_response()
    }
}

/// get_session
///
/// [Public Route] The caller's session; signed-out default when none is known.
#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
pub async fn get_session(MaybeClientSession(client): MaybeClientSession) -> Json<SessionView> {
    match client {
        Some(client) => {
            let dashboard = client.handle.lock().await;
            Json(dashboard.session.snapshot())
        }
        None => Json(SessionView::default()),
    }
}

/// logout
///
/// [Public Route] Signs out, drops the lock and sidebar state and forgets the
/// session id. Always succeeds for a known session.
#[utoipa::path(
    post,
    path = "/api/session/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Unknown session")
    )
)]
pub async fn logout(State(state): State<AppState>, client: ClientSession) -> StatusCode {
    client.handle.lock().await.logout();
    state.registry.remove(client.id).await;
    StatusCode::NO_CONTENT
}

/// clear_error
///
/// [Public Route] Dismisses the session's error message.
#[utoipa::path(
    delete,
    path = "/api/session/error",
    responses((status = 200, description = "Error cleared", body = SessionView))
)]
pub async fn clear_error(client: ClientSession) -> Json<SessionView> {
    let mut dashboard = client.handle.lock().await;
    dashboard.session.clear_error();
    Json(dashboard.session.snapshot())
}

/// evaluate_route
///
/// [Public Route] Runs the route guard for `path` without navigating, so the
/// front-end router can redirect client-side. A locked session gets
/// `lock_screen` for protected paths it would otherwise see.
#[utoipa::path(
    get,
    path = "/api/route",
    params(RouteQuery),
    responses((status = 200, description = "Guard decision", body = RouteDecision))
)]
pub async fn evaluate_route(
    State(state): State<AppState>,
    MaybeClientSession(client): MaybeClientSession,
    Query(query): Query<RouteQuery>,
) -> Json<RouteDecision> {
    let path = normalize_path(&query.path);
    let decision = match client {
        Some(client) => {
            let dashboard = client.handle.lock().await;
            state
                .routes
                .evaluate_locked(&dashboard.session, &path, dashboard.lock.is_locked())
        }
        None => state.routes.evaluate(&SessionStore::new(), &path),
    };
    Json(decision.into_route_decision(&path))
}

/// get_me
///
/// [Authenticated Route] The signed-in user.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn get_me(AuthUser { user, .. }: AuthUser) -> Json<User> {
    Json(user)
}

// --- Lock Screen Handlers ---

/// get_lock
///
/// [Authenticated Route] Lock gate status.
#[utoipa::path(
    get,
    path = "/api/lock",
    responses((status = 200, description = "Lock status", body = LockStatus))
)]
pub async fn get_lock(AuthUser { handle, .. }: AuthUser) -> Json<LockStatus> {
    Json(handle.lock().await.lock.status())
}

/// lock_session
///
/// [Authenticated Route] Locks the session, recording `path` for the restore flow.
#[utoipa::path(
    post,
    path = "/api/lock",
    request_body = LockRequest,
    responses((status = 200, description = "Locked", body = LockStatus))
)]
pub async fn lock_session(
    AuthUser { handle, .. }: AuthUser,
    Json(payload): Json<LockRequest>,
) -> Json<LockStatus> {
    Json(handle.lock().await.lock.lock(&payload.path).await)
}

/// unlock_session
///
/// [Authenticated Route] Clears the lock with any non-empty password and returns
/// the path to go back to (the role home when nothing was recorded).
#[utoipa::path(
    post,
    path = "/api/unlock",
    request_body = UnlockRequest,
    responses(
        (status = 200, description = "Unlocked", body = UnlockResponse),
        (status = 400, description = "Empty password")
    )
)]
pub async fn unlock_session(
    AuthUser { user, handle, .. }: AuthUser,
    Json(payload): Json<UnlockRequest>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let restore = handle.lock().await.lock.unlock(&payload.password).await?;

    Ok(Json(UnlockResponse {
        restore_path: restore.unwrap_or_else(|| user.role.home_path().to_string()),
    }))
}

// --- Navigation Handlers ---

/// get_navigation
///
/// [Authenticated Route] The caller's role menu resolved against `path`.
#[utoipa::path(
    get,
    path = "/api/navigation",
    params(NavigationQuery),
    responses((status = 200, description = "Resolved menu", body = NavigationView))
)]
pub async fn get_navigation(
    State(state): State<AppState>,
    AuthUser { user, handle, .. }: AuthUser,
    Query(query): Query<NavigationQuery>,
) -> Json<NavigationView> {
    let current = query
        .path
        .map(|p| normalize_path(&p))
        .unwrap_or_else(|| user.role.home_path().to_string());

    let dashboard = handle.lock().await;
    Json(navigation_view(
        &state.navigation,
        user.role,
        &current,
        &dashboard.expanded,
    ))
}

/// toggle_navigation
///
/// [Authenticated Route] Opens or closes a sidebar branch.
#[utoipa::path(
    post,
    path = "/api/navigation/{id}/toggle",
    params(("id" = String, Path, description = "Branch id"), NavigationQuery),
    responses(
        (status = 200, description = "Resolved menu after the toggle", body = NavigationView),
        (status = 404, description = "No such branch")
    )
)]
pub async fn toggle_navigation(
    State(state): State<AppState>,
    AuthUser { user, handle, .. }: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<NavigationQuery>,
) -> Result<Json<NavigationView>, ApiError> {
    let current = query
        .path
        .map(|p| normalize_path(&p))
        .unwrap_or_else(|| user.role.home_path().to_string());

    let mut dashboard = handle.lock().await;
    state
        .navigation
        .for_role(user.role)
        .toggle(&mut dashboard.expanded, &id)?;

    Ok(Json(navigation_view(
        &state.navigation,
        user.role,
        &current,
        &dashboard.expanded,
    )))
}

// --- Pages ---

/// serve_page
///
/// Fallback for every non-API path: the route guard either renders the page
/// (lock screen in place of protected content while locked) or answers
/// `303 See Other`, which replaces the history entry.
pub async fn serve_page(
    State(state): State<AppState>,
    MaybeClientSession(client): MaybeClientSession,
    uri: Uri,
) -> Response {
    let path = normalize_path(uri.path());

    let (decision, user) = match client {
        Some(client) => {
            let dashboard = client.handle.lock().await;
            (
                state
                    .routes
                    .evaluate_locked(&dashboard.session, &path, dashboard.lock.is_locked()),
                dashboard.session.user().cloned(),
            )
        }
        None => (state.routes.evaluate(&SessionStore::new(), &path), None),
    };

    match decision {
        GuardDecision::Redirect(target) => Redirect::to(&target).into_response(),
        GuardDecision::Render => {
            Json(state.routes.page_view(&path, user.as_ref(), false)).into_response()
        }
        GuardDecision::LockScreen => {
            Json(state.routes.page_view(&path, user.as_ref(), true)).into_response()
        }
    }
}
