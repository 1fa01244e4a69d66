use async_trait::async_trait;
use axum::{
    Json,
    body::to_bytes,
    extract::{Path, Query, State},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use medialab_crm::{
    AppConfig, AppState, DemoAuthenticator, MemoryKeyValueStore,
    auth::{AuthUser, ClientSession, MaybeClientSession},
    authenticator::{Authenticator, AuthenticatorState},
    error::AuthError,
    handlers::{self, NavigationQuery},
    models::{
        Credentials, LockRequest, PageView, Role, SessionEnvelope, UnlockRequest, User, ViewKind,
    },
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

// --- Mock Authenticators ---

/// Holds every login until `release` is notified.
struct GatedAuthenticator {
    release: Arc<Notify>,
}

#[async_trait]
impl Authenticator for GatedAuthenticator {
    async fn authenticate(&self, email: &str, _password: &str) -> Result<User, AuthError> {
        self.release.notified().await;
        Ok(User {
            id: Uuid::from_u128(3),
            first_name: "Gated".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            role: Role::Client,
        })
    }
}

struct RejectingAuthenticator;

#[async_trait]
impl Authenticator for RejectingAuthenticator {
    async fn authenticate(&self, _email: &str, _password: &str) -> Result<User, AuthError> {
        Err(AuthError::Rejected)
    }
}

// --- Helpers ---

fn state_with(authenticator: AuthenticatorState) -> AppState {
    AppState::new(
        AppConfig::default(),
        authenticator,
        Arc::new(MemoryKeyValueStore::new()),
    )
    .unwrap()
}

fn demo_state() -> AppState {
    state_with(Arc::new(DemoAuthenticator::default()))
}

async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login_as(state: &AppState, email: &str) -> AuthUser {
    let response = handlers::login(
        State(state.clone()),
        MaybeClientSession(None),
        Json(Credentials::new(email, "pw")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let envelope: SessionEnvelope = body_json(response).await;
    let session_id = envelope.session_id.unwrap();
    let handle = state.registry.get(session_id).await.unwrap();
    AuthUser {
        session_id,
        user: envelope.session.user.unwrap(),
        handle,
    }
}

// --- Login ---

#[tokio::test]
async fn test_login_creates_session_and_sets_cookie() {
    let state = demo_state();

    let response = handlers::login(
        State(state.clone()),
        MaybeClientSession(None),
        Json(Credentials::new("  jane.doe@medialab.edu ", "pw")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let header_id = response.headers().get("x-session-id").unwrap().to_str().unwrap().to_string();

    let envelope: SessionEnvelope = body_json(response).await;
    let session_id = envelope.session_id.unwrap();
    assert!(cookie.starts_with(&format!("medialab_session={}", session_id)));
    assert_eq!(header_id, session_id.to_string());

    let user = envelope.session.user.unwrap();
    assert!(envelope.session.is_authenticated);
    assert_eq!(user.email, "jane.doe@medialab.edu");
    assert_eq!(user.first_name, "Jane");
    assert_eq!(user.role, Role::Client);
    assert_eq!(state.registry.len().await, 1);
}

#[tokio::test]
async fn test_login_validation_errors_keep_session_signed_out() {
    let state = demo_state();

    let response = handlers::login(
        State(state.clone()),
        MaybeClientSession(None),
        Json(Credentials::new("   ", "pw")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let envelope: SessionEnvelope = body_json(response).await;
    assert!(envelope.session_id.is_none());
    assert!(!envelope.session.is_authenticated);
    assert!(!envelope.session.is_loading);
    assert_eq!(envelope.session.error.as_deref(), Some("Email is required"));
}

#[tokio::test]
async fn test_rejected_login_reports_error() {
    let state = state_with(Arc::new(RejectingAuthenticator));

    let response = handlers::login(
        State(state.clone()),
        MaybeClientSession(None),
        Json(Credentials::new("a@b.com", "wrong")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let envelope: SessionEnvelope = body_json(response).await;
    assert!(envelope.session.user.is_none());
    assert_eq!(envelope.session.error.as_deref(), Some("Invalid email or password"));
    assert!(state.registry.is_empty().await);
}

#[tokio::test]
async fn test_failed_anonymous_logins_leave_no_sessions() {
    let state = demo_state();

    for _ in 0..20 {
        let response = handlers::login(
            State(state.clone()),
            MaybeClientSession(None),
            Json(Credentials::new("a@b.com", "")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(state.registry.len().await, 0);
}

#[tokio::test]
async fn test_second_login_while_pending_is_conflict() {
    let release = Arc::new(Notify::new());
    let state = state_with(Arc::new(GatedAuthenticator {
        release: release.clone(),
    }));
    let (id, handle) = state.registry.create().await;

    let first = tokio::spawn({
        let state = state.clone();
        let client = ClientSession {
            id,
            handle: handle.clone(),
        };
        async move {
            handlers::login(
                State(state),
                MaybeClientSession(Some(client)),
                Json(Credentials::new("first@medialab.edu", "pw")),
            )
            .await
        }
    });

    while !handle.lock().await.session.is_loading() {
        tokio::task::yield_now().await;
    }

    let second = handlers::login(
        State(state.clone()),
        MaybeClientSession(Some(ClientSession {
            id,
            handle: handle.clone(),
        })),
        Json(Credentials::new("second@medialab.edu", "pw")),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let conflict: SessionEnvelope = body_json(second).await;
    assert!(conflict.session.is_loading);
    assert_eq!(
        conflict.session.error.as_deref(),
        Some("A sign-in request is already in progress")
    );

    release.notify_one();
    let first = first.await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let envelope: SessionEnvelope = body_json(first).await;
    assert_eq!(envelope.session.user.unwrap().email, "first@medialab.edu");
    assert!(envelope.session.error.is_none());
}

#[tokio::test]
async fn test_logout_while_login_pending_stays_signed_out() {
    let release = Arc::new(Notify::new());
    let state = state_with(Arc::new(GatedAuthenticator {
        release: release.clone(),
    }));
    let (id, handle) = state.registry.create().await;

    let pending = tokio::spawn({
        let state = state.clone();
        let client = ClientSession {
            id,
            handle: handle.clone(),
        };
        async move {
            handlers::login(
                State(state),
                MaybeClientSession(Some(client)),
                Json(Credentials::new("first@medialab.edu", "pw")),
            )
            .await
        }
    });

    while !handle.lock().await.session.is_loading() {
        tokio::task::yield_now().await;
    }

    let status = handlers::logout(
        State(state.clone()),
        ClientSession {
            id,
            handle: handle.clone(),
        },
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    release.notify_one();
    let response = pending.await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let envelope: SessionEnvelope = body_json(response).await;
    assert!(envelope.session_id.is_none());
    assert!(!envelope.session.is_authenticated);

    let dashboard = handle.lock().await;
    assert!(!dashboard.session.is_authenticated());
    assert!(!dashboard.session.is_loading());
    assert!(state.registry.get(id).await.is_none());
}

#[tokio::test]
async fn test_login_resets_lock_and_navigation() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;
    let id = auth_user.session_id;

    {
        let mut dashboard = auth_user.handle.lock().await;
        dashboard.lock.lock("/admin/projects").await;
        dashboard.expanded.toggle("settings");
    }

    let response = handlers::login(
        State(state.clone()),
        MaybeClientSession(Some(ClientSession {
            id,
            handle: auth_user.handle.clone(),
        })),
        Json(Credentials::new("admin@medialab.edu", "pw")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let dashboard = auth_user.handle.lock().await;
    assert!(!dashboard.lock.is_locked());
    assert!(dashboard.expanded.contains("settings"));
}

// --- Session ---

#[tokio::test]
async fn test_logout_clears_everything() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;
    auth_user.handle.lock().await.lock.lock("/admin/projects").await;

    assert_eq!(state.registry.len().await, 1);

    let status = handlers::logout(
        State(state.clone()),
        ClientSession {
            id: auth_user.session_id,
            handle: auth_user.handle.clone(),
        },
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.registry.is_empty().await);

    let dashboard = auth_user.handle.lock().await;
    assert!(!dashboard.session.is_authenticated());
    assert!(!dashboard.lock.is_locked());
    assert!(dashboard.expanded.ids().is_empty());
}

#[tokio::test]
async fn test_get_session_for_anonymous_caller() {
    let Json(view) = handlers::get_session(MaybeClientSession(None)).await;
    assert!(!view.is_authenticated);
    assert!(view.user.is_none());
    assert!(view.error.is_none());
}

// --- Lock ---

#[tokio::test]
async fn test_lock_then_unlock_restores_path() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;

    let Json(status) = handlers::lock_session(
        auth_user.clone(),
        Json(LockRequest {
            path: "/admin/podcasts".to_string(),
        }),
    )
    .await;
    assert!(status.locked);

    let Json(unlocked) = handlers::unlock_session(
        auth_user.clone(),
        Json(UnlockRequest {
            password: "anything".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(unlocked.restore_path, "/admin/podcasts");

    let Json(status) = handlers::get_lock(auth_user).await;
    assert!(!status.locked);
}

#[tokio::test]
async fn test_unlock_with_empty_password_is_bad_request() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;
    auth_user.handle.lock().await.lock.lock("/admin/projects").await;

    let result = handlers::unlock_session(
        auth_user.clone(),
        Json(UnlockRequest {
            password: String::new(),
        }),
    )
    .await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(auth_user.handle.lock().await.lock.is_locked());
}

#[tokio::test]
async fn test_unlock_while_unlocked_goes_home() {
    let state = demo_state();
    let auth_user = login_as(&state, "pat@medialab.edu").await;

    let Json(unlocked) = handlers::unlock_session(
        auth_user,
        Json(UnlockRequest {
            password: "pw".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(unlocked.restore_path, "/client/dashboard");
}

// --- Navigation ---

#[tokio::test]
async fn test_navigation_defaults_to_role_home() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;

    let Json(view) = handlers::get_navigation(
        State(state),
        auth_user,
        Query(NavigationQuery { path: None }),
    )
    .await;

    assert_eq!(view.role, Role::Admin);
    assert_eq!(view.expanded, vec!["settings".to_string()]);
    let dashboard = view.nodes.iter().find(|n| n.id == "dashboard").unwrap();
    assert!(dashboard.active);
}

#[tokio::test]
async fn test_toggle_navigation_flips_branch() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;

    let Json(view) = handlers::toggle_navigation(
        State(state),
        auth_user,
        Path("settings".to_string()),
        Query(NavigationQuery {
            path: Some("/admin/settings/users".to_string()),
        }),
    )
    .await
    .unwrap();

    let settings = view.nodes.iter().find(|n| n.id == "settings").unwrap();
    assert!(!settings.expanded);
    assert!(settings.active);
    assert!(view.expanded.is_empty());
}

#[tokio::test]
async fn test_toggle_unknown_branch_is_not_found() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;

    let result = handlers::toggle_navigation(
        State(state),
        auth_user,
        Path("dashboard".to_string()),
        Query(NavigationQuery { path: None }),
    )
    .await;

    assert_eq!(result.unwrap_err().into_response().status(), StatusCode::NOT_FOUND);
}

// --- Pages ---

#[tokio::test]
async fn test_serve_page_redirects_anonymous_to_login() {
    let state = demo_state();

    let response = handlers::serve_page(
        State(state),
        MaybeClientSession(None),
        Uri::from_static("/admin/projects"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn test_serve_page_renders_lock_screen_while_locked() {
    let state = demo_state();
    let auth_user = login_as(&state, "admin@medialab.edu").await;
    auth_user.handle.lock().await.lock.lock("/admin/projects").await;

    let response = handlers::serve_page(
        State(state),
        MaybeClientSession(Some(ClientSession {
            id: auth_user.session_id,
            handle: auth_user.handle.clone(),
        })),
        Uri::from_static("/admin/courses"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let page: PageView = body_json(response).await;
    assert_eq!(page.view, ViewKind::LockScreen);
    assert_eq!(page.path, "/admin/courses");
}
