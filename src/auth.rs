use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::{SESSION_COOKIE, SESSION_HEADER},
    dashboard::{DashboardHandle, SessionRegistry},
    error::ApiError,
    models::User,
};

/// session_id_from_parts
///
/// Reads the caller's dashboard session id. The `x-session-id` header wins over
/// the `medialab_session` cookie; a value that is not a UUID counts as absent.
pub fn session_id_from_parts(parts: &Parts) -> Option<Uuid> {
    if let Some(value) = parts.headers.get(SESSION_HEADER) {
        return value.to_str().ok().and_then(|v| Uuid::parse_str(v.trim()).ok());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// `Set-Cookie` value binding the browser to a session.
pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

/// ClientSession Extractor Result
///
/// The caller's registered dashboard session, signed in or not.
#[derive(Clone)]
pub struct ClientSession {
    pub id: Uuid,
    pub handle: DashboardHandle,
}

/// ClientSession Extractor Implementation
///
/// Rejects with `ApiError::SessionNotFound` (401) when the request carries no
/// session id or the id is not registered.
impl<S> FromRequestParts<S> for ClientSession
where
    S: Send + Sync,
    SessionRegistry: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let registry = SessionRegistry::from_ref(state);
        let id = session_id_from_parts(parts).ok_or(ApiError::SessionNotFound)?;
        let handle = registry.get(id).await.ok_or(ApiError::SessionNotFound)?;

        Ok(ClientSession { id, handle })
    }
}

/// MaybeClientSession
///
/// Like `ClientSession`, but never rejects: anonymous visitors get `None`.
/// Used by public pages and by login, which creates a session on demand.
#[derive(Clone)]
pub struct MaybeClientSession(pub Option<ClientSession>);

impl<S> FromRequestParts<S> for MaybeClientSession
where
    S: Send + Sync,
    SessionRegistry: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeClientSession(
            ClientSession::from_request_parts(parts, state).await.ok(),
        ))
    }
}

/// AuthUser Extractor Result
///
/// The resolved identity of a signed-in caller, plus the handle of their
/// dashboard session so handlers can mutate lock and navigation state.
#[derive(Clone)]
pub struct AuthUser {
    pub session_id: Uuid,
    pub user: User,
    pub handle: DashboardHandle,
}

/// AuthUser Extractor Implementation
///
/// 1. Resolve the dashboard session from the header or cookie.
/// 2. Require that session to be signed in.
///
/// Rejection: `ApiError` with status 401 on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionRegistry: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ClientSession { id, handle } = ClientSession::from_request_parts(parts, state).await?;

        let user = handle
            .lock()
            .await
            .session
            .user()
            .cloned()
            .ok_or(ApiError::Unauthenticated)?;

        Ok(AuthUser {
            session_id: id,
            user,
            handle,
        })
    }
}
