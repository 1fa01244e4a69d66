use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// AuthError
///
/// Every failure a visitor can hit while signing in or unlocking the lock screen.
/// The `Display` text is the human-readable message stored on the session and shown
/// in the dismissible alert, so it is written for end users rather than operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Password is required")]
    MissingPassword,
    #[error("A sign-in request is already in progress")]
    LoginPending,
    #[error("Sign-in was cancelled by a sign-out")]
    Cancelled,
    #[error("Invalid email or password")]
    Rejected,
    #[error("Authentication service unavailable: {0}")]
    Backend(String),
}

impl AuthError {
    /// HTTP status used when the error leaves the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingEmail | AuthError::MissingPassword => StatusCode::BAD_REQUEST,
            AuthError::LoginPending | AuthError::Cancelled => StatusCode::CONFLICT,
            AuthError::Rejected => StatusCode::UNAUTHORIZED,
            AuthError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// NavigationError
///
/// Configuration defects in a menu definition. These are never shown to visitors:
/// the built-in menus are covered by tests and validated again when the state is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("navigation node `{0}` has no path and no children")]
    LeafWithoutPath(String),
    #[error("navigation node `{0}` declares both a path and children")]
    BranchWithPath(String),
    #[error("navigation node `{0}` is a branch and cannot be rendered as a link")]
    BranchAsLink(String),
    #[error("duplicate navigation node id `{0}`")]
    DuplicateId(String),
    #[error("navigation tree is nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("no navigation branch with id `{0}`")]
    UnknownBranch(String),
}

/// StorageError
///
/// Failures of the key/value store backing the persisted lock path.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// ApiError
///
/// The single error type returned by handlers. Converts into a JSON body
/// `{ "error": "<message>" }` with the matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("authentication required")]
    Unauthenticated,
    #[error("no dashboard session for this client")]
    SessionNotFound,
    #[error("session is locked")]
    Locked,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::Navigation(NavigationError::UnknownBranch(_)) => StatusCode::NOT_FOUND,
            ApiError::Navigation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthenticated | ApiError::SessionNotFound => StatusCode::UNAUTHORIZED,
            ApiError::Locked => StatusCode::LOCKED,
        };

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
