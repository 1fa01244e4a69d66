use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// Role
///
/// Coarse permission tag attached to every signed-in user. Routes are gated on it
/// and it selects which sidebar menu the dashboard shows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    /// The canonical landing page of the role, target of every role redirect.
    pub fn home_path(self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Client => "/client/dashboard",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Client => "client",
        }
    }
}

/// User
///
/// The authenticated identity attached to a session. Replaced wholesale on re-login,
/// never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

/// Credentials
///
/// Sign-in form payload (POST /api/session/login). Deliberately not `Debug` so
/// the password cannot end up in a log line.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Credentials {
    #[schema(example = "jane.admin@medialab.edu")]
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// --- Session ---

/// SessionView
///
/// Serializable snapshot of a session. `user` is present iff `is_authenticated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionView {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// SessionEnvelope
///
/// Login response: the session id the browser must send back plus the session itself.
/// `session_id` is absent when an anonymous attempt failed, since no session was kept.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionEnvelope {
    pub session_id: Option<Uuid>,
    pub session: SessionView,
}

// --- Routing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RouteOutcome {
    Render,
    Redirect,
    LockScreen,
}

/// RouteDecision
///
/// Result of evaluating the route guard for one path (GET /api/route).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteDecision {
    pub path: String,
    pub outcome: RouteOutcome,
    pub target: Option<String>,
}

/// ViewKind
///
/// Which page the front-end draws for a rendered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ViewKind {
    Landing,
    Login,
    AdminDashboard,
    ClientDashboard,
    Section,
    Profile,
    LockScreen,
}

/// PageView
///
/// Body of a rendered page request. Visual composition lives in the front-end;
/// the server only decides which view is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageView {
    pub path: String,
    pub view: ViewKind,
    pub title: String,
    pub user: Option<User>,
}

// --- Lock screen ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LockStatus {
    pub locked: bool,
    pub path: Option<String>,
    #[ts(type = "string | null")]
    pub locked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LockRequest {
    #[schema(example = "/admin/projects")]
    pub path: String,
}

#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UnlockResponse {
    pub restore_path: String,
}

// --- Navigation ---

/// RenderNode
///
/// One sidebar entry after resolution against the current location.
/// `path` is set for leaves only; `children` is empty for leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RenderNode {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub path: Option<String>,
    pub active: bool,
    pub expanded: bool,
    #[schema(no_recursion)]
    pub children: Vec<RenderNode>,
}

/// NavigationView
///
/// The caller's role menu, resolved, plus the raw expansion set so the client can
/// persist or replay toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationView {
    pub role: Role,
    pub nodes: Vec<RenderNode>,
    pub expanded: Vec<String>,
}
