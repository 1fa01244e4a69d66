use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    models::{PageView, Role, RouteDecision, RouteOutcome, User, ViewKind},
    navigation::Menus,
    session::SessionStore,
};

pub const LANDING_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_ALIAS: &str = "/dashboard";
pub const PROFILE_PATH: &str = "/profile";

/// RouteAccess
///
/// Access requirement attached to a path, evaluated once per navigation.
/// An empty role set means "any authenticated role".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    RequiresRole(BTreeSet<Role>),
    /// The generic `/dashboard` alias: always forwards to the caller's role home.
    RoleHome,
}

impl RouteAccess {
    pub fn role(role: Role) -> Self {
        RouteAccess::RequiresRole(BTreeSet::from([role]))
    }

    pub fn any_role() -> Self {
        RouteAccess::RequiresRole(BTreeSet::new())
    }

    pub fn is_public(&self) -> bool {
        matches!(self, RouteAccess::Public)
    }

    fn permits(&self, role: Role) -> bool {
        match self {
            RouteAccess::Public | RouteAccess::RoleHome => true,
            RouteAccess::RequiresRole(roles) => roles.is_empty() || roles.contains(&role),
        }
    }
}

/// RouteEntry
///
/// A registered page: its requirement, the view the front-end draws and a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub access: RouteAccess,
    pub view: ViewKind,
    pub title: String,
}

/// GuardDecision
///
/// What the router does with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(String),
    /// Allowed, but the session is locked: draw the lock screen instead.
    LockScreen,
}

impl GuardDecision {
    pub fn redirect(target: &str) -> Self {
        GuardDecision::Redirect(target.to_string())
    }

    pub fn into_route_decision(self, path: &str) -> RouteDecision {
        match self {
            GuardDecision::Render => RouteDecision {
                path: path.to_string(),
                outcome: RouteOutcome::Render,
                target: None,
            },
            GuardDecision::Redirect(target) => RouteDecision {
                path: path.to_string(),
                outcome: RouteOutcome::Redirect,
                target: Some(target),
            },
            GuardDecision::LockScreen => RouteDecision {
                path: path.to_string(),
                outcome: RouteOutcome::LockScreen,
                target: None,
            },
        }
    }
}

/// RouteTable
///
/// Every page the dashboard knows about, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: HashMap<String, RouteEntry>,
}

/// RouteState
///
/// The shared handle stored in `AppState`.
pub type RouteState = Arc<RouteTable>;

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, access: RouteAccess, view: ViewKind, title: &str) {
        self.entries.insert(
            normalize_path(path),
            RouteEntry {
                access,
                view,
                title: title.to_string(),
            },
        );
    }

    /// standard
    ///
    /// The Medialab routing surface. Landing and login are public, `/dashboard`
    /// forwards to the role home, `/profile` is open to any signed-in role, and
    /// every menu leaf inherits the role of the menu it belongs to. Settings pages
    /// carry no requirement of their own beyond that.
    pub fn standard(menus: &Menus) -> Self {
        let mut table = Self::new();
        table.insert(LANDING_PATH, RouteAccess::Public, ViewKind::Landing, "Medialab");
        table.insert(LOGIN_PATH, RouteAccess::Public, ViewKind::Login, "Sign in");
        table.insert(DASHBOARD_ALIAS, RouteAccess::RoleHome, ViewKind::Section, "Dashboard");
        table.insert(PROFILE_PATH, RouteAccess::any_role(), ViewKind::Profile, "Profile");

        for role in [Role::Admin, Role::Client] {
            for (path, label) in menus.for_role(role).leaves() {
                let view = if path == role.home_path() {
                    match role {
                        Role::Admin => ViewKind::AdminDashboard,
                        Role::Client => ViewKind::ClientDashboard,
                    }
                } else {
                    ViewKind::Section
                };
                table.insert(path, RouteAccess::role(role), view, label);
            }
        }

        table
    }

    pub fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.get(&normalize_path(path))
    }

    /// evaluate
    ///
    /// Decides one navigation. Authentication is always checked before roles:
    ///
    /// 1. signed out + protected path (role-gated or `/dashboard`) -> `/login`
    /// 2. signed in + role not in a non-empty requirement -> role home
    /// 3. requirement satisfied, or public path -> render
    /// 4. `/dashboard` -> role home
    /// 5. unknown path -> role home when signed in, `/` otherwise
    pub fn evaluate(&self, session: &SessionStore, path: &str) -> GuardDecision {
        let role = session.role();

        let decision = match (self.lookup(path), role) {
            (None, Some(role)) => GuardDecision::redirect(role.home_path()),
            (None, None) => GuardDecision::redirect(LANDING_PATH),
            (Some(entry), _) if entry.access.is_public() => GuardDecision::Render,
            (Some(_), None) => GuardDecision::redirect(LOGIN_PATH),
            (Some(entry), Some(role)) => match &entry.access {
                RouteAccess::RoleHome => GuardDecision::redirect(role.home_path()),
                access if access.permits(role) => GuardDecision::Render,
                _ => GuardDecision::redirect(role.home_path()),
            },
        };

        tracing::debug!(path, role = role.map(Role::as_str), ?decision, "route guard");
        decision
    }

    /// evaluate_locked
    ///
    /// `evaluate` followed by the lock gate: a protected page the session may see
    /// becomes `LockScreen` while `locked`. Redirects and public pages are unchanged.
    pub fn evaluate_locked(&self, session: &SessionStore, path: &str, locked: bool) -> GuardDecision {
        match self.evaluate(session, path) {
            GuardDecision::Render if locked && !self.is_public(path) => GuardDecision::LockScreen,
            decision => decision,
        }
    }

    fn is_public(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(|entry| entry.access.is_public())
    }

    /// The page body for a path the guard allowed. `locked` replaces protected
    /// content with the lock screen; public pages are never covered.
    pub fn page_view(&self, path: &str, user: Option<&User>, locked: bool) -> PageView {
        let path = normalize_path(path);
        let (view, title) = match self.lookup(&path) {
            Some(entry) if locked && !entry.access.is_public() => {
                (ViewKind::LockScreen, "Locked".to_string())
            }
            Some(entry) => (entry.view, entry.title.clone()),
            None => (ViewKind::Landing, "Medialab".to_string()),
        };

        PageView {
            path,
            view,
            title,
            user: user.cloned(),
        }
    }
}

/// normalize_path
///
/// Strips query and fragment and a trailing slash (except on `/`), so `/login/`
/// and `/login?next=x` resolve to the same route.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');

    if trimmed.is_empty() {
        LANDING_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
