use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{Role, User},
};

/// Authenticator Trait
///
/// The external authentication collaborator. The session store awaits it during
/// `login` and maps the outcome onto the session; it never inspects passwords itself.
///
/// Implementations must be `Send + Sync` so a single instance can be shared through
/// the application state as `Arc<dyn Authenticator>`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolves credentials to a user. Input is already checked for empty fields.
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError>;
}

/// AuthenticatorState
///
/// The shared handle stored in `AppState`.
pub type AuthenticatorState = Arc<dyn Authenticator>;

/// RoleRule
///
/// Derives a role from an email address. Demo-only: the local part (before `@`)
/// containing the admin marker, case-insensitively, maps to `admin`; anything else
/// is a `client`. The marker is configurable through `ADMIN_EMAIL_MARKER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRule {
    admin_marker: String,
}

impl RoleRule {
    pub fn new(admin_marker: impl Into<String>) -> Self {
        Self {
            admin_marker: admin_marker.into().to_lowercase(),
        }
    }

    pub fn derive(&self, email: &str) -> Role {
        let local = local_part(email).to_lowercase();
        if !self.admin_marker.is_empty() && local.contains(&self.admin_marker) {
            Role::Admin
        } else {
            Role::Client
        }
    }
}

impl Default for RoleRule {
    fn default() -> Self {
        Self::new("admin")
    }
}

fn local_part(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// Splits `jane.doe@x` into ("Jane", "Doe"). Extra segments go to the last name.
fn names_from_email(email: &str) -> (String, String) {
    let mut segments = local_part(email)
        .split(['.', '_', '-'])
        .filter(|s| !s.is_empty())
        .map(capitalize);

    let first = segments.next().unwrap_or_default();
    let last = segments.collect::<Vec<_>>().join(" ");
    (first, last)
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// DemoAuthenticator
///
/// The authenticator used by the demo deployment: every non-empty password is
/// accepted and the role comes from the `RoleRule`. Not a security boundary.
#[derive(Debug, Clone, Default)]
pub struct DemoAuthenticator {
    rule: RoleRule,
}

impl DemoAuthenticator {
    pub fn new(rule: RoleRule) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl Authenticator for DemoAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }

        let email = email.trim();
        let (first_name, last_name) = names_from_email(email);

        Ok(User {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email: email.to_string(),
            role: self.rule.derive(email),
        })
    }
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// HttpAuthenticator
///
/// Delegates to a backend endpoint: `POST <url>` with `{ email, password }`,
/// expecting a JSON `User` on success. The backend owns the role claim, which
/// replaces the email-derived role entirely.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: reqwest::Client,
    url: String,
}

impl HttpAuthenticator {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AuthenticateRequest { email, password })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("authentication backend unreachable: {:?}", e);
                AuthError::Backend(e.to_string())
            })?;

        match response.status() {
            status if status.is_success() => response.json::<User>().await.map_err(|e| {
                tracing::error!("authentication backend returned an invalid user: {:?}", e);
                AuthError::Backend(e.to_string())
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::Rejected),
            status => {
                tracing::error!("authentication backend answered {}", status);
                Err(AuthError::Backend(format!("unexpected status {}", status)))
            }
        }
    }
}
