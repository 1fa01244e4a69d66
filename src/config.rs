use std::env;

/// Name of the cookie carrying the dashboard session id.
pub const SESSION_COOKIE: &str = "medialab_session";
/// Header alternative to the cookie, used by API clients and tests.
pub const SESSION_HEADER: &str = "x-session-id";

/// AppConfig
///
/// Holds the application's configuration. Immutable once loaded and shared with
/// handlers through the application state via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and fail-fast rules.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Which authentication collaborator the session store awaits.
    pub auth_backend: AuthBackend,
    // Marker in the email local part that maps to the admin role (demo backend only).
    pub admin_email_marker: String,
    // JSON file persisting the last path before lock. In-memory when absent.
    pub lock_store_path: Option<String>,
    // Prefix of the persisted lock key; the session id is appended.
    pub lock_store_prefix: String,
}

/// Env
///
/// Runtime context: local development or a hardened production deployment.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// AuthBackend
///
/// `Demo` accepts any password and derives the role from the email;
/// `Http` delegates to an external endpoint that owns the role claim.
#[derive(Clone, PartialEq, Debug)]
pub enum AuthBackend {
    Demo,
    Http { url: String },
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for tests: local env, demo backend,
    /// in-memory lock store.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:0".to_string(),
            auth_backend: AuthBackend::Demo,
            admin_email_marker: "admin".to_string(),
            lock_store_path: None,
            lock_store_prefix: "medialab.lock.last_path".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics when the configuration is unusable: `AUTH_BACKEND=http` without
    /// `AUTH_URL`, an unknown `AUTH_BACKEND`, or the demo backend in production.
    /// Starting with a half-configured authenticator is never acceptable.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let backend = env::var("AUTH_BACKEND").unwrap_or_else(|_| match env {
            Env::Production => "http".to_string(),
            Env::Local => "demo".to_string(),
        });

        let auth_backend = match backend.as_str() {
            "demo" => AuthBackend::Demo,
            "http" => AuthBackend::Http {
                url: env::var("AUTH_URL").expect("FATAL: AUTH_URL must be set for AUTH_BACKEND=http."),
            },
            other => panic!("FATAL: unknown AUTH_BACKEND `{}` (expected demo or http).", other),
        };

        if env == Env::Production && auth_backend == AuthBackend::Demo {
            panic!("FATAL: the demo authenticator cannot run in production.");
        }

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            auth_backend,
            admin_email_marker: env::var("ADMIN_EMAIL_MARKER")
                .unwrap_or_else(|_| "admin".to_string()),
            lock_store_path: env::var("LOCK_STORE_PATH").ok().filter(|p| !p.is_empty()),
            lock_store_prefix: env::var("LOCK_STORE_PREFIX")
                .unwrap_or_else(|_| "medialab.lock.last_path".to_string()),
        }
    }
}
