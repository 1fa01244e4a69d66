use crate::{
    authenticator::Authenticator,
    error::AuthError,
    models::{Credentials, Role, SessionView, User},
};

/// SessionStore
///
/// Holds whether a visitor is signed in and who they are. `user` is the only
/// source of truth for authentication: `is_authenticated()` is derived from it,
/// so "user present iff authenticated" cannot be broken by any sequence of calls.
///
/// The store itself never talks to a backend. `login` awaits the injected
/// `Authenticator`; hosts that must not hold a lock across that await use the
/// split `begin_login` / `complete_login` pair instead.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    user: Option<User>,
    is_loading: bool,
    error: Option<String>,
    // Bumped by `logout`; outcomes of attempts begun under an older value are dropped.
    generation: u64,
}

/// LoginTicket
///
/// Issued by `begin_login` and handed back to `complete_login`. A logout in
/// between invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginTicket(u64);

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// login
    ///
    /// Validates the credentials, awaits the authenticator and records the outcome.
    /// On failure the error message is kept on the session and the session stays
    /// signed out.
    pub async fn login(
        &mut self,
        authenticator: &dyn Authenticator,
        credentials: &Credentials,
    ) -> Result<User, AuthError> {
        let ticket = self.begin_login(credentials)?;
        let outcome = authenticator
            .authenticate(credentials.email.trim(), &credentials.password)
            .await;
        self.complete_login(ticket, outcome)
    }

    /// begin_login
    ///
    /// First half of `login`: structural validation and the loading flag.
    /// A call while another login is pending is rejected; the pending attempt
    /// keeps running and only the error message is set.
    pub fn begin_login(&mut self, credentials: &Credentials) -> Result<LoginTicket, AuthError> {
        if self.is_loading {
            self.error = Some(AuthError::LoginPending.to_string());
            return Err(AuthError::LoginPending);
        }

        let validation = if credentials.email.trim().is_empty() {
            Err(AuthError::MissingEmail)
        } else if credentials.password.is_empty() {
            Err(AuthError::MissingPassword)
        } else {
            Ok(())
        };

        // Any new attempt drops the previous identity, including a failed one.
        self.user = None;

        match validation {
            Ok(()) => {
                self.is_loading = true;
                self.error = None;
                Ok(LoginTicket(self.generation))
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// complete_login
    ///
    /// Second half of `login`: applies the authenticator's answer. When the session
    /// was signed out after `ticket` was issued, the answer is discarded and the
    /// session is left as the logout left it.
    pub fn complete_login(
        &mut self,
        ticket: LoginTicket,
        outcome: Result<User, AuthError>,
    ) -> Result<User, AuthError> {
        if ticket.0 != self.generation {
            tracing::info!("login outcome discarded: session signed out meanwhile");
            return Err(AuthError::Cancelled);
        }
        self.is_loading = false;

        match outcome {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = user.role.as_str(), "login succeeded");
                self.error = None;
                self.user = Some(user.clone());
                Ok(user)
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                self.user = None;
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Signs the user out and cancels any pending login. Leaves `error` alone.
    pub fn logout(&mut self) {
        self.generation += 1;
        self.is_loading = false;
        if let Some(user) = self.user.take() {
            tracing::info!(user_id = %user.id, "logout");
        }
    }

    /// Dismisses the error message; authentication state is untouched.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn snapshot(&self) -> SessionView {
        SessionView {
            is_authenticated: self.is_authenticated(),
            user: self.user.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}
