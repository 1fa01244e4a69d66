use async_trait::async_trait;
use medialab_crm::{
    DemoAuthenticator, RoleRule,
    authenticator::Authenticator,
    error::AuthError,
    models::{Credentials, Role, User},
    session::SessionStore,
};

// --- Mock Authenticators ---

struct RejectingAuthenticator;

#[async_trait]
impl Authenticator for RejectingAuthenticator {
    async fn authenticate(&self, _email: &str, _password: &str) -> Result<User, AuthError> {
        Err(AuthError::Rejected)
    }
}

struct UnavailableAuthenticator;

#[async_trait]
impl Authenticator for UnavailableAuthenticator {
    async fn authenticate(&self, _email: &str, _password: &str) -> Result<User, AuthError> {
        Err(AuthError::Backend("connection refused".to_string()))
    }
}

fn assert_invariant(store: &SessionStore) {
    assert_eq!(store.is_authenticated(), store.user().is_some());
    let view = store.snapshot();
    assert_eq!(view.is_authenticated, view.user.is_some());
}

// --- Tests ---

#[tokio::test]
async fn test_login_admin_convention_sets_admin_user() {
    let mut store = SessionStore::new();
    let auth = DemoAuthenticator::default();

    let user = store
        .login(&auth, &Credentials::new("jane.admin@medialab.edu", "anything"))
        .await
        .unwrap();

    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.email, "jane.admin@medialab.edu");
    assert_eq!(user.first_name, "Jane");
    assert_eq!(user.last_name, "Admin");
    assert!(store.is_authenticated());
    assert!(!store.is_loading());
    assert!(store.error().is_none());
    assert_invariant(&store);
}

#[tokio::test]
async fn test_login_plain_address_is_client() {
    let mut store = SessionStore::new();
    let auth = DemoAuthenticator::default();

    let user = store
        .login(&auth, &Credentials::new("sam@medialab.edu", "pw"))
        .await
        .unwrap();

    assert_eq!(user.role, Role::Client);
    assert_eq!(store.role(), Some(Role::Client));
}

#[tokio::test]
async fn test_login_empty_email_fails() {
    let mut store = SessionStore::new();
    let result = store
        .login(&DemoAuthenticator::default(), &Credentials::new("", "x"))
        .await;

    assert_eq!(result.unwrap_err(), AuthError::MissingEmail);
    assert!(!store.is_authenticated());
    assert_eq!(store.error(), Some("Email is required"));
    assert_invariant(&store);
}

#[tokio::test]
async fn test_login_empty_password_fails() {
    let mut store = SessionStore::new();
    let result = store
        .login(&DemoAuthenticator::default(), &Credentials::new("a@b.com", ""))
        .await;

    assert_eq!(result.unwrap_err(), AuthError::MissingPassword);
    assert!(!store.is_authenticated());
    assert!(!store.is_loading());
    assert_invariant(&store);
}

#[tokio::test]
async fn test_whitespace_email_counts_as_empty() {
    let mut store = SessionStore::new();
    let result = store
        .login(&DemoAuthenticator::default(), &Credentials::new("   ", "x"))
        .await;

    assert_eq!(result.unwrap_err(), AuthError::MissingEmail);
}

#[tokio::test]
async fn test_rejected_login_records_error() {
    let mut store = SessionStore::new();
    let result = store
        .login(&RejectingAuthenticator, &Credentials::new("a@b.com", "wrong"))
        .await;

    assert_eq!(result.unwrap_err(), AuthError::Rejected);
    assert!(!store.is_authenticated());
    assert!(!store.is_loading());
    assert_eq!(store.error(), Some("Invalid email or password"));
    assert_invariant(&store);
}

#[tokio::test]
async fn test_backend_failure_is_reported() {
    let mut store = SessionStore::new();
    let result = store
        .login(&UnavailableAuthenticator, &Credentials::new("a@b.com", "pw"))
        .await;

    assert!(matches!(result, Err(AuthError::Backend(_))));
    assert!(store.error().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_failed_relogin_signs_out_previous_user() {
    let mut store = SessionStore::new();
    store
        .login(&DemoAuthenticator::default(), &Credentials::new("a@b.com", "pw"))
        .await
        .unwrap();

    let _ = store
        .login(&RejectingAuthenticator, &Credentials::new("a@b.com", "pw"))
        .await;

    assert!(!store.is_authenticated());
    assert_invariant(&store);
}

#[tokio::test]
async fn test_relogin_replaces_user_wholesale() {
    let mut store = SessionStore::new();
    let auth = DemoAuthenticator::default();

    let first = store
        .login(&auth, &Credentials::new("sam@medialab.edu", "pw"))
        .await
        .unwrap();
    let second = store
        .login(&auth, &Credentials::new("root.admin@medialab.edu", "pw"))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(store.user(), Some(&second));
    assert_eq!(store.role(), Some(Role::Admin));
}

#[test]
fn test_second_login_while_pending_is_rejected() {
    let mut store = SessionStore::new();
    let credentials = Credentials::new("a@b.com", "pw");

    store.begin_login(&credentials).unwrap();
    assert!(store.is_loading());

    assert_eq!(
        store.begin_login(&credentials).unwrap_err(),
        AuthError::LoginPending
    );
    // The pending attempt keeps running; only the message is shown.
    assert!(store.is_loading());
    assert_eq!(store.error(), Some("A sign-in request is already in progress"));
}

#[tokio::test]
async fn test_pending_message_cleared_when_attempt_succeeds() {
    let mut store = SessionStore::new();
    let credentials = Credentials::new("a@b.com", "pw");

    let ticket = store.begin_login(&credentials).unwrap();
    assert!(store.begin_login(&credentials).is_err());

    let outcome = DemoAuthenticator::default().authenticate("a@b.com", "pw").await;
    store.complete_login(ticket, outcome).unwrap();

    assert!(store.is_authenticated());
    assert!(store.error().is_none());
    assert_invariant(&store);
}

#[tokio::test]
async fn test_logout_cancels_pending_login() {
    let mut store = SessionStore::new();
    let ticket = store.begin_login(&Credentials::new("a@b.com", "pw")).unwrap();

    store.logout();
    assert!(!store.is_loading());

    let outcome = DemoAuthenticator::default().authenticate("a@b.com", "pw").await;
    assert_eq!(
        store.complete_login(ticket, outcome).unwrap_err(),
        AuthError::Cancelled
    );
    assert!(!store.is_authenticated());
    assert!(!store.is_loading());
    assert_invariant(&store);
}

#[test]
fn test_complete_login_clears_loading() {
    let mut store = SessionStore::new();
    let ticket = store.begin_login(&Credentials::new("a@b.com", "pw")).unwrap();

    let result = store.complete_login(ticket, Err(AuthError::Rejected));

    assert!(result.is_err());
    assert!(!store.is_loading());
    // A new attempt is accepted once the previous one resolved.
    assert!(store.begin_login(&Credentials::new("a@b.com", "pw")).is_ok());
}

#[tokio::test]
async fn test_logout_clears_user() {
    let mut store = SessionStore::new();
    store
        .login(&DemoAuthenticator::default(), &Credentials::new("a@b.com", "pw"))
        .await
        .unwrap();

    store.logout();

    assert!(!store.is_authenticated());
    assert!(store.user().is_none());
    assert_invariant(&store);
}

#[test]
fn test_logout_when_signed_out_is_harmless() {
    let mut store = SessionStore::new();
    store.logout();
    assert!(!store.is_authenticated());
    assert_invariant(&store);
}

#[tokio::test]
async fn test_clear_error_only_drops_error() {
    let mut store = SessionStore::new();
    let _ = store
        .login(&DemoAuthenticator::default(), &Credentials::new("", "pw"))
        .await;
    assert!(store.error().is_some());

    let before = store.snapshot();
    store.clear_error();
    let after = store.snapshot();

    assert!(after.error.is_none());
    assert_eq!(after.is_authenticated, before.is_authenticated);
    assert_eq!(after.user, before.user);
    assert_eq!(after.is_loading, before.is_loading);
}

#[tokio::test]
async fn test_clear_error_keeps_signed_in_user() {
    let mut store = SessionStore::new();
    let user = store
        .login(&DemoAuthenticator::default(), &Credentials::new("a@b.com", "pw"))
        .await
        .unwrap();

    store.clear_error();

    assert_eq!(store.user(), Some(&user));
    assert_invariant(&store);
}

#[test]
fn test_role_rule_is_configurable() {
    let rule = RoleRule::new("staff");

    assert_eq!(rule.derive("lab.staff@medialab.edu"), Role::Admin);
    assert_eq!(rule.derive("jane.admin@medialab.edu"), Role::Client);
}

#[test]
fn test_role_rule_ignores_domain_and_case() {
    let rule = RoleRule::default();

    assert_eq!(rule.derive("Head.ADMIN@medialab.edu"), Role::Admin);
    assert_eq!(rule.derive("sam@admin.medialab.edu"), Role::Client);
}
