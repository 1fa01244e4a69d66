use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    lock::LockGate,
    navigation::{ExpansionSet, Menus},
    session::SessionStore,
    storage::StorageState,
};

/// DashboardSession
///
/// Everything one browser holds: its session, its lock gate and the sidebar
/// branches it has opened. Constructed explicitly per client and reached only
/// through the registry; there is no global session.
pub struct DashboardSession {
    pub id: Uuid,
    pub session: SessionStore,
    pub lock: LockGate,
    pub expanded: ExpansionSet,
}

impl DashboardSession {
    pub fn new(id: Uuid, store: StorageState, key_prefix: &str) -> Self {
        Self {
            id,
            session: SessionStore::new(),
            lock: LockGate::new(store, format!("{}:{}", key_prefix, id)),
            expanded: ExpansionSet::new(),
        }
    }

    /// Resets the sidebar to the signed-in role's default expansion.
    pub fn reset_navigation(&mut self, menus: &Menus) {
        self.expanded = match self.session.role() {
            Some(role) => ExpansionSet::for_tree(menus.for_role(role)),
            None => ExpansionSet::new(),
        };
    }

    /// Signs out and clears everything tied to the signed-in user.
    pub fn logout(&mut self) {
        self.session.logout();
        self.lock.reset();
        self.expanded = ExpansionSet::new();
    }
}

/// DashboardHandle
///
/// One session behind an async mutex. All transitions happen with the lock held;
/// the login handler releases it while the authenticator call is in flight.
pub type DashboardHandle = Arc<Mutex<DashboardSession>>;

/// SessionRegistry
///
/// Maps session ids (sent back by the browser as a cookie or header) to their
/// dashboard sessions. Cloning shares the same map.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, DashboardHandle>>>,
    store: StorageState,
    key_prefix: String,
}

impl SessionRegistry {
    pub fn new(store: StorageState, key_prefix: impl Into<String>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            key_prefix: key_prefix.into(),
        }
    }

    /// Builds a fresh, signed-out session without registering it. Anonymous
    /// sign-ins run against one of these and only `register` it on success, so
    /// failed attempts leave nothing behind.
    pub fn detached(&self) -> (Uuid, DashboardHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(DashboardSession::new(
            id,
            self.store.clone(),
            &self.key_prefix,
        )));
        (id, handle)
    }

    pub async fn register(&self, id: Uuid, handle: DashboardHandle) {
        self.sessions.write().await.insert(id, handle);
        tracing::debug!(session_id = %id, "dashboard session registered");
    }

    /// Registers a fresh, signed-out session.
    pub async fn create(&self) -> (Uuid, DashboardHandle) {
        let (id, handle) = self.detached();
        self.register(id, handle.clone()).await;
        (id, handle)
    }

    /// Forgets a session. Its id is rejected from then on.
    pub async fn remove(&self, id: Uuid) -> Option<DashboardHandle> {
        let removed = self.sessions.write().await.remove(&id);
        if removed.is_some() {
            tracing::debug!(session_id = %id, "dashboard session removed");
        }
        removed
    }

    pub async fn get(&self, id: Uuid) -> Option<DashboardHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
