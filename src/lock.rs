use chrono::{DateTime, Utc};

use crate::{error::AuthError, guard::normalize_path, models::LockStatus, storage::StorageState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked {
        path: String,
        locked_at: DateTime<Utc>,
    },
}

/// LockGate
///
/// Secondary gate over an open session: while locked, protected pages show the
/// lock screen instead of their content, but the session itself stays signed in.
///
/// The path active at lock time is written to the key/value store under this
/// gate's key and read back by `unlock` to restore the same view. The in-memory
/// copy is used when this lock's write failed or the store cannot be read.
pub struct LockGate {
    state: LockState,
    store: StorageState,
    key: String,
    // Whether the current lock's path reached the store.
    persisted: bool,
}

impl LockGate {
    pub fn new(store: StorageState, key: impl Into<String>) -> Self {
        Self {
            state: LockState::Unlocked,
            store,
            key: key.into(),
            persisted: false,
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    pub fn status(&self) -> LockStatus {
        match &self.state {
            LockState::Unlocked => LockStatus::default(),
            LockState::Locked { path, locked_at } => LockStatus {
                locked: true,
                path: Some(path.clone()),
                locked_at: Some(*locked_at),
            },
        }
    }

    /// lock
    ///
    /// Locks the gate and records `path` for the restore flow. Already locked:
    /// nothing changes, so the first recorded path wins. A store failure is logged
    /// and the gate locks anyway.
    pub async fn lock(&mut self, path: &str) -> LockStatus {
        if self.is_locked() {
            return self.status();
        }

        let path = normalize_path(path);
        self.persisted = match self.store.set(&self.key, &path).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "could not persist lock path");
                false
            }
        };

        tracing::info!(key = %self.key, path = %path, "session locked");
        self.state = LockState::Locked {
            path,
            locked_at: Utc::now(),
        };
        self.status()
    }

    /// unlock
    ///
    /// Any non-empty password clears the lock; it is not checked against the
    /// session's credentials. Returns the path to restore, or `None` when the gate
    /// was not locked.
    pub async fn unlock(&mut self, password: &str) -> Result<Option<String>, AuthError> {
        let LockState::Locked { path, .. } = &self.state else {
            return Ok(None);
        };

        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }

        // A stale value from an earlier lock must not win over this lock's path.
        let restore = if !self.persisted {
            path.clone()
        } else {
            match self.store.get(&self.key).await {
                Ok(Some(stored)) => stored,
                Ok(None) => path.clone(),
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "could not read lock path");
                    path.clone()
                }
            }
        };

        tracing::info!(key = %self.key, restore = %restore, "session unlocked");
        self.state = LockState::Unlocked;
        self.persisted = false;
        Ok(Some(restore))
    }

    /// Drops the lock without a password. Used on logout.
    pub fn reset(&mut self) {
        self.state = LockState::Unlocked;
        self.persisted = false;
    }
}
