use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::storage::{MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};

/// The (token, user identifier) pair identifying an authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_identifier: Option<String>,
}

impl Credential {
    pub fn is_complete(&self) -> bool { self.token.is_some() && self.user_identifier.is_some() }
    pub fn is_empty(&self) -> bool { self.token.is_none() && self.user_identifier.is_none() }
}

/// Shared handle over the session storage. Clones observe the same state, so
/// the request authorizer sees a sign-out the moment it is written.
///
/// Only the session controller is expected to mutate it; everyone else reads.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<RwLock<Box<dyn SessionStorage>>>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = self.credential();
        f.debug_struct("CredentialStore")
            .field("has_token", &c.token.is_some())
            .field("user_identifier", &c.user_identifier)
            .finish()
    }
}

impl CredentialStore {
    /// Wrap a storage backend. A half-written credential (token without email or
    /// the reverse) is discarded so startup always sees a complete pair or nothing.
    pub fn new(storage: impl SessionStorage) -> Self {
        let mut boxed: Box<dyn SessionStorage> = Box::new(storage);
        let has_token = boxed.get_item(TOKEN_KEY).is_some_and(|t| !t.is_empty());
        let has_user = boxed.get_item(USER_KEY).is_some_and(|u| !u.is_empty());
        if has_token != has_user {
            warn!(target: "session", "discarding incomplete stored credential (token={}, useremail={})", has_token, has_user);
            boxed.clear();
        }
        Self { inner: Arc::new(RwLock::new(boxed)) }
    }

    pub fn in_memory() -> Self { Self::new(MemoryStorage::new()) }

    /// Record the identifier for the active session.
    pub fn save(&self, user_identifier: &str) {
        if user_identifier.is_empty() { return; }
        self.inner.write().set_item(USER_KEY, user_identifier.to_string());
    }

    /// Persist a token, or with `None` (or an empty token) erase the token and
    /// every session-scoped identifier. Clearing twice equals clearing once.
    pub fn set_token(&self, token: Option<&str>) {
        let mut s = self.inner.write();
        match token.filter(|t| !t.is_empty()) {
            Some(t) => s.set_item(TOKEN_KEY, t.to_string()),
            None => {
                s.clear();
                debug!(target: "session", "credential cleared");
            }
        }
    }

    /// Write token and identifier as one unit.
    pub fn establish(&self, token: &str, user_identifier: &str) {
        let mut s = self.inner.write();
        s.set_item(USER_KEY, user_identifier.to_string());
        s.set_item(TOKEN_KEY, token.to_string());
    }

    pub fn get_token(&self) -> Option<String> {
        self.inner.read().get_item(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn get_user_identifier(&self) -> Option<String> {
        self.inner.read().get_item(USER_KEY).filter(|u| !u.is_empty())
    }

    /// Consistent snapshot of both keys.
    pub fn credential(&self) -> Credential {
        let s = self.inner.read();
        Credential {
            token: s.get_item(TOKEN_KEY).filter(|t| !t.is_empty()),
            user_identifier: s.get_item(USER_KEY).filter(|u| !u.is_empty()),
        }
    }

    /// Canonical "signed in" test: both keys present.
    pub fn is_present(&self) -> bool { self.credential().is_complete() }
}
