//! Session lifecycle and token ownership
//!
//! There is exactly one [`Session`] value per process. [`SessionManager`]
//! owns writes (login, logout, restore); everything else reads through a
//! cheap [`SessionHandle`] clone. The REST client reads the token from the
//! handle when building each request, so a logout is visible to all
//! in-flight call sites immediately; there is no ambient default header to
//! go stale.
//!
//! Persistence is a single token string in a JSON file under the XDG data
//! directory (see [`TokenStore`]): written on login/register, removed on
//! logout, read once at startup. The user identity is never persisted; a
//! restored session is authenticated but anonymous until the next login.

mod store;

pub use store::TokenStore;

use crate::types::UserIdentity;
use std::sync::{Arc, RwLock};

/// Authentication state: token present iff authenticated, identity only
/// meaningful when a token is present.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<UserIdentity>,
    pub token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Shared read access to the process-wide session.
///
/// Clones are cheap and all point at the same state. Lock sections are a
/// single clone or assignment; a poisoned lock is recovered rather than
/// propagated since the state is plain data.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> Session {
        self.read(|s| s.clone())
    }

    /// Current token, read at call time.
    pub fn token(&self) -> Option<String> {
        self.read(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.read(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.is_authenticated())
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        f(&guard)
    }

    fn replace(&self, session: Session) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = session;
    }
}

/// Owns session transitions and keeps the token store in step with them.
pub struct SessionManager {
    handle: SessionHandle,
    store: TokenStore,
}

impl SessionManager {
    pub fn new(store: TokenStore) -> Self {
        SessionManager {
            handle: SessionHandle::new(),
            store,
        }
    }

    /// Handle for readers (the REST client, the view gate).
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Pre-populate the session from the persisted token, if one exists.
    ///
    /// Absence is not an error; the identity is left unresolved either way.
    /// Returns whether a token was found.
    pub fn restore(&self) -> bool {
        match self.store.load() {
            Some(token) => {
                self.handle.replace(Session {
                    user: None,
                    token: Some(token),
                });
                tracing::info!("Restored persisted session token");
                true
            }
            None => false,
        }
    }

    /// Apply a successful login/registration response.
    ///
    /// The in-memory session is always updated; a failure to persist the
    /// token only costs the next restart and is logged, not surfaced.
    pub fn complete_login(&self, user: UserIdentity, token: String) {
        if let Err(e) = self.store.save(&token) {
            tracing::warn!(error = %e, "Failed to persist session token");
        }
        self.handle.replace(Session {
            user: Some(user),
            token: Some(token),
        });
    }

    /// Clear the session and the persisted token.
    ///
    /// Takes effect immediately: any request built after this call carries
    /// no token, including requests from operations already in flight.
    pub fn logout(&self) {
        self.handle.replace(Session::default());
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to remove persisted session token");
        }
    }

    /// Logout forced by a rejected token (HTTP 401 on any authenticated
    /// call).
    pub fn force_logout(&self) {
        tracing::warn!("Server rejected session token, forcing logout");
        self.logout();
    }

    pub fn is_authenticated(&self) -> bool {
        self.handle.is_authenticated()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.handle.user()
    }
}
