//! Session store: token and consent cache with explicit lifecycle
//!
//! The browser original kept the bearer token and consent id in
//! localStorage, read ambiently by every service. Here the store is an
//! explicit dependency injected into every service: initialized at login,
//! read by every gate, invalidated at logout. Optionally persisted to a
//! small TOML file so the CLI survives restarts.

use genodash_common::models::User;
use genodash_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

/// Everything known about the current login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    /// Consent token cached after the gate signs (or re-fetches) it.
    /// Stored alongside its user, so a login as someone else replaces
    /// the whole session and a stale id cannot leak across users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_id: Option<String>,
}

/// Process-wide session state with explicit lifecycle
pub struct SessionStore {
    inner: RwLock<Option<Session>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Volatile store, nothing touches disk. Used by tests and one-shot
    /// invocations with an injected token.
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(None),
            path: None,
        }
    }

    /// File-backed store. Loads an existing session if the file parses;
    /// a corrupt file is discarded rather than failing startup.
    pub fn with_file(path: PathBuf) -> Self {
        let session = match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Session>(&contents) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable session file");
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            inner: RwLock::new(session),
            path: Some(path),
        }
    }

    /// Initialize the session at login. Replaces any previous session;
    /// the consent cache starts from the user record's own consent id.
    pub fn login(&self, token: String, user: User) -> Result<()> {
        let consent_id = user.consent_id.clone();
        let session = Session {
            token,
            user,
            consent_id,
        };
        {
            let mut guard = self.inner.write().expect("session lock poisoned");
            *guard = Some(session);
        }
        self.persist()
    }

    /// Invalidate everything: memory cleared, session file removed.
    pub fn logout(&self) -> Result<()> {
        {
            let mut guard = self.inner.write().expect("session lock poisoned");
            *guard = None;
        }
        if let Some(path) = &self.path {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Bearer token for authenticated calls. Absent session is an auth
    /// failure, surfaced before any request is built.
    pub fn token(&self) -> Result<String> {
        let guard = self.inner.read().expect("session lock poisoned");
        guard
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or_else(|| Error::Auth {
                status: 401,
                message: "No authentication token found. Please log in again.".to_string(),
            })
    }

    pub fn user(&self) -> Option<User> {
        let guard = self.inner.read().expect("session lock poisoned");
        guard.as_ref().map(|s| s.user.clone())
    }

    pub fn consent_id(&self) -> Option<String> {
        let guard = self.inner.read().expect("session lock poisoned");
        guard.as_ref().and_then(|s| s.consent_id.clone())
    }

    /// Cache the consent token for the logged-in user
    pub fn set_consent_id(&self, consent_id: String) -> Result<()> {
        {
            let mut guard = self.inner.write().expect("session lock poisoned");
            match guard.as_mut() {
                Some(session) => session.consent_id = Some(consent_id),
                None => {
                    return Err(Error::Auth {
                        status: 401,
                        message: "Cannot cache consent without an active session".to_string(),
                    })
                }
            }
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let guard = self.inner.read().expect("session lock poisoned");
        match guard.as_ref() {
            Some(session) => {
                let contents = toml::to_string_pretty(session)
                    .map_err(|e| Error::Config(format!("session serialization: {e}")))?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, contents)?;
            }
            None => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}
