use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::models::User;

/// Persisted shape of a logged-in session: the bearer token plus the
/// operator profile, mirroring what the dashboard keeps in local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    user: User,
}

/// Holds the bearer token and operator profile for the running app.
///
/// The session is written to a JSON state file on login and removed on
/// logout, so a restarted app resumes where it left off.
pub struct AuthSession {
    state_path: PathBuf,
    current: RwLock<Option<StoredSession>>,
}

impl AuthSession {
    /// Creates a session store, restoring any persisted session from disk.
    /// A corrupt state file is ignored rather than treated as fatal.
    pub fn load(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let current = match std::fs::read_to_string(&state_path) {
            Ok(raw) => match serde_json::from_str::<StoredSession>(&raw) {
                Ok(session) => {
                    info!(user = %session.user.username, "Restored persisted session");
                    Some(session)
                }
                Err(e) => {
                    warn!(error = %e, path = %state_path.display(), "Ignoring corrupt session state");
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            state_path,
            current: RwLock::new(current),
        }
    }

    /// Creates an empty, non-persisting session (useful for tests).
    pub fn ephemeral() -> Self {
        Self {
            state_path: PathBuf::new(),
            current: RwLock::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.token.clone()))
    }

    pub fn user(&self) -> Option<User> {
        self.current
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.user.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Stores the token and profile returned by a successful login and
    /// persists them.
    pub fn login(&self, token: impl Into<String>, user: User) -> Result<(), ServiceError> {
        let session = StoredSession {
            token: token.into(),
            user,
        };
        self.persist(&session)?;
        if let Ok(mut guard) = self.current.write() {
            *guard = Some(session);
        }
        Ok(())
    }

    /// Clears the in-memory session and removes the state file.
    pub fn logout(&self) {
        if let Ok(mut guard) = self.current.write() {
            *guard = None;
        }
        if !self.state_path.as_os_str().is_empty() {
            if let Err(e) = std::fs::remove_file(&self.state_path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(error = %e, "Failed to remove session state file");
                }
            }
        }
    }

    fn persist(&self, session: &StoredSession) -> Result<(), ServiceError> {
        if self.state_path.as_os_str().is_empty() {
            return Ok(());
        }
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.state_path, raw)
            .map_err(|e| ServiceError::InternalError(format!("failed to persist session: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "admin".into(),
            full_name: "Admin".into(),
            email: "admin@example.com".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn login_persists_and_logout_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let session = AuthSession::load(&path);
        assert!(!session.is_authenticated());

        session.login("token-abc", sample_user()).unwrap();
        assert_eq!(session.token().as_deref(), Some("token-abc"));
        assert!(path.exists());

        // A fresh load picks the persisted session back up.
        let restored = AuthSession::load(&path);
        assert_eq!(restored.user().unwrap().username, "admin");

        restored.logout();
        assert!(!restored.is_authenticated());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_state_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let session = AuthSession::load(&path);
        assert!(!session.is_authenticated());
    }
}
