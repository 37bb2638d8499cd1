// The logged-in user, mirrored to a JSON file so it survives restarts.
//
// This is the only code that reads or writes the session file. Everything
// else asks the store (or the process-wide holder below) for a snapshot.

use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::SessionError;
use crate::models::UserSession;

#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: RwLock<Option<UserSession>>,
}

impl SessionStore {
    /// Reads the stored session if there is one. A corrupt file is logged and
    /// treated as logged out rather than failing startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let current = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<UserSession>(&raw) {
                Ok(session) => {
                    tracing::info!(user_id = session.user_id, "Restored saved session");
                    Some(session)
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Option<UserSession> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    // The in-memory session is updated even if persisting it fails
    pub fn login(&self, session: UserSession) -> Result<(), SessionError> {
        let raw = serde_json::to_string_pretty(&session)?;
        let user_id = session.user_id;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(session);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, raw)?;
        tracing::info!(user_id, path = %self.path.display(), "Session saved");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.current.write().unwrap_or_else(PoisonError::into_inner).take();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!("Session cleared");
        Ok(())
    }
}

static GLOBAL: OnceCell<Arc<SessionStore>> = OnceCell::new();

/// Installs the process-wide session store. Later calls return the store
/// from the first successful call and ignore `path`.
pub fn init(path: impl Into<PathBuf>) -> Result<Arc<SessionStore>, SessionError> {
    GLOBAL
        .get_or_try_init(|| SessionStore::open(path).map(Arc::new))
        .cloned()
}

pub fn global() -> Option<Arc<SessionStore>> {
    GLOBAL.get().cloned()
}
