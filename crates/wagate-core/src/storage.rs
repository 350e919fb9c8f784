// ── Persistent token storage ──
//
// A session survives process restarts by writing its bearer token to a
// backend under the fixed key `token`. The trait is synchronous: every
// backend is a small local read or write.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::CoreError;

/// Key the token is stored under.
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Somewhere to keep the bearer token between runs.
pub trait TokenStorage: Send + Sync {
    /// Read the stored token. `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<SecretString>, CoreError>;

    /// Replace the stored token.
    fn store(&self, token: &SecretString) -> Result<(), CoreError>;

    /// Remove the stored token. Removing nothing is not an error.
    fn clear(&self) -> Result<(), CoreError>;
}

// ── In-memory ────────────────────────────────────────────────────────

/// Process-local storage. Used by tests and one-shot invocations.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, CoreError> {
        self.token.lock().map_err(|_| CoreError::Storage {
            message: "in-memory token slot poisoned".into(),
        })
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        Ok(self.slot()?.clone().map(SecretString::from))
    }

    fn store(&self, token: &SecretString) -> Result<(), CoreError> {
        *self.slot()? = Some(token.expose_secret().to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.slot()? = None;
        Ok(())
    }
}

// ── File ─────────────────────────────────────────────────────────────

/// Stores the token as a plain file named [`TOKEN_STORAGE_KEY`] inside a
/// directory (normally the per-profile data dir).
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_STORAGE_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::Storage {
        message: format!("failed to {action} {}: {err}", path.display()),
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(SecretString::from(token.to_owned())))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &self.path, &e)),
        }
    }

    fn store(&self, token: &SecretString) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create", parent, &e))?;
        }
        fs::write(&self.path, token.expose_secret()).map_err(|e| io_error("write", &self.path, &e))?;
        restrict_permissions(&self.path)?;
        debug!(path = %self.path.display(), "token persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &self.path, &e)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| io_error("chmod", path, &e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}
