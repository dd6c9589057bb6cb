//! Token persistence: one string under one fixed key.
//!
//! Presence or absence of the persisted token is the sole signal of a
//! "remembered session" across app restarts. The [`TokenStore`] trait keeps
//! the storage mechanism swappable — a file on disk in production, memory
//! in tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::SessionError;

/// The fixed key (file name) the token is stored under.
pub const TOKEN_FILE_NAME: &str = "access_token";

/// Persists the raw access token across restarts.
pub trait TokenStore: Send + Sync + 'static {
    /// Reads the persisted token, if any.
    fn load(&self) -> Result<Option<String>, SessionError>;

    /// Persists the token, replacing any previous one.
    fn save(&self, token: &str) -> Result<(), SessionError>;

    /// Removes the persisted token. A no-op when nothing is stored.
    fn clear(&self) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// FileTokenStore
// ---------------------------------------------------------------------------

/// A [`TokenStore`] keeping the token in a single file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store writing to `<dir>/access_token`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_FILE_NAME),
        }
    }

    /// The full path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::StoreFailed(e)),
        }
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(SessionError::StoreFailed)?;
        }
        std::fs::write(&self.path, token).map_err(SessionError::StoreFailed)
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::StoreFailed(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryTokenStore
// ---------------------------------------------------------------------------

/// An in-memory [`TokenStore`] for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with a token, as if one had been
    /// persisted by a previous run.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.token.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FileTokenStore {
        let dir = std::env::temp_dir().join(format!(
            "agora-store-test-{}-{:p}",
            std::process::id(),
            &TOKEN_FILE_NAME
        ));
        FileTokenStore::new(dir)
    }

    #[test]
    fn test_memory_store_save_load_clear() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save("tok-1").unwrap();
        assert_eq!(store.load().unwrap(), Some("tok-1".to_string()));

        store.save("tok-2").unwrap();
        assert_eq!(store.load().unwrap(), Some("tok-2".to_string()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store_with_token_preseeds() {
        let store = MemoryTokenStore::with_token("remembered");
        assert_eq!(store.load().unwrap(), Some("remembered".to_string()));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let store = temp_store();
        let _ = store.clear();

        assert_eq!(store.load().unwrap(), None);
        store.save("tok-abc").unwrap();
        assert_eq!(store.load().unwrap(), Some("tok-abc".to_string()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let store = temp_store();
        let _ = store.clear();
        store.clear().expect("clearing an empty store is a no-op");
        store.clear().expect("and so is clearing it again");
    }

    #[test]
    fn test_file_store_trims_whitespace() {
        let store = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "  tok-x\n").unwrap();
        assert_eq!(store.load().unwrap(), Some("tok-x".to_string()));
        store.clear().unwrap();
    }
}
