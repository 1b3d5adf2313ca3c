//! On-disk persistence for the session token

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The file format, versioned by being a struct rather than a bare string.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
}

/// Reads and writes the single persisted token file.
///
/// The store is deliberately forgiving on the read side: a missing file is
/// "no session", and an unreadable or corrupt file is logged and treated the
/// same way rather than failing startup.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        TokenStore { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// The persisted token, if a readable one exists.
    pub fn load(&self) -> Option<String> {
        if !self.path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to read session file");
                return None;
            }
        };
        match serde_json::from_str::<PersistedSession>(&content) {
            Ok(persisted) => Some(persisted.token),
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Corrupt session file, ignoring");
                None
            }
        }
    }

    /// Write the token, creating the data directory on first use.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = PersistedSession {
            token: token.to_string(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&persisted)?)?;
        Ok(())
    }

    /// Remove the persisted token. Absence is fine.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load(), None);
        store.save("tok-abc").unwrap();
        assert_eq!(store.load().as_deref(), Some("tok-abc"));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().as_deref(), Some("second"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("session.json"));

        store.save("tok-abc").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);

        // Clearing again is not an error
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = TokenStore::new(path);
        assert_eq!(store.load(), None);
    }
}
