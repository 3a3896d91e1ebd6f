use std::path::PathBuf;

use tracing::{debug, warn};

/// Durable home for the server-issued session identifier.
///
/// The identifier survives process restarts so a later cleanup
/// notification can still be tagged with it, the way page-scoped storage
/// survives reloads. All operations are best-effort; a broken state file
/// never takes the client down.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Last stored identifier, if any.
    pub fn load(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let id = raw.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    /// Persist the identifier, replacing whatever was stored before.
    pub fn save(&self, session_id: &str) {
        match std::fs::write(&self.path, session_id) {
            Ok(()) => debug!(path = %self.path.display(), "session identifier stored"),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "failed to store session identifier");
            }
        }
    }

    /// Forget the stored identifier.
    pub fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (SessionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.id"));
        (store, dir)
    }

    #[test]
    fn missing_file_loads_none() {
        let (store, _dir) = temp_store();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (store, _dir) = temp_store();
        store.save("S123");
        assert_eq!(store.load(), Some("S123".to_string()));
        store.save("S456");
        assert_eq!(store.load(), Some("S456".to_string()));
    }

    #[test]
    fn load_trims_whitespace() {
        let (store, _dir) = temp_store();
        std::fs::write(store.path.clone(), "  S123\n").unwrap();
        assert_eq!(store.load(), Some("S123".to_string()));
    }

    #[test]
    fn empty_file_loads_none() {
        let (store, _dir) = temp_store();
        std::fs::write(store.path.clone(), "\n").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_removes_the_identifier() {
        let (store, _dir) = temp_store();
        store.save("S123");
        store.clear();
        assert_eq!(store.load(), None);
        // Clearing twice is fine.
        store.clear();
    }
}
