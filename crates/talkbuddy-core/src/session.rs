use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Result, TutorError};

/// Storage key the session identifier lives under
pub const SESSION_KEY: &str = "english-talk-buddy-session-id";

const STORAGE_FILE: &str = "storage.json";

/// String key/value store persisted as a JSON object on disk.
///
/// Every call reads or rewrites the file, so separate handles on the same
/// directory always agree.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Storage in the platform data directory (`~/.local/share/talkbuddy` on Linux).
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| TutorError::Config("Could not determine data directory".to_string()))?;
        Ok(Self::in_dir(data_dir.join("talkbuddy")))
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(items)?)?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Per-profile session identifier shared with the backend on every request
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: LocalStorage,
}

impl SessionStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Stored identifier, or a fresh v4 UUID persisted for next time.
    pub fn get_or_create_session_id(&self) -> Result<String> {
        if let Some(existing) = self.storage.get_item(SESSION_KEY)? {
            if !existing.is_empty() {
                return Ok(existing);
            }
        }

        let session_id = Uuid::new_v4().to_string();
        self.storage.set_item(SESSION_KEY, &session_id)?;
        tracing::info!(%session_id, "created new session id");
        Ok(session_id)
    }

    /// Read-only lookup; never creates an identifier.
    pub fn session_id(&self) -> Result<Option<String>> {
        self.storage.get_item(SESSION_KEY)
    }

    /// Forget the identifier so the next conversation starts a new backend session.
    pub fn reset(&self) -> Result<()> {
        self.storage.remove_item(SESSION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::new(LocalStorage::in_dir(dir.path()))
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = store.get_or_create_session_id().unwrap();
        let second = store.get_or_create_session_id().unwrap();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_clearing_storage_yields_new_id() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::in_dir(dir.path());
        let store = SessionStore::new(storage.clone());

        let first = store.get_or_create_session_id().unwrap();
        storage.clear().unwrap();
        let second = store.get_or_create_session_id().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_session_id_never_creates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.session_id().unwrap(), None);
        assert!(!dir.path().join(STORAGE_FILE).exists());

        let created = store.get_or_create_session_id().unwrap();
        assert_eq!(store.session_id().unwrap(), Some(created));
    }

    #[test]
    fn test_separate_handles_agree() {
        let dir = TempDir::new().unwrap();
        let id = store_in(&dir).get_or_create_session_id().unwrap();
        assert_eq!(store_in(&dir).get_or_create_session_id().unwrap(), id);
    }

    #[test]
    fn test_reset_removes_only_session_key() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::in_dir(dir.path());
        storage.set_item("theme", "dark").unwrap();

        let store = SessionStore::new(storage.clone());
        store.get_or_create_session_id().unwrap();
        store.reset().unwrap();

        assert_eq!(store.session_id().unwrap(), None);
        assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_corrupt_storage_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), "{not json").unwrap();
        let store = store_in(&dir);
        assert!(matches!(
            store.get_or_create_session_id(),
            Err(TutorError::Encoding(_))
        ));
    }
}
