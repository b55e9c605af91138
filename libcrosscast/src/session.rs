//! Persistence for the Telegram user-session token
//!
//! The MTProto login handshake is interactive, so its result is cached as a
//! serialized session string. The store is injected into the Telegram adapter
//! so the adapter can be exercised without touching disk.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::{resolve_session_path, Config};
use crate::error::{Result, SessionError};

/// Load/save capability for a serialized session string
pub trait SessionStore: Send + Sync {
    /// Returns `None` when no session has been saved yet
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, session: &str) -> Result<()>;
}

/// Session stored in a single file
///
/// Without an explicit path the default location is resolved on each
/// `load`/`save`, so a host with no data directory only fails once the
/// user-session scheme actually needs the file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: Option<PathBuf>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Store at the configured override or the data-directory default
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.session_file.clone(),
        }
    }

    pub fn path(&self) -> Result<PathBuf> {
        resolve_session_path(self.path.as_deref())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>> {
        let path = self.path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    tracing::debug!("Loaded session from {}", path.display());
                    Ok(Some(trimmed.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Read(e).into()),
        }
    }

    fn save(&self, session: &str) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SessionError::Write)?;
        }

        std::fs::write(&path, session).map_err(SessionError::Write)?;

        // The session grants full account access; keep it owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .map_err(SessionError::Write)?;
        }

        tracing::debug!("Saved session to {}", path.display());
        Ok(())
    }
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: &str) -> Self {
        Self {
            session: Mutex::new(Some(session.to_string())),
            saves: Mutex::new(0),
        }
    }

    /// Number of times `save` has been called
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.session.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, session: &str) -> Result<()> {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.to_string());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_file_loads_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path().join("absent.session"));

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("tg.session");
        let store = FileSessionStore::new(&path);

        store.save("c2Vzc2lvbg==").unwrap();

        assert!(path.exists());
        assert_eq!(store.load().unwrap(), Some("c2Vzc2lvbg==".to_string()));
    }

    #[test]
    fn test_file_store_empty_file_loads_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.session");
        std::fs::write(&path, "\n").unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tg.session");
        FileSessionStore::new(&path).save("abc").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_store_from_config_uses_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("override.session");
        let config = Config::from_lookup(|key| {
            (key == crate::config::SESSION_FILE_ENV).then(|| path.to_string_lossy().to_string())
        })
        .unwrap();

        let store = FileSessionStore::from_config(&config);
        store.save("xyz").unwrap();

        assert_eq!(store.path().unwrap(), path);
        assert_eq!(store.load().unwrap(), Some("xyz".to_string()));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save("one").unwrap();
        store.save("two").unwrap();

        assert_eq!(store.load().unwrap(), Some("two".to_string()));
        assert_eq!(store.save_count(), 2);
    }
}
