//! Local persistence of the user id returned by registration.
//!
//! The OTP step reads the id back, so it must survive between the submit
//! and verify calls (and across restarts of the terminal driver).

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SessionError;

/// Storage for the single registered user id.
#[async_trait]
pub trait UserIdStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, SessionError>;

    async fn save(&self, user_id: &str) -> Result<(), SessionError>;

    async fn clear(&self) -> Result<(), SessionError>;
}

/// Keeps the id in a small text file.
pub struct FileUserIdStore {
    path: PathBuf,
}

impl FileUserIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl UserIdStore for FileUserIdStore {
    async fn load(&self) -> Result<Option<String>, SessionError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let id = contents.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, user_id: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, user_id).await?;
        debug!(path = %self.path.display(), "Saved user id");
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryUserIdStore {
    user_id: RwLock<Option<String>>,
}

impl MemoryUserIdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserIdStore for MemoryUserIdStore {
    async fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.user_id.read().await.clone())
    }

    async fn save(&self, user_id: &str) -> Result<(), SessionError> {
        *self.user_id.write().await = Some(user_id.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.user_id.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserIdStore::new(dir.path().join("nested/user_id"));

        assert_eq!(store.load().await.unwrap(), None);
        store.save("usr_42").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("usr_42"));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_store_ignores_blank_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_id");
        tokio::fs::write(&path, "  \n").await.unwrap();
        assert_eq!(FileUserIdStore::new(path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryUserIdStore::new();
        assert_eq!(store.load().await.unwrap(), None);
        store.save("abc").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("abc"));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
