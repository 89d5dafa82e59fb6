//! JSON file implementation of [`TokenStore`]

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;
use reportflow_core::TokenStore;
use reportflow_domain::constants::DEFAULT_TOKEN_PATH;
use reportflow_domain::{IssuedToken, Result, Token};
use tracing::{debug, instrument};

use crate::errors::InfraError;

/// Persists the current token as a single JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<file name>.tmp` next to the token file.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_PATH)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Token> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| InfraError::token_read(&self.path, err))?;

        let token = serde_json::from_str(&contents)
            .map_err(|err| InfraError::token_decode(&self.path, err))?;
        Ok(token)
    }

    /// Written to a sibling temp file and renamed over the target; a crash
    /// mid-write leaves the previous token in place.
    #[instrument(skip(self, issued), fields(path = %self.path.display()))]
    async fn dump(&self, issued: IssuedToken, now: i64) -> Result<Token> {
        let token = Token::from_issued(issued, now);
        let payload =
            serde_json::to_vec(&token).map_err(|err| InfraError::token_write(&self.path, err))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| InfraError::token_write(&self.path, err))?;
        }

        let staging = self.staging_path();
        if let Err(err) = tokio::fs::write(&staging, payload).await {
            return Err(InfraError::token_write(&self.path, err).into());
        }
        if let Err(err) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(InfraError::token_write(&self.path, err).into());
        }

        debug!(expires_at = token.expires_at, "token persisted");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use reportflow_domain::ReportFlowError;
    use tempfile::TempDir;

    use super::*;

    fn issued() -> IssuedToken {
        IssuedToken {
            access_token: "access-1".into(),
            refresh_token: "refresh-1".into(),
            expires_in: 36_000,
            scope: "create_reports manage_reports".into(),
            token_type: "Bearer".into(),
        }
    }

    #[tokio::test]
    async fn dump_then_load_round_trips_all_fields() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("dm_token.json"));

        let written = store.dump(issued(), 1_700_000_000).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, written);
        assert_eq!(loaded.access_token, "access-1");
        assert_eq!(loaded.refresh_token, "refresh-1");
        assert_eq!(loaded.expires_at, 1_700_036_000);
        assert_eq!(loaded.scope, "create_reports manage_reports");
        assert_eq!(loaded.token_type, "Bearer");
    }

    #[tokio::test]
    async fn on_disk_format_stores_absolute_expiry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dm_token.json");
        let store = FileTokenStore::new(&path);

        store.dump(issued(), 100).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["expires_in"], 36_100);
        assert_eq!(raw.as_object().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn dump_overwrites_previous_token() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("dm_token.json"));

        store.dump(issued(), 0).await.unwrap();
        let mut second = issued();
        second.access_token = "access-2".into();
        store.dump(second, 0).await.unwrap();

        assert_eq!(store.load().await.unwrap().access_token, "access-2");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("absent.json"));

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ReportFlowError::NotFound(_)));
    }

    #[tokio::test]
    async fn garbage_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dm_token.json");
        std::fs::write(&path, "{\"access_token\": ").unwrap();

        let err = FileTokenStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ReportFlowError::MalformedData(_)));
    }

    #[tokio::test]
    async fn incomplete_token_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dm_token.json");
        std::fs::write(&path, r#"{"access_token": "a", "token_type": "Bearer"}"#).unwrap();

        let err = FileTokenStore::new(&path).load().await.unwrap_err();
        assert_eq!(err.code(), 4000);
    }

    #[tokio::test]
    async fn missing_parent_directories_are_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("dm_token.json");
        let store = FileTokenStore::new(&path);

        store.dump(issued(), 0).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn unwritable_location_is_a_storage_write_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = FileTokenStore::new(blocker.join("dm_token.json"));

        let err = store.dump(issued(), 0).await.unwrap_err();
        assert!(matches!(err, ReportFlowError::StorageWrite { .. }));
    }

    #[tokio::test]
    async fn unreadable_store_is_a_storage_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dm_token.json");
        std::fs::create_dir(&path).unwrap();

        let err = FileTokenStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ReportFlowError::StorageRead { .. }), "got {err:?}");
        assert_eq!(err.code(), 4000);
    }

    #[tokio::test]
    async fn dump_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dm_token.json");
        let store = FileTokenStore::new(&path);

        store.dump(issued(), 0).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("dm_token.json")]);
    }

    #[tokio::test]
    async fn interrupted_write_keeps_previous_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dm_token.json");
        let store = FileTokenStore::new(&path);
        store.dump(issued(), 0).await.unwrap();

        // a crash between write and rename leaves only a partial staging file
        std::fs::write(store.staging_path(), "{\"access_token\": ").unwrap();

        assert_eq!(store.load().await.unwrap().access_token, "access-1");
        let mut second = issued();
        second.access_token = "access-2".into();
        store.dump(second, 0).await.unwrap();
        assert_eq!(store.load().await.unwrap().access_token, "access-2");
    }
}
