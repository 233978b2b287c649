//! File-backed credential store.
//!
//! The blob lives at `{auth_dir}/creds.bin`. Writes go to a sibling temp
//! file first and are moved into place with a rename, so a crash mid-write
//! leaves the previous blob intact.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{StorageError, StorageResult};
use crate::store::CredentialStore;

/// File name of the persisted blob inside the auth directory.
pub const CREDENTIALS_FILE: &str = "creds.bin";

const TEMP_SUFFIX: &str = "tmp";

/// Credential store that keeps the blob in a single file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The auth directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the blob file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.path().with_extension(TEMP_SUFFIX)
    }

    async fn ensure_dir(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(0o700)).await?;
        }
        Ok(())
    }

    async fn write_temp(&self, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> StorageResult<Option<Credentials>> {
        let path = self.path();

        let meta = match tokio::fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if meta.file_type().is_symlink() {
            return Err(StorageError::Internal(format!(
                "refusing to read credentials: {} is a symlink",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(&path).await?;
        if bytes.is_empty() {
            debug!(path = %path.display(), "Credentials file is empty; treating as absent");
            return Ok(None);
        }

        debug!(path = %path.display(), len = bytes.len(), "Loaded credentials");
        Ok(Some(Credentials::new(bytes)))
    }

    async fn save(&self, credentials: &Credentials) -> StorageResult<()> {
        self.ensure_dir().await?;

        let temp = self.temp_path();
        let path = self.path();
        if let Err(e) = self.write_temp(&temp, credentials.as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        tokio::fs::rename(&temp, &path).await?;

        debug!(path = %path.display(), len = credentials.len(), "Saved credentials");
        Ok(())
    }

    async fn clear(&self) -> StorageResult<bool> {
        match tokio::fs::remove_file(self.path()).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
