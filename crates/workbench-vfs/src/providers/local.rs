//! Local filesystem provider.
//!
//! Operates on a sandboxed root directory with direct file I/O. Every
//! caller path goes through [`SandboxRoot::resolve`] before it touches disk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::LocalConfig;
use crate::error::{FsError, FsResult};
use crate::path::{self, SandboxRoot};
use crate::provider::{FileSystemProvider, MAX_CONTENT_BYTES};
use crate::types::{
    DirectoryEntry, ItemKind, OperationResult, Permissions, ProviderDescriptor, sort_entries,
};

/// Local filesystem provider.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/home/coder/project`, then `get_file_content("/src/main.rs")` reads
/// `/home/coder/project/src/main.rs`.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root: SandboxRoot,
    descriptor: ProviderDescriptor,
}

impl LocalProvider {
    /// Create a provider rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: SandboxRoot::new(root),
            descriptor: ProviderDescriptor::full("local", "Local file system"),
        }
    }

    pub fn from_config(config: &LocalConfig) -> Self {
        Self::new(config.root.clone())
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Build an entry from host metadata.
    fn entry_from_metadata(
        name: String,
        caller_path: String,
        meta: &std::fs::Metadata,
    ) -> DirectoryEntry {
        let mut entry = if meta.is_dir() {
            DirectoryEntry::folder(name, caller_path)
        } else {
            DirectoryEntry::file(name, caller_path, meta.len())
        };
        if let Ok(modified) = meta.modified() {
            entry = entry.with_modified(DateTime::<Utc>::from(modified));
        }
        entry.with_permissions(Self::permissions(meta))
    }

    #[cfg(unix)]
    fn permissions(meta: &std::fs::Metadata) -> Permissions {
        use std::os::unix::fs::PermissionsExt;
        Permissions::from_mode(meta.permissions().mode(), meta.is_dir())
    }

    #[cfg(not(unix))]
    fn permissions(meta: &std::fs::Metadata) -> Permissions {
        Permissions {
            readable: true,
            writable: !meta.permissions().readonly(),
            executable: meta.is_dir(),
        }
    }

    /// Stat one directory child. Failures are the caller's to skip.
    async fn stat_child(
        dir: &Path,
        caller_dir: &str,
        name: String,
    ) -> Result<DirectoryEntry, (String, std::io::Error)> {
        let meta = match fs::metadata(dir.join(&name)).await {
            Ok(meta) => meta,
            Err(e) => return Err((name, e)),
        };
        let caller_path = path::join(caller_dir, &name);
        Ok(Self::entry_from_metadata(name, caller_path, &meta))
    }

    /// The nearest existing ancestor of `full_path` must be a folder.
    ///
    /// A file in that position means nothing can exist at `caller_path`,
    /// which is a missing location rather than a collision.
    async fn require_folder_parent(&self, caller_path: &str, full_path: &Path) -> FsResult<()> {
        for ancestor in full_path.ancestors().skip(1) {
            match fs::metadata(ancestor).await {
                Ok(meta) if meta.is_dir() => return Ok(()),
                Ok(_) => {
                    let blocking = ancestor
                        .strip_prefix(self.root.path())
                        .map(|rel| {
                            rel.iter()
                                .map(|c| c.to_string_lossy())
                                .collect::<Vec<_>>()
                                .join("/")
                        })
                        .unwrap_or_default();
                    return Err(FsError::not_found(format!(
                        "{caller_path} (/{blocking} is a file)"
                    )));
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(FsError::io(caller_path, e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystemProvider for LocalProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn list_files(&self, path: &str) -> FsResult<Vec<DirectoryEntry>> {
        let caller_path = path::normalize(path)?;
        let full_path = self.root.resolve(&caller_path)?;
        debug!(path = %caller_path, "local list");

        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| FsError::io(&caller_path, e))?;

        if !meta.is_dir() {
            let name = path::basename(&caller_path).to_string();
            return Ok(vec![Self::entry_from_metadata(name, caller_path, &meta)]);
        }

        let mut names = Vec::new();
        let mut dir = fs::read_dir(&full_path)
            .await
            .map_err(|e| FsError::io(&caller_path, e))?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| FsError::io(&caller_path, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        // Children may vanish or change under us; a failed stat skips
        // that child and the rest of the listing stands.
        let stats = join_all(
            names
                .into_iter()
                .map(|name| Self::stat_child(&full_path, &caller_path, name)),
        )
        .await;

        let mut entries = Vec::with_capacity(stats.len());
        for stat in stats {
            match stat {
                Ok(entry) => entries.push(entry),
                Err((name, e)) => {
                    warn!(dir = %caller_path, entry = %name, error = %e, "skipping unreadable entry");
                }
            }
        }

        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn get_file_content(&self, path: &str) -> FsResult<String> {
        let caller_path = path::normalize(path)?;
        let full_path = self.root.resolve(&caller_path)?;
        debug!(path = %caller_path, "local read");

        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| FsError::io(&caller_path, e))?;
        if !meta.is_file() {
            return Err(FsError::not_a_file(caller_path));
        }
        if meta.len() > MAX_CONTENT_BYTES {
            return Err(FsError::TooLarge {
                path: caller_path,
                size: meta.len(),
                limit: MAX_CONTENT_BYTES,
            });
        }

        // The file may have grown since the stat.
        let bytes = read_capped(&full_path, MAX_CONTENT_BYTES)
            .await
            .map_err(|e| FsError::io(&caller_path, e))?;
        if bytes.len() as u64 > MAX_CONTENT_BYTES {
            return Err(FsError::TooLarge {
                path: caller_path,
                size: bytes.len() as u64,
                limit: MAX_CONTENT_BYTES,
            });
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn create_item(
        &self,
        path: &str,
        kind: ItemKind,
        content: &str,
    ) -> FsResult<OperationResult> {
        let caller_path = path::normalize(path)?;
        let full_path = self.root.resolve(&caller_path)?;
        debug!(path = %caller_path, %kind, "local create");

        if fs::symlink_metadata(&full_path).await.is_ok() {
            return Err(FsError::already_exists(caller_path));
        }

        self.require_folder_parent(&caller_path, &full_path).await?;

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::io(&caller_path, e))?;
        }

        let made = match kind {
            ItemKind::Folder => fs::create_dir(&full_path).await,
            ItemKind::File => write_new(&full_path, content.as_bytes()).await,
        };
        made.map_err(|e| FsError::io(&caller_path, e))?;

        Ok(OperationResult::created(caller_path, kind))
    }

    async fn delete_item(&self, path: &str) -> FsResult<OperationResult> {
        let caller_path = path::normalize(path)?;
        let full_path = self.root.resolve(&caller_path)?;
        debug!(path = %caller_path, "local delete");

        if full_path == self.root.path() {
            return Err(FsError::access_denied("refusing to delete the workspace root"));
        }

        let meta = fs::symlink_metadata(&full_path)
            .await
            .map_err(|e| FsError::io(&caller_path, e))?;

        let removed = if meta.is_dir() {
            fs::remove_dir_all(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        };
        removed.map_err(|e| FsError::io(&caller_path, e))?;

        Ok(OperationResult::deleted(caller_path))
    }
}

/// Read at most `limit + 1` bytes, so an oversized file shows as such
/// without being loaded whole.
async fn read_capped(path: &Path, limit: u64) -> std::io::Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;

    let file = fs::File::open(path).await?;
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .await?;
    Ok(bytes)
}

/// Write a file that must not already exist.
///
/// `create_new` closes the gap between the caller's existence check and
/// the write: a racing creator makes this fail instead of clobbering.
async fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
