//! The file system provider contract.

use async_trait::async_trait;

use crate::error::FsResult;
use crate::types::{DirectoryEntry, ItemKind, OperationResult, ProviderDescriptor};

/// Largest file any provider will return from `get_file_content`.
pub const MAX_CONTENT_BYTES: u64 = 10 * 1024 * 1024;

/// Uniform list/read/create/delete over one storage backend.
///
/// Paths are posix strings relative to the provider's root or scope.
/// Implementations are independent per call: no operation leaves state
/// behind that another call can observe, apart from the storage itself.
#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    /// Static metadata, fixed at construction.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Registry key (e.g. "local", "container").
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// List the entries at `path`, folders first.
    ///
    /// A path naming a single file yields a one-element listing for it.
    async fn list_files(&self, path: &str) -> FsResult<Vec<DirectoryEntry>>;

    /// Read a file's full contents as text.
    async fn get_file_content(&self, path: &str) -> FsResult<String>;

    /// Create a file (with `content`) or a folder (`content` ignored).
    ///
    /// Fails with `AlreadyExists` without touching anything if `path` is
    /// occupied.
    async fn create_item(
        &self,
        path: &str,
        kind: ItemKind,
        content: &str,
    ) -> FsResult<OperationResult>;

    /// Recursively delete whatever is at `path`.
    async fn delete_item(&self, path: &str) -> FsResult<OperationResult>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// List the provider's root.
    async fn list_root(&self) -> FsResult<Vec<DirectoryEntry>> {
        self.list_files("/").await
    }
}
