//! Provider error types.

use std::io;
use thiserror::Error;

/// Flat classification of a provider failure.
///
/// Callers (the dispatch layer) map these onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NotAFile,
    AlreadyExists,
    AccessDenied,
    /// A `..` segment survived normalization. A subtype of `AccessDenied`.
    PathTraversal,
    TooLarge,
    ExternalCommandFailed,
    BackendUnavailable,
    UnknownBackend,
    Io,
}

impl ErrorKind {
    /// Returns true for `AccessDenied` and its `PathTraversal` subtype.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ErrorKind::AccessDenied | ErrorKind::PathTraversal)
    }
}

/// Provider error type.
#[derive(Debug, Error)]
pub enum FsError {
    /// Nothing exists at the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Expected a file, found a directory.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// Path already occupied.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Path resolves outside the provider's root, or the OS refused access.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Path contains a `..` segment.
    #[error("directory traversal not allowed: {0}")]
    PathTraversal(String),

    /// File exceeds the read ceiling.
    #[error("file too large to read: {path} is {size} bytes (max {limit})")]
    TooLarge { path: String, size: u64, limit: u64 },

    /// The invoked command ran and reported failure.
    #[error("command `{command}` failed (status {status:?}): {stderr}")]
    ExternalCommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Liveness precheck failed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// No provider registered under this name.
    #[error("unknown backend {name:?} (available: {})", available.join(", "))]
    UnknownBackend {
        name: String,
        available: Vec<String>,
    },

    /// Unclassified I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: impl Into<String>) -> Self {
        Self::NotAFile(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create an AccessDenied error.
    pub fn access_denied(path: impl Into<String>) -> Self {
        Self::AccessDenied(path.into())
    }

    /// Create a PathTraversal error.
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal(path.into())
    }

    /// Create a BackendUnavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Classify an `io::Error` raised while operating on `path`.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            // A file standing in for a directory component: nothing is there.
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Self::NotFound(path),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            io::ErrorKind::PermissionDenied => Self::AccessDenied(format!("{path}: {source}")),
            io::ErrorKind::IsADirectory => Self::NotAFile(path),
            _ => Self::Io { path, source },
        }
    }

    /// The flat classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::NotAFile(_) => ErrorKind::NotAFile,
            FsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            FsError::AccessDenied(_) => ErrorKind::AccessDenied,
            FsError::PathTraversal(_) => ErrorKind::PathTraversal,
            FsError::TooLarge { .. } => ErrorKind::TooLarge,
            FsError::ExternalCommandFailed { .. } => ErrorKind::ExternalCommandFailed,
            FsError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            FsError::UnknownBackend { .. } => ErrorKind::UnknownBackend,
            FsError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Provider result type.
pub type FsResult<T> = Result<T, FsError>;
