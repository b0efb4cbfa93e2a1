//! # workbench-vfs
//!
//! One file-browsing contract over heterogeneous storage.
//!
//! - [`FileSystemProvider`] - list/read/create/delete, identical across backends
//! - [`LocalProvider`] - a sandboxed directory on this host
//! - [`ContainerProvider`] - one running container, via the runtime CLI
//! - [`RemoteProvider`] - a simulated network filesystem with artificial latency
//! - [`ProviderRegistry`] - name → provider dispatch, built once at startup
//!
//! ## Design Decisions
//!
//! - **Posix caller paths**: callers always see `/`-rooted, `/`-separated
//!   paths; only the local provider maps them onto host paths.
//! - **Fail closed on traversal**: a `..` segment is an error, never clamped.
//! - **No shell between caller text and a process**: container commands are
//!   argument vectors; content travels on stdin.
//! - **Typed fallback**: the container mock fallback keys off a [`Liveness`]
//!   value, not error text.

pub mod config;
mod error;
pub mod listing;
pub mod path;
pub mod process;
mod provider;
pub mod providers;
mod registry;
mod types;

pub use config::{ConfigError, ContainerFallback, RemoteLatency, RemoteProtocol, WorkbenchConfig};
pub use error::{ErrorKind, FsError, FsResult};
pub use listing::ListingParser;
pub use process::{CommandOutput, CommandSpec, ProcessInvoker, TokioInvoker};
pub use provider::{FileSystemProvider, MAX_CONTENT_BYTES};
pub use providers::{ConnectionState, ContainerProvider, Liveness, LocalProvider, RemoteProvider};
pub use registry::ProviderRegistry;
pub use types::{
    Action, Capability, DirectoryEntry, EntryType, ItemKind, OperationResult, Permissions,
    ProviderDescriptor, SourceTag, listing_order, sort_entries,
};
