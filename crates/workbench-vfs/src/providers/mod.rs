//! Provider implementations.
//!
//! Each implements [`FileSystemProvider`](crate::FileSystemProvider) over a
//! different transport.

mod container;
mod local;
mod remote;

pub use container::{ContainerProvider, Liveness};
pub use local::LocalProvider;
pub use remote::{ConnectionState, RemoteProvider};
