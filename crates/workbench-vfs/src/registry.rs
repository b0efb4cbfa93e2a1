//! Name → provider dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::WorkbenchConfig;
use crate::error::{FsError, FsResult};
use crate::provider::FileSystemProvider;
use crate::providers::{ContainerProvider, LocalProvider, RemoteProvider};
use crate::types::ProviderDescriptor;

/// Registry of file system providers.
///
/// Built once at startup and shared by reference; providers inside are
/// immutable, so the registry needs no locking.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn FileSystemProvider>>,
    default_provider: Option<String>,
    container: Option<Arc<ContainerProvider>>,
    remote: Option<Arc<RemoteProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("default_provider", &self.default_provider)
            .finish()
    }
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard three providers, with `local` as the default.
    pub fn from_config(config: &WorkbenchConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LocalProvider::from_config(&config.local)));
        registry.register_container(Arc::new(ContainerProvider::new(&config.container)));
        registry.register_remote(Arc::new(RemoteProvider::new(config.remote.clone())));
        registry.set_default("local");
        registry
    }

    /// Register a provider under its descriptor name, replacing any
    /// previous holder of that name.
    pub fn register(&mut self, provider: Arc<dyn FileSystemProvider>) {
        let name = provider.name().to_string();
        self.providers.insert(name, provider);
    }

    /// Register a container provider, keeping its typed handle.
    pub fn register_container(&mut self, provider: Arc<ContainerProvider>) {
        self.register(provider.clone());
        self.container = Some(provider);
    }

    /// Register a remote provider, keeping its typed handle.
    pub fn register_remote(&mut self, provider: Arc<RemoteProvider>) {
        self.register(provider.clone());
        self.remote = Some(provider);
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn FileSystemProvider>> {
        self.providers.get(name).cloned()
    }

    /// Get a provider by name, failing with `UnknownBackend`.
    pub fn require(&self, name: &str) -> FsResult<Arc<dyn FileSystemProvider>> {
        self.get(name).ok_or_else(|| FsError::UnknownBackend {
            name: name.to_string(),
            available: self.names().into_iter().map(String::from).collect(),
        })
    }

    /// Set the default provider.
    pub fn set_default(&mut self, name: &str) -> bool {
        if self.providers.contains_key(name) {
            self.default_provider = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn FileSystemProvider>> {
        self.default_provider
            .as_ref()
            .and_then(|name| self.get(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Every provider's descriptor, sorted by name.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .values()
            .map(|p| p.descriptor().clone())
            .collect()
    }

    /// The container provider, for runtime introspection.
    pub fn container(&self) -> Option<Arc<ContainerProvider>> {
        self.container.clone()
    }

    /// The remote provider, for its connect/disconnect lifecycle.
    pub fn remote(&self) -> Option<Arc<RemoteProvider>> {
        self.remote.clone()
    }
}
