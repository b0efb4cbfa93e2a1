//! Provider configuration, read once from the process environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;

pub const DEFAULT_WORKSPACE_ROOT: &str = "/home/coder/project";
pub const DEFAULT_TARGET_CONTAINER: &str = "workspace";
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";
pub const DEFAULT_REMOTE_HOST: &str = "localhost";
pub const DEFAULT_REMOTE_PORT: u16 = 22;
pub const DEFAULT_REMOTE_USER: &str = "user";

/// A malformed environment value.
#[derive(Debug, Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Configuration for every provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    pub local: LocalConfig,
    pub container: ContainerConfig,
    pub remote: RemoteConfig,
}

impl WorkbenchConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read from an arbitrary variable lookup. Unset variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let local = LocalConfig {
            root: var("WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE_ROOT)),
        };

        let fallback = match var("CONTAINER_MOCK_FALLBACK") {
            None => ContainerFallback::MockData,
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => ContainerFallback::MockData,
                "0" | "false" | "no" | "off" => ContainerFallback::Disabled,
                _ => {
                    return Err(ConfigError {
                        var: "CONTAINER_MOCK_FALLBACK",
                        value: v,
                        reason: "expected a boolean".into(),
                    });
                }
            },
        };

        let container = ContainerConfig {
            runtime: var("CONTAINER_RUNTIME").unwrap_or_else(|| DEFAULT_CONTAINER_RUNTIME.into()),
            container_name: var("TARGET_CONTAINER")
                .unwrap_or_else(|| DEFAULT_TARGET_CONTAINER.into()),
            fallback,
        };

        let port = match var("REMOTE_PORT") {
            None => DEFAULT_REMOTE_PORT,
            Some(v) => v.trim().parse::<u16>().map_err(|e| ConfigError {
                var: "REMOTE_PORT",
                value: v.clone(),
                reason: e.to_string(),
            })?,
        };

        let protocol = match var("REMOTE_PROTOCOL") {
            None => RemoteProtocol::Ssh,
            Some(v) => v.trim().parse::<RemoteProtocol>().map_err(|_| ConfigError {
                var: "REMOTE_PROTOCOL",
                value: v.clone(),
                reason: "expected one of ssh, ftp, webdav".into(),
            })?,
        };

        let remote = RemoteConfig {
            host: var("REMOTE_HOST").unwrap_or_else(|| DEFAULT_REMOTE_HOST.into()),
            port,
            username: var("REMOTE_USER").unwrap_or_else(|| DEFAULT_REMOTE_USER.into()),
            protocol,
            latency: RemoteLatency::default(),
        };

        Ok(Self {
            local,
            container,
            remote,
        })
    }
}

/// Local provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Sandbox root; every caller path resolves strictly inside it.
    pub root: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_WORKSPACE_ROOT),
        }
    }
}

/// What container reads do when the target is absent or stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFallback {
    /// Serve the fixed mock table.
    #[default]
    MockData,
    /// Surface `BackendUnavailable`.
    Disabled,
}

/// Container provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Runtime CLI (`docker`, `podman`).
    pub runtime: String,
    /// The one container this provider targets.
    pub container_name: String,
    pub fallback: ContainerFallback,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_CONTAINER_RUNTIME.into(),
            container_name: DEFAULT_TARGET_CONTAINER.into(),
            fallback: ContainerFallback::MockData,
        }
    }
}

/// Protocol a remote host would speak. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RemoteProtocol {
    Ssh,
    Ftp,
    Webdav,
}

/// Simulated network delay per operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLatency {
    pub list: Duration,
    pub read: Duration,
    pub create: Duration,
    pub delete: Duration,
    pub connect: Duration,
    pub disconnect: Duration,
}

impl Default for RemoteLatency {
    fn default() -> Self {
        Self {
            list: Duration::from_millis(200),
            read: Duration::from_millis(300),
            create: Duration::from_millis(400),
            delete: Duration::from_millis(300),
            connect: Duration::from_millis(500),
            disconnect: Duration::from_millis(100),
        }
    }
}

impl RemoteLatency {
    /// Every operation delayed by the same amount.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            list: delay,
            read: delay,
            create: delay,
            delete: delay,
            connect: delay,
            disconnect: delay,
        }
    }
}

/// Remote provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub protocol: RemoteProtocol,
    #[serde(default)]
    pub latency: RemoteLatency,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REMOTE_HOST.into(),
            port: DEFAULT_REMOTE_PORT,
            username: DEFAULT_REMOTE_USER.into(),
            protocol: RemoteProtocol::Ssh,
            latency: RemoteLatency::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WorkbenchConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.local.root, PathBuf::from(DEFAULT_WORKSPACE_ROOT));
        assert_eq!(config.container.container_name, "workspace");
        assert_eq!(config.container.runtime, "docker");
        assert_eq!(config.container.fallback, ContainerFallback::MockData);
        assert_eq!(config.remote.port, 22);
        assert_eq!(config.remote.protocol, RemoteProtocol::Ssh);
    }

    #[test]
    fn test_overrides() {
        let config = WorkbenchConfig::from_lookup(lookup(&[
            ("WORKSPACE_ROOT", "/srv/ws"),
            ("TARGET_CONTAINER", "dev-box"),
            ("CONTAINER_RUNTIME", "podman"),
            ("CONTAINER_MOCK_FALLBACK", "off"),
            ("REMOTE_HOST", "files.internal"),
            ("REMOTE_PORT", "2222"),
            ("REMOTE_USER", "amy"),
            ("REMOTE_PROTOCOL", "WebDAV"),
        ]))
        .unwrap();

        assert_eq!(config.local.root, PathBuf::from("/srv/ws"));
        assert_eq!(config.container.container_name, "dev-box");
        assert_eq!(config.container.runtime, "podman");
        assert_eq!(config.container.fallback, ContainerFallback::Disabled);
        assert_eq!(config.remote.host, "files.internal");
        assert_eq!(config.remote.port, 2222);
        assert_eq!(config.remote.username, "amy");
        assert_eq!(config.remote.protocol, RemoteProtocol::Webdav);
    }

    #[test]
    fn test_empty_values_take_defaults() {
        let config = WorkbenchConfig::from_lookup(lookup(&[("TARGET_CONTAINER", "  ")])).unwrap();
        assert_eq!(config.container.container_name, "workspace");
    }

    #[test]
    fn test_invalid_values() {
        let err = WorkbenchConfig::from_lookup(lookup(&[("REMOTE_PORT", "ssh")])).unwrap_err();
        assert_eq!(err.var, "REMOTE_PORT");

        let err =
            WorkbenchConfig::from_lookup(lookup(&[("REMOTE_PROTOCOL", "gopher")])).unwrap_err();
        assert_eq!(err.var, "REMOTE_PROTOCOL");

        let err = WorkbenchConfig::from_lookup(lookup(&[("CONTAINER_MOCK_FALLBACK", "maybe")]))
            .unwrap_err();
        assert_eq!(err.var, "CONTAINER_MOCK_FALLBACK");
    }
}
