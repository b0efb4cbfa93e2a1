//! Simulated remote filesystem provider.
//!
//! Stands in for a networked backend (SSH, FTP, WebDAV): a small fixed
//! tree, extension-keyed content templates, and a per-operation delay that
//! models round-trip latency. Connection parameters are displayed only.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{RemoteConfig, RemoteLatency, RemoteProtocol};
use crate::error::{FsError, FsResult};
use crate::path;
use crate::provider::FileSystemProvider;
use crate::types::{
    DirectoryEntry, ItemKind, OperationResult, ProviderDescriptor, SourceTag, sort_entries,
};

/// `(folder, children)`; a child with a size is a file.
const TREE: &[(&str, &[(&str, Option<u64>)])] = &[
    (
        "/",
        &[
            ("remote-config.yml", Some(1024)),
            ("data", None),
            ("scripts", None),
            ("logs", None),
            ("README-remote.md", Some(2048)),
        ],
    ),
    (
        "/data",
        &[
            ("database.json", Some(5120)),
            ("exports", None),
            ("cache", None),
        ],
    ),
    (
        "/scripts",
        &[
            ("deploy.sh", Some(1536)),
            ("backup.js", Some(2048)),
            ("utils", None),
        ],
    ),
    (
        "/logs",
        &[
            ("app.log", Some(10240)),
            ("error.log", Some(2048)),
            ("access.log", Some(15360)),
        ],
    ),
];

/// What sits at a path in the simulated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Folder,
    File(u64),
}

/// Result of `connect` / `disconnect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub protocol: RemoteProtocol,
}

/// Simulated remote provider.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    config: RemoteConfig,
    descriptor: ProviderDescriptor,
}

impl RemoteProvider {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            descriptor: ProviderDescriptor::full(
                "remote",
                format!(
                    "Remote file system ({}://{}@{}:{})",
                    config.protocol, config.username, config.host, config.port
                ),
            ),
            config,
        }
    }

    /// Replace the latency profile.
    pub fn with_latency(mut self, latency: RemoteLatency) -> Self {
        self.config.latency = latency;
        self
    }

    pub fn latency(&self) -> &RemoteLatency {
        &self.config.latency
    }

    /// Establish a (simulated) session. Other operations never require it.
    pub async fn connect(&self) -> FsResult<ConnectionState> {
        info!(
            protocol = %self.config.protocol,
            host = %self.config.host,
            port = self.config.port,
            "connecting to remote system"
        );
        simulate(self.config.latency.connect).await;
        Ok(self.state(true))
    }

    /// Tear down the (simulated) session.
    pub async fn disconnect(&self) -> FsResult<ConnectionState> {
        info!(host = %self.config.host, "disconnecting from remote system");
        simulate(self.config.latency.disconnect).await;
        Ok(self.state(false))
    }

    fn state(&self, connected: bool) -> ConnectionState {
        ConnectionState {
            connected,
            host: self.config.host.clone(),
            port: self.config.port,
            username: self.config.username.clone(),
            protocol: self.config.protocol,
        }
    }

    fn lookup(target: &str) -> Option<Node> {
        if TREE.iter().any(|(dir, _)| *dir == target) {
            return Some(Node::Folder);
        }
        TREE.iter().find_map(|(dir, children)| {
            children.iter().find_map(|(name, size)| {
                (path::join(dir, name) == target).then(|| match size {
                    Some(size) => Node::File(*size),
                    None => Node::Folder,
                })
            })
        })
    }

    fn entry(dir: &str, name: &str, size: Option<u64>) -> DirectoryEntry {
        let full = path::join(dir, name);
        let entry = match size {
            Some(size) => DirectoryEntry::file(name, full, size),
            None => DirectoryEntry::folder(name, full),
        };
        entry.with_modified(Utc::now())
    }

    /// Template text for a file, chosen by extension.
    fn render(target: &str) -> String {
        let name = path::basename(target);
        match path::extension(target).as_deref() {
            Some("md") => format!(
                "# Remote File: {name}\n\nThis is content from a remote file system.\n\nPath: {target}"
            ),
            Some("js") | Some("sh") => format!(
                "// Remote script: {name}\n// Path: {target}\nconsole.log('Hello from remote file system!');"
            ),
            Some("json") => {
                let doc = serde_json::json!({
                    "name": name,
                    "source": "remote",
                    "path": target,
                    "timestamp": Utc::now().to_rfc3339(),
                });
                serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string())
            }
            Some("yml") | Some("yaml") => format!(
                "# Remote YAML file: {name}\n# Path: {target}\nversion: '3.8'\nservices:\n  app:\n    image: nginx:alpine\n    ports:\n      - \"80:80\""
            ),
            _ => format!(
                "Remote file content for: {name}\nPath: {target}\nSource: Remote File System"
            ),
        }
    }
}

async fn simulate(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl FileSystemProvider for RemoteProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn list_files(&self, path: &str) -> FsResult<Vec<DirectoryEntry>> {
        let target = path::normalize(path)?;
        debug!(path = %target, "remote list");
        simulate(self.config.latency.list).await;

        if let Some((dir, children)) = TREE.iter().find(|(dir, _)| *dir == target) {
            let mut entries: Vec<_> = children
                .iter()
                .map(|(name, size)| Self::entry(dir, name, *size))
                .collect();
            sort_entries(&mut entries);
            return Ok(entries);
        }

        match Self::lookup(&target) {
            // A leaf folder of the simulated tree: known, but empty.
            Some(Node::Folder) => Ok(Vec::new()),
            Some(Node::File(size)) => {
                let name = path::basename(&target).to_string();
                Ok(vec![
                    DirectoryEntry::file(name, target.clone(), size).with_modified(Utc::now()),
                ])
            }
            None => Err(FsError::not_found(target)),
        }
    }

    async fn get_file_content(&self, path: &str) -> FsResult<String> {
        let target = path::normalize(path)?;
        debug!(path = %target, "remote read");
        simulate(self.config.latency.read).await;

        if Self::lookup(&target) == Some(Node::Folder) {
            return Err(FsError::not_a_file(target));
        }
        Ok(Self::render(&target))
    }

    async fn create_item(
        &self,
        path: &str,
        kind: ItemKind,
        _content: &str,
    ) -> FsResult<OperationResult> {
        let target = path::normalize(path)?;
        debug!(path = %target, %kind, "remote create");
        simulate(self.config.latency.create).await;

        if Self::lookup(&target).is_some() {
            return Err(FsError::already_exists(target));
        }
        Ok(OperationResult::created(target, kind).from_source(SourceTag::Remote))
    }

    async fn delete_item(&self, path: &str) -> FsResult<OperationResult> {
        let target = path::normalize(path)?;
        debug!(path = %target, "remote delete");
        simulate(self.config.latency.delete).await;

        if target == "/" {
            return Err(FsError::access_denied("refusing to delete the remote root"));
        }
        if Self::lookup(&target).is_none() {
            return Err(FsError::not_found(target));
        }
        Ok(OperationResult::deleted(target).from_source(SourceTag::Remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::EntryType;
    use std::time::Instant;

    fn fast() -> RemoteProvider {
        RemoteProvider::new(RemoteConfig::default()).with_latency(RemoteLatency::uniform(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_root_listing() {
        let entries = fast().list_files("/").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["data", "logs", "scripts", "README-remote.md", "remote-config.yml"]
        );
        assert!(entries[..3].iter().all(|e| e.entry_type == EntryType::Folder));
        assert_eq!(entries[3].path, "/README-remote.md");
    }

    #[tokio::test]
    async fn test_listing_shapes() {
        let p = fast();

        let entries = p.list_files("/logs/app.log").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, Some(10240));

        assert!(p.list_files("/data/cache").await.unwrap().is_empty());

        let err = p.list_files("/nowhere").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = p.list_files("/data/../..").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversal);
    }

    #[tokio::test]
    async fn test_content_templates() {
        let p = fast();

        let md = p.get_file_content("/x.md").await.unwrap();
        assert!(md.contains("/x.md"));
        assert!(md.starts_with("# Remote File: x.md"));

        let json = p.get_file_content("/data/database.json").await.unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(doc["name"], "database.json");
        assert_eq!(doc["source"], "remote");

        let yaml = p.get_file_content("/remote-config.yml").await.unwrap();
        assert!(yaml.contains("services:"));

        let other = p.get_file_content("/notes.txt").await.unwrap();
        assert!(other.contains("Remote file content for: notes.txt"));

        let err = p.get_file_content("/scripts").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAFile);
    }

    #[tokio::test]
    async fn test_mutations() {
        let p = fast();

        let created = p.create_item("/data/new.csv", ItemKind::File, "a,b").await.unwrap();
        assert_eq!(created.source, Some(SourceTag::Remote));
        assert_eq!(created.kind, Some(ItemKind::File));

        let err = p.create_item("/logs", ItemKind::Folder, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let deleted = p.delete_item("/logs/app.log").await.unwrap();
        assert_eq!(deleted.path, "/logs/app.log");

        for _ in 0..2 {
            let err = p.delete_item("/logs/none.log").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let latency = RemoteLatency {
            list: Duration::from_millis(60),
            read: Duration::from_millis(40),
            ..RemoteLatency::uniform(Duration::ZERO)
        };
        let p = RemoteProvider::new(RemoteConfig::default()).with_latency(latency);

        let started = Instant::now();
        p.list_files("/").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));

        let started = Instant::now();
        p.get_file_content("/x.md").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_default_latency_profile() {
        let p = RemoteProvider::new(RemoteConfig::default());
        let started = Instant::now();
        p.list_files("/").await.unwrap();
        assert!(started.elapsed() >= p.latency().list);
    }

    #[tokio::test]
    async fn test_connect_disconnect() {
        let config = RemoteConfig {
            host: "files.example".into(),
            protocol: RemoteProtocol::Webdav,
            ..RemoteConfig::default()
        };
        let p = RemoteProvider::new(config).with_latency(RemoteLatency::uniform(Duration::ZERO));

        let state = p.connect().await.unwrap();
        assert!(state.connected);
        assert_eq!(state.host, "files.example");
        assert_eq!(state.protocol, RemoteProtocol::Webdav);

        let state = p.disconnect().await.unwrap();
        assert!(!state.connected);

        assert!(p.descriptor().description.contains("webdav://user@files.example:22"));
    }
}
