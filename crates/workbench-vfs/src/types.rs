//! Core provider types.
//!
//! Everything here is created per request and serializes to the shape the
//! dispatch layer hands to the web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use strum::{Display, EnumString};

/// Entry type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryType {
    /// Regular file (or anything that is not a directory).
    File,
    /// Directory.
    Folder,
}

impl EntryType {
    /// Returns true if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, EntryType::Folder)
    }
}

/// What `create_item` should make.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ItemKind {
    #[default]
    File,
    Folder,
}

/// Operations a provider advertises.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Delete,
    Create,
}

impl Capability {
    /// The full capability set.
    pub fn all() -> BTreeSet<Capability> {
        [
            Capability::Read,
            Capability::Write,
            Capability::Delete,
            Capability::Create,
        ]
        .into_iter()
        .collect()
    }
}

/// Best-effort capability triple. Not a security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

impl Permissions {
    /// Derive from the owner bits of a unix mode.
    pub fn from_mode(mode: u32, is_folder: bool) -> Self {
        Self {
            readable: mode & 0o400 != 0,
            writable: mode & 0o200 != 0,
            executable: is_folder || mode & 0o111 != 0,
        }
    }

    /// Derive from a long-listing permission string such as `-rwxr-xr-x`.
    ///
    /// Returns `None` when the string is too short to carry owner bits.
    pub fn from_symbolic(perms: &str) -> Option<Self> {
        let owner = perms.as_bytes().get(1..4)?;
        Some(Self {
            readable: owner[0] == b'r',
            writable: owner[1] == b'w',
            executable: matches!(owner[2], b'x' | b's' | b't'),
        })
    }
}

/// One file-system object as seen by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Leaf name, no separators.
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Backend-relative path, always `/`-rooted with posix separators.
    pub path: String,
    /// Byte count; only present for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl DirectoryEntry {
    /// Create a file entry.
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::File,
            path: path.into(),
            size: Some(size),
            modified_at: None,
            permissions: None,
        }
    }

    /// Create a folder entry.
    pub fn folder(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::Folder,
            path: path.into(),
            size: None,
            modified_at: None,
            permissions: None,
        }
    }

    /// Set the modification time.
    pub fn with_modified(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    /// Set the permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.entry_type.is_folder()
    }
}

/// Listing order: folders first, then case-insensitive by name.
///
/// Names equal under case folding fall back to byte order so the result
/// is deterministic.
pub fn listing_order(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort a listing in place per [`listing_order`].
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(listing_order);
}

/// Static metadata describing a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub description: String,
    pub capabilities: BTreeSet<Capability>,
}

impl ProviderDescriptor {
    /// Descriptor advertising every capability.
    pub fn full(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            capabilities: Capability::all(),
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Which provider produced an [`OperationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceTag {
    Container,
    Remote,
}

/// Mutation performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Created,
    Deleted,
}

/// Result of `create_item` / `delete_item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub path: String,
    pub action: Action,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    pub timestamp: DateTime<Utc>,
    /// Absent for the local provider.
    #[serde(rename = "source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceTag>,
}

impl OperationResult {
    /// A creation stamped now.
    pub fn created(path: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            path: path.into(),
            action: Action::Created,
            kind: Some(kind),
            timestamp: Utc::now(),
            source: None,
        }
    }

    /// A deletion stamped now.
    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            action: Action::Deleted,
            kind: None,
            timestamp: Utc::now(),
            source: None,
        }
    }

    /// Tag the producing provider.
    pub fn from_source(mut self, source: SourceTag) -> Self {
        self.source = Some(source);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_order() {
        let mut entries = vec![
            DirectoryEntry::file("b.txt", "/b.txt", 1),
            DirectoryEntry::folder("A", "/A"),
            DirectoryEntry::file("a.txt", "/a.txt", 1),
            DirectoryEntry::folder("B", "/B"),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_listing_order_ignores_case() {
        let mut entries = vec![
            DirectoryEntry::file("beta", "/beta", 1),
            DirectoryEntry::file("Alpha", "/Alpha", 1),
            DirectoryEntry::file("alpha", "/alpha", 1),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!("folder".parse::<ItemKind>().unwrap(), ItemKind::Folder);
        assert_eq!("FILE".parse::<ItemKind>().unwrap(), ItemKind::File);
        assert!("symlink".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_permissions() {
        let p = Permissions::from_symbolic("-rw-r--r--").unwrap();
        assert!(p.readable && p.writable && !p.executable);

        let p = Permissions::from_symbolic("drwxr-xr-x").unwrap();
        assert!(p.executable);

        assert!(Permissions::from_symbolic("d").is_none());

        let p = Permissions::from_mode(0o555, false);
        assert!(p.readable && !p.writable && p.executable);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = DirectoryEntry::folder("src", "/src");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "folder");
        assert!(json.get("size").is_none());

        let entry = DirectoryEntry::file("a.txt", "/a.txt", 5);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["size"], 5);
    }

    #[test]
    fn test_operation_result_source() {
        let local = OperationResult::created("/a", ItemKind::File);
        let json = serde_json::to_value(&local).unwrap();
        assert!(json.get("source").is_none());

        let remote = OperationResult::deleted("/a").from_source(SourceTag::Remote);
        let json = serde_json::to_value(&remote).unwrap();
        assert_eq!(json["source"], "remote");
        assert_eq!(json["action"], "deleted");
        assert!(json.get("type").is_none());
    }
}
