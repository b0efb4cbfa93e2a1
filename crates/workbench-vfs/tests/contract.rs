//! Contract tests run against every provider through `dyn FileSystemProvider`.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use workbench_vfs::config::{ContainerConfig, RemoteConfig};
use workbench_vfs::{
    CommandOutput, CommandSpec, ContainerProvider, EntryType, ErrorKind, FileSystemProvider,
    ItemKind, LocalProvider, ProcessInvoker, ProviderRegistry, RemoteLatency, RemoteProvider,
    WorkbenchConfig, listing_order,
};

// ============================================================================
// Shared test setup
// ============================================================================

/// A runtime whose target container does not exist.
struct AbsentContainer;

#[async_trait]
impl ProcessInvoker for AbsentContainer {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        assert_eq!(spec.args[0], "inspect", "only the precheck may run");
        Ok(CommandOutput {
            status: Some(1),
            stdout: Vec::new(),
            stderr: "Error: No such container: workspace".into(),
        })
    }
}

fn providers(dir: &TempDir) -> Vec<Arc<dyn FileSystemProvider>> {
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::create_dir(dir.path().join("Docs")).unwrap();
    std::fs::write(dir.path().join("README.md"), "# readme").unwrap();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();

    vec![
        Arc::new(LocalProvider::new(dir.path())),
        Arc::new(ContainerProvider::with_invoker(
            &ContainerConfig::default(),
            Arc::new(AbsentContainer),
        )),
        Arc::new(
            RemoteProvider::new(RemoteConfig::default())
                .with_latency(RemoteLatency::uniform(Duration::ZERO)),
        ),
    ]
}

// ============================================================================
// Contract properties
// ============================================================================

#[tokio::test]
async fn root_listing_is_sorted_on_every_provider() {
    let dir = TempDir::new().unwrap();
    for provider in providers(&dir) {
        let entries = provider.list_root().await.unwrap();
        assert!(!entries.is_empty(), "{} listed nothing", provider.name());

        for pair in entries.windows(2) {
            assert_ne!(
                listing_order(&pair[0], &pair[1]),
                std::cmp::Ordering::Greater,
                "{}: {:?} listed before {:?}",
                provider.name(),
                pair[0].name,
                pair[1].name
            );
        }

        for entry in &entries {
            assert!(entry.path.starts_with('/'));
            assert!(!entry.name.contains('/'));
            assert!(entry.name != "." && entry.name != "..");
            assert_eq!(entry.size.is_some(), entry.entry_type == EntryType::File);
        }
    }
}

#[tokio::test]
async fn descriptors_are_distinct() {
    let dir = TempDir::new().unwrap();
    let names: Vec<String> = providers(&dir)
        .iter()
        .map(|p| p.descriptor().name.clone())
        .collect();
    assert_eq!(names, ["local", "container", "remote"]);
}

#[tokio::test]
async fn traversal_is_rejected_by_local_and_remote() {
    let dir = TempDir::new().unwrap();
    let all = providers(&dir);
    for provider in [&all[0], &all[2]] {
        let err = provider.get_file_content("/../secret").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversal, "{}", provider.name());
        assert!(err.kind().is_access_denied());
    }
}

// ============================================================================
// Local round trips
// ============================================================================

#[tokio::test]
async fn local_create_then_read_round_trips() {
    let dir = TempDir::new().unwrap();
    let local = LocalProvider::new(dir.path());

    local
        .create_item("/deep/nested/p.txt", ItemKind::File, "hello")
        .await
        .unwrap();
    assert_eq!(local.get_file_content("/deep/nested/p.txt").await.unwrap(), "hello");

    let err = local
        .create_item("/deep/nested/p.txt", ItemKind::File, "bye")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(local.get_file_content("/deep/nested/p.txt").await.unwrap(), "hello");

    local.delete_item("/deep").await.unwrap();
    for _ in 0..2 {
        let err = local.delete_item("/deep").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn local_concurrent_requests_are_independent() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(LocalProvider::new(dir.path()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let local = local.clone();
            tokio::spawn(async move {
                let path = format!("/batch/file-{i}.txt");
                local
                    .create_item(&path, ItemKind::File, &format!("body {i}"))
                    .await
                    .unwrap();
                local.get_file_content(&path).await.unwrap()
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), format!("body {i}"));
    }

    let entries = local.list_files("/batch").await.unwrap();
    assert_eq!(entries.len(), 16);
}

// ============================================================================
// Container fallback
// ============================================================================

#[tokio::test]
async fn absent_container_serves_mock_reads_and_rejects_writes() {
    let container = ContainerProvider::with_invoker(
        &ContainerConfig::default(),
        Arc::new(AbsentContainer),
    );

    let entries = container.list_files("/").await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["app", "etc", "home", "tmp", "var"]);

    let err = container
        .create_item("/tmp/new.txt", ItemKind::File, "x")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);

    let err = container.delete_item("/tmp").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
}

// ============================================================================
// Registry dispatch
// ============================================================================

#[tokio::test]
async fn registry_dispatches_by_name() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hello.md"), "hi").unwrap();

    let config = WorkbenchConfig::from_lookup(|var| match var {
        "WORKSPACE_ROOT" => Some(dir.path().display().to_string()),
        _ => None,
    })
    .unwrap();
    let registry = ProviderRegistry::from_config(&config);

    let local = registry.require("local").unwrap();
    assert_eq!(local.get_file_content("/hello.md").await.unwrap(), "hi");

    let err = registry.require("webdav").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::UnknownBackend);
}
