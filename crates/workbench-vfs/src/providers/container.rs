//! Container filesystem provider.
//!
//! Reaches into one named, already-running container through the runtime
//! CLI (`docker exec`, `podman exec`). The target name comes from
//! configuration only; callers cannot pick a container.
//!
//! ## Command construction
//!
//! Every command is an argument vector. Where a shell is needed (output
//! redirection, `dirname`), the script is a constant and the caller's path
//! is passed as `$1`, so no caller text is ever parsed by a shell. File
//! content travels on stdin.
//!
//! ## Liveness
//!
//! Each operation first inspects the container. When it is missing or
//! stopped, reads fall back to a fixed mock table (if configured) while
//! writes fail with `BackendUnavailable`.

use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ContainerConfig, ContainerFallback};
use crate::error::{FsError, FsResult};
use crate::listing::ListingParser;
use crate::path;
use crate::process::{CommandOutput, CommandSpec, ProcessInvoker, TokioInvoker};
use crate::provider::{FileSystemProvider, MAX_CONTENT_BYTES};
use crate::types::{DirectoryEntry, ItemKind, OperationResult, ProviderDescriptor, SourceTag};

/// Exit 0 if `$1` exists (dangling symlinks included).
pub(crate) const EXISTS_SCRIPT: &str = r#"[ -e "$1" ] || [ -L "$1" ]"#;

/// Exit status of the create scripts when the parent folder cannot be made.
pub(crate) const PARENT_FAILED: i32 = 3;

/// Write stdin to `$1`, creating parents. Noclobber makes an existing
/// target fail rather than be overwritten.
pub(crate) const CREATE_FILE_SCRIPT: &str =
    r#"set -C; mkdir -p -- "$(dirname -- "$1")" || exit 3; cat > "$1""#;

/// Create folder `$1`, creating parents. Fails if `$1` exists.
pub(crate) const CREATE_FOLDER_SCRIPT: &str =
    r#"mkdir -p -- "$(dirname -- "$1")" || exit 3; mkdir -- "$1""#;

/// Recursively remove `$1`.
pub(crate) const DELETE_SCRIPT: &str = r#"rm -rf -- "$1""#;

/// Container liveness as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Liveness {
    Running,
    /// Exists but is not running.
    Stopped,
    /// The runtime does not know the container.
    Missing,
    /// The runtime CLI itself could not be started.
    RuntimeMissing,
}

impl Liveness {
    pub fn is_running(&self) -> bool {
        matches!(self, Liveness::Running)
    }
}

/// Container filesystem provider.
pub struct ContainerProvider {
    runtime: String,
    container: String,
    fallback: ContainerFallback,
    invoker: Arc<dyn ProcessInvoker>,
    descriptor: ProviderDescriptor,
}

impl std::fmt::Debug for ContainerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerProvider")
            .field("runtime", &self.runtime)
            .field("container", &self.container)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ContainerProvider {
    /// Create a provider that shells out through `tokio::process`.
    pub fn new(config: &ContainerConfig) -> Self {
        Self::with_invoker(config, Arc::new(TokioInvoker))
    }

    /// Create a provider with a custom command runner.
    pub fn with_invoker(config: &ContainerConfig, invoker: Arc<dyn ProcessInvoker>) -> Self {
        Self {
            runtime: config.runtime.clone(),
            container: config.container_name.clone(),
            fallback: config.fallback,
            invoker,
            descriptor: ProviderDescriptor::full(
                "container",
                format!(
                    "Container file system ({} exec into {})",
                    config.runtime, config.container_name
                ),
            ),
        }
    }

    /// The target container's name.
    pub fn container(&self) -> &str {
        &self.container
    }

    // ========================================================================
    // Runtime introspection
    // ========================================================================

    /// Ask the runtime whether the target container is running.
    ///
    /// Failures other than "no such container" or a missing runtime
    /// binary (e.g. an unreachable daemon) are errors, not a liveness state.
    pub async fn check_container(&self) -> FsResult<Liveness> {
        let spec = CommandSpec::new(&self.runtime).args([
            "inspect",
            "--format",
            "{{.State.Running}}",
            self.container.as_str(),
        ]);

        let out = match self.invoker.run(&spec).await {
            Ok(out) => out,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Liveness::RuntimeMissing);
            }
            Err(e) => return Err(FsError::io(spec.to_string(), e)),
        };

        if out.success() {
            return Ok(if out.stdout_text().trim() == "true" {
                Liveness::Running
            } else {
                Liveness::Stopped
            });
        }

        // Docker says "No such container", podman and `docker inspect`
        // without a type say "no such object".
        let stderr = out.stderr.to_ascii_lowercase();
        if stderr.contains("no such container") || stderr.contains("no such object") {
            return Ok(Liveness::Missing);
        }
        Err(command_failed(&spec, &out))
    }

    /// Full runtime description of the target container.
    pub async fn inspect(&self) -> FsResult<serde_json::Value> {
        let spec = CommandSpec::new(&self.runtime).args([
            "inspect",
            "--format",
            "{{json .}}",
            self.container.as_str(),
        ]);
        let out = self.run(&spec).await?;
        if !out.success() {
            return Err(command_failed(&spec, &out));
        }
        serde_json::from_slice(&out.stdout).map_err(|e| FsError::ExternalCommandFailed {
            command: spec.to_string(),
            status: out.status,
            stderr: format!("unparseable inspect output: {e}"),
        })
    }

    /// Names of all running containers.
    pub async fn running_containers(&self) -> FsResult<Vec<String>> {
        let spec = CommandSpec::new(&self.runtime).args(["ps", "--format", "{{.Names}}"]);
        let out = self.run(&spec).await?;
        if !out.success() {
            return Err(command_failed(&spec, &out));
        }
        Ok(out
            .stdout_text()
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Run a command; a runtime binary that can't be spawned means the
    /// backend is unavailable.
    async fn run(&self, spec: &CommandSpec) -> FsResult<CommandOutput> {
        match self.invoker.run(spec).await {
            Ok(out) => Ok(out),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FsError::unavailable(format!(
                "container runtime {:?} not found",
                self.runtime
            ))),
            Err(e) => Err(FsError::io(spec.to_string(), e)),
        }
    }

    /// `<runtime> exec [-i] -e LC_ALL=C <container> <args...>`
    ///
    /// The C locale keeps `ls` columns and error messages stable.
    fn exec<I, S>(&self, args: I, interactive: bool) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = CommandSpec::new(&self.runtime).arg("exec");
        if interactive {
            spec = spec.arg("-i");
        }
        spec.args(["-e", "LC_ALL=C"])
            .arg(&self.container)
            .args(args)
    }

    /// `sh -c <script> sh <path>` inside the container.
    fn exec_script(&self, script: &str, target: &str, interactive: bool) -> CommandSpec {
        self.exec(["sh", "-c", script, "sh", target], interactive)
    }

    /// Describe the container when it is not running.
    fn unavailable(&self, liveness: Liveness) -> FsError {
        FsError::unavailable(format!(
            "container {:?} is not available ({liveness})",
            self.container
        ))
    }

    /// Precheck for writes: anything but a running container fails.
    async fn require_running(&self) -> FsResult<()> {
        match self.check_container().await? {
            Liveness::Running => Ok(()),
            other => Err(self.unavailable(other)),
        }
    }

    /// Precheck for reads. `Ok(false)` means serve mock data.
    async fn live_or_fallback(&self) -> FsResult<bool> {
        match self.check_container().await? {
            Liveness::Running => Ok(true),
            other => match self.fallback {
                ContainerFallback::MockData => {
                    info!(container = %self.container, liveness = %other, "container not available, using mock data");
                    Ok(false)
                }
                ContainerFallback::Disabled => Err(self.unavailable(other)),
            },
        }
    }

    async fn exists(&self, target: &str) -> FsResult<bool> {
        let spec = self.exec_script(EXISTS_SCRIPT, target, false);
        let out = self.run(&spec).await?;
        match out.status {
            Some(0) => Ok(true),
            Some(1) if out.stderr.trim().is_empty() => Ok(false),
            _ => Err(classify_failure(&spec, &out, target)),
        }
    }

    fn tag(result: OperationResult) -> OperationResult {
        result.from_source(SourceTag::Container)
    }
}

/// Map a failed in-container command onto the error taxonomy.
///
/// Messages come from the C locale, so the coreutils/busybox wording is
/// stable.
fn classify_failure(spec: &CommandSpec, out: &CommandOutput, target: &str) -> FsError {
    let stderr = out.stderr.as_str();
    if stderr.contains("No such file or directory") {
        FsError::not_found(target)
    } else if stderr.contains("Is a directory") {
        FsError::not_a_file(target)
    } else if stderr.contains("File exists") || stderr.contains("cannot overwrite existing file") {
        FsError::already_exists(target)
    } else if stderr.contains("Permission denied") {
        FsError::access_denied(format!("{target}: {}", stderr.trim()))
    } else {
        command_failed(spec, out)
    }
}

/// The parent of `target` could not be made. "File exists" here names an
/// ancestor that is a file, so nothing can be created at `target`.
fn parent_failure(out: &CommandOutput, target: &str) -> FsError {
    let stderr = out.stderr.trim();
    if stderr.contains("Permission denied") {
        FsError::access_denied(format!("{target}: {stderr}"))
    } else {
        FsError::not_found(format!("{target}: {stderr}"))
    }
}

fn command_failed(spec: &CommandSpec, out: &CommandOutput) -> FsError {
    FsError::ExternalCommandFailed {
        command: spec.to_string(),
        status: out.status,
        stderr: out.stderr.trim().to_string(),
    }
}

#[async_trait]
impl FileSystemProvider for ContainerProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn list_files(&self, path: &str) -> FsResult<Vec<DirectoryEntry>> {
        let target = path::resolve_lexical(path);
        debug!(container = %self.container, path = %target, "container list");

        if !self.live_or_fallback().await? {
            return Ok(mock::listing(&target));
        }

        // -H: a symlinked folder lists its contents, not the link.
        let spec = self.exec(["ls", "-laH", "--", target.as_str()], false);
        let out = self.run(&spec).await?;
        if !out.success() {
            return Err(classify_failure(&spec, &out, &target));
        }
        if !out.stderr.trim().is_empty() {
            warn!(container = %self.container, stderr = %out.stderr.trim(), "ls reported diagnostics");
        }

        Ok(ListingParser::new().parse(&out.stdout_text(), &target))
    }

    async fn get_file_content(&self, path: &str) -> FsResult<String> {
        let target = path::resolve_lexical(path);
        debug!(container = %self.container, path = %target, "container read");

        if !self.live_or_fallback().await? {
            return Ok(mock::content(&target, &self.container));
        }

        // Size and type first, so an oversized file never crosses the pipe.
        let spec = self.exec(["stat", "-L", "-c", "%s %F", "--", target.as_str()], false);
        let out = self.run(&spec).await?;
        if !out.success() {
            return Err(classify_failure(&spec, &out, &target));
        }
        let stat = out.stdout_text();
        let (size, file_type) = stat.trim().split_once(' ').unwrap_or((stat.trim(), ""));
        if file_type == "directory" {
            return Err(FsError::not_a_file(target));
        }
        if let Ok(size) = size.parse::<u64>() {
            if size > MAX_CONTENT_BYTES {
                return Err(FsError::TooLarge {
                    path: target,
                    size,
                    limit: MAX_CONTENT_BYTES,
                });
            }
        }

        let spec = self.exec(["cat", "--", target.as_str()], false);
        let out = self.run(&spec).await?;
        if !out.success() || !out.stderr.trim().is_empty() {
            return Err(classify_failure(&spec, &out, &target));
        }
        Ok(out.stdout_text())
    }

    async fn create_item(
        &self,
        path: &str,
        kind: ItemKind,
        content: &str,
    ) -> FsResult<OperationResult> {
        let target = path::resolve_lexical(path);
        debug!(container = %self.container, path = %target, %kind, "container create");

        self.require_running().await?;

        if self.exists(&target).await? {
            return Err(FsError::already_exists(target));
        }

        let spec = match kind {
            ItemKind::Folder => self.exec_script(CREATE_FOLDER_SCRIPT, &target, false),
            ItemKind::File => self
                .exec_script(CREATE_FILE_SCRIPT, &target, true)
                .stdin(content.as_bytes()),
        };
        let out = self.run(&spec).await?;
        if out.status == Some(PARENT_FAILED) {
            return Err(parent_failure(&out, &target));
        }
        if !out.success() || !out.stderr.trim().is_empty() {
            return Err(classify_failure(&spec, &out, &target));
        }

        Ok(Self::tag(OperationResult::created(target, kind)))
    }

    async fn delete_item(&self, path: &str) -> FsResult<OperationResult> {
        let target = path::resolve_lexical(path);
        debug!(container = %self.container, path = %target, "container delete");

        if target == "/" {
            return Err(FsError::access_denied("refusing to delete the container root"));
        }

        self.require_running().await?;

        if !self.exists(&target).await? {
            return Err(FsError::not_found(target));
        }

        let spec = self.exec_script(DELETE_SCRIPT, &target, false);
        let out = self.run(&spec).await?;
        if !out.success() || !out.stderr.trim().is_empty() {
            return Err(classify_failure(&spec, &out, &target));
        }

        Ok(Self::tag(OperationResult::deleted(target)))
    }
}

/// Deterministic stand-in data served while the container is unavailable.
mod mock {
    use super::*;
    use crate::types::sort_entries;
    use chrono::Utc;

    /// `(path, entries)` where an entry is `(name, size)`; `None` is a folder.
    const TABLE: &[(&str, &[(&str, Option<u64>)])] = &[
        (
            "/",
            &[
                ("home", None),
                ("app", None),
                ("var", None),
                ("tmp", None),
                ("etc", None),
            ],
        ),
        ("/home", &[("coder", None)]),
        ("/home/coder", &[("project", None), (".bashrc", Some(1024))]),
        (
            "/app",
            &[
                ("docker-compose.yml", Some(2048)),
                ("Dockerfile", Some(512)),
                ("src", None),
            ],
        ),
    ];

    fn entry(dir: &str, name: &str, size: Option<u64>) -> DirectoryEntry {
        let full = path::join(dir, name);
        let entry = match size {
            Some(size) => DirectoryEntry::file(name, full, size),
            None => DirectoryEntry::folder(name, full),
        };
        entry.with_modified(Utc::now())
    }

    /// Children of a known folder, the one entry for a known file, or
    /// nothing for an unknown path.
    pub(super) fn listing(target: &str) -> Vec<DirectoryEntry> {
        if let Some((dir, children)) = TABLE.iter().find(|(dir, _)| *dir == target) {
            let mut entries: Vec<_> = children
                .iter()
                .map(|(name, size)| entry(dir, name, *size))
                .collect();
            sort_entries(&mut entries);
            return entries;
        }

        TABLE
            .iter()
            .flat_map(|(dir, children)| children.iter().map(move |(name, size)| (dir, name, size)))
            .find(|(dir, name, _)| path::join(dir, name) == target)
            .map(|(dir, name, size)| vec![entry(dir, name, *size)])
            .unwrap_or_default()
    }

    pub(super) fn content(target: &str, container: &str) -> String {
        format!(
            "# Container File: {}\n\nThis is mock content from container file system.\n\nContainer: {container}\nPath: {target}\nTimestamp: {}",
            path::basename(target),
            Utc::now().to_rfc3339(),
        )
    }
}
