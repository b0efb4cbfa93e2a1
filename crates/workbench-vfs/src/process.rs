//! External command execution.
//!
//! Commands are always argument vectors handed straight to the OS; no
//! shell sits between the caller's strings and the program. Input, when
//! present, is written to the child's stdin.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// A command line to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` to the child's stdin.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    /// A zero exit status.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout decoded lossily as UTF-8.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs external commands.
///
/// Returning `Err` means the process could not be run at all. A process
/// that ran and exited non-zero is an `Ok` with that status.
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;
}

/// [`ProcessInvoker`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioInvoker;

#[async_trait]
impl ProcessInvoker for TokioInvoker {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        debug!(command = %spec, "spawning");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        // Feed stdin concurrently so a chatty child can't fill its stdout
        // pipe while we are still writing.
        let writer = match (child.stdin.take(), spec.stdin.clone()) {
            (Some(mut pipe), Some(input)) => Some(tokio::spawn(async move {
                pipe.write_all(&input).await?;
                pipe.shutdown().await
            })),
            _ => None,
        };

        let output = child.wait_with_output().await?;

        // A child that exits without draining stdin reports through its
        // status; the broken pipe on our side adds nothing.
        if let Some(writer) = writer {
            match writer.await.map_err(io::Error::other)? {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e),
                _ => {}
            }
        }
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_spaced_args() {
        let spec = CommandSpec::new("docker")
            .args(["exec", "workspace", "ls", "-la", "--"])
            .arg("/home/my dir");
        assert_eq!(
            spec.to_string(),
            r#"docker exec workspace ls -la -- "/home/my dir""#
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_invoker_captures_output() {
        let out = TokioInvoker
            .run(&CommandSpec::new("sh").args(["-c", "printf out; printf err >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.stdout, b"out");
        assert_eq!(out.stderr, "err");
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_invoker_feeds_stdin() {
        let out = TokioInvoker
            .run(&CommandSpec::new("cat").stdin("it's \"quoted\" $HOME"))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_text(), "it's \"quoted\" $HOME");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = TokioInvoker
            .run(&CommandSpec::new("definitely-not-a-real-program-4c1f"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
