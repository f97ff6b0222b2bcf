//! VCS gateway - the only component that touches the outside world
//!
//! Everything the core knows about git comes through [`VcsGateway`]: one
//! method to run a subcommand and capture its output, one to start a
//! non-blocking fetch whose completion is observed by polling. The rest of
//! the crate is testable against a fake gateway returning canned outputs.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

/// Errors from invoking the external VCS binary
///
/// A spawn or nonzero-exit failure is always an `Err`; empty captured
/// output on exit 0 is `Ok("")`. The two are never conflated.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {subcommand} exited with code {code}: {stderr}")]
    Exit {
        subcommand: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to wait for subprocess: {0}")]
    Wait(#[from] std::io::Error),
}

/// A spawned fetch subprocess whose completion is observed by polling
///
/// `try_status` must never block: it returns `None` while the process is
/// still running and the exit code once it has terminated.
pub trait FetchProcess: Send {
    fn try_status(&mut self) -> Result<Option<i32>, GatewayError>;
}

/// Narrow seam over the external version-control binary
#[async_trait]
pub trait VcsGateway: Send + Sync {
    /// Run a subcommand in the repository directory and capture stdout.
    ///
    /// Exit code 0 yields the captured output (possibly empty); anything
    /// else yields a [`GatewayError`]. Exactly one subprocess per call,
    /// no retries, no in-memory state mutated.
    async fn run(&self, args: &[&str]) -> Result<String, GatewayError>;

    /// Start a fetch from the given remote without waiting for it.
    async fn begin_fetch(&self, remote: &str) -> Result<Box<dyn FetchProcess>, GatewayError>;
}

/// Real gateway shelling out to the `git` binary
pub struct GitGateway {
    program: String,
    repo_dir: PathBuf,
}

impl GitGateway {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "git".to_string(),
            repo_dir: repo_dir.into(),
        }
    }

    /// Override the binary name (tests use this to force spawn failures).
    pub fn with_program(repo_dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            repo_dir: repo_dir.into(),
        }
    }
}

#[async_trait]
impl VcsGateway for GitGateway {
    async fn run(&self, args: &[&str]) -> Result<String, GatewayError> {
        debug!(?args, dir = %self.repo_dir.display(), "GitGateway::run: called");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| GatewayError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GatewayError::Exit {
                subcommand: args.first().unwrap_or(&"").to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn begin_fetch(&self, remote: &str) -> Result<Box<dyn FetchProcess>, GatewayError> {
        debug!(%remote, dir = %self.repo_dir.display(), "GitGateway::begin_fetch: called");

        let child = Command::new(&self.program)
            .args(["fetch", remote])
            .current_dir(&self.repo_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| GatewayError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        Ok(Box::new(GitFetchProcess { child }))
    }
}

/// Poll handle around a spawned `git fetch`
struct GitFetchProcess {
    child: Child,
}

impl FetchProcess for GitFetchProcess {
    fn try_status(&mut self) -> Result<Option<i32>, GatewayError> {
        match self.child.try_wait()? {
            Some(status) => Ok(Some(status.code().unwrap_or(-1))),
            None => Ok(None),
        }
    }
}
