//! External collaborator seams
//!
//! Display and prompting are not part of the core; they sit behind small
//! traits so the coordinator tests against fakes. The production glue here
//! is intentionally thin.

use std::io::{BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use tracing::debug;

use crate::gateway::VcsGateway;

/// Shows the incoming (unmerged upstream) log for the tracked repository
#[async_trait]
pub trait LogView: Send + Sync {
    async fn show_incoming(&self) -> Result<()>;
}

/// Log view that prints `git log --oneline` of the pending range
pub struct GitLogView {
    gateway: Arc<dyn VcsGateway>,
    remote: String,
}

impl GitLogView {
    pub fn new(gateway: Arc<dyn VcsGateway>, remote: impl Into<String>) -> Self {
        Self {
            gateway,
            remote: remote.into(),
        }
    }
}

#[async_trait]
impl LogView for GitLogView {
    async fn show_incoming(&self) -> Result<()> {
        let branch = self
            .gateway
            .run(&["branch", "--show-current"])
            .await
            .context("Failed to determine current branch")?;
        let branch = branch.trim();

        let range = format!("{branch}..{}/{branch}", self.remote);
        debug!(%range, "GitLogView::show_incoming: called");

        let log = self
            .gateway
            .run(&["log", "--oneline", &range])
            .await
            .context("Failed to read incoming log")?;

        if log.trim().is_empty() {
            println!("No incoming commits.");
        } else {
            print!("{log}");
        }
        Ok(())
    }
}

/// Two-way choice offered when `pull` is invoked without `--confirm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullChoice {
    ShowLog,
    Update,
}

/// Asks the user whether to show the log or actually update
pub trait PullPrompt: Send + Sync {
    fn choose(&self) -> Result<PullChoice>;
}

/// Interactive stdin prompt, defaulting to ShowLog
pub struct StdinPrompt;

impl PullPrompt for StdinPrompt {
    fn choose(&self) -> Result<PullChoice> {
        print!("Pull latest changes? [L]og / [u]pdate: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read choice")?;

        match line.trim().to_ascii_lowercase().as_str() {
            "u" | "update" => Ok(PullChoice::Update),
            _ => Ok(PullChoice::ShowLog),
        }
    }
}
