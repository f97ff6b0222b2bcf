//! Divergence evaluation - how far behind upstream is the local branch?
//!
//! The evaluator turns raw gateway query results into a tri-state
//! [`Divergence`]. It never caches: every call re-queries the repository.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gateway::{GatewayError, VcsGateway};

/// Sentinel count used for a branch with no upstream counterpart
pub const NO_UPSTREAM_SENTINEL: i64 = -1;

/// Errors from divergence evaluation
#[derive(Debug, thiserror::Error)]
pub enum DivergenceError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Commit count output is not a valid integer: {raw:?}")]
    BadCount { raw: String },

    #[error("Could not determine the current local branch")]
    NoLocalBranch,
}

/// Tri-state divergence of the local branch from its upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Divergence {
    /// Upstream has this many commits the local branch does not
    AheadRemote(u64),
    UpToDate,
    /// No remote-tracking counterpart exists for the local branch
    NoUpstream,
}

impl Divergence {
    pub fn from_count(n: i64) -> Self {
        match n {
            n if n > 0 => Divergence::AheadRemote(n as u64),
            0 => Divergence::UpToDate,
            _ => Divergence::NoUpstream,
        }
    }

    /// Collapse to the conventional integer form (-1 = no upstream).
    pub fn as_count(&self) -> i64 {
        match self {
            Divergence::AheadRemote(n) => *n as i64,
            Divergence::UpToDate => 0,
            Divergence::NoUpstream => NO_UPSTREAM_SENTINEL,
        }
    }
}

/// Computes the commit delta between the local branch and upstream
pub struct Evaluator {
    gateway: Arc<dyn VcsGateway>,
    remote: String,
}

impl Evaluator {
    pub fn new(gateway: Arc<dyn VcsGateway>, remote: impl Into<String>) -> Self {
        Self {
            gateway,
            remote: remote.into(),
        }
    }

    /// Evaluate divergence from upstream.
    ///
    /// Queries the remote-tracking branch listing first; if
    /// `<remote>/<branch>` is not present the branch is local-only and no
    /// rev-list query is issued.
    pub async fn evaluate(&self) -> Result<Divergence, DivergenceError> {
        let branch = self.current_branch().await?;
        let remote_branch = format!("{}/{}", self.remote, branch);

        let listing = self.gateway.run(&["branch", "-r"]).await?;
        if !remote_branch_listed(&listing, &remote_branch) {
            debug!(%branch, "Evaluator::evaluate: no remote-tracking branch");
            return Ok(Divergence::NoUpstream);
        }

        let range = format!("{branch}..{remote_branch}");
        let raw = self.gateway.run(&["rev-list", "--count", &range]).await?;
        let count: i64 = raw
            .trim()
            .parse()
            .map_err(|_| DivergenceError::BadCount { raw: raw.clone() })?;
        if count < 0 {
            // A count is non-negative by definition; anything else is
            // garbage output, not a sentinel.
            return Err(DivergenceError::BadCount { raw });
        }

        debug!(%branch, count, "Evaluator::evaluate: computed delta");
        Ok(Divergence::from_count(count))
    }

    /// Evaluate and collapse to the integer convention (-1 = no upstream).
    pub async fn count_new_commits(&self) -> Result<i64, DivergenceError> {
        Ok(self.evaluate().await?.as_count())
    }

    async fn current_branch(&self) -> Result<String, DivergenceError> {
        let out = self.gateway.run(&["branch", "--show-current"]).await?;

        // Defensive: use the first line even if the output has extras,
        // error out if there is nothing at all (detached HEAD).
        out.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)
            .ok_or(DivergenceError::NoLocalBranch)
    }
}

/// Check whether a `branch -r` listing names the given remote branch.
///
/// Listing lines are indented and may include symbolic entries like
/// `origin/HEAD -> origin/main`; match on the leading name only.
fn remote_branch_listed(listing: &str, remote_branch: &str) -> bool {
    listing
        .lines()
        .filter_map(|l| l.trim().split_whitespace().next())
        .any(|name| name == remote_branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::gateway::FetchProcess;

    /// Gateway returning canned outputs keyed by leading subcommand,
    /// recording every invocation.
    struct FakeGateway {
        branches: &'static str,
        remotes: &'static str,
        rev_list: Result<&'static str, ()>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        fn new(branches: &'static str, remotes: &'static str, rev_list: Result<&'static str, ()>) -> Self {
            Self {
                branches,
                remotes,
                rev_list,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VcsGateway for FakeGateway {
        async fn run(&self, args: &[&str]) -> Result<String, GatewayError> {
            self.calls.lock().unwrap().push(args.join(" "));
            match args {
                ["branch", "--show-current"] => Ok(self.branches.to_string()),
                ["branch", "-r"] => Ok(self.remotes.to_string()),
                ["rev-list", ..] => match self.rev_list {
                    Ok(out) => Ok(out.to_string()),
                    Err(()) => Err(GatewayError::Exit {
                        subcommand: "rev-list".to_string(),
                        code: 128,
                        stderr: "fatal".to_string(),
                    }),
                },
                other => panic!("Unexpected gateway call: {other:?}"),
            }
        }

        async fn begin_fetch(&self, _remote: &str) -> Result<Box<dyn FetchProcess>, GatewayError> {
            panic!("Evaluator must never start a fetch");
        }
    }

    fn evaluator(gateway: FakeGateway) -> (Arc<FakeGateway>, Evaluator) {
        let gateway = Arc::new(gateway);
        let eval = Evaluator::new(gateway.clone(), "origin");
        (gateway, eval)
    }

    #[tokio::test]
    async fn test_behind_upstream_counts_commits() {
        let (_, eval) = evaluator(FakeGateway::new(
            "main\n",
            "  origin/HEAD -> origin/main\n  origin/main\n",
            Ok("3\n"),
        ));

        assert_eq!(eval.evaluate().await.unwrap(), Divergence::AheadRemote(3));
        assert_eq!(eval.count_new_commits().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_up_to_date() {
        let (_, eval) = evaluator(FakeGateway::new("main\n", "  origin/main\n", Ok("0\n")));
        assert_eq!(eval.evaluate().await.unwrap(), Divergence::UpToDate);
    }

    #[tokio::test]
    async fn test_local_only_branch_skips_rev_list() {
        let (gateway, eval) = evaluator(FakeGateway::new(
            "feature/local-only\n",
            "  origin/main\n",
            Ok("999\n"),
        ));

        assert_eq!(eval.evaluate().await.unwrap(), Divergence::NoUpstream);
        assert_eq!(eval.count_new_commits().await.unwrap(), NO_UPSTREAM_SENTINEL);

        // Short-circuit: the rev-list query must never have been issued
        assert!(
            gateway.calls().iter().all(|c| !c.starts_with("rev-list")),
            "rev-list was invoked for a local-only branch"
        );
    }

    #[tokio::test]
    async fn test_unparsable_count_is_an_error() {
        let (_, eval) = evaluator(FakeGateway::new("main\n", "  origin/main\n", Ok("not-a-number\n")));

        match eval.evaluate().await {
            Err(DivergenceError::BadCount { raw }) => assert!(raw.contains("not-a-number")),
            other => panic!("Expected BadCount, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_overlarge_count_is_an_error() {
        // Beyond i64::MAX; must surface as BadCount, never wrap into the
        // no-upstream sentinel
        let (_, eval) = evaluator(FakeGateway::new(
            "main\n",
            "  origin/main\n",
            Ok("18446744073709551615\n"),
        ));
        assert!(matches!(eval.evaluate().await, Err(DivergenceError::BadCount { .. })));
    }

    #[tokio::test]
    async fn test_negative_count_is_an_error() {
        let (_, eval) = evaluator(FakeGateway::new("main\n", "  origin/main\n", Ok("-4\n")));
        assert!(matches!(eval.evaluate().await, Err(DivergenceError::BadCount { .. })));
    }

    #[tokio::test]
    async fn test_empty_branch_output_is_an_error() {
        let (_, eval) = evaluator(FakeGateway::new("", "  origin/main\n", Ok("0\n")));
        assert!(matches!(eval.evaluate().await, Err(DivergenceError::NoLocalBranch)));
    }

    #[tokio::test]
    async fn test_multiple_branch_lines_uses_first() {
        let (_, eval) = evaluator(FakeGateway::new(
            "main\nstray-second-line\n",
            "  origin/main\n",
            Ok("2\n"),
        ));
        assert_eq!(eval.evaluate().await.unwrap(), Divergence::AheadRemote(2));
    }

    #[tokio::test]
    async fn test_gateway_failure_propagates() {
        let (_, eval) = evaluator(FakeGateway::new("main\n", "  origin/main\n", Err(())));
        assert!(matches!(eval.evaluate().await, Err(DivergenceError::Gateway(_))));
    }

    #[test]
    fn test_count_round_trip() {
        assert_eq!(Divergence::from_count(5).as_count(), 5);
        assert_eq!(Divergence::from_count(0), Divergence::UpToDate);
        assert_eq!(Divergence::from_count(-1), Divergence::NoUpstream);
        assert_eq!(Divergence::NoUpstream.as_count(), NO_UPSTREAM_SENTINEL);
    }

    #[test]
    fn test_remote_branch_listing_ignores_symbolic_refs() {
        let listing = "  origin/HEAD -> origin/main\n  origin/main\n  origin/dev\n";
        assert!(remote_branch_listed(listing, "origin/main"));
        assert!(remote_branch_listed(listing, "origin/dev"));
        assert!(!remote_branch_listed(listing, "origin/feature"));
    }
}
