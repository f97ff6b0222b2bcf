//! Status rendering - pure mapping from a commit delta to display text

/// Render a divergence count as a human-readable status line.
///
/// `n > 0` means upstream has unseen commits, `0` means fully synced, and
/// any negative value is the no-upstream sentinel.
pub fn render(n: i64) -> String {
    if n > 0 {
        format!("updates available ({n} new upstream commit{})", plural(n))
    } else if n == 0 {
        "up to date".to_string()
    } else {
        "local-only branch, no upstream".to_string()
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_counts_report_updates() {
        for n in [1, 2, 3, 7, 100, i64::MAX] {
            let msg = render(n);
            assert!(msg.contains("updates available"), "n={n}: {msg}");
        }
    }

    #[test]
    fn test_zero_reports_up_to_date() {
        assert_eq!(render(0), "up to date");
    }

    #[test]
    fn test_sentinel_reports_no_upstream() {
        assert_eq!(render(-1), "local-only branch, no upstream");
    }

    #[test]
    fn test_no_upstream_only_for_negative_input() {
        for n in 0..50 {
            assert!(!render(n).contains("no upstream"), "n={n}");
        }
    }

    #[test]
    fn test_singular_and_plural() {
        assert!(render(1).contains("1 new upstream commit)"));
        assert!(render(2).contains("2 new upstream commits)"));
    }
}
