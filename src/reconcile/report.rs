//! Summary of a reconciliation pass

use super::task::Removal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// What a pass looked at and what it changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    /// Whether removals were only planned
    pub dry_run: bool,
    /// Chains with at least one endpoint
    pub chains_scanned: usize,
    /// Endpoints across scanned chains
    pub endpoints_seen: usize,
    /// Endpoints with a recent remote success
    pub fresh: usize,
    /// Endpoints the status source does not know
    pub unseen: usize,
    /// Stale endpoints that were probed
    pub probed: usize,
    /// Probed endpoints that answered and were kept
    pub stale_but_alive: usize,
    /// Removed endpoints per chain (planned ones in dry-run mode)
    pub removed: BTreeMap<String, Vec<Removal>>,
    /// Chains skipped because the status source failed
    pub unavailable: BTreeMap<String, String>,
    /// Chains whose record could not be read or updated
    pub abandoned: BTreeMap<String, String>,
}

impl PassReport {
    /// Total number of removed endpoints
    pub fn removed_count(&self) -> usize {
        self.removed.values().map(Vec::len).sum()
    }

    /// Whether the pass changed (or would change) the registry
    pub fn has_changes(&self) -> bool {
        self.removed_count() > 0
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.dry_run { "[dry-run]" } else { "[-]" };
        for (chain, removals) in &self.removed {
            for removal in removals {
                writeln!(
                    f,
                    "{} {} {} {} ({})",
                    marker, chain, removal.kind, removal.address, removal.reason
                )?;
            }
        }
        for (chain, reason) in &self.unavailable {
            writeln!(f, "[?] {} status unavailable: {}", chain, reason)?;
        }
        for (chain, reason) in &self.abandoned {
            writeln!(f, "[!] {} not updated: {}", chain, reason)?;
        }

        write!(
            f,
            "{} chains, {} endpoints: {} fresh, {} unseen, {} probed ({} alive), {} {}",
            self.chains_scanned,
            self.endpoints_seen,
            self.fresh,
            self.unseen,
            self.probed,
            self.stale_but_alive,
            self.removed_count(),
            if self.dry_run { "would be removed" } else { "removed" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ApiKind;

    #[test]
    fn test_summary() {
        let mut report = PassReport {
            chains_scanned: 2,
            endpoints_seen: 5,
            fresh: 2,
            unseen: 1,
            probed: 2,
            stale_but_alive: 1,
            ..Default::default()
        };
        report.removed.insert(
            "demo".to_string(),
            vec![Removal {
                kind: ApiKind::Rpc,
                address: "https://x.example/rpc".to_string(),
                provider: None,
                reason: "Request timeout after 10000ms".to_string(),
            }],
        );
        report
            .unavailable
            .insert("other".to_string(), "HTTP 500".to_string());

        assert_eq!(report.removed_count(), 1);
        assert!(report.has_changes());

        let text = report.to_string();
        assert!(text.contains("[-] demo rpc https://x.example/rpc (Request timeout after 10000ms)"));
        assert!(text.contains("[?] other status unavailable: HTTP 500"));
        assert!(text.ends_with("2 chains, 5 endpoints: 2 fresh, 1 unseen, 2 probed (1 alive), 1 removed"));
    }

    #[test]
    fn test_dry_run_wording() {
        let report = PassReport {
            dry_run: true,
            ..Default::default()
        };
        assert!(!report.has_changes());
        assert!(report.to_string().ends_with("0 would be removed"));
    }
}
