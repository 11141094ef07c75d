//! Staleness judgement

use crate::error::ProbeError;
use crate::probe::ProbeOutcome;
use crate::status::EndpointStatus;

/// What remote history says about an endpoint, before any probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Succeeded within the freshness window
    Fresh,
    /// The status source has never seen this address
    Unseen,
    /// Last success is older than the window, or unknown
    Stale { last_success_at: i64 },
}

impl Staleness {
    /// Judge an endpoint's remote history.
    ///
    /// `cutoff_ms` is the oldest success still considered fresh. An unknown
    /// last success is stale whatever the cutoff.
    pub fn judge(entry: Option<&EndpointStatus>, cutoff_ms: i64) -> Self {
        match entry {
            None => Staleness::Unseen,
            Some(status) => match status.last_success_at {
                Some(last) if last >= cutoff_ms => Staleness::Fresh,
                _ => Staleness::Stale {
                    last_success_at: status.last_success_ms(),
                },
            },
        }
    }
}

/// Final verdict for an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StalenessDecision {
    /// Recent remote success; kept
    Fresh,
    /// No remote evidence either way; kept
    Unseen,
    /// Stale history but the live probe answered; kept
    StaleButAlive(u16),
    /// Stale history and the probe failed; removed
    ConfirmedDead(ProbeError),
}

impl StalenessDecision {
    /// Combine a stale judgement with the probe that followed it.
    ///
    /// A live probe always wins over history.
    pub fn after_probe(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Alive(status) => StalenessDecision::StaleButAlive(status),
            ProbeOutcome::Dead(reason) => StalenessDecision::ConfirmedDead(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;

    #[test]
    fn test_judge() {
        let now = 1_700_000_000_000;
        let cutoff = now - 10 * DAY_MS;

        assert_eq!(Staleness::judge(None, cutoff), Staleness::Unseen);
        assert_eq!(
            Staleness::judge(Some(&EndpointStatus::at(now - DAY_MS)), cutoff),
            Staleness::Fresh
        );
        // boundary counts as fresh
        assert_eq!(
            Staleness::judge(Some(&EndpointStatus::at(cutoff)), cutoff),
            Staleness::Fresh
        );
        assert_eq!(
            Staleness::judge(Some(&EndpointStatus::at(now - 20 * DAY_MS)), cutoff),
            Staleness::Stale {
                last_success_at: now - 20 * DAY_MS
            }
        );
        assert_eq!(
            Staleness::judge(Some(&EndpointStatus::default()), cutoff),
            Staleness::Stale { last_success_at: -1 }
        );
    }

    #[test]
    fn test_unknown_success_is_stale_for_any_cutoff() {
        let unknown = EndpointStatus::default();
        assert_eq!(
            Staleness::judge(Some(&unknown), i64::MIN),
            Staleness::Stale { last_success_at: -1 }
        );
        assert_eq!(
            Staleness::judge(Some(&EndpointStatus::at(0)), i64::MIN),
            Staleness::Fresh
        );
    }

    #[test]
    fn test_live_probe_wins() {
        let alive = StalenessDecision::after_probe(ProbeOutcome::Alive(501));
        assert_eq!(alive, StalenessDecision::StaleButAlive(501));

        let dead = StalenessDecision::after_probe(ProbeOutcome::Dead(ProbeError::Timeout(10)));
        assert_eq!(dead, StalenessDecision::ConfirmedDead(ProbeError::Timeout(10)));
    }
}
