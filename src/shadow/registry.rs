//! Callback registry: the de-duplication ledger.
//!
//! # States
//! ```text
//! (unknown) ─register→ Pending ─mark_done→ Cloned   (terminal)
//!                        │   ↑
//!                mark_done   reclaim (retry deadline passed)
//!                        ↓   │
//!                        Failed
//! Pending ─reclaim→ Pending   (stuck past pending_timeout)
//! ```
//!
//! Entries are never evicted. Every identity seen stays known for the
//! lifetime of the process, so the map grows with the number of distinct
//! identities discovered.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::CloneConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::shadow::types::{CandidateId, CloneStatus};

/// When failed or stuck entries become eligible for another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max: Duration,
    pub pending_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CloneConfig) -> Self {
        Self {
            base: Duration::from_secs(config.retry_base_secs),
            max: Duration::from_secs(config.retry_max_secs),
            pending_timeout: Duration::from_secs(config.pending_timeout_secs),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CloneConfig::default())
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    status: CloneStatus,
    attempts: u32,
    updated_at: Instant,
    retry_at: Instant,
}

/// Count of entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrySummary {
    pub pending: usize,
    pub cloned: usize,
    pub failed: usize,
}

/// Thread-safe ledger of candidates scheduled for cloning.
#[derive(Debug)]
pub struct CallbackRegistry {
    entries: DashMap<CandidateId, RegistryEntry>,
    retry: RetryPolicy,
}

impl CallbackRegistry {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            retry,
        }
    }

    /// Record the first sighting of `id`.
    ///
    /// Returns `true` exactly once per identity, even under concurrent calls.
    pub fn register(&self, id: &CandidateId) -> bool {
        let inserted = match self.entries.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let now = Instant::now();
                slot.insert(RegistryEntry {
                    status: CloneStatus::Pending,
                    attempts: 1,
                    updated_at: now,
                    retry_at: now,
                });
                true
            }
        };

        if inserted {
            metrics::record_registry_size(self.entries.len());
        }
        inserted
    }

    /// Finish attempt `attempt` for `id`.
    ///
    /// Only `Pending → Cloned` and `Pending → Failed` are accepted, and only
    /// from the entry's current attempt. A late completion from an attempt
    /// that was since reclaimed, or an unknown identity, leaves the registry
    /// unchanged and returns `false`.
    pub fn mark_done(&self, id: &CandidateId, attempt: u32, status: CloneStatus) -> bool {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return false;
        };
        if entry.status != CloneStatus::Pending || status == CloneStatus::Pending {
            return false;
        }
        if entry.attempts != attempt {
            tracing::debug!(
                candidate = %id,
                attempt,
                current = entry.attempts,
                "Ignoring completion from superseded attempt"
            );
            return false;
        }

        let now = Instant::now();
        entry.status = status;
        entry.updated_at = now;
        if status == CloneStatus::Failed {
            entry.retry_at = now + calculate_backoff(entry.attempts, self.retry.base, self.retry.max);
        }
        true
    }

    /// Current status of `id`, if it has been registered.
    pub fn status(&self, id: &CandidateId) -> Option<CloneStatus> {
        self.entries.get(id).map(|e| e.status)
    }

    /// Number of attempts scheduled so far for `id`.
    pub fn attempts(&self, id: &CandidateId) -> Option<u32> {
        self.entries.get(id).map(|e| e.attempts)
    }

    /// Schedule another attempt if `id` is due for one.
    ///
    /// Due means `Failed` with its retry deadline reached, or `Pending` for
    /// longer than the pending timeout. On success the entry is `Pending`
    /// again and the new attempt number is returned.
    pub fn reclaim(&self, id: &CandidateId, now: Instant) -> Option<u32> {
        let mut entry = self.entries.get_mut(id)?;
        let due = match entry.status {
            CloneStatus::Failed => now >= entry.retry_at,
            CloneStatus::Pending => {
                now.saturating_duration_since(entry.updated_at) >= self.retry.pending_timeout
            }
            CloneStatus::Cloned => false,
        };
        if !due {
            return None;
        }

        entry.status = CloneStatus::Pending;
        entry.attempts += 1;
        entry.updated_at = now;
        Some(entry.attempts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> RegistrySummary {
        let mut summary = RegistrySummary::default();
        for entry in self.entries.iter() {
            match entry.value().status {
                CloneStatus::Pending => summary.pending += 1,
                CloneStatus::Cloned => summary.cloned += 1,
                CloneStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(name: &str) -> CandidateId {
        CandidateId::new("default", name, "Service", "1")
    }

    fn immediate_retry() -> RetryPolicy {
        RetryPolicy {
            base: Duration::ZERO,
            max: Duration::ZERO,
            pending_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_register_is_new_exactly_once() {
        let registry = CallbackRegistry::default();
        assert!(registry.register(&id("svc-a")));
        assert!(!registry.register(&id("svc-a")));
        assert!(!registry.register(&id("svc-a")));
        assert!(registry.register(&id("svc-b")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.status(&id("svc-a")), Some(CloneStatus::Pending));
    }

    #[test]
    fn test_resource_version_is_part_of_identity() {
        let registry = CallbackRegistry::default();
        assert!(registry.register(&CandidateId::new("ns", "svc", "Service", "1")));
        assert!(registry.register(&CandidateId::new("ns", "svc", "Service", "2")));
    }

    #[test]
    fn test_concurrent_register_single_winner() {
        let registry = CallbackRegistry::default();
        let winners = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        if registry.register(&id("contended")) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mark_done_transitions() {
        let registry = CallbackRegistry::default();
        assert!(!registry.mark_done(&id("unknown"), 1, CloneStatus::Cloned));
        assert_eq!(registry.status(&id("unknown")), None);

        registry.register(&id("svc"));
        assert!(!registry.mark_done(&id("svc"), 1, CloneStatus::Pending));
        assert!(registry.mark_done(&id("svc"), 1, CloneStatus::Cloned));
        // Cloned is terminal.
        assert!(!registry.mark_done(&id("svc"), 1, CloneStatus::Failed));
        assert_eq!(registry.status(&id("svc")), Some(CloneStatus::Cloned));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_entry_reclaimed_after_backoff() {
        let registry = CallbackRegistry::new(RetryPolicy {
            base: Duration::from_secs(30),
            max: Duration::from_secs(900),
            pending_timeout: Duration::from_secs(600),
        });
        registry.register(&id("svc"));
        registry.mark_done(&id("svc"), 1, CloneStatus::Failed);

        assert_eq!(registry.reclaim(&id("svc"), Instant::now()), None);

        tokio::time::advance(Duration::from_secs(34)).await;
        assert_eq!(registry.reclaim(&id("svc"), Instant::now()), Some(2));
        assert_eq!(registry.status(&id("svc")), Some(CloneStatus::Pending));
        // Now pending again, not due until the pending timeout.
        assert_eq!(registry.reclaim(&id("svc"), Instant::now()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_pending_reclaimed() {
        let registry = CallbackRegistry::new(immediate_retry());
        registry.register(&id("svc"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(registry.reclaim(&id("svc"), Instant::now()), None);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(registry.reclaim(&id("svc"), Instant::now()), Some(2));
        assert_eq!(registry.attempts(&id("svc")), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_attempt_cannot_finish_entry() {
        let registry = CallbackRegistry::new(immediate_retry());
        registry.register(&id("svc"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(registry.reclaim(&id("svc"), Instant::now()), Some(2));

        // The first attempt finishes after the entry was handed to attempt 2.
        assert!(!registry.mark_done(&id("svc"), 1, CloneStatus::Failed));
        assert_eq!(registry.status(&id("svc")), Some(CloneStatus::Pending));

        assert!(registry.mark_done(&id("svc"), 2, CloneStatus::Cloned));
        assert_eq!(registry.status(&id("svc")), Some(CloneStatus::Cloned));
        assert!(!registry.mark_done(&id("svc"), 1, CloneStatus::Failed));
        assert_eq!(registry.status(&id("svc")), Some(CloneStatus::Cloned));
    }

    #[test]
    fn test_cloned_never_reclaimed() {
        let registry = CallbackRegistry::new(immediate_retry());
        registry.register(&id("svc"));
        registry.mark_done(&id("svc"), 1, CloneStatus::Cloned);
        assert_eq!(registry.reclaim(&id("svc"), Instant::now()), None);
    }

    #[test]
    fn test_summary() {
        let registry = CallbackRegistry::new(immediate_retry());
        for name in ["a", "b", "c", "d"] {
            registry.register(&id(name));
        }
        registry.mark_done(&id("a"), 1, CloneStatus::Cloned);
        registry.mark_done(&id("b"), 1, CloneStatus::Cloned);
        registry.mark_done(&id("c"), 1, CloneStatus::Failed);

        assert_eq!(
            registry.summary(),
            RegistrySummary {
                pending: 1,
                cloned: 2,
                failed: 1
            }
        );
    }
}
