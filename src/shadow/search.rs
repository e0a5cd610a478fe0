//! Search handler: periodic discovery of shadow candidates.
//!
//! # Responsibilities
//! - Poll the service source on a fixed interval
//! - Filter candidates through the inclusion policy
//! - Enqueue a clone job for every new or retry-eligible identity
//!
//! # Design Decisions
//! - One ticker, missed ticks delayed: cycles never overlap
//! - Sends block when the clone side is behind (bounded channel backpressure)
//! - Every blocking point also waits on shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::cluster::ServiceSource;
use crate::observability::metrics;
use crate::resilience::timeouts::{with_deadline, Elapsed};
use crate::shadow::policy::InclusionPolicy;
use crate::shadow::registry::CallbackRegistry;
use crate::shadow::types::{CloneJob, DiscoveryError};

/// What one discovery cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidates returned by the source.
    pub discovered: usize,
    /// Candidates accepted by the policy.
    pub matched: usize,
    /// First-attempt jobs sent.
    pub enqueued: usize,
    /// Retry jobs sent.
    pub retried: usize,
}

/// Why a cycle ended early.
#[derive(Debug)]
pub enum CycleError {
    /// The source could not be listed; try again next tick.
    Discovery(DiscoveryError),
    /// Shutdown was signalled while the cycle was running.
    Interrupted,
    /// The job receiver is gone.
    Closed,
}

/// Polls for candidates and feeds the clone queue.
pub struct SearchHandler {
    source: Arc<dyn ServiceSource>,
    policy: Arc<dyn InclusionPolicy>,
    registry: Arc<CallbackRegistry>,
    jobs: mpsc::Sender<CloneJob>,
    interval: Duration,
    request_timeout: Duration,
}

impl SearchHandler {
    pub fn new(
        source: Arc<dyn ServiceSource>,
        policy: Arc<dyn InclusionPolicy>,
        registry: Arc<CallbackRegistry>,
        jobs: mpsc::Sender<CloneJob>,
        interval: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            source,
            policy,
            registry,
            jobs,
            interval,
            request_timeout,
        }
    }

    /// Run the poll loop until shutdown or until the clone side goes away.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            source = self.source.name(),
            interval_secs = self.interval.as_secs_f64(),
            "Search handler starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once(&mut shutdown).await {
                        Ok(report) => {
                            tracing::debug!(
                                discovered = report.discovered,
                                matched = report.matched,
                                enqueued = report.enqueued,
                                retried = report.retried,
                                "Discovery cycle complete"
                            );
                        }
                        Err(CycleError::Discovery(e)) => {
                            tracing::warn!(
                                source = self.source.name(),
                                error = %e,
                                "Discovery failed, retrying next tick"
                            );
                        }
                        Err(CycleError::Interrupted) => break,
                        Err(CycleError::Closed) => {
                            tracing::warn!("Clone queue closed, stopping search handler");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Search handler stopped");
    }

    /// Run a single discovery cycle.
    pub async fn poll_once(
        &self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<CycleReport, CycleError> {
        let candidates = match with_deadline(self.request_timeout, self.source.list(), |Elapsed(d)| {
            DiscoveryError::Timeout(d)
        })
        .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                metrics::record_discovery_error(self.source.name());
                return Err(CycleError::Discovery(e));
            }
        };

        let mut report = CycleReport {
            discovered: candidates.len(),
            ..CycleReport::default()
        };
        metrics::record_candidates_discovered(candidates.len());

        for candidate in candidates {
            if !self.policy.includes(&candidate) {
                continue;
            }
            report.matched += 1;

            if self.registry.register(&candidate.id) {
                tracing::info!(candidate = %candidate.id, "New shadow candidate");
                self.send(CloneJob::new(candidate, 1), shutdown).await?;
                report.enqueued += 1;
                metrics::record_job_enqueued("new");
            } else if let Some(attempt) = self.registry.reclaim(&candidate.id, Instant::now()) {
                tracing::info!(candidate = %candidate.id, attempt, "Retrying shadow candidate");
                self.send(CloneJob::new(candidate, attempt), shutdown).await?;
                report.retried += 1;
                metrics::record_job_enqueued("retry");
            }
        }

        Ok(report)
    }

    async fn send(
        &self,
        job: CloneJob,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), CycleError> {
        tokio::select! {
            res = self.jobs.send(job) => res.map_err(|_| CycleError::Closed),
            _ = shutdown.recv() => Err(CycleError::Interrupted),
        }
    }
}
