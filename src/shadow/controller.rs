//! Shadow controller: owns the pipeline and its lifecycle.
//!
//! # States
//! ```text
//! Created ─start→ Running ─shutdown / search ends→ Stopped
//!                    └────── task panicked ──────→ Crashed
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::cluster::{ServiceSource, ShadowApi};
use crate::config::validation::validate_config;
use crate::config::{ConfigError, ShadowConfig};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::shadow::clone::{CloneHandler, ShadowNaming};
use crate::shadow::policy::{InclusionPolicy, MeshLabelPolicy};
use crate::shadow::registry::{CallbackRegistry, RetryPolicy};
use crate::shadow::search::SearchHandler;
use crate::shadow::types::{CloneJob, CloneStatus};

/// Lifecycle state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Created,
    Running,
    Stopped,
    Crashed,
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ControllerState::Stopped | ControllerState::Crashed)
    }
}

/// Collects the controller's collaborators before validation.
pub struct ControllerBuilder {
    config: ShadowConfig,
    source: Option<Arc<dyn ServiceSource>>,
    policy: Option<Arc<dyn InclusionPolicy>>,
    api: Option<Arc<dyn ShadowApi>>,
}

impl ControllerBuilder {
    /// Where candidates come from. Required.
    pub fn source(mut self, source: Arc<dyn ServiceSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Which candidates get shadowed. Defaults to [`MeshLabelPolicy`] built
    /// from `discovery.label_selector`.
    pub fn policy(mut self, policy: Arc<dyn InclusionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Where shadows are created. Required.
    pub fn api(mut self, api: Arc<dyn ShadowApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Validate everything and wire the pipeline. Nothing runs yet.
    pub fn build(self) -> Result<Controller, ConfigError> {
        let config = self.config;
        validate_config(&config).map_err(ConfigError::Validation)?;

        let source = self.source.ok_or(ConfigError::MissingCollaborator("source"))?;
        let api = self.api.ok_or(ConfigError::MissingCollaborator("api"))?;
        let policy = self.policy.unwrap_or_else(|| {
            Arc::new(MeshLabelPolicy::from_selector(&config.discovery.label_selector))
        });

        let registry = Arc::new(CallbackRegistry::new(RetryPolicy::from_config(&config.clone)));
        let (jobs_tx, jobs_rx) = mpsc::channel(config.clone.queue_depth);

        let search = SearchHandler::new(
            source,
            policy,
            registry.clone(),
            jobs_tx,
            config.pull_interval(),
            config.request_timeout(),
        );
        let cloner = CloneHandler::new(
            api,
            ShadowNaming::from_config(&config.clone),
            config.request_timeout(),
        );

        tracing::info!(
            mesh_server = %config.mesh_server,
            pull_interval_secs = config.pull_interval_secs,
            request_timeout_secs = config.request_timeout_secs,
            queue_depth = config.clone.queue_depth,
            "Shadow controller created"
        );

        Ok(Controller {
            search,
            cloner,
            jobs: jobs_rx,
            registry,
        })
    }
}

/// The shadow-service controller in its `Created` state.
pub struct Controller {
    search: SearchHandler,
    cloner: CloneHandler,
    jobs: mpsc::Receiver<CloneJob>,
    registry: Arc<CallbackRegistry>,
}

impl Controller {
    pub fn builder(config: ShadowConfig) -> ControllerBuilder {
        ControllerBuilder {
            config,
            source: None,
            policy: None,
            api: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        ControllerState::Created
    }

    pub fn registry(&self) -> Arc<CallbackRegistry> {
        self.registry.clone()
    }

    /// Start both loops. They stop when `shutdown` is triggered.
    pub fn start(self, shutdown: &Shutdown) -> ControllerHandle {
        let (state_tx, state_rx) = watch::channel(ControllerState::Running);

        // Internal signal, so a crash in one loop can stop the other
        // without touching the caller's shutdown channel.
        let stop = Shutdown::new();
        let search = tokio::spawn(self.search.run(stop.subscribe()));
        let clone = tokio::spawn(consume(
            self.jobs,
            self.cloner,
            self.registry.clone(),
            stop.subscribe(),
        ));
        tokio::spawn(supervise(search, clone, shutdown.subscribe(), stop, state_tx));

        tracing::info!("Shadow controller running");
        ControllerHandle {
            state: state_rx,
            registry: self.registry,
        }
    }
}

/// Handle to a started controller.
pub struct ControllerHandle {
    state: watch::Receiver<ControllerState>,
    registry: Arc<CallbackRegistry>,
}

impl ControllerHandle {
    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Wait until the controller reaches a terminal state.
    pub async fn done(&mut self) -> ControllerState {
        match self.state.wait_for(ControllerState::is_terminal).await {
            Ok(state) => *state,
            // Supervisor vanished without reporting.
            Err(_) => ControllerState::Crashed,
        }
    }
}

/// Drain the job queue, cloning one job at a time in arrival order.
async fn consume(
    mut jobs: mpsc::Receiver<CloneJob>,
    cloner: CloneHandler,
    registry: Arc<CallbackRegistry>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!("Clone handler starting");

    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let candidate = job.candidate.id.clone();
        let (job_id, attempt) = (job.id, job.attempt);

        let status = match cloner.clone_job(job).await {
            Ok(outcome) => {
                tracing::info!(
                    job = %job_id,
                    candidate = %candidate,
                    attempt,
                    outcome = outcome.as_str(),
                    "Shadow cloned"
                );
                metrics::record_clone(outcome.as_str());
                CloneStatus::Cloned
            }
            Err(e) => {
                tracing::warn!(
                    job = %job_id,
                    candidate = %candidate,
                    attempt,
                    error = %e,
                    "Clone failed"
                );
                metrics::record_clone("failed");
                CloneStatus::Failed
            }
        };

        registry.mark_done(&candidate, attempt, status);
    }

    tracing::info!("Clone handler stopped");
}

enum FirstExit {
    Signal,
    Search(Result<(), JoinError>),
    Clone(Result<(), JoinError>),
}

async fn supervise(
    mut search: JoinHandle<()>,
    mut clone: JoinHandle<()>,
    mut external: broadcast::Receiver<()>,
    stop: Shutdown,
    state: watch::Sender<ControllerState>,
) {
    let first = tokio::select! {
        _ = external.recv() => FirstExit::Signal,
        res = &mut search => FirstExit::Search(res),
        res = &mut clone => FirstExit::Clone(res),
    };

    if matches!(first, FirstExit::Signal) {
        tracing::info!("Shutdown signal received, stopping shadow controller");
    }
    stop.trigger();

    let (search_res, clone_res) = match first {
        FirstExit::Signal => (search.await, clone.await),
        FirstExit::Search(res) => (res, clone.await),
        FirstExit::Clone(res) => (search.await, res),
    };

    let mut crashed = false;
    for (task, res) in [("search", search_res), ("clone", clone_res)] {
        if let Err(e) = res {
            tracing::error!(task, error = %e, "Controller task crashed");
            crashed = true;
        }
    }

    let final_state = if crashed {
        ControllerState::Crashed
    } else {
        ControllerState::Stopped
    };
    tracing::info!(state = ?final_state, "Shadow controller finished");
    let _ = state.send(final_state);
}
