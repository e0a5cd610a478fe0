//! Shared fakes for pipeline integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use emctl_shadow::cluster::{ServiceSource, ShadowApi};
use emctl_shadow::shadow::{
    Candidate, CandidateId, CloneError, CreateOutcome, DiscoveryError, ShadowResource,
};
use emctl_shadow::ShadowConfig;

/// A mesh-labelled Service candidate in namespace `ns`.
pub fn service(ns: &str, name: &str) -> Candidate {
    let labels: BTreeMap<String, String> =
        [("mesh.emctl.io/inject".to_string(), "enabled".to_string())].into();
    let payload = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "namespace": ns,
            "resourceVersion": "1",
            "uid": format!("uid-{}", name),
            "labels": labels,
        },
        "spec": {
            "clusterIP": "10.0.0.1",
            "selector": {"app": name},
            "ports": [{"port": 80}],
        },
    });
    Candidate::new(CandidateId::new(ns, name, "Service", "1"), labels, payload)
}

/// Config that passes validation, with a one second poll interval.
pub fn config() -> ShadowConfig {
    let mut config = ShadowConfig::default();
    config.mesh_server = "http://mesh.test:15010".to_string();
    config.pull_interval_secs = 1;
    config.request_timeout_secs = 5;
    config
}

/// Source that replays scripted cycles, repeating the last one forever.
///
/// `None` in the script is a failed listing.
pub struct ScriptedSource {
    cycles: Vec<Option<Vec<Candidate>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(cycles: Vec<Option<Vec<Candidate>>>) -> Self {
        assert!(!cycles.is_empty(), "script needs at least one cycle");
        Self {
            cycles,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every cycle returns the same services in namespace `ns`.
    pub fn fixed(ns: &str, names: &[&str]) -> Self {
        Self::new(vec![Some(names.iter().map(|n| service(ns, n)).collect())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn list(&self) -> Result<Vec<Candidate>, DiscoveryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let cycle = &self.cycles[call.min(self.cycles.len() - 1)];
        cycle
            .clone()
            .ok_or_else(|| DiscoveryError::Decode("scripted failure".to_string()))
    }
}

/// Shadow API that records every call and can fail named shadows.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<ShadowResource>>,
    existing: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, u32>>,
    delay: Option<Duration>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` creates of `shadow_name`.
    pub fn failing(self, shadow_name: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(shadow_name.to_string(), times);
        self
    }

    /// Sleep this long inside every create.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<ShadowResource> {
        self.created.lock().unwrap().clone()
    }

    pub fn calls_for(&self, shadow_name: &str) -> usize {
        self.calls().iter().filter(|n| *n == shadow_name).count()
    }
}

#[async_trait]
impl ShadowApi for RecordingApi {
    async fn create(&self, shadow: &ShadowResource) -> Result<CreateOutcome, CloneError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(shadow.name.clone());

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&shadow.name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CloneError::Rejected {
                    name: shadow.name.clone(),
                    reason: "injected failure".to_string(),
                });
            }
        }

        if !self.existing.lock().unwrap().insert(shadow.name.clone()) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        self.created.lock().unwrap().push(shadow.clone());
        Ok(CreateOutcome::Created)
    }
}

/// Poll `cond` until it holds, sleeping in between.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
