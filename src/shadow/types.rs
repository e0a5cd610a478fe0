//! Pipeline data types and error definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity of a discovered resource.
///
/// Two candidates are the same work item iff their identities are equal;
/// content (labels, payload) is never compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId {
    pub namespace: String,
    pub name: String,
    pub kind: String,
    pub resource_version: String,
}

impl CandidateId {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        resource_version: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind: kind.into(),
            resource_version: resource_version.into(),
        }
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.kind, self.namespace, self.name, self.resource_version
        )
    }
}

/// A discovered resource that may need a shadow clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub labels: BTreeMap<String, String>,
    /// The object as returned by the source (JSON manifest).
    pub payload: serde_json::Value,
}

impl Candidate {
    pub fn new(id: CandidateId, labels: BTreeMap<String, String>, payload: serde_json::Value) -> Self {
        Self { id, labels, payload }
    }
}

/// Registry status of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStatus {
    /// Scheduled, not yet finished.
    Pending,
    /// Shadow exists in the cluster.
    Cloned,
    /// Last attempt failed; eligible for retry after its deadline.
    Failed,
}

impl CloneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloneStatus::Pending => "pending",
            CloneStatus::Cloned => "cloned",
            CloneStatus::Failed => "failed",
        }
    }
}

/// Unit of work handed from search to clone.
///
/// The candidate is moved into the job; the producer keeps no handle to it.
#[derive(Debug)]
pub struct CloneJob {
    /// Correlates the log lines of one attempt.
    pub id: Uuid,
    /// 1 for the first attempt, incremented on every retry.
    pub attempt: u32,
    pub candidate: Candidate,
}

impl CloneJob {
    pub fn new(candidate: Candidate, attempt: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt,
            candidate,
        }
    }
}

/// The shadow counterpart of a candidate, ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowResource {
    pub name: String,
    pub namespace: String,
    pub source: CandidateId,
    pub manifest: serde_json::Value,
}

/// Result of a successful create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The shadow was already present; treated as success.
    AlreadyExists,
}

impl CreateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateOutcome::Created => "created",
            CreateOutcome::AlreadyExists => "already_exists",
        }
    }
}

/// Errors listing candidates during a discovery cycle.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Listing did not finish within `request_timeout`.
    #[error("discovery timed out after {0:?}")]
    Timeout(Duration),

    /// Kubernetes API request failed.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Mesh control-plane request failed.
    #[error("mesh control plane error: {0}")]
    Mesh(#[from] reqwest::Error),

    /// A response could not be turned into candidates.
    #[error("could not decode discovery response: {0}")]
    Decode(String),
}

/// Errors building or creating a shadow resource.
#[derive(Debug, Error)]
pub enum CloneError {
    /// Create did not finish within `request_timeout`.
    #[error("clone timed out after {0:?}")]
    Timeout(Duration),

    /// The job payload cannot be turned into a shadow.
    #[error("invalid clone payload: {0}")]
    InvalidPayload(String),

    /// Kubernetes API request failed.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The API refused the shadow for a non-transport reason.
    #[error("shadow {name} rejected: {reason}")]
    Rejected { name: String, reason: String },
}
