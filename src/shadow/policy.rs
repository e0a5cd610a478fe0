//! Inclusion policies: which candidates get a shadow.

use std::collections::BTreeMap;

use crate::shadow::types::Candidate;

/// Label carried by every shadow, pointing at the service it copies.
pub const SHADOW_OF_LABEL: &str = "mesh.emctl.io/shadow-of";

/// Marker label carried by every shadow.
pub const SHADOW_LABEL: &str = "mesh.emctl.io/shadow";

/// Decides whether a discovered candidate should be cloned.
pub trait InclusionPolicy: Send + Sync {
    fn includes(&self, candidate: &Candidate) -> bool;
}

impl<F> InclusionPolicy for F
where
    F: Fn(&Candidate) -> bool + Send + Sync,
{
    fn includes(&self, candidate: &Candidate) -> bool {
        self(candidate)
    }
}

/// Default policy: all required labels present, and not a shadow itself.
#[derive(Debug, Clone, Default)]
pub struct MeshLabelPolicy {
    required: BTreeMap<String, String>,
}

impl MeshLabelPolicy {
    pub fn new(required: BTreeMap<String, String>) -> Self {
        Self { required }
    }

    /// Build from an equality selector such as `"app=web,tier=frontend"`.
    ///
    /// Malformed pairs are skipped; config validation rejects them earlier.
    pub fn from_selector(selector: &str) -> Self {
        let required = selector
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { required }
    }
}

impl InclusionPolicy for MeshLabelPolicy {
    fn includes(&self, candidate: &Candidate) -> bool {
        if candidate.labels.contains_key(SHADOW_OF_LABEL) || candidate.labels.contains_key(SHADOW_LABEL) {
            return false;
        }
        self.required
            .iter()
            .all(|(k, v)| candidate.labels.get(k) == Some(v))
    }
}
