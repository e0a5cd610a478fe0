//! Mesh control-plane discovery.
//!
//! The control plane lists the services it manages at
//! `GET {mesh_server}/api/v1/services` as a JSON array:
//!
//! ```text
//! [{"namespace": "shop", "name": "checkout", "kind": "Service",
//!   "resourceVersion": "42", "labels": {...}, "manifest": {...}}]
//! ```
//!
//! `kind` defaults to `Service`. When `manifest` is absent a bare manifest is
//! synthesized from the other fields. The endpoint has no namespace filter, so
//! a configured namespace is applied after decoding.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::cluster::ServiceSource;
use crate::shadow::types::{Candidate, CandidateId, DiscoveryError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeshService {
    namespace: String,
    name: String,
    #[serde(default = "default_kind")]
    kind: String,
    #[serde(default)]
    resource_version: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    manifest: Option<Value>,
}

fn default_kind() -> String {
    "Service".to_string()
}

impl MeshService {
    fn into_candidate(self) -> Candidate {
        let payload = self.manifest.unwrap_or_else(|| {
            json!({
                "apiVersion": "v1",
                "kind": self.kind,
                "metadata": {
                    "name": self.name,
                    "namespace": self.namespace,
                    "labels": self.labels,
                },
            })
        });
        let id = CandidateId::new(self.namespace, self.name, self.kind, self.resource_version);
        Candidate::new(id, self.labels, payload)
    }
}

/// Lists services registered with the mesh control plane.
pub struct MeshServiceSource {
    client: reqwest::Client,
    endpoint: Url,
    namespace: Option<String>,
}

impl MeshServiceSource {
    /// Watch one namespace, or all of them when `namespace` is `None`.
    pub fn new(mesh_server: &str, namespace: Option<&str>) -> Result<Self, DiscoveryError> {
        let endpoint = Url::parse(mesh_server)
            .and_then(|base| base.join("/api/v1/services"))
            .map_err(|e| DiscoveryError::Decode(format!("invalid mesh server `{}`: {}", mesh_server, e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            namespace: namespace.map(str::to_string),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ServiceSource for MeshServiceSource {
    fn name(&self) -> &'static str {
        "mesh"
    }

    async fn list(&self) -> Result<Vec<Candidate>, DiscoveryError> {
        let body = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        decode_services(&body, self.namespace.as_deref())
    }
}

fn decode_services(body: &str, namespace: Option<&str>) -> Result<Vec<Candidate>, DiscoveryError> {
    let services: Vec<MeshService> =
        serde_json::from_str(body).map_err(|e| DiscoveryError::Decode(e.to_string()))?;
    Ok(services
        .into_iter()
        .filter(|svc| namespace.map_or(true, |ns| svc.namespace == ns))
        .map(MeshService::into_candidate)
        .collect())
}
