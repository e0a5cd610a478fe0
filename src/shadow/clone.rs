//! Clone handler: turns jobs into shadow resources.
//!
//! # Responsibilities
//! - Resolve the job payload into a manifest
//! - Rewrite it into the shadow counterpart (name, namespace, labels)
//! - Submit the shadow through `ShadowApi` within `request_timeout`

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::cluster::ShadowApi;
use crate::config::CloneConfig;
use crate::resilience::timeouts::{with_deadline, Elapsed};
use crate::shadow::policy::{SHADOW_LABEL, SHADOW_OF_LABEL};
use crate::shadow::types::{CloneError, CloneJob, CreateOutcome, ShadowResource};

/// Metadata fields owned by the API server.
const SERVER_METADATA: &[&str] = &[
    "uid",
    "resourceVersion",
    "creationTimestamp",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
    "generation",
    "managedFields",
    "ownerReferences",
    "selfLink",
    "finalizers",
];

/// Service spec fields assigned by the cluster.
const ASSIGNED_SERVICE_FIELDS: &[&str] = &["clusterIP", "clusterIPs", "healthCheckNodePort"];

/// Per-port fields assigned by the cluster. Node ports are unique cluster-wide.
const ASSIGNED_PORT_FIELDS: &[&str] = &["nodePort"];

/// How shadow names and namespaces are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowNaming {
    pub suffix: String,
    pub namespace: Option<String>,
}

impl ShadowNaming {
    pub fn from_config(config: &CloneConfig) -> Self {
        Self {
            suffix: config.shadow_suffix.clone(),
            namespace: config.shadow_namespace.clone(),
        }
    }

    pub fn name_for(&self, source: &str) -> String {
        format!("{}{}", source, self.suffix)
    }

    pub fn namespace_for<'a>(&'a self, source: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(source)
    }
}

impl Default for ShadowNaming {
    fn default() -> Self {
        Self::from_config(&CloneConfig::default())
    }
}

/// Performs the clone for one job at a time.
pub struct CloneHandler {
    api: Arc<dyn ShadowApi>,
    naming: ShadowNaming,
    request_timeout: Duration,
}

impl CloneHandler {
    pub fn new(api: Arc<dyn ShadowApi>, naming: ShadowNaming, request_timeout: Duration) -> Self {
        Self {
            api,
            naming,
            request_timeout,
        }
    }

    /// Build and submit the shadow for `job`.
    pub async fn clone_job(&self, job: CloneJob) -> Result<CreateOutcome, CloneError> {
        let shadow = self.build_shadow(job)?;

        tracing::debug!(
            source = %shadow.source,
            shadow = %shadow.name,
            namespace = %shadow.namespace,
            "Submitting shadow"
        );

        with_deadline(self.request_timeout, self.api.create(&shadow), |Elapsed(d)| {
            CloneError::Timeout(d)
        })
        .await
    }

    /// Rewrite the job's payload into its shadow counterpart.
    pub fn build_shadow(&self, job: CloneJob) -> Result<ShadowResource, CloneError> {
        let source = job.candidate.id;
        let mut manifest = match job.candidate.payload {
            Value::Object(map) => map,
            other => {
                return Err(CloneError::InvalidPayload(format!(
                    "{}: expected an object, got {}",
                    source,
                    type_name(&other)
                )))
            }
        };

        let source_name = manifest
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CloneError::InvalidPayload(format!("{}: missing metadata.name", source)))?;

        let name = self.naming.name_for(&source_name);
        let namespace = self.naming.namespace_for(&source.namespace).to_string();

        manifest.remove("status");

        let mut metadata = take_object(&mut manifest, "metadata");
        for field in SERVER_METADATA {
            metadata.remove(*field);
        }
        metadata.insert("name".to_string(), Value::String(name.clone()));
        metadata.insert("namespace".to_string(), Value::String(namespace.clone()));

        let mut labels = take_object(&mut metadata, "labels");
        labels.insert(SHADOW_OF_LABEL.to_string(), Value::String(source_name));
        labels.insert(SHADOW_LABEL.to_string(), Value::String("true".to_string()));
        metadata.insert("labels".to_string(), Value::Object(labels));
        manifest.insert("metadata".to_string(), Value::Object(metadata));

        if source.kind == "Service" {
            if let Some(Value::Object(spec)) = manifest.get_mut("spec") {
                for field in ASSIGNED_SERVICE_FIELDS {
                    spec.remove(*field);
                }
                if let Some(Value::Array(ports)) = spec.get_mut("ports") {
                    for port in ports.iter_mut().filter_map(Value::as_object_mut) {
                        for field in ASSIGNED_PORT_FIELDS {
                            port.remove(*field);
                        }
                    }
                }
            }
        }

        Ok(ShadowResource {
            name,
            namespace,
            source,
            manifest: Value::Object(manifest),
        })
    }
}

/// Remove `map[key]` as an object, or an empty one if it is missing or not an object.
fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
