//! Kubernetes adapters for discovery and cloning.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, DynamicObject, ListParams, PostParams};
use kube::core::GroupVersionKind;
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::Value;

use crate::cluster::{ServiceSource, ShadowApi};
use crate::shadow::types::{
    Candidate, CandidateId, CloneError, CreateOutcome, DiscoveryError, ShadowResource,
};

/// Lists mesh services through the Kubernetes API.
pub struct KubeServiceSource {
    api: Api<Service>,
    params: ListParams,
}

impl KubeServiceSource {
    /// Watch one namespace, or all of them when `namespace` is `None`.
    pub fn new(client: Client, namespace: Option<&str>, label_selector: &str) -> Self {
        let api = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };

        let mut params = ListParams::default();
        if !label_selector.trim().is_empty() {
            params = params.labels(label_selector);
        }

        Self { api, params }
    }
}

#[async_trait]
impl ServiceSource for KubeServiceSource {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    async fn list(&self) -> Result<Vec<Candidate>, DiscoveryError> {
        let services = self.api.list(&self.params).await?;
        tracing::trace!(count = services.items.len(), "Listed services");

        services.items.into_iter().map(service_to_candidate).collect()
    }
}

fn service_to_candidate(service: Service) -> Result<Candidate, DiscoveryError> {
    let meta = &service.metadata;
    let name = meta
        .name
        .clone()
        .ok_or_else(|| DiscoveryError::Decode("service without metadata.name".to_string()))?;

    let id = CandidateId::new(
        meta.namespace.clone().unwrap_or_else(|| "default".to_string()),
        name,
        "Service",
        meta.resource_version.clone().unwrap_or_default(),
    );
    let labels = meta.labels.clone().unwrap_or_default();
    let payload = serde_json::to_value(&service)
        .map_err(|e| DiscoveryError::Decode(format!("{}: {}", id, e)))?;

    Ok(Candidate::new(id, labels, payload))
}

/// Creates shadows as dynamic objects, whatever their kind.
#[derive(Clone)]
pub struct KubeShadowApi {
    client: Client,
}

impl KubeShadowApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ShadowApi for KubeShadowApi {
    async fn create(&self, shadow: &ShadowResource) -> Result<CreateOutcome, CloneError> {
        let gvk = gvk_of(&shadow.manifest)?;
        let resource = ApiResource::from_gvk(&gvk);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &shadow.namespace, &resource);

        let object: DynamicObject = serde_json::from_value(shadow.manifest.clone())
            .map_err(|e| CloneError::InvalidPayload(e.to_string()))?;

        match api.create(&PostParams::default(), &object).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(ref err)) if err.code == 409 => Ok(CreateOutcome::AlreadyExists),
            Err(kube::Error::Api(ref err)) if matches!(err.code, 400 | 403 | 422) => {
                Err(CloneError::Rejected {
                    name: shadow.name.clone(),
                    reason: err.message.clone(),
                })
            }
            Err(e) => Err(CloneError::Kube(e)),
        }
    }
}

/// Resolve group/version/kind from a manifest's `apiVersion` and `kind`.
fn gvk_of(manifest: &Value) -> Result<GroupVersionKind, CloneError> {
    let field = |key: &str| {
        manifest
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CloneError::InvalidPayload(format!("manifest has no {}", key)))
    };
    let api_version = field("apiVersion")?;
    let kind = field("kind")?;

    let (group, version) = api_version.rsplit_once('/').unwrap_or(("", api_version));
    Ok(GroupVersionKind::gvk(group, version, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    #[test]
    fn test_gvk_of_core_and_grouped() {
        let core = gvk_of(&json!({"apiVersion": "v1", "kind": "Service"})).unwrap();
        assert_eq!((core.group.as_str(), core.version.as_str(), core.kind.as_str()), ("", "v1", "Service"));

        let apps = gvk_of(&json!({"apiVersion": "apps/v1", "kind": "Deployment"})).unwrap();
        assert_eq!((apps.group.as_str(), apps.version.as_str()), ("apps", "v1"));

        assert!(matches!(
            gvk_of(&json!({"kind": "Service"})),
            Err(CloneError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_service_to_candidate() {
        let service = Service {
            metadata: ObjectMeta {
                name: Some("checkout".to_string()),
                namespace: Some("shop".to_string()),
                resource_version: Some("42".to_string()),
                labels: Some([("app".to_string(), "checkout".to_string())].into()),
                ..ObjectMeta::default()
            },
            ..Service::default()
        };

        let candidate = service_to_candidate(service).unwrap();
        assert_eq!(candidate.id, CandidateId::new("shop", "checkout", "Service", "42"));
        assert_eq!(candidate.labels.get("app").map(String::as_str), Some("checkout"));
        assert_eq!(candidate.payload["kind"], "Service");
        assert_eq!(candidate.payload["apiVersion"], "v1");
    }

    #[test]
    fn test_service_without_name_is_decode_error() {
        let err = service_to_candidate(Service::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::Decode(_)));
    }
}
