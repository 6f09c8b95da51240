//! Gateway backed by a live Kubernetes API server
//!
//! Discovery walks the core and group resource lists directly (rather than
//! `kube::Discovery`) because name resolution needs short names, singular names and
//! categories, which only the raw `APIResourceList` carries.

use async_trait::async_trait;
use converge_core::{
    DeleteOptions, DiscoveredType, ListOptions, Manifest, PatchStrategy, PropagationPolicy,
    ResourceList, ResourceTypeMapping,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::{
    Client,
    api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    core::GroupVersionKind,
    discovery::ApiResource,
};
use serde_json::Value as JsonValue;

use super::{ClusterGateway, ResourceTarget};
use crate::error::{GatewayError, GatewayResult};

/// Field manager recorded on every write
pub const DEFAULT_FIELD_MANAGER: &str = "converge";

/// [`ClusterGateway`] over a `kube::Client`
///
/// The client must already be configured and authenticated; building it from a
/// kubeconfig or the in-cluster identity is left to the caller.
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    field_manager: String,
}

impl KubeGateway {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }

    /// Record writes under a different field manager
    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }

    /// Get the underlying Kubernetes client
    pub fn kube_client(&self) -> &Client {
        &self.client
    }

    fn api(&self, mapping: &ResourceTypeMapping, namespace: Option<&str>) -> Api<DynamicObject> {
        let api_resource = api_resource(mapping);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &api_resource),
            None => Api::all_with(self.client.clone(), &api_resource),
        }
    }

    fn target_api(&self, target: &ResourceTarget) -> Api<DynamicObject> {
        self.api(&target.mapping, target.namespace.as_deref())
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }

    async fn discover_core(&self, types: &mut Vec<DiscoveredType>) -> GatewayResult<()> {
        let versions = self.client.list_core_api_versions().await?;

        // The first core version is the preferred one
        for (index, version) in versions.versions.iter().enumerate() {
            match self.client.list_core_api_resources(version).await {
                Ok(list) => types.extend(discovered_types("", version, index == 0, &list)),
                Err(e) => {
                    tracing::warn!(version = %version, error = %e, "skipping core API version");
                }
            }
        }
        Ok(())
    }

    async fn discover_groups(&self, types: &mut Vec<DiscoveredType>) -> GatewayResult<()> {
        let groups = self.client.list_api_groups().await?;

        for group in &groups.groups {
            let preferred = group
                .preferred_version
                .as_ref()
                .map(|v| v.version.as_str());

            for group_version in &group.versions {
                match self
                    .client
                    .list_api_group_resources(&group_version.group_version)
                    .await
                {
                    Ok(list) => types.extend(discovered_types(
                        &group.name,
                        &group_version.version,
                        preferred == Some(group_version.version.as_str()),
                        &list,
                    )),
                    // An unavailable aggregated API must not hide every other group
                    Err(e) => {
                        tracing::warn!(
                            group_version = %group_version.group_version,
                            error = %e,
                            "skipping unavailable API group version"
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    async fn discover(&self) -> GatewayResult<Vec<DiscoveredType>> {
        let mut types = Vec::new();
        self.discover_core(&mut types).await?;
        self.discover_groups(&mut types).await?;
        tracing::debug!(types = types.len(), "fetched discovery document");
        Ok(types)
    }

    async fn get(&self, target: &ResourceTarget) -> GatewayResult<Manifest> {
        let obj = self
            .target_api(target)
            .get(&target.name)
            .await
            .map_err(|e| map_kube_error(e, target))?;
        to_manifest(obj)
    }

    async fn create(
        &self,
        target: &ResourceTarget,
        manifest: &Manifest,
    ) -> GatewayResult<Manifest> {
        let obj = to_object(target, manifest)?;
        let created = self
            .target_api(target)
            .create(&self.post_params(), &obj)
            .await
            .map_err(|e| map_kube_error(e, target))?;
        to_manifest(created)
    }

    async fn replace(
        &self,
        target: &ResourceTarget,
        manifest: &Manifest,
    ) -> GatewayResult<Manifest> {
        let obj = to_object(target, manifest)?;
        let replaced = self
            .target_api(target)
            .replace(&target.name, &self.post_params(), &obj)
            .await
            .map_err(|e| map_kube_error(e, target))?;
        to_manifest(replaced)
    }

    async fn patch(
        &self,
        target: &ResourceTarget,
        patch: &[u8],
        strategy: PatchStrategy,
    ) -> GatewayResult<Manifest> {
        let patch = decode_patch(patch, strategy)?;
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };
        let patched = self
            .target_api(target)
            .patch(&target.name, &params, &patch)
            .await
            .map_err(|e| map_kube_error(e, target))?;
        to_manifest(patched)
    }

    async fn delete(&self, target: &ResourceTarget, options: &DeleteOptions) -> GatewayResult<()> {
        let params = DeleteParams {
            dry_run: options.dry_run,
            grace_period_seconds: options.grace_period_seconds,
            propagation_policy: options.propagation_policy.map(propagation_policy),
            ..Default::default()
        };
        self.target_api(target)
            .delete(&target.name, &params)
            .await
            .map_err(|e| map_kube_error(e, target))?;
        Ok(())
    }

    async fn list(
        &self,
        mapping: &ResourceTypeMapping,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> GatewayResult<ResourceList> {
        let params = ListParams {
            label_selector: options.label_selector.clone(),
            field_selector: options.field_selector.clone(),
            limit: options.limit,
            continue_token: options.continue_token.clone(),
            ..Default::default()
        };
        let list = self
            .api(mapping, namespace)
            .list(&params)
            .await
            .map_err(api_error)?;

        let items = list
            .items
            .into_iter()
            .map(to_manifest)
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(ResourceList {
            items,
            continue_token: list.metadata.continue_.filter(|t| !t.is_empty()),
        })
    }
}

fn api_resource(mapping: &ResourceTypeMapping) -> ApiResource {
    let gvk = GroupVersionKind::gvk(&mapping.group, &mapping.version, &mapping.kind);
    ApiResource::from_gvk_with_plural(&gvk, &mapping.resource)
}

/// Discovery entries for one group version, subresources excluded
fn discovered_types(
    group: &str,
    version: &str,
    preferred: bool,
    list: &APIResourceList,
) -> Vec<DiscoveredType> {
    list.resources
        .iter()
        .filter(|r| !r.name.contains('/'))
        .map(|r| DiscoveredType {
            mapping: ResourceTypeMapping::new(group, version, &r.kind, &r.name, r.namespaced),
            singular_name: r.singular_name.clone(),
            short_names: r.short_names.clone().unwrap_or_default(),
            categories: r.categories.clone().unwrap_or_default(),
            verbs: r.verbs.clone(),
            preferred,
        })
        .collect()
}

/// Convert a manifest to the wire object, filling in type information when missing
fn to_object(target: &ResourceTarget, manifest: &Manifest) -> GatewayResult<DynamicObject> {
    let mut manifest = manifest.clone();
    let map = manifest.as_map_mut();
    map.entry("apiVersion")
        .or_insert_with(|| JsonValue::from(target.mapping.api_version()));
    map.entry("kind")
        .or_insert_with(|| JsonValue::from(target.mapping.kind.as_str()));

    Ok(serde_json::from_value(manifest.into_value())?)
}

fn to_manifest(obj: DynamicObject) -> GatewayResult<Manifest> {
    let value = serde_json::to_value(obj)?;
    Manifest::from_value(value).map_err(|e| GatewayError::Serialization(e.to_string()))
}

fn decode_patch(patch: &[u8], strategy: PatchStrategy) -> GatewayResult<Patch<JsonValue>> {
    let invalid = |e: serde_json::Error| GatewayError::InvalidPatch(e.to_string());
    let decoded = match strategy {
        PatchStrategy::StrategicMerge => {
            Patch::Strategic(serde_json::from_slice(patch).map_err(invalid)?)
        }
        PatchStrategy::JsonMerge => Patch::Merge(serde_json::from_slice(patch).map_err(invalid)?),
        PatchStrategy::JsonPatch => Patch::Json(serde_json::from_slice(patch).map_err(invalid)?),
    };
    Ok(decoded)
}

fn propagation_policy(policy: PropagationPolicy) -> kube::api::PropagationPolicy {
    match policy {
        PropagationPolicy::Orphan => kube::api::PropagationPolicy::Orphan,
        PropagationPolicy::Background => kube::api::PropagationPolicy::Background,
        PropagationPolicy::Foreground => kube::api::PropagationPolicy::Foreground,
    }
}

fn map_kube_error(err: kube::Error, target: &ResourceTarget) -> GatewayError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => GatewayError::NotFound {
            resource: target.mapping.qualified_resource(),
            name: target.name.clone(),
        },
        other => api_error(other),
    }
}

fn api_error(err: kube::Error) -> GatewayError {
    match err {
        kube::Error::Api(resp) => GatewayError::Api {
            code: resp.code,
            reason: resp.reason,
            message: resp.message,
        },
        other => GatewayError::Kube(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;

    fn api_resource_entry(name: &str, kind: &str, namespaced: bool) -> APIResource {
        APIResource {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced,
            singular_name: kind.to_ascii_lowercase(),
            short_names: Some(vec!["po".to_string()]),
            categories: Some(vec!["all".to_string()]),
            verbs: vec!["get".to_string(), "list".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_discovered_types_skip_subresources() {
        let list = APIResourceList {
            group_version: "v1".to_string(),
            resources: vec![
                api_resource_entry("pods", "Pod", true),
                api_resource_entry("pods/log", "Pod", true),
                api_resource_entry("pods/status", "Pod", true),
            ],
        };

        let types = discovered_types("", "v1", true, &list);
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].mapping.resource, "pods");
        assert_eq!(types[0].short_names, vec!["po"]);
        assert_eq!(types[0].categories, vec!["all"]);
        assert!(types[0].preferred);
        assert!(types[0].supports("list"));
    }

    #[test]
    fn test_api_resource_from_mapping() {
        let mapping = ResourceTypeMapping::new("apps", "v1", "Deployment", "deployments", true);
        let ar = api_resource(&mapping);
        assert_eq!(ar.group, "apps");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.api_version, "apps/v1");
        assert_eq!(ar.kind, "Deployment");
        assert_eq!(ar.plural, "deployments");
    }

    #[test]
    fn test_to_object_fills_missing_type_meta() {
        let target = ResourceTarget::new(
            ResourceTypeMapping::new(
                "rbac.authorization.k8s.io",
                "v1",
                "ClusterRole",
                "clusterroles",
                false,
            ),
            "",
            "cr1",
        );
        let manifest =
            Manifest::from_json(r#"{"kind":"ClusterRole","metadata":{"name":"cr1"}}"#).unwrap();

        let obj = to_object(&target, &manifest).unwrap();
        let types = obj.types.unwrap();
        assert_eq!(types.api_version, "rbac.authorization.k8s.io/v1");
        assert_eq!(types.kind, "ClusterRole");
        assert_eq!(obj.metadata.name.as_deref(), Some("cr1"));
    }

    #[test]
    fn test_object_roundtrip_keeps_payload() {
        let target = ResourceTarget::new(
            ResourceTypeMapping::new("", "v1", "ConfigMap", "configmaps", true),
            "default",
            "cm1",
        );
        let manifest = Manifest::from_json(
            r#"{"apiVersion":"v1","kind":"ConfigMap","metadata":{"name":"cm1","namespace":"default"},"data":{"k":"v"}}"#,
        )
        .unwrap();

        let back = to_manifest(to_object(&target, &manifest).unwrap()).unwrap();
        assert_eq!(back.name(), Some("cm1"));
        assert_eq!(back.namespace(), Some("default"));
        assert_eq!(back.get(&["data", "k"]), Some(&JsonValue::from("v")));
    }

    #[test]
    fn test_decode_patch_rejects_malformed_bytes() {
        for strategy in [
            PatchStrategy::StrategicMerge,
            PatchStrategy::JsonMerge,
            PatchStrategy::JsonPatch,
        ] {
            let err = decode_patch(b"{not json", strategy).unwrap_err();
            assert!(matches!(err, GatewayError::InvalidPatch(_)));
        }
    }

    #[test]
    fn test_decode_patch_strategies() {
        assert!(matches!(
            decode_patch(
                br#"{"metadata":{"labels":{"a":"b"}}}"#,
                PatchStrategy::StrategicMerge
            ),
            Ok(Patch::Strategic(_))
        ));
        assert!(matches!(
            decode_patch(br#"{"data":null}"#, PatchStrategy::JsonMerge),
            Ok(Patch::Merge(_))
        ));
        assert!(matches!(
            decode_patch(
                br#"[{"op":"remove","path":"/data/k"}]"#,
                PatchStrategy::JsonPatch
            ),
            Ok(Patch::Json(_))
        ));
    }
}
