//! Apply engine
//!
//! Get-or-create-or-replace for a single manifest:
//!
//! ```text
//! RESOLVE -> LOOKUP -> CREATE | REPLACE -> DONE
//! ```
//!
//! A replace sends the whole manifest; fields other actors set on the live object are
//! overwritten. There is no field-level merge and no retry.

use converge_core::{Manifest, OperationResult, effective_namespace};

use crate::connection::ClusterConnection;
use crate::error::{ClientError, Result};
use crate::gateway::{ClusterGateway, ResourceTarget};
use crate::report::{Operation, report};

/// Outcome of an apply, with the remote view
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub result: OperationResult,
    /// Whether the object was created (true) or replaced (false)
    pub created: bool,
    /// Remote object after the write, as far as it could be observed
    pub live: Manifest,
}

impl<G: ClusterGateway> ClusterConnection<G> {
    /// Create the manifest's object, or replace it when it already exists
    pub async fn apply(&self, manifest: &mut Manifest) -> Result<OperationResult> {
        self.apply_with_namespace_override(manifest, "").await
    }

    /// Like [`apply`](Self::apply), placing namespaced objects that declare no namespace
    /// into `namespace_override`
    ///
    /// The override never replaces a namespace the manifest declares. The manifest's
    /// namespace field is rewritten to the effective namespace.
    pub async fn apply_with_namespace_override(
        &self,
        manifest: &mut Manifest,
        namespace_override: &str,
    ) -> Result<OperationResult> {
        self.apply_detailed(manifest, namespace_override)
            .await
            .map(|report| report.result)
    }

    /// Apply and report whether the object was created along with its remote view
    pub async fn apply_detailed(
        &self,
        manifest: &mut Manifest,
        namespace_override: &str,
    ) -> Result<ApplyReport> {
        let mapping = self.resolve_manifest_type(manifest).await?;

        let name = manifest
            .name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ClientError::InvalidManifest("manifest has no metadata.name".into()))?
            .to_string();

        let namespace = effective_namespace(
            &mapping,
            manifest.namespace().unwrap_or(""),
            namespace_override,
        );
        manifest.set_namespace(&namespace);

        let target = ResourceTarget::new(mapping, &namespace, &name);
        tracing::debug!(resource = %target.context(), "looking up existing object");

        match self.gateway().get(&target).await {
            Ok(_) => self.replace(&target, manifest).await,
            Err(e) if e.is_not_found() => self.create(&target, manifest).await,
            Err(source) => Err(ClientError::Lookup {
                context: target.context(),
                source,
            }),
        }
    }

    async fn create(&self, target: &ResourceTarget, manifest: &Manifest) -> Result<ApplyReport> {
        let live = self
            .gateway()
            .create(target, manifest)
            .await
            .map_err(|source| ClientError::Create {
                context: target.context(),
                source,
            })?;

        let result = report(
            Operation::Created,
            &target.mapping,
            &target.name,
            target.namespace_str(),
        );
        Ok(ApplyReport {
            result,
            created: true,
            live,
        })
    }

    async fn replace(&self, target: &ResourceTarget, manifest: &Manifest) -> Result<ApplyReport> {
        let replaced = self
            .gateway()
            .replace(target, &unconditional(manifest))
            .await
            .map_err(|source| ClientError::Replace {
                context: target.context(),
                source,
            })?;

        // Refresh is best effort; the replace already succeeded
        let live = match self.gateway().get(target).await {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(
                    resource = %target.context(),
                    error = %e,
                    "failed to refresh object after replace"
                );
                replaced
            }
        };

        let result = report(
            Operation::Replaced,
            &target.mapping,
            &target.name,
            target.namespace_str(),
        );
        Ok(ApplyReport {
            result,
            created: false,
            live,
        })
    }
}

/// Copy of the manifest without `metadata.resourceVersion`, so the server does not check
/// it against the live object
fn unconditional(manifest: &Manifest) -> Manifest {
    let mut outgoing = manifest.clone();
    if let Some(serde_json::Value::Object(metadata)) = outgoing.as_map_mut().get_mut("metadata") {
        metadata.remove("resourceVersion");
    }
    outgoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, MockOperation};
    use converge_core::ResourceTypeMapping;
    use serde_json::json;

    fn configmap(yaml: &str) -> Manifest {
        Manifest::from_yaml(yaml).unwrap()
    }

    fn configmaps() -> ResourceTypeMapping {
        ResourceTypeMapping::new("", "v1", "ConfigMap", "configmaps", true)
    }

    #[tokio::test]
    async fn test_create_then_replace() {
        let gateway = MockGateway::new();
        let conn = ClusterConnection::new(gateway.clone());
        let mut manifest = configmap("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm1\n");

        let first = conn.apply_detailed(&mut manifest, "").await.unwrap();
        assert!(first.created);
        assert_eq!(first.result.group, None);

        let second = conn.apply_detailed(&mut manifest, "").await.unwrap();
        assert!(!second.created);
        assert_eq!(second.result.resource.as_deref(), Some("configmaps"));
        assert_eq!(second.live, manifest);

        let counts = gateway.operation_counts();
        assert_eq!(counts.creates, 1);
        assert_eq!(counts.replaces, 1);
    }

    #[tokio::test]
    async fn test_namespace_written_back() {
        let conn = ClusterConnection::new(MockGateway::new());
        let mut manifest = configmap("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm1\n");

        let result = conn
            .apply_with_namespace_override(&mut manifest, "team-a")
            .await
            .unwrap();
        assert_eq!(result.namespace, "team-a");
        assert_eq!(manifest.namespace(), Some("team-a"));
    }

    #[tokio::test]
    async fn test_cluster_scoped_namespace_removed() {
        let conn = ClusterConnection::new(MockGateway::new());
        let mut manifest = configmap(
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: ClusterRole\nmetadata:\n  name: cr1\n  namespace: stray\n",
        );

        let result = conn.apply(&mut manifest).await.unwrap();
        assert_eq!(result.namespace, "");
        assert_eq!(manifest.namespace(), None);
    }

    #[tokio::test]
    async fn test_lookup_error_aborts() {
        let gateway = MockGateway::new();
        gateway.fail_next(MockOperation::Get, 500, "etcd timeout");
        let conn = ClusterConnection::new(gateway.clone());
        let mut manifest = configmap("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm1\n");

        let err = conn.apply(&mut manifest).await.unwrap_err();
        assert!(matches!(err, ClientError::Lookup { .. }));
        assert!(!err.is_not_found());
        assert_eq!(gateway.operation_counts().creates, 0);
        assert_eq!(gateway.object_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_swallowed() {
        let gateway = MockGateway::new();
        let conn = ClusterConnection::new(gateway.clone());
        let mut manifest = configmap("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm1\n");
        conn.apply(&mut manifest).await.unwrap();

        manifest
            .as_map_mut()
            .insert("data".to_string(), json!({"k": "v"}));
        // Lookup passes, the refresh after the replace fails
        gateway.fail_after(MockOperation::Get, 1, 503, "unavailable");

        let report = conn.apply_detailed(&mut manifest, "").await.unwrap();
        assert!(!report.created);
        assert_eq!(report.live, manifest);
        assert_eq!(gateway.operation_counts().gets, 3);
        assert_eq!(
            gateway.object(&configmaps(), "default", "cm1").unwrap(),
            manifest
        );
    }

    #[tokio::test]
    async fn test_replace_strips_resource_version() {
        let gateway = MockGateway::new();
        let conn = ClusterConnection::new(gateway.clone());
        let mut manifest = configmap(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm1\n  namespace: default\n  resourceVersion: \"42\"\n",
        );
        gateway.insert(&configmaps(), manifest.clone());

        conn.apply(&mut manifest).await.unwrap();

        let stored = gateway.object(&configmaps(), "default", "cm1").unwrap();
        assert_eq!(stored.resource_version(), None);
        assert_eq!(manifest.resource_version(), Some("42"));
    }

    #[tokio::test]
    async fn test_missing_name_rejected() {
        let gateway = MockGateway::new();
        let conn = ClusterConnection::new(gateway.clone());
        let mut manifest = configmap("apiVersion: v1\nkind: ConfigMap\nmetadata: {}\n");

        let err = conn.apply(&mut manifest).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidManifest(_)));
        assert_eq!(gateway.operation_counts().gets, 0);
    }
}
