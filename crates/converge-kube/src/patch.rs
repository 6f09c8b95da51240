//! Patch engine

use converge_core::{Manifest, OperationResult, PatchStrategy, namespace_or_default};

use crate::connection::ClusterConnection;
use crate::error::{ClientError, Result};
use crate::gateway::{ClusterGateway, ResourceTarget};
use crate::report::{Operation, report};

impl<G: ClusterGateway> ClusterConnection<G> {
    /// Strategic-merge patch of an existing object
    pub async fn patch(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        patch: &[u8],
    ) -> Result<(OperationResult, Manifest)> {
        self.patch_with_strategy(kind, name, namespace, patch, PatchStrategy::StrategicMerge)
            .await
    }

    /// Patch an existing object with the given strategy
    ///
    /// The patch bytes are forwarded as they are; the server rejects malformed ones. A
    /// missing target is a not-found [`ClientError::Patch`], nothing gets created. The
    /// namespace is ignored for cluster-scoped types.
    pub async fn patch_with_strategy(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        patch: &[u8],
        strategy: PatchStrategy,
    ) -> Result<(OperationResult, Manifest)> {
        let mapping = self.resolve_kind(kind).await?;
        let target = ResourceTarget::new(mapping, namespace_or_default(namespace), name);

        tracing::debug!(
            resource = %target.context(),
            strategy = strategy.content_type(),
            "patch"
        );
        let patched = self
            .gateway()
            .patch(&target, patch, strategy)
            .await
            .map_err(|source| ClientError::Patch {
                context: target.context(),
                source,
            })?;

        let result = report(
            Operation::Patched,
            &target.mapping,
            patched.name().unwrap_or(&target.name),
            patched.namespace().unwrap_or(target.namespace_str()),
        );
        Ok((result, patched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use converge_core::ResourceTypeMapping;
    use serde_json::json;

    fn pods() -> ResourceTypeMapping {
        ResourceTypeMapping::new("", "v1", "Pod", "pods", true)
    }

    fn pod(name: &str, namespace: &str) -> Manifest {
        let mut manifest = Manifest::with_identity("v1", "Pod", name);
        manifest.set_namespace(namespace);
        manifest
    }

    #[tokio::test]
    async fn test_patch_missing_is_not_found() {
        let gateway = MockGateway::new();
        let conn = ClusterConnection::new(gateway.clone());

        let err = conn
            .patch("pod", "p1", "ns1", br#"{"metadata":{"labels":{"a":"b"}}}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Patch { .. }));
        assert!(err.is_not_found());
        assert_eq!(gateway.object_count(), 0);
        assert_eq!(gateway.operation_counts().creates, 0);
    }

    #[tokio::test]
    async fn test_patch_returns_updated_object() {
        let gateway = MockGateway::new();
        gateway.insert(&pods(), pod("p1", "ns1"));
        let conn = ClusterConnection::new(gateway.clone());

        let (result, updated) = conn
            .patch("po", "p1", "ns1", br#"{"metadata":{"labels":{"app":"web"}}}"#)
            .await
            .unwrap();

        assert_eq!(result.kind, "Pod");
        assert_eq!(result.namespace, "ns1");
        assert_eq!(result.resource.as_deref(), Some("pods"));
        assert_eq!(result.version.as_deref(), Some("v1"));
        assert_eq!(updated.labels().get("app").map(String::as_str), Some("web"));
    }

    #[tokio::test]
    async fn test_patch_default_namespace() {
        let gateway = MockGateway::new();
        gateway.insert(&pods(), pod("p1", "default"));
        let conn = ClusterConnection::new(gateway);

        let (result, _) = conn
            .patch_with_strategy(
                "pods",
                "p1",
                "",
                br#"[{"op":"add","path":"/spec","value":{}}]"#,
                PatchStrategy::JsonPatch,
            )
            .await
            .unwrap();
        assert_eq!(result.namespace, "default");
    }

    #[tokio::test]
    async fn test_patch_cluster_scoped_ignores_namespace() {
        let gateway = MockGateway::new();
        let cluster_roles = ResourceTypeMapping::new(
            "rbac.authorization.k8s.io",
            "v1",
            "ClusterRole",
            "clusterroles",
            false,
        );
        gateway.insert(
            &cluster_roles,
            Manifest::with_identity("rbac.authorization.k8s.io/v1", "ClusterRole", "cr1"),
        );
        let conn = ClusterConnection::new(gateway.clone());

        let (result, updated) = conn
            .patch_with_strategy(
                "clusterrole",
                "cr1",
                "team-a",
                br#"{"rules":[]}"#,
                PatchStrategy::JsonMerge,
            )
            .await
            .unwrap();

        assert_eq!(result.namespace, "");
        assert_eq!(updated.get(&["rules"]), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_malformed_patch_surfaces_as_patch_error() {
        let gateway = MockGateway::new();
        gateway.insert(&pods(), pod("p1", "ns1"));
        let conn = ClusterConnection::new(gateway);

        let err = conn.patch("pod", "p1", "ns1", b"not json").await.unwrap_err();
        assert!(matches!(err, ClientError::Patch { .. }));
        assert!(!err.is_not_found());
    }
}
