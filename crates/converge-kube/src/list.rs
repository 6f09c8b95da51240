//! List engine

use converge_core::{ListOptions, ResourceList};

use crate::connection::ClusterConnection;
use crate::error::{ClientError, ResourceContext, Result};
use crate::gateway::ClusterGateway;

impl<G: ClusterGateway> ClusterConnection<G> {
    /// List objects of a kind or resource across all namespaces
    ///
    /// Selectors, limit and continue token are handed to the gateway untouched; the
    /// returned page carries the server's continue token.
    pub async fn list_resource(
        &self,
        resource: &str,
        options: &ListOptions,
    ) -> Result<ResourceList> {
        let mapping = self.resolve_kind(resource).await?;

        tracing::debug!(resource = %mapping.qualified_resource(), "list");
        self.gateway()
            .list(&mapping, None, options)
            .await
            .map_err(|source| ClientError::List {
                context: ResourceContext::collection(&mapping.kind, ""),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, MockOperation};
    use converge_core::{Manifest, ResourceTypeMapping};

    fn replicasets() -> ResourceTypeMapping {
        ResourceTypeMapping::new("apps", "v1", "ReplicaSet", "replicasets", true)
    }

    fn replicaset(name: &str, namespace: &str, app: &str) -> Manifest {
        Manifest::from_yaml(&format!(
            "apiVersion: apps/v1\nkind: ReplicaSet\nmetadata:\n  name: {name}\n  namespace: {namespace}\n  labels:\n    app: {app}\n"
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_across_namespaces() {
        let gateway = MockGateway::new();
        gateway.insert(&replicasets(), replicaset("a", "ns1", "web"));
        gateway.insert(&replicasets(), replicaset("b", "ns2", "web"));
        let conn = ClusterConnection::new(gateway);

        let list = conn
            .list_resource("replicaset", &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn test_options_passed_through() {
        let gateway = MockGateway::new();
        gateway.insert(&replicasets(), replicaset("a", "ns1", "web"));
        gateway.insert(&replicasets(), replicaset("b", "ns1", "db"));
        let conn = ClusterConnection::new(gateway.clone());

        let options = ListOptions::default()
            .with_label_selector("app=web")
            .with_field_selector("metadata.name=a")
            .with_limit(10);
        let list = conn.list_resource("rs", &options).await.unwrap();

        assert_eq!(list.len(), 1);
        let calls = gateway.list_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].resource, "replicasets.apps");
        assert_eq!(calls[0].namespace, None);
        assert_eq!(calls[0].options, options);
    }

    #[tokio::test]
    async fn test_list_error_has_context() {
        let gateway = MockGateway::new();
        gateway.fail_next(MockOperation::List, 403, "forbidden");
        let conn = ClusterConnection::new(gateway);

        let err = conn
            .list_resource("pods", &ListOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.context().map(|c| c.kind.as_str()), Some("Pod"));
        assert!(err.to_string().starts_with("failed to list Pod:"));
    }
}
