//! Cluster API gateway
//!
//! The client never talks HTTP itself. Everything it needs from the cluster goes through
//! [`ClusterGateway`]:
//! - **Discovery**: the list of served types with their scope and aliases
//! - **CRUD**: get/create/replace/patch/delete/list against an addressed type
//!
//! Two implementations ship with the crate:
//! - [`KubeGateway`]: backed by an already configured `kube::Client`
//! - [`MockGateway`]: in-memory cluster for tests

mod kubernetes;
mod mock;

pub use kubernetes::{DEFAULT_FIELD_MANAGER, KubeGateway};
pub use mock::{ListCall, MockGateway, MockOperation, OperationCounts, builtin_types};

use async_trait::async_trait;
use converge_core::{
    DeleteOptions, DiscoveredType, ListOptions, Manifest, PatchStrategy, ResourceList,
    ResourceTypeMapping,
};

use crate::error::{GatewayResult, ResourceContext};

/// Address of a single object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTarget {
    pub mapping: ResourceTypeMapping,
    /// `None` addresses the cluster-scoped endpoint
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceTarget {
    /// Address `name` in `namespace`; the namespace is dropped for cluster-scoped types
    pub fn new(mapping: ResourceTypeMapping, namespace: &str, name: &str) -> Self {
        let namespace = mapping.namespace_scoped.then(|| namespace.to_string());
        Self {
            mapping,
            namespace,
            name: name.to_string(),
        }
    }

    /// Namespace as a plain string, empty for cluster-scoped targets
    pub fn namespace_str(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// Error context for calls against this target
    pub fn context(&self) -> ResourceContext {
        ResourceContext::new(&self.mapping.kind, &self.name, self.namespace_str())
    }
}

/// Transport and discovery primitives of the cluster API
///
/// Implementations must be Send + Sync for use across async tasks. No call is retried.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Fetch the full discovery document
    async fn discover(&self) -> GatewayResult<Vec<DiscoveredType>>;

    /// Fetch one object; a missing object is [`GatewayError::NotFound`](crate::GatewayError::NotFound)
    async fn get(&self, target: &ResourceTarget) -> GatewayResult<Manifest>;

    /// Create a new object
    async fn create(&self, target: &ResourceTarget, manifest: &Manifest) -> GatewayResult<Manifest>;

    /// Replace an existing object's content entirely
    async fn replace(
        &self,
        target: &ResourceTarget,
        manifest: &Manifest,
    ) -> GatewayResult<Manifest>;

    /// Send a partial update, returning the updated object
    async fn patch(
        &self,
        target: &ResourceTarget,
        patch: &[u8],
        strategy: PatchStrategy,
    ) -> GatewayResult<Manifest>;

    /// Delete an object; returns once the request is accepted
    async fn delete(&self, target: &ResourceTarget, options: &DeleteOptions) -> GatewayResult<()>;

    /// List objects of a type, in one namespace or across all of them
    async fn list(
        &self,
        mapping: &ResourceTypeMapping,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> GatewayResult<ResourceList>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_drops_namespace_for_cluster_scoped() {
        let target = ResourceTarget::new(
            ResourceTypeMapping::new(
                "rbac.authorization.k8s.io",
                "v1",
                "ClusterRole",
                "clusterroles",
                false,
            ),
            "team-a",
            "cr1",
        );
        assert_eq!(target.namespace, None);
        assert_eq!(target.namespace_str(), "");
        assert_eq!(target.context().to_string(), "ClusterRole 'cr1'");
    }

    #[test]
    fn test_target_keeps_namespace_for_namespaced() {
        let target = ResourceTarget::new(
            ResourceTypeMapping::new("", "v1", "Pod", "pods", true),
            "ns1",
            "p1",
        );
        assert_eq!(target.namespace.as_deref(), Some("ns1"));
        assert_eq!(target.context(), ResourceContext::new("Pod", "p1", "ns1"));
    }
}
