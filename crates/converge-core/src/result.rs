//! Canonical outcome of a mutating operation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mapping::ResourceTypeMapping;

/// What a mutating call touched
///
/// `kind` is always the resolved kind. Group, version and resource are only present when
/// the code path that produced the result had the full type identity at hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub name: String,
    /// Empty for cluster-scoped resources
    pub namespace: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl OperationResult {
    /// Name, namespace and kind only
    pub fn identity(kind: &str, name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// Every field, taken from the resolved type
    pub fn qualified(mapping: &ResourceTypeMapping, name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind: mapping.kind.clone(),
            group: Some(mapping.group.clone()),
            version: Some(mapping.version.clone()),
            resource: Some(mapping.resource.clone()),
        }
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_leaves_type_fields_unset() {
        let result = OperationResult::identity("ConfigMap", "cm1", "default");
        assert_eq!(result.name, "cm1");
        assert_eq!(result.namespace, "default");
        assert_eq!(result.kind, "ConfigMap");
        assert!(result.group.is_none());
        assert!(result.version.is_none());
        assert!(result.resource.is_none());
    }

    #[test]
    fn test_qualified_populates_everything() {
        let mapping = ResourceTypeMapping::new("apps", "v1", "Deployment", "deployments", true);
        let result = OperationResult::qualified(&mapping, "web", "prod");
        assert_eq!(result.kind, "Deployment");
        assert_eq!(result.group.as_deref(), Some("apps"));
        assert_eq!(result.version.as_deref(), Some("v1"));
        assert_eq!(result.resource.as_deref(), Some("deployments"));
    }

    #[test]
    fn test_core_group_is_set_but_empty() {
        let mapping = ResourceTypeMapping::new("", "v1", "Pod", "pods", true);
        let result = OperationResult::qualified(&mapping, "p1", "ns1");
        assert_eq!(result.group.as_deref(), Some(""));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            OperationResult::identity("ClusterRole", "cr1", "").to_string(),
            "ClusterRole/cr1"
        );
        assert_eq!(
            OperationResult::identity("Pod", "p1", "ns1").to_string(),
            "ns1/Pod/p1"
        );
    }

    #[test]
    fn test_serialize_skips_unset_fields() {
        let json = serde_json::to_value(OperationResult::identity("Pod", "p1", "ns1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "p1", "namespace": "ns1", "kind": "Pod"})
        );
    }
}
