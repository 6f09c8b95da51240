//! Namespace scoping policy
//!
//! Decides which namespace a manifest lands in. An override only fills a gap: it never
//! replaces a namespace the manifest already declares.

use crate::mapping::ResourceTypeMapping;

/// Namespace used when neither the manifest nor the caller names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Effective namespace for a manifest of the given type
///
/// Rules, in order:
/// 1. cluster-scoped type: `""`, both inputs ignored
/// 2. no manifest namespace, no override: [`DEFAULT_NAMESPACE`]
/// 3. no manifest namespace, override given: the override
/// 4. manifest namespace given: the manifest namespace
pub fn effective_namespace(
    resolved: &ResourceTypeMapping,
    manifest_namespace: &str,
    override_namespace: &str,
) -> String {
    if !resolved.namespace_scoped {
        return String::new();
    }
    match (manifest_namespace.is_empty(), override_namespace.is_empty()) {
        (true, true) => DEFAULT_NAMESPACE.to_string(),
        (true, false) => override_namespace.to_string(),
        (false, _) => manifest_namespace.to_string(),
    }
}

/// Namespace for a direct get/patch/delete call against a namespaced type
pub fn namespace_or_default(namespace: &str) -> &str {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    }
}
