//! Per-call options forwarded to the cluster gateway

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;

/// How a partial update is merged into the live object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchStrategy {
    /// Kubernetes strategic merge patch
    #[default]
    StrategicMerge,
    /// RFC 7386 JSON merge patch
    JsonMerge,
    /// RFC 6902 JSON patch
    JsonPatch,
}

impl PatchStrategy {
    /// Content type sent with the patch request
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::StrategicMerge => "application/strategic-merge-patch+json",
            Self::JsonMerge => "application/merge-patch+json",
            Self::JsonPatch => "application/json-patch+json",
        }
    }
}

/// Listing parameters, never interpreted locally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
}

impl ListOptions {
    pub fn with_label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    pub fn with_field_selector(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_continue_token(mut self, token: impl Into<String>) -> Self {
        self.continue_token = Some(token.into());
        self
    }
}

/// Cascading behavior of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropagationPolicy {
    Orphan,
    Background,
    Foreground,
}

/// Delete parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation_policy: Option<PropagationPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<u32>,
    #[serde(default)]
    pub dry_run: bool,
}

impl DeleteOptions {
    /// Delete dependents in the background
    pub fn background() -> Self {
        Self {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceList {
    pub items: Vec<Manifest>,
    /// Token for the next page, `None` on the last page
    pub continue_token: Option<String>,
}

impl ResourceList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_strategy_default_is_strategic_merge() {
        assert_eq!(PatchStrategy::default(), PatchStrategy::StrategicMerge);
    }

    #[test]
    fn test_patch_strategy_content_types() {
        assert_eq!(
            PatchStrategy::JsonMerge.content_type(),
            "application/merge-patch+json"
        );
        assert_eq!(
            PatchStrategy::JsonPatch.content_type(),
            "application/json-patch+json"
        );
    }

    #[test]
    fn test_patch_strategy_from_yaml() {
        let strategy: PatchStrategy = serde_yaml::from_str("json-merge").unwrap();
        assert_eq!(strategy, PatchStrategy::JsonMerge);
    }

    #[test]
    fn test_list_options_builder() {
        let options = ListOptions::default()
            .with_label_selector("app=web")
            .with_limit(50)
            .with_continue_token("abc");

        assert_eq!(options.label_selector.as_deref(), Some("app=web"));
        assert_eq!(options.field_selector, None);
        assert_eq!(options.limit, Some(50));
        assert_eq!(options.continue_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_delete_options_background() {
        let options = DeleteOptions::background();
        assert_eq!(
            options.propagation_policy,
            Some(PropagationPolicy::Background)
        );
        assert!(!options.dry_run);
    }
}
