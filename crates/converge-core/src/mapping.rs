//! Resource type identities and discovery matching
//!
//! Discovery yields one [`DiscoveredType`] per (group, version, resource). A
//! [`DiscoverySnapshot`] holds an immutable copy of that document and answers the
//! question "which type does this free-form name refer to?".
//!
//! Matching rules:
//! - case-insensitive against the kind, the plural resource, the singular name and every
//!   short name
//! - bare names only consider each group's preferred version (falling back to the first
//!   listed version that serves the name)
//! - `resource.group` and `resource.version.group` pin the group (and version)
//! - a bare name matching more than one resource, in one group or across groups, is
//!   ambiguous, never guessed

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ResolveError;

/// Group and version parsed from an `apiVersion` string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    /// Parse an `apiVersion`
    ///
    /// - "apps/v1" -> group="apps", version="v1"
    /// - "v1" -> group="", version="v1" (core API)
    pub fn parse(api_version: &str) -> Self {
        match api_version.rsplit_once('/') {
            Some((group, version)) => Self {
                group: group.to_string(),
                version: version.to_string(),
            },
            None => Self {
                group: String::new(),
                version: api_version.to_string(),
            },
        }
    }

    /// Render back to `apiVersion` form
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_version())
    }
}

/// Fully resolved identity of a resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeMapping {
    /// API group, empty for the core group
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural REST collection name, e.g. "pods"
    pub resource: String,
    pub namespace_scoped: bool,
}

impl ResourceTypeMapping {
    pub fn new(
        group: &str,
        version: &str,
        kind: &str,
        resource: &str,
        namespace_scoped: bool,
    ) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            resource: resource.to_string(),
            namespace_scoped,
        }
    }

    /// The core `v1` Namespace type
    pub fn namespace() -> Self {
        Self::new("", "v1", "Namespace", "namespaces", false)
    }

    /// `apiVersion` form of group and version
    pub fn api_version(&self) -> String {
        GroupVersion {
            group: self.group.clone(),
            version: self.version.clone(),
        }
        .api_version()
    }

    /// Whether this type is the Namespace kind itself
    pub fn is_namespace_kind(&self) -> bool {
        self.group.is_empty() && self.kind.eq_ignore_ascii_case("namespace")
    }

    /// `resource.group` form used in messages, bare resource for the core group
    pub fn qualified_resource(&self) -> String {
        if self.group.is_empty() {
            self.resource.clone()
        } else {
            format!("{}.{}", self.resource, self.group)
        }
    }
}

impl fmt::Display for ResourceTypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// One discovery entry with everything needed for name matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredType {
    pub mapping: ResourceTypeMapping,
    #[serde(default)]
    pub singular_name: String,
    #[serde(default)]
    pub short_names: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    /// Whether `mapping.version` is the group's preferred version
    #[serde(default)]
    pub preferred: bool,
}

impl DiscoveredType {
    /// Entry for a preferred version with the conventional singular name
    pub fn new(mapping: ResourceTypeMapping) -> Self {
        let singular_name = mapping.kind.to_ascii_lowercase();
        Self {
            mapping,
            singular_name,
            short_names: Vec::new(),
            categories: Vec::new(),
            verbs: ["create", "delete", "get", "list", "patch", "update"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            preferred: true,
        }
    }

    pub fn with_short_names(mut self, short_names: &[&str]) -> Self {
        self.short_names = short_names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_verbs(mut self, verbs: &[&str]) -> Self {
        self.verbs = verbs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn not_preferred(mut self) -> Self {
        self.preferred = false;
        self
    }

    /// Case-insensitive match against kind, plural, singular and short names
    pub fn matches_name(&self, name: &str) -> bool {
        self.mapping.kind.eq_ignore_ascii_case(name)
            || self.mapping.resource.eq_ignore_ascii_case(name)
            || self.singular_name.eq_ignore_ascii_case(name)
            || self.short_names.iter().any(|s| s.eq_ignore_ascii_case(name))
    }

    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Immutable discovery document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySnapshot {
    types: Vec<DiscoveredType>,
}

impl DiscoverySnapshot {
    pub fn new(types: Vec<DiscoveredType>) -> Self {
        Self { types }
    }

    pub fn types(&self) -> &[DiscoveredType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve a kind, resource or short name, optionally group-qualified
    pub fn resolve(&self, name: &str) -> Result<ResourceTypeMapping, ResolveError> {
        let name = name.trim();
        let unknown = || ResolveError::Unknown {
            name: name.to_string(),
        };
        if name.is_empty() {
            return Err(unknown());
        }

        let selected = match name.split_once('.') {
            Some((resource, qualifier)) => self.select_qualified(resource, qualifier),
            None => self.select_per_group(|t| t.matches_name(name)),
        };

        match selected.as_slice() {
            [] => Err(unknown()),
            [only] => Ok(only.mapping.clone()),
            many => {
                let mut candidates: Vec<String> =
                    many.iter().map(|t| t.mapping.qualified_resource()).collect();
                candidates.sort();
                Err(ResolveError::Ambiguous {
                    name: name.to_string(),
                    candidates,
                })
            }
        }
    }

    /// Exact lookup by group, version and kind
    pub fn resolve_gvk(
        &self,
        group: &str,
        version: &str,
        kind: &str,
    ) -> Option<ResourceTypeMapping> {
        self.types
            .iter()
            .find(|t| {
                t.mapping.group == group
                    && t.mapping.version == version
                    && t.mapping.kind.eq_ignore_ascii_case(kind)
            })
            .map(|t| t.mapping.clone())
    }

    /// Namespaced types that can be listed, one version per group, optionally
    /// restricted to a discovery category
    pub fn listable_namespaced(&self, category: Option<&str>) -> Vec<ResourceTypeMapping> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        let mut result = Vec::new();

        for t in self.preferred_first() {
            if !t.mapping.namespace_scoped || !t.supports("list") {
                continue;
            }
            if category.is_some_and(|c| !t.in_category(c)) {
                continue;
            }
            let key = (t.mapping.group.as_str(), t.mapping.resource.as_str());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            result.push(t.mapping.clone());
        }

        result
    }

    fn select_qualified(&self, resource: &str, qualifier: &str) -> Vec<&DiscoveredType> {
        let by_group =
            self.select_per_group(|t| t.mapping.group == qualifier && t.matches_name(resource));
        if !by_group.is_empty() {
            return by_group;
        }

        // resource.version.group
        match qualifier.split_once('.') {
            Some((version, group)) => self.select_per_group(|t| {
                t.mapping.group == group
                    && t.mapping.version == version
                    && t.matches_name(resource)
            }),
            None => Vec::new(),
        }
    }

    /// At most one matching entry per group and resource: the preferred version if it
    /// matches, otherwise the first listed version that does
    fn select_per_group<F>(&self, matches: F) -> Vec<&DiscoveredType>
    where
        F: Fn(&DiscoveredType) -> bool,
    {
        let mut selected: Vec<&DiscoveredType> = Vec::new();

        for t in self.preferred_first() {
            if !matches(t) {
                continue;
            }
            let seen = selected.iter().any(|s| {
                s.mapping.group == t.mapping.group && s.mapping.resource == t.mapping.resource
            });
            if !seen {
                selected.push(t);
            }
        }

        selected
    }

    fn preferred_first(&self) -> impl Iterator<Item = &DiscoveredType> {
        self.types
            .iter()
            .filter(|t| t.preferred)
            .chain(self.types.iter().filter(|t| !t.preferred))
    }
}
