//! Untyped resource manifests
//!
//! A [`Manifest`] is the dynamic document a caller hands to the client: `apiVersion`,
//! `kind`, `metadata` and an opaque payload. Keys keep their insertion order so a manifest
//! serializes back the way it was written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::mapping::GroupVersion;

/// Dynamic resource document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, JsonValue>);

impl Manifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Create a manifest with type information and a name
    pub fn with_identity(api_version: &str, kind: &str, name: &str) -> Self {
        let mut manifest = Self::new();
        manifest
            .0
            .insert("apiVersion".to_string(), JsonValue::from(api_version));
        manifest.0.insert("kind".to_string(), JsonValue::from(kind));
        manifest.set_metadata_field("name", JsonValue::from(name));
        manifest
    }

    /// Wrap a JSON value; anything other than an object is rejected
    pub fn from_value(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(CoreError::invalid(format!(
                "expected a mapping at the document root, found {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a multi-document YAML stream
    ///
    /// Documents are separated by `---`. Empty and comment-only documents are skipped.
    pub fn parse_stream(stream: &str) -> Result<Vec<Self>> {
        let mut manifests = Vec::new();

        for (index, doc) in split_documents(stream).into_iter().enumerate() {
            let manifest = Self::from_yaml(doc).map_err(|e| {
                CoreError::invalid(format!("failed to parse document {}: {}", index, e))
            })?;
            manifests.push(manifest);
        }

        Ok(manifests)
    }

    /// Raw `apiVersion` field
    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion").and_then(JsonValue::as_str)
    }

    /// Group and version parsed from `apiVersion`
    pub fn group_version(&self) -> Option<GroupVersion> {
        self.api_version()
            .filter(|v| !v.is_empty())
            .map(GroupVersion::parse)
    }

    /// Raw `kind` field
    pub fn kind(&self) -> Option<&str> {
        self.0
            .get("kind")
            .and_then(JsonValue::as_str)
            .filter(|k| !k.is_empty())
    }

    /// `metadata.name`
    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    /// `metadata.namespace`, `None` when absent or empty
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    /// Set `metadata.namespace`; an empty value removes the field
    pub fn set_namespace(&mut self, namespace: &str) {
        if namespace.is_empty() {
            if let Some(JsonValue::Object(metadata)) = self.0.get_mut("metadata") {
                metadata.remove("namespace");
            }
            return;
        }
        self.set_metadata_field("namespace", JsonValue::from(namespace));
    }

    /// `metadata.resourceVersion`
    pub fn resource_version(&self) -> Option<&str> {
        self.metadata_str("resourceVersion")
    }

    /// `metadata.labels` as string pairs; non-string values are skipped
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.metadata_string_map("labels")
    }

    /// `metadata.annotations` as string pairs; non-string values are skipped
    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.metadata_string_map("annotations")
    }

    /// Look up a nested field by its path segments
    pub fn get(&self, path: &[&str]) -> Option<&JsonValue> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, segment| value.get(segment))
    }

    /// Underlying ordered map
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Mutable access to the underlying ordered map
    pub fn as_map_mut(&mut self) -> &mut Map<String, JsonValue> {
        &mut self.0
    }

    /// Convert into a JSON value
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.0)
    }

    /// Human-readable `namespace/Kind/name` label for logs
    pub fn display_name(&self) -> String {
        let kind = self.kind().unwrap_or("Unknown");
        let name = self.name().unwrap_or("unnamed");
        match self.namespace() {
            Some(ns) => format!("{}/{}/{}", ns, kind, name),
            None => format!("{}/{}", kind, name),
        }
    }

    fn metadata_str(&self, field: &str) -> Option<&str> {
        self.get(&["metadata", field])
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
    }

    fn metadata_string_map(&self, field: &str) -> BTreeMap<String, String> {
        self.get(&["metadata", field])
            .and_then(JsonValue::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set one `metadata` field, replacing a `metadata` value that is not a mapping
    fn set_metadata_field(&mut self, field: &str, value: JsonValue) {
        match self.0.entry("metadata").or_insert(JsonValue::Null) {
            JsonValue::Object(metadata) => {
                metadata.insert(field.to_string(), value);
            }
            slot => {
                let mut metadata = Map::new();
                metadata.insert(field.to_string(), value);
                *slot = JsonValue::Object(metadata);
            }
        }
    }
}

impl TryFrom<JsonValue> for Manifest {
    type Error = CoreError;

    fn try_from(value: JsonValue) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Manifest> for JsonValue {
    fn from(manifest: Manifest) -> Self {
        manifest.into_value()
    }
}

fn split_documents(stream: &str) -> Vec<&str> {
    stream
        .split("\n---")
        .map(|doc| doc.trim_start_matches("---").trim())
        .filter(|doc| {
            !doc.lines()
                .all(|l| l.trim().is_empty() || l.trim().starts_with('#'))
        })
        .collect()
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}
