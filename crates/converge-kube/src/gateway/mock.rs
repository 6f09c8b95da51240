//! Mock gateway for testing
//!
//! Keeps objects in memory and serves a fixed discovery document, useful for unit tests
//! without requiring a Kubernetes cluster. Objects are stored exactly as written; no
//! server-side fields are added.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use converge_core::{
    DeleteOptions, DiscoveredType, ListOptions, Manifest, PatchStrategy, ResourceList,
    ResourceTypeMapping,
};
use serde_json::Value as JsonValue;

use super::{ClusterGateway, ResourceTarget};
use crate::error::{GatewayError, GatewayResult};

/// Gateway call kinds, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Discover,
    Get,
    Create,
    Replace,
    Patch,
    Delete,
    List,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub discoveries: usize,
    pub gets: usize,
    pub creates: usize,
    pub replaces: usize,
    pub patches: usize,
    pub deletes: usize,
    pub lists: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectKey {
    group: String,
    resource: String,
    namespace: String,
    name: String,
}

impl ObjectKey {
    fn new(mapping: &ResourceTypeMapping, namespace: &str, name: &str) -> Self {
        Self {
            group: mapping.group.clone(),
            resource: mapping.resource.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    fn for_target(target: &ResourceTarget) -> Self {
        Self::new(&target.mapping, target.namespace_str(), &target.name)
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    /// Calls to let through before failing
    skip: usize,
    code: u16,
    message: String,
}

/// A recorded list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    pub resource: String,
    pub namespace: Option<String>,
    pub options: ListOptions,
}

/// In-memory cluster for testing
#[derive(Clone)]
pub struct MockGateway {
    types: Arc<RwLock<Vec<DiscoveredType>>>,
    store: Arc<RwLock<BTreeMap<ObjectKey, Manifest>>>,
    operations: Arc<RwLock<OperationCounts>>,
    failures: Arc<RwLock<HashMap<MockOperation, InjectedFailure>>>,
    list_calls: Arc<RwLock<Vec<ListCall>>>,
}

impl MockGateway {
    /// Create an empty cluster serving [`builtin_types`]
    pub fn new() -> Self {
        Self::with_types(builtin_types())
    }

    /// Create an empty cluster serving the given discovery document
    pub fn with_types(types: Vec<DiscoveredType>) -> Self {
        Self {
            types: Arc::new(RwLock::new(types)),
            store: Arc::new(RwLock::new(BTreeMap::new())),
            operations: Arc::new(RwLock::new(OperationCounts::default())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            list_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Serve an additional type, e.g. after a CRD was installed
    pub fn add_type(&self, discovered: DiscoveredType) {
        self.types.write().unwrap().push(discovered);
    }

    /// Store an object directly, bypassing the gateway calls
    pub fn insert(&self, mapping: &ResourceTypeMapping, manifest: Manifest) {
        let namespace = if mapping.namespace_scoped {
            manifest.namespace().unwrap_or("").to_string()
        } else {
            String::new()
        };
        let name = manifest.name().unwrap_or("").to_string();
        let key = ObjectKey::new(mapping, &namespace, &name);
        self.store.write().unwrap().insert(key, manifest);
    }

    /// Read an object without counting a get
    pub fn object(
        &self,
        mapping: &ResourceTypeMapping,
        namespace: &str,
        name: &str,
    ) -> Option<Manifest> {
        let key = ObjectKey::new(mapping, namespace, name);
        self.store.read().unwrap().get(&key).cloned()
    }

    /// Count stored objects
    pub fn object_count(&self) -> usize {
        self.store.read().unwrap().len()
    }

    /// Make the next call of `operation` fail with the given HTTP status
    ///
    /// A 404 is reported as [`GatewayError::NotFound`].
    pub fn fail_next(&self, operation: MockOperation, code: u16, message: &str) {
        self.fail_after(operation, 0, code, message);
    }

    /// Let `successes` calls of `operation` through, then fail the one after
    pub fn fail_after(
        &self,
        operation: MockOperation,
        successes: usize,
        code: u16,
        message: &str,
    ) {
        self.failures.write().unwrap().insert(
            operation,
            InjectedFailure {
                skip: successes,
                code,
                message: message.to_string(),
            },
        );
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        let mut ops = self.operations.write().unwrap();
        *ops = OperationCounts::default();
    }

    /// Every list call seen so far, oldest first
    pub fn list_calls(&self) -> Vec<ListCall> {
        self.list_calls.read().unwrap().clone()
    }

    fn record(&self, operation: MockOperation) {
        let mut ops = self.operations.write().unwrap();
        match operation {
            MockOperation::Discover => ops.discoveries += 1,
            MockOperation::Get => ops.gets += 1,
            MockOperation::Create => ops.creates += 1,
            MockOperation::Replace => ops.replaces += 1,
            MockOperation::Patch => ops.patches += 1,
            MockOperation::Delete => ops.deletes += 1,
            MockOperation::List => ops.lists += 1,
        }
    }

    /// Count the call and take any injected failure for it
    fn begin(
        &self,
        operation: MockOperation,
        target: Option<&ResourceTarget>,
    ) -> GatewayResult<()> {
        self.record(operation);

        let failure = {
            let mut failures = self.failures.write().unwrap();
            let due = match failures.get_mut(&operation) {
                Some(pending) if pending.skip > 0 => {
                    pending.skip -= 1;
                    false
                }
                Some(_) => true,
                None => false,
            };
            if due {
                failures.remove(&operation)
            } else {
                None
            }
        };
        match failure {
            None => Ok(()),
            Some(InjectedFailure { code: 404, .. }) => Err(GatewayError::NotFound {
                resource: target
                    .map(|t| t.mapping.qualified_resource())
                    .unwrap_or_default(),
                name: target.map(|t| t.name.clone()).unwrap_or_default(),
            }),
            Some(InjectedFailure { code, message, .. }) => Err(GatewayError::Api {
                code,
                reason: reason_for(code).to_string(),
                message,
            }),
        }
    }

    fn not_found(target: &ResourceTarget) -> GatewayError {
        GatewayError::NotFound {
            resource: target.mapping.qualified_resource(),
            name: target.name.clone(),
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterGateway for MockGateway {
    async fn discover(&self) -> GatewayResult<Vec<DiscoveredType>> {
        self.begin(MockOperation::Discover, None)?;
        Ok(self.types.read().unwrap().clone())
    }

    async fn get(&self, target: &ResourceTarget) -> GatewayResult<Manifest> {
        self.begin(MockOperation::Get, Some(target))?;

        let store = self.store.read().unwrap();
        store
            .get(&ObjectKey::for_target(target))
            .cloned()
            .ok_or_else(|| Self::not_found(target))
    }

    async fn create(
        &self,
        target: &ResourceTarget,
        manifest: &Manifest,
    ) -> GatewayResult<Manifest> {
        self.begin(MockOperation::Create, Some(target))?;

        let mut store = self.store.write().unwrap();
        let key = ObjectKey::for_target(target);
        if store.contains_key(&key) {
            return Err(GatewayError::Api {
                code: 409,
                reason: reason_for(409).to_string(),
                message: format!(
                    "{} \"{}\" already exists",
                    target.mapping.qualified_resource(),
                    target.name
                ),
            });
        }

        store.insert(key, manifest.clone());
        Ok(manifest.clone())
    }

    async fn replace(
        &self,
        target: &ResourceTarget,
        manifest: &Manifest,
    ) -> GatewayResult<Manifest> {
        self.begin(MockOperation::Replace, Some(target))?;

        let mut store = self.store.write().unwrap();
        let existing = store
            .get_mut(&ObjectKey::for_target(target))
            .ok_or_else(|| Self::not_found(target))?;

        *existing = manifest.clone();
        Ok(manifest.clone())
    }

    async fn patch(
        &self,
        target: &ResourceTarget,
        patch: &[u8],
        strategy: PatchStrategy,
    ) -> GatewayResult<Manifest> {
        self.begin(MockOperation::Patch, Some(target))?;

        let mut store = self.store.write().unwrap();
        let existing = store
            .get_mut(&ObjectKey::for_target(target))
            .ok_or_else(|| Self::not_found(target))?;

        let mut doc = existing.clone().into_value();
        apply_patch(&mut doc, patch, strategy)?;
        let patched =
            Manifest::from_value(doc).map_err(|e| GatewayError::InvalidPatch(e.to_string()))?;

        *existing = patched.clone();
        Ok(patched)
    }

    async fn delete(&self, target: &ResourceTarget, options: &DeleteOptions) -> GatewayResult<()> {
        self.begin(MockOperation::Delete, Some(target))?;

        let mut store = self.store.write().unwrap();
        let key = ObjectKey::for_target(target);
        if !store.contains_key(&key) {
            return Err(Self::not_found(target));
        }
        if !options.dry_run {
            store.remove(&key);
        }
        Ok(())
    }

    async fn list(
        &self,
        mapping: &ResourceTypeMapping,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> GatewayResult<ResourceList> {
        self.begin(MockOperation::List, None)?;
        self.list_calls.write().unwrap().push(ListCall {
            resource: mapping.qualified_resource(),
            namespace: namespace.map(str::to_string),
            options: options.clone(),
        });

        let store = self.store.read().unwrap();
        let matching: Vec<Manifest> = store
            .iter()
            .filter(|(key, _)| key.group == mapping.group && key.resource == mapping.resource)
            .filter(|(key, _)| namespace.is_none_or(|ns| key.namespace == ns))
            .filter(|(_, manifest)| {
                options
                    .label_selector
                    .as_deref()
                    .is_none_or(|selector| selector_matches(selector, &manifest.labels()))
            })
            .map(|(_, manifest)| manifest.clone())
            .collect();

        // Continue tokens are plain offsets
        let offset = match options.continue_token.as_deref() {
            Some(token) => token.parse::<usize>().map_err(|_| GatewayError::Api {
                code: 410,
                reason: reason_for(410).to_string(),
                message: format!("invalid continue token {:?}", token),
            })?,
            None => 0,
        };
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let end = offset.saturating_add(limit).min(matching.len());
        let items = matching.get(offset..end).map(<[Manifest]>::to_vec).unwrap_or_default();
        let continue_token = (end < matching.len()).then(|| end.to_string());

        Ok(ResourceList {
            items,
            continue_token,
        })
    }
}

fn apply_patch(doc: &mut JsonValue, patch: &[u8], strategy: PatchStrategy) -> GatewayResult<()> {
    let invalid = |e: &dyn std::fmt::Display| GatewayError::InvalidPatch(e.to_string());
    match strategy {
        // Close enough to a strategic merge for maps; lists are replaced wholesale
        PatchStrategy::StrategicMerge | PatchStrategy::JsonMerge => {
            let patch: JsonValue = serde_json::from_slice(patch).map_err(|e| invalid(&e))?;
            json_patch::merge(doc, &patch);
        }
        PatchStrategy::JsonPatch => {
            let patch: json_patch::Patch =
                serde_json::from_slice(patch).map_err(|e| invalid(&e))?;
            json_patch::patch(doc, &patch).map_err(|e| invalid(&e))?;
        }
    }
    Ok(())
}

/// Equality-based label selector: `a=b`, `a==b`, `a!=b`, `a`, `!a`
fn selector_matches(selector: &str, labels: &BTreeMap<String, String>) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            if let Some((key, value)) = term.split_once("!=") {
                labels.get(key.trim()).map(String::as_str) != Some(value.trim())
            } else if let Some((key, value)) = term.split_once('=') {
                let value = value.trim_start_matches('=');
                labels.get(key.trim()).map(String::as_str) == Some(value.trim())
            } else if let Some(key) = term.strip_prefix('!') {
                !labels.contains_key(key.trim())
            } else {
                labels.contains_key(term)
            }
        })
}

fn reason_for(code: u16) -> &'static str {
    match code {
        400 => "BadRequest",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "NotFound",
        409 => "AlreadyExists",
        410 => "Expired",
        422 => "Invalid",
        429 => "TooManyRequests",
        500 => "InternalError",
        503 => "ServiceUnavailable",
        _ => "Unknown",
    }
}

/// Discovery document of a small stock cluster
pub fn builtin_types() -> Vec<DiscoveredType> {
    let rbac = "rbac.authorization.k8s.io";
    vec![
        DiscoveredType::new(ResourceTypeMapping::new("", "v1", "Pod", "pods", true))
            .with_short_names(&["po"])
            .with_categories(&["all"]),
        DiscoveredType::new(ResourceTypeMapping::new("", "v1", "Service", "services", true))
            .with_short_names(&["svc"])
            .with_categories(&["all"]),
        DiscoveredType::new(ResourceTypeMapping::new(
            "",
            "v1",
            "ConfigMap",
            "configmaps",
            true,
        ))
        .with_short_names(&["cm"]),
        DiscoveredType::new(ResourceTypeMapping::new("", "v1", "Secret", "secrets", true)),
        DiscoveredType::new(ResourceTypeMapping::new(
            "",
            "v1",
            "ServiceAccount",
            "serviceaccounts",
            true,
        ))
        .with_short_names(&["sa"]),
        DiscoveredType::new(ResourceTypeMapping::namespace()).with_short_names(&["ns"]),
        DiscoveredType::new(ResourceTypeMapping::new("", "v1", "Node", "nodes", false))
            .with_short_names(&["no"]),
        DiscoveredType::new(ResourceTypeMapping::new("", "v1", "Event", "events", true))
            .with_short_names(&["ev"]),
        DiscoveredType::new(ResourceTypeMapping::new(
            "events.k8s.io",
            "v1",
            "Event",
            "events",
            true,
        ))
        .with_short_names(&["ev"]),
        DiscoveredType::new(ResourceTypeMapping::new(
            "apps",
            "v1",
            "Deployment",
            "deployments",
            true,
        ))
        .with_short_names(&["deploy"])
        .with_categories(&["all"]),
        DiscoveredType::new(ResourceTypeMapping::new(
            "apps",
            "v1",
            "ReplicaSet",
            "replicasets",
            true,
        ))
        .with_short_names(&["rs"])
        .with_categories(&["all"]),
        DiscoveredType::new(ResourceTypeMapping::new(
            "autoscaling",
            "v2",
            "HorizontalPodAutoscaler",
            "horizontalpodautoscalers",
            true,
        ))
        .with_short_names(&["hpa"])
        .with_categories(&["all"]),
        DiscoveredType::new(ResourceTypeMapping::new(
            "autoscaling",
            "v1",
            "HorizontalPodAutoscaler",
            "horizontalpodautoscalers",
            true,
        ))
        .with_short_names(&["hpa"])
        .with_categories(&["all"])
        .not_preferred(),
        DiscoveredType::new(ResourceTypeMapping::new(rbac, "v1", "Role", "roles", true)),
        DiscoveredType::new(ResourceTypeMapping::new(
            rbac,
            "v1",
            "ClusterRole",
            "clusterroles",
            false,
        )),
    ]
}
