//! Cluster connection and resource type resolution
//!
//! A [`ClusterConnection`] pairs an already built gateway with client configuration and a
//! discovery cache of its own. The apply, patch, delete and list engines are `impl` blocks
//! on this type in their own modules.

use std::sync::Arc;

use converge_core::{
    DiscoverySnapshot, Manifest, ResolveError, ResourceTypeMapping, namespace_or_default,
};

use crate::config::ClientConfig;
use crate::discovery::DiscoveryCache;
use crate::error::{ClientError, GatewayResult, Result};
use crate::gateway::{ClusterGateway, ResourceTarget};

/// Handle to one target cluster
pub struct ClusterConnection<G: ClusterGateway> {
    gateway: G,
    config: ClientConfig,
    discovery: DiscoveryCache,
}

impl<G: ClusterGateway> ClusterConnection<G> {
    /// Wrap a gateway with the default configuration
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            config: ClientConfig::default(),
            discovery: DiscoveryCache::new(),
        }
    }

    /// Wrap a gateway with a validated configuration
    pub fn with_config(gateway: G, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gateway,
            config,
            discovery: DiscoveryCache::new(),
        })
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn discovery(&self) -> &DiscoveryCache {
        &self.discovery
    }

    /// Fetch discovery from the cluster and replace the cached snapshot
    pub async fn refresh_discovery(&self) -> GatewayResult<Arc<DiscoverySnapshot>> {
        let types = self.gateway.discover().await?;
        tracing::debug!(types = types.len(), "fetched discovery");
        Ok(self.discovery.store(DiscoverySnapshot::new(types)))
    }

    /// Forget the cached snapshot
    pub fn invalidate_discovery(&self) {
        self.discovery.invalidate();
    }

    /// Resolve a kind, plural, singular or short name to a type identity
    ///
    /// Names may be qualified as `resource.group` or `resource.version.group`. A name that
    /// matches more than one resource fails with every candidate listed.
    pub async fn resolve_kind(&self, name: &str) -> Result<ResourceTypeMapping> {
        self.resolve_with(name, |snapshot| snapshot.resolve(name)).await
    }

    /// Resolve the type of a manifest
    ///
    /// With an `apiVersion` the exact group, version and kind must be served; without one
    /// the kind alone is resolved like [`resolve_kind`](Self::resolve_kind).
    pub async fn resolve_manifest_type(
        &self,
        manifest: &Manifest,
    ) -> Result<ResourceTypeMapping> {
        let kind = manifest
            .kind()
            .ok_or_else(|| ClientError::InvalidManifest("manifest has no kind".to_string()))?;

        match manifest.group_version() {
            Some(gv) => {
                let display = format!("{} ({})", kind, gv.api_version());
                self.resolve_with(&display, |snapshot| {
                    snapshot
                        .resolve_gvk(&gv.group, &gv.version, kind)
                        .ok_or_else(|| ResolveError::Unknown {
                            name: display.clone(),
                        })
                })
                .await
            }
            None => self.resolve_kind(kind).await,
        }
    }

    /// Fetch a single object
    ///
    /// An empty namespace on a namespaced type means `"default"`; it is ignored for
    /// cluster-scoped types. A missing object is a [`ClientError::Lookup`] not-found error.
    pub async fn get(&self, kind: &str, name: &str, namespace: &str) -> Result<Manifest> {
        let mapping = self.resolve_kind(kind).await?;
        let target = ResourceTarget::new(mapping, namespace_or_default(namespace), name);

        tracing::debug!(resource = %target.context(), "get");
        self.gateway
            .get(&target)
            .await
            .map_err(|source| ClientError::Lookup {
                context: target.context(),
                source,
            })
    }

    /// Run `lookup` against the cached snapshot, fetching discovery when the cache is
    /// empty and refetching once on an unknown name when configured to
    async fn resolve_with<F>(&self, name: &str, lookup: F) -> Result<ResourceTypeMapping>
    where
        F: Fn(&DiscoverySnapshot) -> std::result::Result<ResourceTypeMapping, ResolveError>,
    {
        let (snapshot, fresh) = match self.discovery.get() {
            Some(snapshot) => (snapshot, false),
            None => {
                tracing::debug!(name, "discovery cache empty");
                let snapshot = self
                    .refresh_discovery()
                    .await
                    .map_err(|e| ClientError::resolution(name, e))?;
                (snapshot, true)
            }
        };

        let refresh_on_miss = !fresh && self.config.refresh_discovery_on_miss;
        match lookup(&snapshot) {
            Ok(mapping) => {
                tracing::debug!(name, mapping = %mapping, "resolved");
                Ok(mapping)
            }
            Err(ResolveError::Unknown { .. }) if refresh_on_miss => {
                tracing::debug!(name, "not in cached discovery, refreshing");
                let snapshot = self
                    .refresh_discovery()
                    .await
                    .map_err(|e| ClientError::resolution(name, e))?;
                lookup(&snapshot).map_err(|e| ClientError::resolution(name, e))
            }
            Err(e) => Err(ClientError::resolution(name, e)),
        }
    }
}
