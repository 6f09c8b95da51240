//! Client configuration

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Page size used when sweeping a namespace before deleting it
pub const DEFAULT_SWEEP_PAGE_SIZE: u32 = 500;

/// Discovery category swept by default, the same set `kubectl get all` shows
pub const DEFAULT_SWEEP_CATEGORY: &str = "all";

/// Which kinds a cascading namespace delete checks for leftovers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamespaceSweep {
    /// Every listable namespaced kind
    AllKinds,
    /// Only kinds in the given discovery category
    Category(String),
}

impl Default for NamespaceSweep {
    fn default() -> Self {
        Self::Category(DEFAULT_SWEEP_CATEGORY.to_string())
    }
}

impl NamespaceSweep {
    pub(crate) fn category(&self) -> Option<&str> {
        match self {
            Self::AllKinds => None,
            Self::Category(category) => Some(category.as_str()),
        }
    }
}

/// Connection-level behavior of the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Refetch discovery once when a name is unknown to a populated cache
    pub refresh_discovery_on_miss: bool,

    /// Kinds checked before a namespace is deleted
    pub namespace_sweep: NamespaceSweep,

    /// Page size for the namespace sweep listings
    pub sweep_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            refresh_discovery_on_miss: true,
            namespace_sweep: NamespaceSweep::default(),
            sweep_page_size: DEFAULT_SWEEP_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Parse configuration from YAML; missing fields keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_refresh_on_miss(mut self, refresh: bool) -> Self {
        self.refresh_discovery_on_miss = refresh;
        self
    }

    pub fn with_namespace_sweep(mut self, sweep: NamespaceSweep) -> Self {
        self.namespace_sweep = sweep;
        self
    }

    pub fn with_sweep_page_size(mut self, size: u32) -> Self {
        self.sweep_page_size = size;
        self
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.sweep_page_size == 0 {
            return Err(ClientError::InvalidConfig(
                "sweepPageSize must be greater than zero".to_string(),
            ));
        }
        if let NamespaceSweep::Category(category) = &self.namespace_sweep {
            if category.is_empty() {
                return Err(ClientError::InvalidConfig(
                    "namespaceSweep category must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
