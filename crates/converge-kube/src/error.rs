//! Error types for converge-kube

use std::fmt;

use converge_core::{CoreError, ResolveError};
use thiserror::Error;

/// Result type for converge-kube operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Result type for gateway calls
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Failures reported by the cluster gateway
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The addressed object does not exist
    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    /// The API server rejected the request
    #[error("API error ({code} {reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    /// Patch bytes could not be decoded or applied
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// A document could not be converted to or from the wire format
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Kubernetes client error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Any other transport failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Check if this is a Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, GatewayError::Api { code: 409, .. })
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

/// Kind, name and namespace an operation was aimed at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceContext {
    pub kind: String,
    /// Empty for collection-level calls
    pub name: String,
    /// Empty for cluster-scoped targets
    pub namespace: String,
}

impl ResourceContext {
    pub fn new(kind: &str, name: &str, namespace: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// Context of a collection call such as a listing
    pub fn collection(kind: &str, namespace: &str) -> Self {
        Self::new(kind, "", namespace)
    }
}

impl fmt::Display for ResourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.namespace.is_empty()) {
            (true, true) => write!(f, "{}", self.kind),
            (true, false) => write!(f, "{} in namespace '{}'", self.kind, self.namespace),
            (false, true) => write!(f, "{} '{}'", self.kind, self.name),
            (false, false) => write!(f, "{} '{}/{}'", self.kind, self.namespace, self.name),
        }
    }
}

/// Why a type could not be resolved
#[derive(Debug, Error)]
pub enum ResolutionFailure {
    #[error(transparent)]
    Unresolved(#[from] ResolveError),

    #[error("discovery failed: {0}")]
    Discovery(#[source] GatewayError),
}

/// Errors returned by the reconciliation client
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// No usable type identity for the given name
    #[error("failed to resolve resource type '{name}': {source}")]
    Resolution {
        name: String,
        #[source]
        source: ResolutionFailure,
    },

    /// Fetching the existing object failed
    #[error("failed to get {context}: {source}")]
    Lookup {
        context: ResourceContext,
        #[source]
        source: GatewayError,
    },

    #[error("failed to create {context}: {source}")]
    Create {
        context: ResourceContext,
        #[source]
        source: GatewayError,
    },

    #[error("failed to replace {context}: {source}")]
    Replace {
        context: ResourceContext,
        #[source]
        source: GatewayError,
    },

    #[error("failed to patch {context}: {source}")]
    Patch {
        context: ResourceContext,
        #[source]
        source: GatewayError,
    },

    #[error("failed to delete {context}: {source}")]
    Delete {
        context: ResourceContext,
        #[source]
        source: GatewayError,
    },

    #[error("failed to list {context}: {source}")]
    List {
        context: ResourceContext,
        #[source]
        source: GatewayError,
    },

    /// The manifest lacks what an operation needs
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A caller-supplied argument cannot address anything
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<CoreError> for ClientError {
    fn from(e: CoreError) -> Self {
        ClientError::InvalidManifest(e.to_string())
    }
}

impl ClientError {
    pub(crate) fn resolution(name: &str, source: impl Into<ResolutionFailure>) -> Self {
        ClientError::Resolution {
            name: name.to_string(),
            source: source.into(),
        }
    }

    /// The gateway error underneath, if any
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            ClientError::Lookup { source, .. }
            | ClientError::Create { source, .. }
            | ClientError::Replace { source, .. }
            | ClientError::Patch { source, .. }
            | ClientError::Delete { source, .. }
            | ClientError::List { source, .. } => Some(source),
            ClientError::Resolution {
                source: ResolutionFailure::Discovery(source),
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// Check if the target of the call did not exist
    pub fn is_not_found(&self) -> bool {
        self.gateway_error().is_some_and(GatewayError::is_not_found)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        self.gateway_error().is_some_and(GatewayError::is_conflict)
    }

    /// The kind/name/namespace the failing call was aimed at
    pub fn context(&self) -> Option<&ResourceContext> {
        match self {
            ClientError::Lookup { context, .. }
            | ClientError::Create { context, .. }
            | ClientError::Replace { context, .. }
            | ClientError::Patch { context, .. }
            | ClientError::Delete { context, .. }
            | ClientError::List { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<GatewayError> for ResolutionFailure {
    fn from(e: GatewayError) -> Self {
        ResolutionFailure::Discovery(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> GatewayError {
        GatewayError::NotFound {
            resource: "pods".to_string(),
            name: "p1".to_string(),
        }
    }

    #[test]
    fn test_context_display() {
        assert_eq!(
            ResourceContext::new("Pod", "p1", "ns1").to_string(),
            "Pod 'ns1/p1'"
        );
        assert_eq!(
            ResourceContext::new("ClusterRole", "cr1", "").to_string(),
            "ClusterRole 'cr1'"
        );
        assert_eq!(
            ResourceContext::collection("Pod", "ns1").to_string(),
            "Pod in namespace 'ns1'"
        );
        assert_eq!(ResourceContext::collection("Pod", "").to_string(), "Pod");
    }

    #[test]
    fn test_is_not_found_through_wrapper() {
        let err = ClientError::Patch {
            context: ResourceContext::new("Pod", "p1", "ns1"),
            source: not_found(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert_eq!(err.context().map(|c| c.name.as_str()), Some("p1"));
        assert_eq!(
            err.to_string(),
            "failed to patch Pod 'ns1/p1': pods \"p1\" not found"
        );
    }

    #[test]
    fn test_conflict() {
        let err = ClientError::Create {
            context: ResourceContext::new("ConfigMap", "cm1", "default"),
            source: GatewayError::Api {
                code: 409,
                reason: "AlreadyExists".to_string(),
                message: "configmaps \"cm1\" already exists".to_string(),
            },
        };
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_resolution_error_message() {
        let err = ClientError::resolution(
            "widgets",
            ResolveError::Unknown {
                name: "widgets".to_string(),
            },
        );
        assert!(err.to_string().contains("widgets"));
        assert!(err.gateway_error().is_none());
        assert!(err.context().is_none());
    }

    #[test]
    fn test_discovery_failure_exposes_gateway_error() {
        let err = ClientError::resolution("pods", GatewayError::Transport("refused".to_string()));
        assert!(matches!(
            err.gateway_error(),
            Some(GatewayError::Transport(_))
        ));
    }
}
