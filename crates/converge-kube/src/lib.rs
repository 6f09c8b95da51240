//! Converge Kube - reconciliation client for Kubernetes-style cluster APIs
//!
//! This crate provides:
//! - **Type Resolution**: kind, plural, singular or short names to a full type identity,
//!   backed by a per-connection discovery cache
//! - **Apply**: get-or-create-or-replace of a manifest, with the namespace scoping policy
//! - **Patch**: strategic-merge, JSON-merge and JSON-patch updates of existing objects
//! - **Delete**: single objects, and namespaces once they are empty
//! - **List**: selectors and pagination passed through untouched
//! - **Gateways**: a `kube::Client` backed gateway and an in-memory mock for tests
//!
//! The connection never builds its own client: callers hand in a configured gateway.

pub mod apply;
pub mod config;
pub mod connection;
pub mod delete;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod list;
pub mod patch;
pub mod report;

pub use apply::ApplyReport;
pub use config::{ClientConfig, DEFAULT_SWEEP_CATEGORY, DEFAULT_SWEEP_PAGE_SIZE, NamespaceSweep};
pub use connection::ClusterConnection;
pub use delete::NamespaceDeletion;
pub use discovery::DiscoveryCache;
pub use error::{
    ClientError, GatewayError, GatewayResult, ResolutionFailure, ResourceContext, Result,
};
pub use gateway::{
    ClusterGateway, DEFAULT_FIELD_MANAGER, KubeGateway, ListCall, MockGateway, MockOperation,
    OperationCounts, ResourceTarget, builtin_types,
};
pub use report::{Operation, report};

pub use converge_core::{
    DeleteOptions, ListOptions, Manifest, OperationResult, PatchStrategy, PropagationPolicy,
    ResourceList, ResourceTypeMapping,
};
