//! Converge Core - types shared by the reconciliation client
//!
//! This crate provides the pure, I/O-free part of Converge:
//! - `Manifest`: dynamic resource documents with typed metadata accessors
//! - `ResourceTypeMapping` / `DiscoverySnapshot`: type identities and name resolution
//! - `effective_namespace`: the namespace scoping policy
//! - `OperationResult`: the canonical outcome of every mutating call
//! - `callback`: the status callback message shape

pub mod callback;
pub mod error;
pub mod manifest;
pub mod mapping;
pub mod namespace;
pub mod options;
pub mod result;

pub use callback::{CallbackKey, CallbackMessage, CallbackStatus};
pub use error::{CoreError, ResolveError};
pub use manifest::Manifest;
pub use mapping::{DiscoveredType, DiscoverySnapshot, GroupVersion, ResourceTypeMapping};
pub use namespace::{DEFAULT_NAMESPACE, effective_namespace, namespace_or_default};
pub use options::{DeleteOptions, ListOptions, PatchStrategy, PropagationPolicy, ResourceList};
pub use result::OperationResult;
