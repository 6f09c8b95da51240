//! Metadata reporter
//!
//! Every mutating call ends here: the outcome is normalized into an [`OperationResult`]
//! and logged as one structured event.

use std::fmt;

use converge_core::{OperationResult, ResourceTypeMapping};

/// Kind of mutation that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Created,
    Replaced,
    Patched,
    Deleted,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Created => "created",
            Operation::Replaced => "replaced",
            Operation::Patched => "patched",
            Operation::Deleted => "deleted",
        }
    }

    /// Whether the result carries group, version and resource
    ///
    /// Creates and deletes only describe what was targeted; replaces and patches
    /// report the full type identity.
    pub fn is_qualified(&self) -> bool {
        matches!(self, Operation::Replaced | Operation::Patched)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the canonical result of `operation` and log it
///
/// The kind always comes from the resolved mapping, never from caller input.
pub fn report(
    operation: Operation,
    mapping: &ResourceTypeMapping,
    name: &str,
    namespace: &str,
) -> OperationResult {
    let result = if operation.is_qualified() {
        OperationResult::qualified(mapping, name, namespace)
    } else {
        OperationResult::identity(&mapping.kind, name, namespace)
    };

    tracing::info!(
        operation = operation.as_str(),
        kind = %result.kind,
        name = %result.name,
        namespace = %result.namespace,
        "{} {}",
        operation,
        result
    );

    result
}
