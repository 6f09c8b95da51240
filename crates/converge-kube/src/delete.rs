//! Delete engine
//!
//! Single-object deletes by kind and name, and the guarded namespace delete that only
//! removes a namespace once nothing is left in it.

use converge_core::{
    DeleteOptions, ListOptions, OperationResult, ResourceTypeMapping, namespace_or_default,
};

use crate::connection::ClusterConnection;
use crate::error::{ClientError, ResourceContext, Result};
use crate::gateway::{ClusterGateway, ResourceTarget};
use crate::report::{Operation, report};

/// What a namespace delete did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceDeletion {
    /// The namespace was empty and its delete was accepted
    Deleted,
    /// Objects remain; nothing was deleted
    Skipped {
        /// `resource.group` of every swept type that still has objects
        kinds: Vec<String>,
    },
}

impl NamespaceDeletion {
    pub fn is_deleted(&self) -> bool {
        matches!(self, NamespaceDeletion::Deleted)
    }
}

impl<G: ClusterGateway> ClusterConnection<G> {
    /// Delete one object
    ///
    /// For the Namespace kind the namespace argument is ignored and the result's namespace
    /// is empty. Otherwise an empty namespace means `"default"`; other cluster-scoped types
    /// still go to the cluster endpoint. Returns once the server accepted the request.
    pub async fn delete_by_kind_name_namespace(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        options: &DeleteOptions,
    ) -> Result<OperationResult> {
        let mapping = self.resolve_kind(kind).await?;
        let namespace = if mapping.is_namespace_kind() {
            ""
        } else {
            namespace_or_default(namespace)
        };
        let target = ResourceTarget::new(mapping, namespace, name);

        tracing::debug!(resource = %target.context(), "delete");
        self.gateway()
            .delete(&target, options)
            .await
            .map_err(|source| ClientError::Delete {
                context: target.context(),
                source,
            })?;

        Ok(report(Operation::Deleted, &target.mapping, &target.name, namespace))
    }

    /// Delete a namespace, but only if it holds no objects
    ///
    /// Every swept type (see [`NamespaceSweep`](crate::NamespaceSweep)) is listed in the
    /// namespace first, page by page. Any listing error aborts before a delete is sent.
    /// Leftover objects are not an error: the delete is skipped and the kinds are reported.
    /// An empty name is rejected before anything is listed.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<NamespaceDeletion> {
        if namespace.is_empty() {
            return Err(ClientError::InvalidArgument("namespace name is empty".to_string()));
        }
        let snapshot = match self.discovery().get() {
            Some(snapshot) => snapshot,
            None => self
                .refresh_discovery()
                .await
                .map_err(|e| ClientError::resolution("namespaces", e))?,
        };

        let swept = snapshot.listable_namespaced(self.config().namespace_sweep.category());
        let mut kinds = Vec::new();
        for mapping in &swept {
            if self.has_objects(mapping, namespace).await? {
                kinds.push(mapping.qualified_resource());
            }
        }

        if !kinds.is_empty() {
            tracing::warn!(
                namespace,
                remaining = %kinds.join(", "),
                "namespace not empty, skipping delete"
            );
            return Ok(NamespaceDeletion::Skipped { kinds });
        }

        let mapping = snapshot
            .types()
            .iter()
            .map(|t| &t.mapping)
            .find(|m| m.is_namespace_kind())
            .cloned()
            .unwrap_or_else(ResourceTypeMapping::namespace);
        let target = ResourceTarget::new(mapping, "", namespace);

        self.gateway()
            .delete(&target, &DeleteOptions::default())
            .await
            .map_err(|source| ClientError::Delete {
                context: target.context(),
                source,
            })?;

        report(Operation::Deleted, &target.mapping, namespace, "");
        Ok(NamespaceDeletion::Deleted)
    }

    async fn has_objects(&self, mapping: &ResourceTypeMapping, namespace: &str) -> Result<bool> {
        let mut options = ListOptions::default().with_limit(self.config().sweep_page_size);

        loop {
            let page = self
                .gateway()
                .list(mapping, Some(namespace), &options)
                .await
                .map_err(|source| ClientError::List {
                    context: ResourceContext::collection(&mapping.kind, namespace),
                    source,
                })?;

            if !page.is_empty() {
                return Ok(true);
            }
            match page.continue_token {
                Some(token) => options.continue_token = Some(token),
                None => return Ok(false),
            }
        }
    }
}
