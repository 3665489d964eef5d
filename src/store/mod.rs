// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access to the cluster's resource store.
//!
//! Both propagation paths talk to the cluster exclusively through the
//! [`ResourceStore`] trait. The store owns nodes and pods; this crate only
//! reads nodes and writes pod labels through conditional merge patches, so
//! the store's optimistic-concurrency check is the only serialization point.
//!
//! Two implementations are provided:
//! - [`KubeStore`] talks to the Kubernetes API server through kube-rs.
//! - [`memory::InMemoryStore`] keeps nodes and pods in memory and supports
//!   fault injection; it backs the unit and integration tests.

pub mod memory;

use crate::constants::{DEFAULT_FIELD_MANAGER, DEFAULT_LIST_PAGE_SIZE, KIND_NODE, KIND_POD};
use crate::errors::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{
    api::{ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Label changes to submit: `Some(value)` sets a label, `None` removes it.
pub type LabelPatch = BTreeMap<String, Option<String>>;

/// Typed read/patch access to nodes and pods.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read a node by name.
    async fn get_node(&self, name: &str) -> Result<Node, StoreError>;

    /// Read a pod by namespace and name.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, StoreError>;

    /// List every pod in the cluster as a point-in-time snapshot.
    async fn list_pods(&self) -> Result<Vec<Pod>, StoreError>;

    /// Merge-patch the labels of a pod.
    ///
    /// When `resource_version` is set the patch only applies if the stored pod
    /// still has that version; otherwise it fails with [`StoreError::Conflict`].
    async fn patch_pod_labels(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        labels: &LabelPatch,
    ) -> Result<Pod, StoreError>;
}

/// `namespace/name` key used in logs and error messages.
#[must_use]
pub fn object_key(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}/{name}")
    }
}

/// `namespace/name` key of a pod.
#[must_use]
pub fn pod_key(pod: &Pod) -> String {
    object_key(&pod.namespace().unwrap_or_default(), &pod.name_any())
}

/// Build the JSON merge patch body for a label change.
///
/// Including `metadata.resourceVersion` makes the API server reject the patch
/// with 409 if the pod changed since it was read.
#[must_use]
pub fn label_merge_patch(
    resource_version: Option<&str>,
    labels: &LabelPatch,
) -> serde_json::Value {
    match resource_version {
        Some(version) => json!({
            "metadata": {
                "resourceVersion": version,
                "labels": labels,
            }
        }),
        None => json!({
            "metadata": {
                "labels": labels,
            }
        }),
    }
}

/// [`ResourceStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
    page_size: u32,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_node(&self, name: &str) -> Result<Node, StoreError> {
        let api: Api<Node> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(KIND_NODE, name, &format!("get node {name}"), &e))
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, StoreError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let key = object_key(namespace, name);
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(KIND_POD, &key, &format!("get pod {key}"), &e))
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, StoreError> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let mut list_params = ListParams::default();
        list_params.limit = Some(self.page_size);

        // Continue tokens are only followed within this call; every call
        // starts a fresh snapshot.
        let mut all_items = Vec::new();
        let mut page_count = 0;

        loop {
            page_count += 1;
            let result = api
                .list(&list_params)
                .await
                .map_err(|e| StoreError::from_kube(KIND_POD, "*", "list pods", &e))?;

            let item_count = result.items.len();
            all_items.extend(result.items);

            debug!(
                page = page_count,
                items_in_page = item_count,
                total_items = all_items.len(),
                "Fetched page of pods"
            );

            match result.metadata.continue_ {
                Some(token) if !token.is_empty() => list_params.continue_token = Some(token),
                _ => break,
            }
        }

        Ok(all_items)
    }

    async fn patch_pod_labels(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        labels: &LabelPatch,
    ) -> Result<Pod, StoreError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let key = object_key(namespace, name);
        let patch = label_merge_patch(resource_version, labels);
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        };

        api.patch(name, &params, &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(KIND_POD, &key, &format!("patch pod {key}"), &e))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
