// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ResourceStore`] with optimistic concurrency and fault injection.
//!
//! Resource versions are assigned from a single counter, like the API server
//! does, and every successful patch bumps the pod's version. Faults can be
//! queued per pod or per operation to exercise the error paths of the binding
//! intercept and the convergence sweep.

use super::{object_key, LabelPatch, ResourceStore};
use crate::constants::{KIND_NODE, KIND_POD};
use crate::errors::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    pods: BTreeMap<String, Pod>,
    version: u64,
    patch_faults: HashMap<String, StoreError>,
    node_faults: HashMap<String, StoreError>,
    pod_faults: HashMap<String, StoreError>,
    list_fault: Option<StoreError>,
    patch_attempts: Vec<String>,
    read_delay: Option<Duration>,
}

impl State {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

/// Store that keeps nodes and pods in memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a node.
    pub fn insert_node(&self, mut node: Node) {
        let mut state = self.lock();
        node.metadata.resource_version = Some(state.next_version());
        state.nodes.insert(node.name_any(), node);
    }

    /// Insert or replace a pod, assigning it a fresh resource version.
    pub fn insert_pod(&self, mut pod: Pod) {
        let mut state = self.lock();
        let key = object_key(&pod.namespace().unwrap_or_default(), &pod.name_any());
        pod.metadata.resource_version = Some(state.next_version());
        state.pods.insert(key, pod);
    }

    pub fn remove_pod(&self, namespace: &str, name: &str) -> Option<Pod> {
        self.lock().pods.remove(&object_key(namespace, name))
    }

    /// Current copy of a pod.
    #[must_use]
    pub fn pod(&self, namespace: &str, name: &str) -> Option<Pod> {
        self.lock().pods.get(&object_key(namespace, name)).cloned()
    }

    /// Current labels of a pod, empty if the pod or its labels are missing.
    #[must_use]
    pub fn pod_labels(&self, namespace: &str, name: &str) -> BTreeMap<String, String> {
        self.pod(namespace, name)
            .and_then(|pod| pod.metadata.labels)
            .unwrap_or_default()
    }

    /// Simulate another writer touching the pod: bumps its resource version.
    pub fn touch_pod(&self, namespace: &str, name: &str) {
        let mut state = self.lock();
        let version = state.next_version();
        if let Some(pod) = state.pods.get_mut(&object_key(namespace, name)) {
            pod.metadata.resource_version = Some(version);
        }
    }

    /// Make every patch of the given pod fail with `error` until cleared.
    pub fn fail_patch(&self, namespace: &str, name: &str, error: StoreError) {
        self.lock()
            .patch_faults
            .insert(object_key(namespace, name), error);
    }

    /// Make every read of the given node fail with `error`.
    pub fn fail_node_read(&self, name: &str, error: StoreError) {
        self.lock().node_faults.insert(name.to_string(), error);
    }

    /// Make every read of the given pod fail with `error`.
    pub fn fail_pod_read(&self, namespace: &str, name: &str, error: StoreError) {
        self.lock()
            .pod_faults
            .insert(object_key(namespace, name), error);
    }

    /// Make every pod listing fail with `error`.
    pub fn fail_list(&self, error: StoreError) {
        self.lock().list_fault = Some(error);
    }

    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.patch_faults.clear();
        state.node_faults.clear();
        state.pod_faults.clear();
        state.list_fault = None;
    }

    /// Delay every node and pod read, used to exercise deadlines.
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = Some(delay);
    }

    /// Keys (`namespace/name`) of every patch submitted, including failed ones.
    #[must_use]
    pub fn patch_attempts(&self) -> Vec<String> {
        self.lock().patch_attempts.clone()
    }

    async fn read_delay(&self) {
        let delay = self.lock().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_node(&self, name: &str) -> Result<Node, StoreError> {
        self.read_delay().await;
        let state = self.lock();
        if let Some(err) = state.node_faults.get(name) {
            return Err(err.clone());
        }
        state
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(KIND_NODE, name))
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, StoreError> {
        self.read_delay().await;
        let key = object_key(namespace, name);
        let state = self.lock();
        if let Some(err) = state.pod_faults.get(&key) {
            return Err(err.clone());
        }
        state
            .pods
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(KIND_POD, key))
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, StoreError> {
        let state = self.lock();
        if let Some(err) = &state.list_fault {
            return Err(err.clone());
        }
        Ok(state.pods.values().cloned().collect())
    }

    async fn patch_pod_labels(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        labels: &LabelPatch,
    ) -> Result<Pod, StoreError> {
        let key = object_key(namespace, name);
        let mut state = self.lock();
        state.patch_attempts.push(key.clone());

        if let Some(err) = state.patch_faults.get(&key) {
            return Err(err.clone());
        }

        let version = state.next_version();
        let pod = state
            .pods
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(KIND_POD, key.clone()))?;

        if let Some(expected) = resource_version {
            if pod.metadata.resource_version.as_deref() != Some(expected) {
                return Err(StoreError::conflict(KIND_POD, key));
            }
        }

        let current = pod.metadata.labels.get_or_insert_with(BTreeMap::new);
        for (label, value) in labels {
            match value {
                Some(value) => {
                    current.insert(label.clone(), value.clone());
                }
                None => {
                    current.remove(label);
                }
            }
        }
        pod.metadata.resource_version = Some(version);

        Ok(pod.clone())
    }
}
