// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The label propagation rule.
//!
//! Given the labels of a node and the labels of a pod bound to it, computes the
//! pod's next label state. The rule is pure and idempotent, which is what lets
//! the binding intercept and the convergence sweep race each other safely:
//! whichever runs last (or both, any number of times) produces the same labels.
//!
//! # Example
//!
//! ```rust
//! use labels_injector::labels::{TopologyKeys, CLUSTER_NAME_LABEL, REGION_LABEL};
//! use labels_injector::propagation::propagate;
//! use std::collections::BTreeMap;
//!
//! let keys = TopologyKeys::default();
//! let node_labels = BTreeMap::from([(REGION_LABEL.to_string(), "eu-1".to_string())]);
//!
//! let pod_labels = propagate(&keys, "node-42", Some(&node_labels), None);
//! assert_eq!(pod_labels[REGION_LABEL], "eu-1");
//! assert_eq!(pod_labels[CLUSTER_NAME_LABEL], "node-42");
//! ```

use crate::labels::TopologyKeys;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Compute the next label map of a pod bound to the given node.
///
/// - Every topology key the node carries is copied onto the pod, overwriting
///   any existing pod value.
/// - Topology keys the node does not carry keep whatever value the pod has.
/// - If the node has no identity key at all, the pod's identity key is set to
///   the node name. An empty-string value on the node counts as present.
/// - Keys outside the topology set are never touched.
///
/// Absent label maps are treated as empty.
#[must_use]
pub fn propagate(
    keys: &TopologyKeys,
    node_name: &str,
    node_labels: Option<&BTreeMap<String, String>>,
    pod_labels: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut next = pod_labels.cloned().unwrap_or_default();

    for key in keys.keys() {
        if let Some(value) = node_labels.and_then(|labels| labels.get(key)) {
            next.insert(key.to_string(), value.clone());
        }
    }

    let has_identity = node_labels.is_some_and(|labels| labels.contains_key(keys.identity()));
    if !has_identity {
        next.insert(keys.identity().to_string(), node_name.to_string());
    }

    next
}

/// Apply [`propagate`] to Kubernetes objects.
#[must_use]
pub fn propagate_from_node(
    keys: &TopologyKeys,
    node: &Node,
    pod: &Pod,
) -> BTreeMap<String, String> {
    propagate(
        keys,
        &node.name_any(),
        node.metadata.labels.as_ref(),
        pod.metadata.labels.as_ref(),
    )
}

#[cfg(test)]
#[path = "propagation_tests.rs"]
mod propagation_tests;
