// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Topology label keys propagated from nodes to pods.
//!
//! The key set is fixed: five labels, copied in a fixed order. The first one
//! is the identity key, which falls back to the node name when the node does
//! not carry it (clusters provisioned before the label existed).

// ============================================================================
// Topology Labels
// ============================================================================

/// Human-readable name of the cluster the node belongs to (identity key)
pub const CLUSTER_NAME_LABEL: &str = "kubernetes.metal.cloud.sap/name";

/// Identifier of the cluster the node belongs to
pub const CLUSTER_ID_LABEL: &str = "kubernetes.metal.cloud.sap/cluster";

/// Building block the node is racked in
pub const BUILDING_BLOCK_LABEL: &str = "kubernetes.metal.cloud.sap/bb";

/// Well-known Kubernetes region label
pub const REGION_LABEL: &str = "topology.kubernetes.io/region";

/// Well-known Kubernetes zone label
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Ordered, immutable set of label keys eligible for propagation.
///
/// Passed explicitly into the propagation rule so the rule stays a pure
/// function of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyKeys {
    keys: Vec<String>,
    identity: String,
}

impl TopologyKeys {
    /// Build a key set from an ordered list and the identity key.
    ///
    /// The identity key is appended to the list if it is not already part of it.
    #[must_use]
    pub fn new<I, S>(keys: I, identity: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identity = identity.into();
        let mut ordered: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !ordered.contains(&key) {
                ordered.push(key);
            }
        }
        if !ordered.contains(&identity) {
            ordered.push(identity.clone());
        }
        Self {
            keys: ordered,
            identity,
        }
    }

    /// Keys in propagation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// The key that falls back to the node name.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl Default for TopologyKeys {
    fn default() -> Self {
        Self::new(
            [
                CLUSTER_NAME_LABEL,
                CLUSTER_ID_LABEL,
                BUILDING_BLOCK_LABEL,
                REGION_LABEL,
                ZONE_LABEL,
            ],
            CLUSTER_NAME_LABEL,
        )
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
