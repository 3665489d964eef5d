// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `propagation.rs`

use crate::labels::{
    TopologyKeys, BUILDING_BLOCK_LABEL, CLUSTER_ID_LABEL, CLUSTER_NAME_LABEL, REGION_LABEL,
    ZONE_LABEL,
};
use crate::propagation::{propagate, propagate_from_node};
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_copies_node_topology_and_falls_back_to_node_name() {
    let keys = TopologyKeys::default();
    let node = labels(&[(REGION_LABEL, "eu-1"), (ZONE_LABEL, "eu-1-a")]);

    let result = propagate(&keys, "node-1", Some(&node), None);

    assert_eq!(
        result,
        labels(&[
            (REGION_LABEL, "eu-1"),
            (ZONE_LABEL, "eu-1-a"),
            (CLUSTER_NAME_LABEL, "node-1"),
        ])
    );
}

#[test]
fn test_legacy_fallback_uses_node_name() {
    let keys = TopologyKeys::default();
    let node = labels(&[(REGION_LABEL, "eu-1")]);

    let result = propagate(&keys, "node-42", Some(&node), Some(&BTreeMap::new()));

    assert_eq!(result[CLUSTER_NAME_LABEL], "node-42");
    assert_eq!(result[REGION_LABEL], "eu-1");
    assert_eq!(result.len(), 2);
}

#[test]
fn test_identity_label_on_node_wins_over_fallback() {
    let keys = TopologyKeys::default();
    let node = labels(&[
        (CLUSTER_NAME_LABEL, "prod-eu"),
        (CLUSTER_ID_LABEL, "c-17"),
        (BUILDING_BLOCK_LABEL, "bb091"),
    ]);

    let result = propagate(&keys, "node-1", Some(&node), None);

    assert_eq!(result[CLUSTER_NAME_LABEL], "prod-eu");
    assert_eq!(result[CLUSTER_ID_LABEL], "c-17");
    assert_eq!(result[BUILDING_BLOCK_LABEL], "bb091");
}

#[test]
fn test_empty_identity_value_does_not_trigger_fallback() {
    let keys = TopologyKeys::default();
    let node = labels(&[(CLUSTER_NAME_LABEL, "")]);

    let result = propagate(&keys, "node-1", Some(&node), None);

    assert_eq!(result[CLUSTER_NAME_LABEL], "");
}

#[test]
fn test_unrelated_pod_labels_are_kept() {
    let keys = TopologyKeys::default();
    let node = labels(&[(REGION_LABEL, "eu-1")]);
    let pod = labels(&[("team", "payments"), ("app", "ledger")]);

    let result = propagate(&keys, "node-1", Some(&node), Some(&pod));

    assert_eq!(result["team"], "payments");
    assert_eq!(result["app"], "ledger");
}

#[test]
fn test_stale_topology_values_are_overwritten() {
    let keys = TopologyKeys::default();
    let node = labels(&[(ZONE_LABEL, "eu-1-b")]);
    let pod = labels(&[(ZONE_LABEL, "eu-1-a")]);

    let result = propagate(&keys, "node-1", Some(&node), Some(&pod));

    assert_eq!(result[ZONE_LABEL], "eu-1-b");
}

#[test]
fn test_missing_node_key_leaves_pod_value_untouched() {
    let keys = TopologyKeys::default();
    let node = labels(&[(CLUSTER_NAME_LABEL, "prod-eu")]);
    let pod = labels(&[(REGION_LABEL, "eu-1")]);

    let result = propagate(&keys, "node-1", Some(&node), Some(&pod));

    assert_eq!(result[REGION_LABEL], "eu-1");
}

#[test]
fn test_node_without_labels() {
    let keys = TopologyKeys::default();

    let result = propagate(&keys, "bare-node", None, None);

    assert_eq!(result, labels(&[(CLUSTER_NAME_LABEL, "bare-node")]));
}

#[test]
fn test_propagate_is_idempotent() {
    let keys = TopologyKeys::default();
    let nodes = [
        labels(&[]),
        labels(&[(REGION_LABEL, "eu-1"), (ZONE_LABEL, "eu-1-a")]),
        labels(&[(CLUSTER_NAME_LABEL, "prod"), (BUILDING_BLOCK_LABEL, "bb1")]),
        labels(&[(CLUSTER_NAME_LABEL, ""), ("unrelated", "x")]),
    ];
    let pods = [
        labels(&[]),
        labels(&[("team", "payments")]),
        labels(&[(REGION_LABEL, "us-1"), (CLUSTER_NAME_LABEL, "old")]),
    ];

    for node in &nodes {
        for pod in &pods {
            let once = propagate(&keys, "node-1", Some(node), Some(pod));
            let twice = propagate(&keys, "node-1", Some(node), Some(&once));
            assert_eq!(once, twice, "node={node:?} pod={pod:?}");
        }
    }
}

#[test]
fn test_node_labels_outside_key_set_are_not_copied() {
    let keys = TopologyKeys::default();
    let node = labels(&[("kubernetes.io/hostname", "node-1"), (REGION_LABEL, "eu-1")]);

    let result = propagate(&keys, "node-1", Some(&node), None);

    assert!(!result.contains_key("kubernetes.io/hostname"));
}

#[test]
fn test_propagate_from_node_objects() {
    let keys = TopologyKeys::default();
    let node = Node {
        metadata: ObjectMeta {
            name: Some("node-7".to_string()),
            labels: Some(labels(&[(ZONE_LABEL, "eu-1-c")])),
            ..Default::default()
        },
        ..Default::default()
    };
    let pod = Pod {
        metadata: ObjectMeta {
            name: Some("web-0".to_string()),
            namespace: Some("default".to_string()),
            labels: Some(labels(&[("team", "payments")])),
            ..Default::default()
        },
        ..Default::default()
    };

    let result = propagate_from_node(&keys, &node, &pod);

    assert_eq!(
        result,
        labels(&[
            ("team", "payments"),
            (ZONE_LABEL, "eu-1-c"),
            (CLUSTER_NAME_LABEL, "node-7"),
        ])
    );
}
