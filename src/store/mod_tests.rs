// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `store/mod.rs` and the in-memory store

use crate::errors::StoreError;
use crate::store::memory::InMemoryStore;
use crate::store::{label_merge_patch, object_key, LabelPatch, ResourceStore};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::json;
use std::collections::BTreeMap;

fn pod(namespace: &str, name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([("team".to_string(), "payments".to_string())])),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_object_key() {
    assert_eq!(object_key("default", "web-0"), "default/web-0");
    assert_eq!(object_key("", "node-1"), "node-1");
}

#[test]
fn test_label_merge_patch_carries_resource_version() {
    let labels: LabelPatch = BTreeMap::from([
        ("zone".to_string(), Some("eu-1-a".to_string())),
        ("old".to_string(), None),
    ]);

    let patch = label_merge_patch(Some("42"), &labels);

    assert_eq!(
        patch,
        json!({
            "metadata": {
                "resourceVersion": "42",
                "labels": { "zone": "eu-1-a", "old": null }
            }
        })
    );
}

#[test]
fn test_label_merge_patch_without_resource_version() {
    let labels: LabelPatch = BTreeMap::from([("zone".to_string(), Some("eu-1-a".to_string()))]);

    let patch = label_merge_patch(None, &labels);

    assert!(patch["metadata"].get("resourceVersion").is_none());
    assert_eq!(patch["metadata"]["labels"]["zone"], "eu-1-a");
}

#[tokio::test]
async fn test_memory_store_patch_merges_labels_and_bumps_version() {
    let store = InMemoryStore::new();
    store.insert_pod(pod("default", "web-0"));
    let before = store.get_pod("default", "web-0").await.unwrap();
    let version = before.metadata.resource_version.clone();

    let labels: LabelPatch = BTreeMap::from([("zone".to_string(), Some("eu-1-a".to_string()))]);
    let after = store
        .patch_pod_labels("default", "web-0", version.as_deref(), &labels)
        .await
        .unwrap();

    let after_labels = after.metadata.labels.unwrap();
    assert_eq!(after_labels["zone"], "eu-1-a");
    assert_eq!(after_labels["team"], "payments");
    assert_ne!(after.metadata.resource_version, version);
}

#[tokio::test]
async fn test_memory_store_rejects_stale_version() {
    let store = InMemoryStore::new();
    store.insert_pod(pod("default", "web-0"));
    let observed = store.get_pod("default", "web-0").await.unwrap();
    store.touch_pod("default", "web-0");

    let labels: LabelPatch = BTreeMap::from([("zone".to_string(), Some("eu-1-a".to_string()))]);
    let result = store
        .patch_pod_labels(
            "default",
            "web-0",
            observed.metadata.resource_version.as_deref(),
            &labels,
        )
        .await;

    assert!(matches!(result, Err(StoreError::Conflict { .. })));
    assert!(!store.pod_labels("default", "web-0").contains_key("zone"));
}

#[tokio::test]
async fn test_memory_store_missing_objects() {
    let store = InMemoryStore::new();

    let node = store.get_node("ghost-node").await;
    assert!(node.unwrap_err().is_not_found());

    let labels: LabelPatch = BTreeMap::new();
    let patched = store
        .patch_pod_labels("default", "gone", None, &labels)
        .await;
    assert!(patched.unwrap_err().is_not_found());
    assert_eq!(store.patch_attempts(), vec!["default/gone".to_string()]);
}

#[tokio::test]
async fn test_memory_store_pod_read_faults_until_cleared() {
    let store = InMemoryStore::new();
    store.insert_pod(pod("default", "web-0"));
    store.insert_pod(pod("default", "web-1"));
    let failure = StoreError::transport("get pod default/web-0", "connection reset");
    store.fail_pod_read("default", "web-0", failure.clone());

    assert_eq!(store.get_pod("default", "web-0").await, Err(failure));
    assert!(store.get_pod("default", "web-1").await.is_ok());

    store.clear_faults();
    assert!(store.get_pod("default", "web-0").await.is_ok());
}
