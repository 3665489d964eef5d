// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `patch.rs`

use crate::errors::StoreError;
use crate::patch::{apply_label_patch, label_diff, PatchOutcome};
use crate::store::memory::InMemoryStore;
use crate::store::ResourceStore;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn pod_with_labels(name: &str, pod_labels: Option<BTreeMap<String, String>>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: pod_labels,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_label_diff_only_contains_changes() {
    let before = labels(&[("team", "payments"), ("zone", "eu-1-a"), ("gone", "x")]);
    let after = labels(&[("team", "payments"), ("zone", "eu-1-b"), ("region", "eu-1")]);

    let diff = label_diff(&before, &after);

    assert_eq!(diff.len(), 3);
    assert_eq!(diff["zone"], Some("eu-1-b".to_string()));
    assert_eq!(diff["region"], Some("eu-1".to_string()));
    assert_eq!(diff["gone"], None);
    assert!(!diff.contains_key("team"));
}

#[test]
fn test_label_diff_identical_maps_is_empty() {
    let map = labels(&[("team", "payments")]);
    assert!(label_diff(&map, &map).is_empty());
}

#[tokio::test]
async fn test_apply_label_patch_submits_delta() {
    let store = InMemoryStore::new();
    store.insert_pod(pod_with_labels("web-0", None));
    let pod = store.get_pod("default", "web-0").await.unwrap();

    let outcome = apply_label_patch(&store, &pod, |labels| {
        labels.insert("zone".to_string(), "eu-1-a".to_string());
    })
    .await
    .unwrap();

    assert_eq!(outcome, PatchOutcome::Patched { changed: 1 });
    assert_eq!(store.pod_labels("default", "web-0")["zone"], "eu-1-a");
}

#[tokio::test]
async fn test_apply_label_patch_skips_store_when_unchanged() {
    let store = InMemoryStore::new();
    store.insert_pod(pod_with_labels("web-0", Some(labels(&[("zone", "eu-1-a")]))));
    let pod = store.get_pod("default", "web-0").await.unwrap();

    let outcome = apply_label_patch(&store, &pod, |labels| {
        labels.insert("zone".to_string(), "eu-1-a".to_string());
    })
    .await
    .unwrap();

    assert_eq!(outcome, PatchOutcome::Unchanged);
    assert!(store.patch_attempts().is_empty());
}

#[tokio::test]
async fn test_apply_label_patch_reports_conflict() {
    let store = InMemoryStore::new();
    store.insert_pod(pod_with_labels("web-0", None));
    let stale = store.get_pod("default", "web-0").await.unwrap();
    store.touch_pod("default", "web-0");

    let result = apply_label_patch(&store, &stale, |labels| {
        labels.insert("zone".to_string(), "eu-1-a".to_string());
    })
    .await;

    assert!(matches!(result, Err(StoreError::Conflict { .. })));
}

#[tokio::test]
async fn test_apply_label_patch_reports_not_found() {
    let store = InMemoryStore::new();
    store.insert_pod(pod_with_labels("web-0", None));
    let pod = store.get_pod("default", "web-0").await.unwrap();
    store.remove_pod("default", "web-0");

    let result = apply_label_patch(&store, &pod, |labels| {
        labels.insert("zone".to_string(), "eu-1-a".to_string());
    })
    .await;

    assert!(result.unwrap_err().is_not_found());
}
