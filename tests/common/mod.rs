// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use k8s_openapi::api::core::v1::{Node, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::client::Client;
use kube::core::admission::AdmissionReview;
use kube::core::DynamicObject;
use serde_json::json;
use std::collections::BTreeMap;

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn node(name: &str, node_labels: &[(&str, &str)]) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels(node_labels)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Pod in `default`, optionally already bound to `node_name`
pub fn pod(name: &str, node_name: Option<&str>, pod_labels: &[(&str, &str)]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: Some(labels(pod_labels)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: node_name.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Admission review the API server sends when the scheduler binds `pod` to `target`
pub fn binding_review(
    pod: &str,
    target_kind: &str,
    target: &str,
) -> AdmissionReview<DynamicObject> {
    serde_json::from_value(json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": format!("binding-{pod}-{target}"),
            "kind": { "group": "", "version": "v1", "kind": "Binding" },
            "resource": { "group": "", "version": "v1", "resource": "pods" },
            "subResource": "binding",
            "name": pod,
            "namespace": "default",
            "operation": "CREATE",
            "userInfo": { "username": "system:kube-scheduler" },
            "object": {
                "apiVersion": "v1",
                "kind": "Binding",
                "metadata": { "name": pod, "namespace": "default" },
                "target": { "apiVersion": "v1", "kind": target_kind, "name": target }
            }
        }
    }))
    .unwrap()
}
