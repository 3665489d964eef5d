// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployment manifests derived from the running configuration.
//!
//! The webhook registration and the RBAC rules are built from the same
//! constants the server uses, so the path the API server calls and the path
//! the server listens on cannot drift apart.

use crate::constants::{
    ADMISSION_PATH, CLUSTER_ROLE_NAME, DEFAULT_NAMESPACE, WEBHOOK_CONFIGURATION_NAME,
    WEBHOOK_NAME, WEBHOOK_SERVICE_NAME, WEBHOOK_SERVICE_PORT, WEBHOOK_TIMEOUT_SECS,
};
use k8s_openapi::api::admissionregistration::v1::{
    RuleWithOperations, ServiceReference, ValidatingWebhook, ValidatingWebhookConfiguration,
    WebhookClientConfig,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Header written on top of every generated file
pub const GENERATED_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/manifests.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin manifestgen` to regenerate
#
";

/// File name of the generated webhook registration
pub const WEBHOOK_MANIFEST_FILE: &str = "validating-webhook-configuration.yaml";

/// File name of the generated cluster role
pub const CLUSTER_ROLE_MANIFEST_FILE: &str = "cluster-role.yaml";

/// Where the API server reaches the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookService {
    pub namespace: String,
    pub name: String,
    pub port: i32,
}

impl Default for WebhookService {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: WEBHOOK_SERVICE_NAME.to_string(),
            port: WEBHOOK_SERVICE_PORT,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Registration of the binding webhook.
///
/// Non-mutating, `failurePolicy: Ignore` and `sideEffects: None`: a webhook
/// outage never blocks scheduling.
#[must_use]
pub fn webhook_configuration(service: &WebhookService) -> ValidatingWebhookConfiguration {
    ValidatingWebhookConfiguration {
        metadata: ObjectMeta {
            name: Some(WEBHOOK_CONFIGURATION_NAME.to_string()),
            ..Default::default()
        },
        webhooks: Some(vec![ValidatingWebhook {
            name: WEBHOOK_NAME.to_string(),
            admission_review_versions: strings(&["v1"]),
            client_config: WebhookClientConfig {
                service: Some(ServiceReference {
                    namespace: service.namespace.clone(),
                    name: service.name.clone(),
                    path: Some(ADMISSION_PATH.to_string()),
                    port: Some(service.port),
                }),
                ..Default::default()
            },
            rules: Some(vec![RuleWithOperations {
                api_groups: Some(strings(&[""])),
                api_versions: Some(strings(&["v1"])),
                operations: Some(strings(&["CREATE", "UPDATE"])),
                resources: Some(strings(&["pods/binding"])),
                ..Default::default()
            }]),
            failure_policy: Some("Ignore".to_string()),
            side_effects: "None".to_string(),
            timeout_seconds: Some(WEBHOOK_TIMEOUT_SECS),
            ..Default::default()
        }]),
    }
}

/// Permissions needed by both propagation paths.
#[must_use]
pub fn cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(CLUSTER_ROLE_NAME.to_string()),
            ..Default::default()
        },
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(strings(&[""])),
                resources: Some(strings(&["nodes"])),
                verbs: strings(&["get", "list", "watch"]),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(strings(&[""])),
                resources: Some(strings(&["pods"])),
                verbs: strings(&["get", "list", "watch", "patch"]),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

/// Render a Kubernetes object as YAML with the generated-file header.
///
/// # Errors
///
/// Returns an error if the object cannot be serialized.
pub fn render<T: Serialize>(object: &T) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(object)?;
    Ok(format!("{GENERATED_HEADER}{yaml}"))
}

/// Write every manifest into `output_dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if rendering or writing any file fails.
pub fn write_all(output_dir: &Path, service: &WebhookService) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;

    let files = [
        (WEBHOOK_MANIFEST_FILE, render(&webhook_configuration(service))?),
        (CLUSTER_ROLE_MANIFEST_FILE, render(&cluster_role())?),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = output_dir.join(name);
        fs::write(&path, content)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
#[path = "manifests_tests.rs"]
mod manifests_tests;
