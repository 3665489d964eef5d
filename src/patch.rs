// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Conditional label patches shared by both propagation paths.
//!
//! The applier captures the labels a pod had when it was read, lets the caller
//! mutate a copy, and submits only the difference as a merge patch pinned to
//! the observed resource version. Labels owned by other writers are never sent
//! back, so concurrent mutators of the same pod do not clobber each other.

use crate::errors::StoreError;
use crate::store::{LabelPatch, ResourceStore};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of a successful [`apply_label_patch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The mutation produced no change; nothing was submitted
    Unchanged,
    /// A patch touching `changed` labels was accepted by the store
    Patched {
        /// Number of labels set or removed
        changed: usize,
    },
}

/// Minimal set of label changes turning `before` into `after`.
#[must_use]
pub fn label_diff(
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
) -> LabelPatch {
    let mut diff = LabelPatch::new();

    for (key, value) in after {
        if before.get(key) != Some(value) {
            diff.insert(key.clone(), Some(value.clone()));
        }
    }
    for key in before.keys() {
        if !after.contains_key(key) {
            diff.insert(key.clone(), None);
        }
    }

    diff
}

/// Mutate the labels of `pod` and submit the delta to `store`.
///
/// The patch is conditioned on the pod's observed resource version.
///
/// # Errors
///
/// - [`StoreError::Conflict`] if the pod changed since it was read. Not retried.
/// - [`StoreError::NotFound`] if the pod was deleted concurrently.
/// - [`StoreError::Transport`] if the store could not be reached.
pub async fn apply_label_patch<S, F>(
    store: &S,
    pod: &Pod,
    mutate: F,
) -> Result<PatchOutcome, StoreError>
where
    S: ResourceStore + ?Sized,
    F: FnOnce(&mut BTreeMap<String, String>),
{
    let observed = pod.metadata.labels.clone().unwrap_or_default();
    let mut desired = observed.clone();
    mutate(&mut desired);

    let diff = label_diff(&observed, &desired);
    if diff.is_empty() {
        return Ok(PatchOutcome::Unchanged);
    }

    let namespace = pod.namespace().unwrap_or_default();
    let name = pod.name_any();
    debug!(
        namespace = %namespace,
        pod = %name,
        resource_version = ?pod.metadata.resource_version,
        changed = diff.len(),
        "Submitting label patch"
    );

    store
        .patch_pod_labels(
            &namespace,
            &name,
            pod.metadata.resource_version.as_deref(),
            &diff,
        )
        .await?;

    Ok(PatchOutcome::Patched {
        changed: diff.len(),
    })
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod patch_tests;
