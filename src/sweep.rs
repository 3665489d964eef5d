// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Convergence sweep over all pods.
//!
//! The sweep is the correctness backstop for the fail-open binding intercept.
//! It lists every pod, resolves the node each pod is bound to, applies the
//! propagation rule and patches what differs. It runs once at startup, to
//! repair drift accumulated while the process was down, and can be triggered
//! again on demand through [`SweepRunner`].
//!
//! # Error policy
//!
//! - Pods that are not bound yet, or whose node is gone, are skipped.
//! - Each pod is re-read right before it is patched, so the patch is pinned to
//!   the pod's current resource version rather than the listed one.
//! - Pods deleted concurrently (not-found on read or patch) are skipped.
//! - A conflict on patch is retried once against a fresh read; a second
//!   conflict aborts the sweep.
//! - Any other store failure aborts the sweep and is returned to the caller.
//!   Pods patched before the failure keep their labels.
//!
//! # Example
//!
//! ```rust,no_run
//! use labels_injector::labels::TopologyKeys;
//! use labels_injector::store::memory::InMemoryStore;
//! use labels_injector::sweep::reconcile_all;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), labels_injector::errors::SweepError> {
//! let store = InMemoryStore::new();
//! let summary = reconcile_all(&store, &TopologyKeys::default(), &CancellationToken::new()).await?;
//! println!("patched {} pods", summary.patched);
//! # Ok(())
//! # }
//! ```

use crate::errors::SweepError;
use crate::labels::TopologyKeys;
use crate::metrics::{
    record_pod_patched, record_store_error, record_sweep, record_sweep_counts, PATH_SWEEP,
};
use crate::patch::{apply_label_patch, PatchOutcome};
use crate::propagation::propagate_from_node;
use crate::store::{pod_key, ResourceStore};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pod counts of a completed sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Pods returned by the listing
    pub listed: usize,
    /// Pods whose labels were patched
    pub patched: usize,
    /// Pods that already carried the right labels
    pub unchanged: usize,
    /// Pods not bound to a node yet
    pub unbound: usize,
    /// Pods whose node no longer exists
    pub missing_node: usize,
    /// Pods deleted between listing and patching
    pub vanished: usize,
    /// Pods modified between read and patch, then patched from a fresh read
    pub conflicts: usize,
}

impl SweepSummary {
    fn skipped(&self) -> usize {
        self.unbound + self.missing_node + self.vanished
    }
}

/// Re-apply the propagation rule to every pod in the store.
///
/// Pods are processed one at a time; `cancel` is checked before each pod.
///
/// # Errors
///
/// - [`SweepError::List`] if pods cannot be listed.
/// - [`SweepError::NodeLookup`] if a node read fails for a reason other than not-found.
/// - [`SweepError::PodLookup`] if re-reading a pod fails for a reason other than not-found.
/// - [`SweepError::Patch`] if a patch fails for a reason other than not-found, or
///   still conflicts after one retry.
/// - [`SweepError::Cancelled`] if `cancel` fires before all pods were processed.
pub async fn reconcile_all<S>(
    store: &S,
    keys: &TopologyKeys,
    cancel: &CancellationToken,
) -> Result<SweepSummary, SweepError>
where
    S: ResourceStore + ?Sized,
{
    let start = Instant::now();
    let result = sweep_pods(store, keys, cancel).await;

    match &result {
        Ok(summary) => {
            record_sweep("success", start.elapsed());
            record_sweep_counts(
                summary.listed,
                summary.patched,
                summary.unchanged,
                summary.skipped(),
                summary.conflicts,
            );
            info!(
                listed = summary.listed,
                patched = summary.patched,
                unchanged = summary.unchanged,
                skipped = summary.skipped(),
                conflicts = summary.conflicts,
                duration_ms = start.elapsed().as_millis(),
                "Convergence sweep completed"
            );
        }
        Err(SweepError::Cancelled { processed }) => {
            record_sweep("cancelled", start.elapsed());
            warn!(processed, "Convergence sweep cancelled");
        }
        Err(e) => {
            record_sweep("error", start.elapsed());
            error!(error = %e, "Convergence sweep failed");
        }
    }

    result
}

async fn sweep_pods<S>(
    store: &S,
    keys: &TopologyKeys,
    cancel: &CancellationToken,
) -> Result<SweepSummary, SweepError>
where
    S: ResourceStore + ?Sized,
{
    info!("Reconciling all pods");

    let pods = store.list_pods().await.map_err(|e| {
        record_store_error(PATH_SWEEP, e.kind_label());
        SweepError::List(e)
    })?;

    let mut summary = SweepSummary {
        listed: pods.len(),
        ..SweepSummary::default()
    };

    for (processed, pod) in pods.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(SweepError::Cancelled { processed });
        }

        let key = pod_key(pod);
        let Some(node_name) = pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.as_deref())
            .filter(|name| !name.is_empty())
        else {
            debug!(pod = %key, "Pod not bound to a node yet, skipping");
            summary.unbound += 1;
            continue;
        };

        let node = match store.get_node(node_name).await {
            Ok(node) => node,
            Err(e) if e.is_not_found() => {
                debug!(pod = %key, node = %node_name, "Node no longer exists, skipping");
                summary.missing_node += 1;
                continue;
            }
            Err(e) => {
                record_store_error(PATH_SWEEP, e.kind_label());
                return Err(SweepError::NodeLookup {
                    pod: key,
                    source: e,
                });
            }
        };

        converge_pod(store, keys, &node, pod, &mut summary).await?;
    }

    Ok(summary)
}

/// Re-read one pod and patch it towards the node's labels.
///
/// The listed copy is only used to find the pod; its resource version is
/// usually stale by the time the sweep reaches it.
async fn converge_pod<S>(
    store: &S,
    keys: &TopologyKeys,
    node: &Node,
    listed: &Pod,
    summary: &mut SweepSummary,
) -> Result<(), SweepError>
where
    S: ResourceStore + ?Sized,
{
    let key = pod_key(listed);
    let namespace = listed.namespace().unwrap_or_default();
    let name = listed.name_any();
    let mut retried = false;

    loop {
        let current = match store.get_pod(&namespace, &name).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => {
                debug!(pod = %key, "Pod deleted during sweep, skipping");
                summary.vanished += 1;
                return Ok(());
            }
            Err(e) => {
                record_store_error(PATH_SWEEP, e.kind_label());
                return Err(SweepError::PodLookup {
                    pod: key,
                    source: e,
                });
            }
        };

        let desired = propagate_from_node(keys, node, &current);
        match apply_label_patch(store, &current, |labels| *labels = desired).await {
            Ok(PatchOutcome::Patched { changed }) => {
                record_pod_patched(PATH_SWEEP);
                info!(
                    pod = %key,
                    node = %node.name_any(),
                    changed,
                    "Propagated node labels to pod"
                );
                summary.patched += 1;
                return Ok(());
            }
            Ok(PatchOutcome::Unchanged) => {
                summary.unchanged += 1;
                return Ok(());
            }
            Err(e) if e.is_not_found() => {
                record_store_error(PATH_SWEEP, e.kind_label());
                debug!(pod = %key, "Pod deleted during sweep, skipping");
                summary.vanished += 1;
                return Ok(());
            }
            Err(e) if e.is_conflict() && !retried => {
                record_store_error(PATH_SWEEP, e.kind_label());
                debug!(pod = %key, "Pod modified concurrently, retrying from a fresh read");
                summary.conflicts += 1;
                retried = true;
            }
            Err(e) => {
                record_store_error(PATH_SWEEP, e.kind_label());
                return Err(SweepError::Patch {
                    pod: key,
                    source: e,
                });
            }
        }
    }
}

/// Runs sweeps on demand and makes sure two never overlap.
pub struct SweepRunner<S: ?Sized> {
    store: Arc<S>,
    keys: TopologyKeys,
    cancel: CancellationToken,
    running: Mutex<()>,
    converged: AtomicBool,
}

impl<S> SweepRunner<S>
where
    S: ResourceStore + ?Sized,
{
    /// Create a runner whose sweeps stop when `cancel` fires.
    #[must_use]
    pub fn new(store: Arc<S>, keys: TopologyKeys, cancel: CancellationToken) -> Self {
        Self {
            store,
            keys,
            cancel,
            running: Mutex::new(()),
            converged: AtomicBool::new(false),
        }
    }

    /// Run one sweep.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::AlreadyRunning`] if a sweep is in progress,
    /// otherwise whatever [`reconcile_all`] returns.
    pub async fn run(&self) -> Result<SweepSummary, SweepError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| SweepError::AlreadyRunning)?;

        let summary = reconcile_all(self.store.as_ref(), &self.keys, &self.cancel).await?;
        self.converged.store(true, Ordering::Release);
        Ok(summary)
    }

    /// Report readiness without sweeping, for processes started with the
    /// startup sweep disabled.
    pub fn assume_converged(&self) {
        self.converged.store(true, Ordering::Release);
    }

    /// Whether at least one sweep completed successfully.
    #[must_use]
    pub fn has_converged(&self) -> bool {
        self.converged.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod sweep_tests;
