// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Synchronous propagation on pod binding.
//!
//! The API server calls this webhook for every `pods/binding` request, i.e.
//! when the scheduler assigns a pod to a node. The intercept resolves the node
//! and the pod, applies the propagation rule and patches the pod labels.
//!
//! Binding sits on the scheduler's hot path, so the intercept is fail-open:
//! every request is answered with `allowed: true`, whatever happens. Lookups
//! that fail add a warning to the response; patches that fail are only logged.
//! Pods that miss their labels here are repaired by the convergence sweep.
//!
//! # Outcomes
//!
//! | Situation | Outcome | Warning |
//! |-----------|---------|---------|
//! | Not a binding, non-node target, empty target | `Ignored` | no |
//! | Node or pod lookup failed | `Skipped` | yes |
//! | Labels already up to date | `Unchanged` | no |
//! | Patch accepted | `Patched` | no |
//! | Patch rejected (conflict, not found, transport) | `PatchFailed` | no |
//! | Deadline expired | `TimedOut` | yes |

use crate::constants::{DEFAULT_INTERCEPT_TIMEOUT_MILLIS, KIND_BINDING, KIND_NODE};
use crate::errors::StoreError;
use crate::labels::TopologyKeys;
use crate::metrics::{record_intercept, record_pod_patched, record_store_error, PATH_INTERCEPT};
use crate::patch::{apply_label_patch, PatchOutcome};
use crate::propagation::propagate_from_node;
use crate::store::{object_key, ResourceStore};
use k8s_openapi::api::core::v1::Binding;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What the intercept did with a single admission request.
///
/// Every variant results in the binding being allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptOutcome {
    /// The request is out of scope (not a binding to a named node)
    Ignored {
        /// Why the request was ignored
        reason: String,
    },
    /// The node or the pod could not be resolved
    Skipped {
        /// Warning returned to the API client
        warning: String,
    },
    /// The pod already carries the node's topology labels
    Unchanged,
    /// The pod labels were patched
    Patched {
        /// Number of labels set
        changed: usize,
    },
    /// The patch was rejected by the store
    PatchFailed {
        /// Store error returned for the patch
        error: StoreError,
    },
    /// The intercept did not finish within its deadline
    TimedOut,
}

impl InterceptOutcome {
    /// Metric label for this outcome.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ignored { .. } => "ignored",
            Self::Skipped { .. } => "skipped",
            Self::Unchanged => "unchanged",
            Self::Patched { .. } => "patched",
            Self::PatchFailed { .. } => "patch_failed",
            Self::TimedOut => "timeout",
        }
    }

    /// Warning to attach to the admission response, if any.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Skipped { warning } => Some(warning.clone()),
            Self::TimedOut => Some("Timed out propagating node labels to pod".to_string()),
            _ => None,
        }
    }
}

/// Pod and node named by a binding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTarget {
    pub pod_namespace: String,
    pub pod_name: String,
    pub node_name: String,
}

/// Extract the pod and node of a binding admission request.
///
/// # Errors
///
/// Returns the reason the request is out of scope: wrong kind, missing or
/// undecodable object, a target that is not a node, or an empty node name.
pub fn binding_target(
    request: &AdmissionRequest<DynamicObject>,
) -> Result<BindingTarget, String> {
    if request.kind.kind != KIND_BINDING {
        return Err(format!("not a binding request (kind {})", request.kind.kind));
    }

    let object = request
        .object
        .as_ref()
        .ok_or_else(|| "binding request carries no object".to_string())?;
    let binding: Binding = serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|e| format!("failed to decode binding: {e}"))?;

    let target_kind = binding.target.kind.as_deref().unwrap_or_default();
    if target_kind != KIND_NODE {
        return Err(format!("binding target is not a node (kind {target_kind})"));
    }

    let node_name = binding.target.name.clone().unwrap_or_default();
    if node_name.is_empty() {
        return Err("binding target node name is empty".to_string());
    }

    let pod_name = binding
        .metadata
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| request.name.clone());
    let pod_namespace = binding
        .metadata
        .namespace
        .clone()
        .filter(|namespace| !namespace.is_empty())
        .or_else(|| request.namespace.clone())
        .unwrap_or_default();

    Ok(BindingTarget {
        pod_namespace,
        pod_name,
        node_name,
    })
}

/// Fail-open binding webhook handler.
pub struct BindingInterceptor<S: ?Sized> {
    store: Arc<S>,
    keys: TopologyKeys,
    timeout: Duration,
}

impl<S> BindingInterceptor<S>
where
    S: ResourceStore + ?Sized,
{
    #[must_use]
    pub fn new(store: Arc<S>, keys: TopologyKeys) -> Self {
        Self {
            store,
            keys,
            timeout: Duration::from_millis(DEFAULT_INTERCEPT_TIMEOUT_MILLIS),
        }
    }

    /// Deadline for a single intercept; on expiry the binding is allowed.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Handle a full admission review and build the (always allowing) reply.
    pub async fn review(
        &self,
        review: AdmissionReview<DynamicObject>,
    ) -> AdmissionReview<DynamicObject> {
        let request: AdmissionRequest<DynamicObject> = match review.try_into() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Received admission review without a request, allowing");
                let mut response = AdmissionResponse::invalid(e.to_string());
                response.allowed = true;
                return response.into_review();
            }
        };

        let outcome = self.intercept(&request).await;
        respond(&request, &outcome).into_review()
    }

    /// Run the intercept for one request under the configured deadline.
    pub async fn intercept(&self, request: &AdmissionRequest<DynamicObject>) -> InterceptOutcome {
        let start = Instant::now();
        let deadline = tokio::time::timeout(self.timeout, self.propagate_binding(request));
        let outcome = match deadline.await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    request = %request.name,
                    timeout_ms = self.timeout.as_millis(),
                    "Binding intercept exceeded its deadline, allowing without labels"
                );
                InterceptOutcome::TimedOut
            }
        };
        record_intercept(outcome.label(), start.elapsed());
        outcome
    }

    async fn propagate_binding(
        &self,
        request: &AdmissionRequest<DynamicObject>,
    ) -> InterceptOutcome {
        info!(request = %request.name, uid = %request.uid, "Handling binding request");

        let target = match binding_target(request) {
            Ok(target) => target,
            Err(reason) => {
                info!(request = %request.name, reason = %reason, "Ignoring admission request");
                return InterceptOutcome::Ignored { reason };
            }
        };
        let pod_key = object_key(&target.pod_namespace, &target.pod_name);

        let node = match self.store.get_node(&target.node_name).await {
            Ok(node) => node,
            Err(e) => {
                record_store_error(PATH_INTERCEPT, e.kind_label());
                warn!(node = %target.node_name, pod = %pod_key, error = %e, "Failed to fetch node");
                return InterceptOutcome::Skipped {
                    warning: format!("Failed to fetch node {}", target.node_name),
                };
            }
        };

        let pod = match self
            .store
            .get_pod(&target.pod_namespace, &target.pod_name)
            .await
        {
            Ok(pod) => pod,
            Err(e) => {
                record_store_error(PATH_INTERCEPT, e.kind_label());
                warn!(pod = %pod_key, error = %e, "Failed to fetch pod");
                return InterceptOutcome::Skipped {
                    warning: format!("Failed to fetch pod {pod_key}"),
                };
            }
        };

        let desired = propagate_from_node(&self.keys, &node, &pod);
        match apply_label_patch(self.store.as_ref(), &pod, |labels| *labels = desired).await {
            Ok(PatchOutcome::Patched { changed }) => {
                record_pod_patched(PATH_INTERCEPT);
                info!(
                    pod = %pod_key,
                    node = %target.node_name,
                    changed,
                    "Propagated node labels to pod"
                );
                InterceptOutcome::Patched { changed }
            }
            Ok(PatchOutcome::Unchanged) => {
                debug!(pod = %pod_key, node = %target.node_name, "Pod labels already up to date");
                InterceptOutcome::Unchanged
            }
            Err(e) => {
                record_store_error(PATH_INTERCEPT, e.kind_label());
                if e.is_not_found() || e.is_conflict() {
                    info!(
                        pod = %pod_key,
                        error = %e,
                        "Pod changed during binding, leaving it to the sweep"
                    );
                } else {
                    error!(pod = %pod_key, error = %e, "Failed to patch pod");
                }
                InterceptOutcome::PatchFailed { error: e }
            }
        }
    }
}

/// Build the admission response for an outcome. Always allows the request.
#[must_use]
pub fn respond(
    request: &AdmissionRequest<DynamicObject>,
    outcome: &InterceptOutcome,
) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    if let Some(warning) = outcome.warning() {
        response.warnings = Some(vec![warning]);
    }
    response
}

#[cfg(test)]
#[path = "intercept_tests.rs"]
mod intercept_tests;
