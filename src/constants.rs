// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the labels-injector.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Admission Constants
// ============================================================================

/// HTTP path the binding admission webhook is served on
pub const ADMISSION_PATH: &str = "/admission--v1-pods-binding";

/// Name of the webhook inside the `ValidatingWebhookConfiguration`
pub const WEBHOOK_NAME: &str = "labels-injector.kvm.cloud.sap";

/// Kind of the admission request object this webhook handles
pub const KIND_BINDING: &str = "Binding";

/// Binding target kind that triggers label propagation
pub const KIND_NODE: &str = "Node";

/// Kind name used for pods in errors and log fields
pub const KIND_POD: &str = "Pod";

/// Default time budget for a single binding intercept (milliseconds)
///
/// Kept below the API server's default webhook timeout of 10 seconds so the
/// intercept always answers before the server gives up on it.
pub const DEFAULT_INTERCEPT_TIMEOUT_MILLIS: u64 = 5000;

/// Timeout written into the generated webhook registration (seconds)
pub const WEBHOOK_TIMEOUT_SECS: i32 = 10;

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Field manager recorded on every pod label patch
pub const DEFAULT_FIELD_MANAGER: &str = "labels-injector";

/// Page size used when listing all pods for the convergence sweep
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 500;

// ============================================================================
// Server Constants
// ============================================================================

/// Bind address for the admission webhook listener
pub const DEFAULT_WEBHOOK_BIND_ADDRESS: &str = "0.0.0.0:9443";

/// Bind address for the admin listener (metrics, health, on-demand sweep)
pub const DEFAULT_ADMIN_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness probe
pub const HEALTHZ_PATH: &str = "/healthz";

/// Path for the readiness probe
pub const READYZ_PATH: &str = "/readyz";

/// Path that triggers an on-demand convergence sweep
pub const RECONCILE_PATH: &str = "/reconcile";

// ============================================================================
// Deployment Constants
// ============================================================================

/// Namespace the webhook service is deployed into
pub const DEFAULT_NAMESPACE: &str = "labels-injector-system";

/// Name of the service fronting the webhook listener
pub const WEBHOOK_SERVICE_NAME: &str = "labels-injector-webhook-service";

/// Port of the webhook service (TLS terminated in front of the pod)
pub const WEBHOOK_SERVICE_PORT: i32 = 443;

/// Name of the generated `ValidatingWebhookConfiguration`
pub const WEBHOOK_CONFIGURATION_NAME: &str = "labels-injector-validating-webhook-configuration";

/// Name of the generated `ClusterRole`
pub const CLUSTER_ROLE_NAME: &str = "labels-injector";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Thread name prefix for Tokio worker threads
pub const TOKIO_THREAD_NAME: &str = "labels-injector";
