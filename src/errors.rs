// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for resource store access and the convergence sweep.
//!
//! Store errors are classified by how callers treat them:
//! - [`StoreError::NotFound`] is benign everywhere; the object went away.
//! - [`StoreError::Conflict`] is logged by the binding intercept; the sweep
//!   retries it once from a fresh read and aborts if it persists.
//! - [`StoreError::Transport`] is logged and swallowed by the binding intercept
//!   but aborts the convergence sweep.

use thiserror::Error;

/// Errors returned by a [`ResourceStore`](crate::store::ResourceStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist (HTTP 404)
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Kind of the object (`Node`, `Pod`)
        kind: String,
        /// Name of the object (`namespace/name` for pods)
        name: String,
    },

    /// The object changed since it was read (HTTP 409)
    ///
    /// Returned when a patch carries a resource version that no longer matches
    /// the stored object.
    #[error("{kind} '{name}' was modified concurrently (resource version conflict)")]
    Conflict {
        /// Kind of the object (`Node`, `Pod`)
        kind: String,
        /// Name of the object (`namespace/name` for pods)
        name: String,
    },

    /// The store could not be reached or answered with an unexpected error
    #[error("{operation} failed: {reason}")]
    Transport {
        /// Operation that failed (e.g., `get node node-1`, `list pods`)
        operation: String,
        /// Underlying error message
        reason: String,
    },
}

impl StoreError {
    pub fn not_found(kind: &str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    pub fn conflict(kind: &str, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    pub fn transport(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Map a Kubernetes client error onto the store taxonomy.
    ///
    /// 404 becomes `NotFound`, 409 becomes `Conflict`, everything else
    /// (including connection failures and timeouts) becomes `Transport`.
    #[must_use]
    pub fn from_kube(kind: &str, name: &str, operation: &str, err: &kube::Error) -> Self {
        match err {
            kube::Error::Api(status) => {
                Self::from_status_code(kind, name, operation, status.code, &err.to_string())
            }
            other => Self::transport(operation, other.to_string()),
        }
    }

    /// Classify an API status code.
    #[must_use]
    pub fn from_status_code(
        kind: &str,
        name: &str,
        operation: &str,
        code: u16,
        reason: &str,
    ) -> Self {
        match code {
            404 => Self::not_found(kind, name),
            409 => Self::conflict(kind, name),
            _ => Self::transport(operation, reason),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Short label used for metrics (`not_found`, `conflict`, `transport`).
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Transport { .. } => "transport",
        }
    }
}

/// Errors that abort a convergence sweep.
///
/// Pods patched before the failure keep their new labels; nothing is rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    /// Listing pods failed, nothing was processed
    #[error("failed to list pods: {0}")]
    List(#[source] StoreError),

    /// Reading the node of a pod failed for a reason other than not-found
    #[error("failed to read node of pod {pod}: {source}")]
    NodeLookup {
        /// Pod being processed (`namespace/name`)
        pod: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Re-reading a pod before patching failed for a reason other than not-found
    #[error("failed to read pod {pod}: {source}")]
    PodLookup {
        /// Pod being processed (`namespace/name`)
        pod: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Patching a pod failed for a reason other than not-found, or kept
    /// conflicting after a retry
    #[error("failed to patch pod {pod}: {source}")]
    Patch {
        /// Pod being processed (`namespace/name`)
        pod: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// The sweep was cancelled between two pods
    #[error("sweep cancelled after {processed} pods")]
    Cancelled {
        /// Number of pods processed before cancellation
        processed: usize,
    },

    /// Another sweep is still running
    #[error("a sweep is already in progress")]
    AlreadyRunning,
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
