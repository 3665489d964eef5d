// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # labels-injector - Node topology labels on Kubernetes pods
//!
//! Copies a fixed set of topology labels (region, zone, cluster identity) from
//! each node onto the pods bound to it, so that workloads and tooling that
//! only look at pods can still reason about placement.
//!
//! ## Overview
//!
//! Labels reach a pod through two paths that apply the same rule:
//!
//! - **Binding intercept** - a fail-open admission webhook on `pods/binding`
//!   labels the pod at the moment the scheduler places it.
//! - **Convergence sweep** - a full pass over all pods, run at startup and on
//!   demand, repairs whatever the intercept missed.
//!
//! ## Modules
//!
//! - [`labels`] - Topology key set
//! - [`propagation`] - The pure propagation rule
//! - [`store`] - Cluster access trait, Kubernetes and in-memory stores
//! - [`patch`] - Minimal, version-guarded label patches
//! - [`intercept`] - Binding admission handler
//! - [`sweep`] - Convergence sweep and its runner
//! - [`server`] - Webhook and admin HTTP listeners
//! - [`manifests`] - Webhook registration and RBAC generation
//!
//! ## Example
//!
//! ```rust
//! use labels_injector::labels::{TopologyKeys, CLUSTER_NAME_LABEL, REGION_LABEL};
//! use labels_injector::propagation::propagate;
//! use std::collections::BTreeMap;
//!
//! let node_labels = BTreeMap::from([(REGION_LABEL.to_string(), "eu-1".to_string())]);
//! let labels = propagate(&TopologyKeys::default(), "node-42", Some(&node_labels), None);
//!
//! assert_eq!(labels[REGION_LABEL], "eu-1");
//! assert_eq!(labels[CLUSTER_NAME_LABEL], "node-42");
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod intercept;
pub mod labels;
pub mod manifests;
pub mod metrics;
pub mod patch;
pub mod propagation;
pub mod server;
pub mod store;
pub mod sweep;
