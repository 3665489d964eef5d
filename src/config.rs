// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration.
//!
//! Every flag can also be set through the environment variable named in its
//! help text, which is how the deployment manifests configure the process.

use crate::constants::{
    DEFAULT_ADMIN_BIND_ADDRESS, DEFAULT_FIELD_MANAGER, DEFAULT_INTERCEPT_TIMEOUT_MILLIS,
    DEFAULT_LIST_PAGE_SIZE, DEFAULT_WEBHOOK_BIND_ADDRESS,
};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Propagates node topology labels onto the pods bound to them.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "labels-injector", version, about)]
pub struct Config {
    /// Address the binding admission webhook listens on
    #[arg(long, env = "WEBHOOK_BIND_ADDRESS", default_value = DEFAULT_WEBHOOK_BIND_ADDRESS)]
    pub webhook_bind_address: SocketAddr,

    /// Address serving metrics, health probes and on-demand sweeps
    #[arg(long, env = "ADMIN_BIND_ADDRESS", default_value = DEFAULT_ADMIN_BIND_ADDRESS)]
    pub admin_bind_address: SocketAddr,

    /// Deadline for a single binding intercept, in milliseconds
    #[arg(long, env = "INTERCEPT_TIMEOUT_MS", default_value_t = DEFAULT_INTERCEPT_TIMEOUT_MILLIS)]
    pub intercept_timeout_ms: u64,

    /// Page size used when listing pods for the convergence sweep
    #[arg(long, env = "LIST_PAGE_SIZE", default_value_t = DEFAULT_LIST_PAGE_SIZE)]
    pub list_page_size: u32,

    /// Field manager recorded on pod label patches
    #[arg(long, env = "FIELD_MANAGER", default_value = DEFAULT_FIELD_MANAGER)]
    pub field_manager: String,

    /// Do not run the convergence sweep at startup
    #[arg(long, env = "SKIP_STARTUP_SWEEP")]
    pub skip_startup_sweep: bool,
}

impl Config {
    #[must_use]
    pub fn intercept_timeout(&self) -> Duration {
        Duration::from_millis(self.intercept_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
