// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployment Manifest Generator
//!
//! Generates the webhook registration and RBAC YAML from the constants the
//! server uses, so the files in deploy/ always match the running code.
//!
//! Usage:
//!   cargo run --bin manifestgen [output-dir]
//!
//! Generated files are written to deploy/ unless another directory is given.

use labels_injector::manifests::{write_all, WebhookService};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("deploy"), PathBuf::from);

    println!("Generating deployment manifests from src/manifests.rs...");

    for path in write_all(&output_dir, &WebhookService::default())? {
        println!("  ✓ {}", path.display());
    }

    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f {}", output_dir.display());

    Ok(())
}
