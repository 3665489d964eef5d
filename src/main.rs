// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use labels_injector::{
    config::Config,
    constants::{TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS},
    errors::SweepError,
    intercept::BindingInterceptor,
    labels::TopologyKeys,
    server::{self, admin_router, webhook_router, AppState},
    store::{KubeStore, ResourceStore},
    sweep::SweepRunner,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = Config::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

/// Format: timestamp file:line LEVEL message
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or `text`).
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: Config) -> Result<()> {
    init_tracing();

    info!("Starting labels-injector");
    debug!(?config, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let store: Arc<dyn ResourceStore> = Arc::new(
        KubeStore::new(client)
            .with_field_manager(config.field_manager.clone())
            .with_page_size(config.list_page_size),
    );
    let keys = TopologyKeys::default();
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState {
        interceptor: BindingInterceptor::new(store.clone(), keys.clone())
            .with_timeout(config.intercept_timeout()),
        sweeper: SweepRunner::new(store, keys, shutdown.child_token()),
    });

    let webhook_listener = TcpListener::bind(config.webhook_bind_address)
        .await
        .with_context(|| format!("failed to bind webhook on {}", config.webhook_bind_address))?;
    let admin_listener = TcpListener::bind(config.admin_bind_address)
        .await
        .with_context(|| format!("failed to bind admin on {}", config.admin_bind_address))?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => info!(signal, "Received shutdown signal, stopping"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signals, stopping"),
        }
        signal_token.cancel();
    });

    let servers = async {
        tokio::try_join!(
            server::serve(
                "webhook",
                webhook_listener,
                webhook_router(state.clone()),
                shutdown.clone()
            ),
            server::serve(
                "admin",
                admin_listener,
                admin_router(state.clone()),
                shutdown.clone()
            ),
        )
        .map(|_| ())
    };
    tokio::pin!(servers);

    tokio::select! {
        result = &mut servers => {
            // Servers only return on their own after shutdown was requested
            return result;
        }
        result = run_startup_sweep(&state.sweeper, config.skip_startup_sweep) => {
            if let Err(e) = result {
                error!(error = %e, "CRITICAL: startup convergence sweep failed, exiting");
                shutdown.cancel();
                servers.await?;
                return Err(e);
            }
        }
    }

    servers.await?;
    info!("labels-injector stopped");
    Ok(())
}

/// Run the convergence sweep once, or mark the process ready right away when
/// the sweep is disabled. A sweep cancelled by shutdown is not a failure.
async fn run_startup_sweep<S>(sweeper: &SweepRunner<S>, skip: bool) -> Result<()>
where
    S: ResourceStore + ?Sized,
{
    if skip {
        info!("Startup convergence sweep disabled");
        sweeper.assume_converged();
        return Ok(());
    }

    match sweeper.run().await {
        Ok(_) => Ok(()),
        Err(SweepError::Cancelled { processed }) => {
            info!(processed, "Startup convergence sweep interrupted by shutdown");
            Ok(())
        }
        Err(e) => Err(e).context("startup convergence sweep failed"),
    }
}

/// Resolve with the name of the first termination signal received.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}
