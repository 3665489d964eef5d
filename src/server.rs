// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP listeners.
//!
//! Two routers share one [`AppState`]:
//!
//! - The webhook router serves the binding admission endpoint the API server
//!   calls. TLS is terminated in front of the process.
//! - The admin router serves Prometheus metrics, liveness and readiness probes
//!   and an on-demand convergence sweep.
//!
//! Routes:
//! - `POST /admission--v1-pods-binding` - Binding admission review (webhook)
//! - `GET /metrics` - Prometheus text exposition (admin)
//! - `GET /healthz` - Liveness, always 200 (admin)
//! - `GET /readyz` - 200 once a sweep succeeded, 503 before (admin)
//! - `POST /reconcile` - Run a sweep now (admin)

use crate::constants::{
    ADMISSION_PATH, HEALTHZ_PATH, METRICS_SERVER_PATH, READYZ_PATH, RECONCILE_PATH,
};
use crate::errors::SweepError;
use crate::intercept::BindingInterceptor;
use crate::metrics::gather_metrics;
use crate::store::ResourceStore;
use crate::sweep::{SweepRunner, SweepSummary};
use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kube::core::admission::AdmissionReview;
use kube::core::DynamicObject;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Content type of the Prometheus text format
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared state of both routers.
pub struct AppState<S: ?Sized> {
    pub interceptor: BindingInterceptor<S>,
    pub sweeper: SweepRunner<S>,
}

/// Router for the admission webhook listener.
pub fn webhook_router<S>(state: Arc<AppState<S>>) -> Router
where
    S: ResourceStore + ?Sized + 'static,
{
    Router::new()
        .route(ADMISSION_PATH, post(admit::<S>))
        .with_state(state)
}

/// Router for the admin listener.
pub fn admin_router<S>(state: Arc<AppState<S>>) -> Router
where
    S: ResourceStore + ?Sized + 'static,
{
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics))
        .route(HEALTHZ_PATH, get(healthz))
        .route(READYZ_PATH, get(readyz::<S>))
        .route(RECONCILE_PATH, post(reconcile::<S>))
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(
    name: &str,
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let address = listener.local_addr()?;
    info!(listener = name, %address, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .with_context(|| format!("{name} listener on {address} failed"))?;

    info!(listener = name, "Listener stopped");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /admission--v1-pods-binding
pub(crate) async fn admit<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>>
where
    S: ResourceStore + ?Sized + 'static,
{
    Json(state.interceptor.review(review).await)
}

/// GET /metrics
pub(crate) async fn metrics() -> Response {
    match gather_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /healthz
pub(crate) async fn healthz() -> &'static str {
    "ok"
}

/// GET /readyz
pub(crate) async fn readyz<S>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, &'static str)
where
    S: ResourceStore + ?Sized + 'static,
{
    if state.sweeper.has_converged() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "waiting for the first convergence sweep")
    }
}

/// POST /reconcile
pub(crate) async fn reconcile<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SweepSummary>, SweepError>
where
    S: ResourceStore + ?Sized + 'static,
{
    info!("On-demand convergence sweep requested");
    state.sweeper.run().await.map(Json)
}

impl IntoResponse for SweepError {
    fn into_response(self) -> Response {
        let status = match &self {
            SweepError::AlreadyRunning => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
