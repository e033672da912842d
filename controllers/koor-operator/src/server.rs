//! HTTP endpoints: liveness and readiness probes, Prometheus metrics and the
//! KoorCluster validating admission webhook.
//!
//! TLS for the webhook is terminated in front of the operator; the server
//! itself speaks plain HTTP.

use crate::error::ControllerError;
use crate::metrics::Metrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use crds::KoorCluster;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::api::DynamicObject;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const VALIDATE_PATH: &str = "/validate-storage-koor-tech-v1alpha1-koorcluster";

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct ServerState {
    pub metrics: Arc<Metrics>,
    /// Set once the controller has started watching
    pub ready: Arc<AtomicBool>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route(VALIDATE_PATH, post(validate_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControllerError::Server(format!("failed to bind {addr}: {e}")))?;
    info!("Serving probes, metrics and admission on {}", addr);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| ControllerError::Server(e.to_string()))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<ServerState>) -> StatusCode {
    if state.ready.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(State(state): State<ServerState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn validate_handler(
    Json(review): Json<AdmissionReview<KoorCluster>>,
) -> Json<AdmissionReview<DynamicObject>> {
    Json(admission_response(review).into_review())
}

/// Admit or deny a KoorCluster create/update.
pub fn admission_response(review: AdmissionReview<KoorCluster>) -> AdmissionResponse {
    let request: AdmissionRequest<KoorCluster> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid admission review: {}", e);
            return AdmissionResponse::invalid(e.to_string());
        }
    };

    let response = AdmissionResponse::from(&request);
    let Some(cluster) = &request.object else {
        debug!("Admission request {} carries no object, allowing", request.uid);
        return response;
    };

    match cluster.validate() {
        Ok(()) => response,
        Err(e) => {
            warn!(
                "Denying KoorCluster {}/{}: {}",
                request.namespace.as_deref().unwrap_or_default(),
                request.name,
                e
            );
            response.deny(e.to_string())
        }
    }
}
