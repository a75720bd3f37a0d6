//! HTTP transport for the pipeline

use crate::error::PipelineError;
use crate::pipeline::PipelineContext;
use crate::types::request::RawRequest;
use crate::types::response::{ErrorResponse, PredictionResponse};
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

/// Build the service router
pub fn router(context: Arc<PipelineContext>) -> Router {
    // OPTIONS is routed after the CORS layer so the acknowledgment body reaches the client
    Router::new()
        .route(
            "/predict",
            post(predict)
                .layer(CorsLayer::permissive())
                .options(preflight),
        )
        .route("/health", get(health).layer(CorsLayer::permissive()))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

/// Bind and serve until the process exits
pub async fn serve(context: Arc<PipelineContext>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Irrigation inference service listening on {}", addr);

    axum::serve(listener, router(context)).await?;
    Ok(())
}

async fn predict(
    State(context): State<Arc<PipelineContext>>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, PipelineError> {
    let raw = match RawRequest::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            context.metrics().record_failure(Duration::ZERO, &e);
            warn!(error = %e, "Rejected unparseable request body");
            return Err(e);
        }
    };

    match context.run(raw).await {
        Ok(outcome) => {
            info!(
                water_required = outcome.water_required,
                overridden = outcome.overridden,
                crop = %outcome.record.crop_name,
                "Prediction successful"
            );
            Ok(Json(PredictionResponse::new(
                outcome.water_required,
                outcome.record,
            )))
        }
        Err(e) if e.is_validation() => {
            warn!(error = %e, "Rejected prediction request");
            Err(e)
        }
        Err(e) => {
            error!(error = %e, "Prediction error");
            Err(e)
        }
    }
}

async fn preflight() -> impl IntoResponse {
    (
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
        ],
        Json(json!({ "status": "success" })),
    )
}

async fn health(State(context): State<Arc<PipelineContext>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": context.model_name(),
        "encoder": context.encoder_name(),
        "features": context.registry().features(),
    }))
}
