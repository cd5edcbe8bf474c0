//! HTTP API
//!
//! `GET /analyze/{wallet_id}?risk_level=low|medium|high` runs one optimization
//! pass and answers with the report as JSON. An unknown risk level is a 400,
//! a failed pass a 500, both with an `{"error": ...}` body.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::RiskTolerance;
use crate::pipeline::{OptimizationReport, Optimizer};
use crate::Result;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    /// Falls back to the configured tolerance
    pub risk_level: Option<String>,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(optimizer: Arc<Optimizer>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze/:wallet_id", get(analyze_wallet))
        .with_state(optimizer)
}

/// Serve the API until the listener fails
pub async fn serve(optimizer: Arc<Optimizer>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "API server listening");
    axum::serve(listener, router(optimizer)).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn analyze_wallet(
    State(optimizer): State<Arc<Optimizer>>,
    Path(wallet_id): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> std::result::Result<Json<OptimizationReport>, ApiError> {
    let tolerance = match query.risk_level.as_deref() {
        Some(level) => level.parse::<RiskTolerance>().map_err(|_| {
            ApiError::bad_request("Risk tolerance must be one of: 'low', 'medium', 'high'")
        })?,
        None => optimizer.config().risk.tolerance,
    };

    info!(wallet_id = %wallet_id, risk_tolerance = %tolerance, "Analyze request");
    let optimizer = optimizer.for_tolerance(tolerance);
    match optimizer.run(&wallet_id).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            error!(wallet_id = %wallet_id, error = %e, "Analyze request failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}
