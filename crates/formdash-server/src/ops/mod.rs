//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format (500 with a fixed body on failure)

use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use formdash_core::metrics::{exposition, render, MetricSource};

use crate::app_state::AppState;

pub const EXPORT_ERROR_BODY: &str = "# Error exporting metrics\n";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let source = state.metric_source();
    scrape(source.as_ref())
}

/// Collect and render; every failure, panics included, stops here.
pub fn scrape(source: &dyn MetricSource) -> Response {
    let outcome = catch_unwind(AssertUnwindSafe(|| source.snapshot().and_then(|snap| render(&snap))));

    match outcome {
        Ok(Ok(body)) => text_response(StatusCode::OK, body),
        Ok(Err(e)) => {
            tracing::error!(class = e.class().as_str(), error = %e, "metrics export failed");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, EXPORT_ERROR_BODY.to_string())
        }
        Err(_) => {
            tracing::error!("metrics export panicked");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, EXPORT_ERROR_BODY.to_string())
        }
    }
}

fn text_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response()
}
