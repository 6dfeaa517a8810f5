use axum::{extract::State, http::header, response::IntoResponse};

use crate::state::AppState;

/// Prometheus text exposition of the installed recorder
#[tracing::instrument(skip(state))]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
