use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use credseal_core::{resolve_download, VerificationReport};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{filename}", get(verify_file))
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub filename: String,
    #[serde(flatten)]
    pub report: VerificationReport,
}

/// Inspect the content credentials embedded in a previously signed file.
pub async fn verify_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<VerifyResponse>> {
    let path = resolve_download(&state.config().upload_dir, &filename).await?;
    let report = state.orchestrator.tool().verify(&path).await;

    tracing::info!(filename = %filename, valid = report.valid, "Verified signed file");

    Ok(Json(VerifyResponse { filename, report }))
}
