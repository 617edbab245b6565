use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    response::Response,
    routing::get,
    Router,
};
use credseal_core::resolve_download;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::ApiResult;
use crate::state::AppState;

/// Mounted at `/api/v1/files` and at `/files`; both go through the gateway.
pub fn router() -> Router<AppState> {
    Router::new().route("/{filename}", get(download_file))
}

/// Stream a signed video or extracted manifest as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let path = resolve_download(&state.config().upload_dir, &filename).await?;

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(filename);
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}
