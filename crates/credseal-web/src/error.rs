use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use credseal_core::ErrorKind;
use serde_json::json;

/// Error type for HTTP handlers.
///
/// Domain errors carry their own classification; the JSON body is always
/// `{ "status": "error", "message", "detail" }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] credseal_core::Error),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(e) => match e.kind() {
                ErrorKind::Client => StatusCode::BAD_REQUEST,
                ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Multipart(e) => e.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::FORBIDDEN => "Access denied",
            StatusCode::NOT_FOUND => "File not found",
            s if s.is_server_error() => "Error processing video",
            _ => "Invalid request",
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = json!({
            "status": "error",
            "message": message,
            "detail": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credseal_core::Error;
    use http_body_util::BodyExt;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_error_body() {
        let (status, body) = body_of(Error::EmptyUpload.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["detail"], "Uploaded file is empty");
    }

    #[tokio::test]
    async fn test_server_error_carries_diagnostic() {
        let (status, body) = body_of(Error::SigningFailed("certificate expired".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error processing video");
        assert_eq!(body["detail"], "c2patool failed: certificate expired");
    }

    #[tokio::test]
    async fn test_download_errors() {
        let (status, body) = body_of(Error::AccessDenied.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied");

        let (status, _) = body_of(Error::FileNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
