use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub sign_video: &'static str,
    pub download: &'static str,
    pub verify: &'static str,
    pub health: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: String,
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let config = state.config();
    Json(ServiceInfo {
        service: config.app_name.clone(),
        version: config.app_version.clone(),
        status: "running",
        endpoints: Endpoints {
            sign_video: "/api/v1/sign-video",
            download: "/api/v1/files/{filename}",
            verify: "/api/v1/verify/{filename}",
            health: "/api/v1/health",
        },
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.config();
    Json(HealthResponse {
        status: "healthy",
        service: config.app_name.clone(),
        version: config.app_version.clone(),
    })
}
