use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::SecondsFormat;
use credseal_core::{Error, SignedVideo, SigningJob, SigningRequest};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

const SIGNING_MODE: &str = "embedded";

pub fn router() -> Router<AppState> {
    // Oversize uploads are rejected by the orchestrator once written to disk.
    Router::new().route(
        "/sign-video",
        post(sign_video).layer(DefaultBodyLimit::disable()),
    )
}

#[derive(Debug, Serialize)]
pub struct SignLinks {
    pub download_url: String,
    pub manifest_url: Option<String>,
    pub mode: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SignMetadata {
    pub original_filename: String,
    pub file_size_mb: f64,
    pub signed_at: String,
    pub organization: String,
    pub ai_tool: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignResponse {
    pub status: &'static str,
    pub message: String,
    pub job_id: Uuid,
    pub links: SignLinks,
    pub metadata: SignMetadata,
}

impl SignResponse {
    fn new(state: &AppState, signed: SignedVideo) -> Self {
        let message = if signed.is_degraded() {
            format!("C2PA signing succeeded in {SIGNING_MODE} mode; manifest extraction unavailable.")
        } else {
            format!("C2PA signing succeeded in {SIGNING_MODE} mode.")
        };

        Self {
            status: "ok",
            message,
            job_id: signed.job_id,
            links: SignLinks {
                download_url: state.file_url(&signed.video_filename),
                manifest_url: signed.manifest_filename.as_deref().map(|m| state.file_url(m)),
                mode: SIGNING_MODE,
            },
            metadata: SignMetadata {
                file_size_mb: signed.file_size_mb(),
                original_filename: signed.original_filename,
                signed_at: signed.signed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                organization: signed.request.organization,
                ai_tool: signed.request.ai_tool,
                title: signed.request.title,
                description: signed.request.description,
            },
        }
    }
}

#[derive(Default)]
struct SignForm {
    job: Option<SigningJob>,
    organization: Option<String>,
    ai_tool: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

/// Accept a video plus authorship metadata and return links to the signed
/// result.
pub async fn sign_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<SignResponse>> {
    let SignForm {
        job,
        organization,
        ai_tool,
        title,
        description,
    } = read_form(&state, multipart).await?;

    let mut job = job.ok_or(Error::MissingField("video"))?;
    let request = match build_request(organization, ai_tool, title, description) {
        Ok(request) => request,
        Err(e) => {
            job.cleanup().await;
            return Err(e.into());
        }
    };

    let signed = state.orchestrator.sign(job, request).await?;
    tracing::info!(
        job_id = %signed.job_id,
        video = %signed.video_filename,
        degraded = signed.is_degraded(),
        "Signing request completed"
    );

    Ok(Json(SignResponse::new(&state, signed)))
}

fn build_request(
    organization: Option<String>,
    ai_tool: Option<String>,
    title: Option<String>,
    description: Option<String>,
) -> credseal_core::Result<SigningRequest> {
    let organization = organization.ok_or(Error::MissingField("organization"))?;
    let ai_tool = ai_tool.ok_or(Error::MissingField("ai_tool"))?;
    SigningRequest::new(
        &organization,
        &ai_tool,
        title.as_deref(),
        description.as_deref(),
    )
}

/// Drain the multipart body. A partially streamed upload is cleaned up
/// before the error is returned.
async fn read_form(state: &AppState, mut multipart: Multipart) -> ApiResult<SignForm> {
    let mut form = SignForm::default();

    if let Err(e) = read_fields(state, &mut multipart, &mut form).await {
        if let Some(job) = form.job.as_mut() {
            job.cleanup().await;
        }
        return Err(e);
    }

    Ok(form)
}

/// The video is streamed straight to the job's input path; a disallowed
/// extension is rejected before anything is written. The job is registered
/// on the form before the first byte lands so a failed stream is cleaned up.
async fn read_fields(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut SignForm,
) -> ApiResult<()> {
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let job = state.orchestrator.open_job(&filename)?;
                let input_path = job.input_path.clone();
                if let Some(mut previous) = form.job.replace(job) {
                    previous.cleanup().await;
                }

                let mut file = tokio::fs::File::create(&input_path)
                    .await
                    .map_err(Error::from)?;
                while let Some(chunk) = field.chunk().await? {
                    file.write_all(&chunk).await.map_err(Error::from)?;
                }
                file.flush().await.map_err(Error::from)?;
            }
            "organization" => form.organization = Some(field.text().await?),
            "ai_tool" => form.ai_tool = Some(field.text().await?),
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(())
}
