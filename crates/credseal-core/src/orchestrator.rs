//! Signing request lifecycle.
//!
//! `open_job` validates the upload name and allocates the job's paths; the
//! caller streams the upload to [`SigningJob::input_path`]; `sign` then runs
//! size check → descriptor → signing → best-effort extraction, followed by the
//! job's cleanup pass on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::SigningConfig;
use crate::job::SigningJob;
use crate::manifest::{ManifestBuilder, ManifestDescriptor};
use crate::request::{validate_extension, SigningRequest};
use crate::tool::{SigningResult, SigningTool};
use crate::{Error, Result};

/// Outcome of a best-effort pipeline step.
#[derive(Debug)]
pub enum StepOutcome<T> {
    Succeeded(T),
    /// The step failed but the request can still complete.
    Degraded(String),
    /// A precondition of the step did not hold; the request fails.
    Failed(Error),
}

/// A completed signing, ready to be reported.
#[derive(Debug, Clone)]
pub struct SignedVideo {
    pub job_id: Uuid,
    pub original_filename: String,
    pub file_size_bytes: u64,
    pub signed_at: DateTime<Utc>,
    pub video_filename: String,
    /// `None` when extraction was degraded
    pub manifest_filename: Option<String>,
    pub manifest_error: Option<String>,
    pub request: SigningRequest,
}

impl SignedVideo {
    pub fn file_size_mb(&self) -> f64 {
        let mb = self.file_size_bytes as f64 / (1024.0 * 1024.0);
        (mb * 100.0).round() / 100.0
    }

    pub const fn is_degraded(&self) -> bool {
        self.manifest_filename.is_none()
    }
}

pub struct Orchestrator {
    config: Arc<SigningConfig>,
    manifests: ManifestBuilder,
    tool: Arc<dyn SigningTool>,
}

impl Orchestrator {
    pub fn new(config: Arc<SigningConfig>, tool: Arc<dyn SigningTool>) -> Self {
        let manifests = ManifestBuilder::new(config.manifest_dir.clone());
        Self {
            config,
            manifests,
            tool,
        }
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    pub fn tool(&self) -> &dyn SigningTool {
        self.tool.as_ref()
    }

    /// Reject disallowed extensions before anything touches the disk.
    pub fn open_job(&self, original_filename: &str) -> Result<SigningJob> {
        let extension = validate_extension(original_filename)?;
        let job = SigningJob::new(&self.config.upload_dir, original_filename, &extension);
        tracing::info!(job_id = %job.job_id, filename = original_filename, "Opened signing job");
        Ok(job)
    }

    /// Run the job to completion. `job` is consumed and cleaned up before
    /// this returns, whatever the outcome.
    pub async fn sign(&self, mut job: SigningJob, request: SigningRequest) -> Result<SignedVideo> {
        let result = self.run(&mut job, request).await;
        job.cleanup().await;
        result
    }

    async fn run(&self, job: &mut SigningJob, request: SigningRequest) -> Result<SignedVideo> {
        let file_size_bytes = self.check_upload(job).await?;

        let descriptor = ManifestDescriptor::build(&self.config, &request, Utc::now());
        let descriptor_path = self.manifests.write(&descriptor).await?;
        job.track_temp(&descriptor_path);
        job.manifest_descriptor_path = Some(descriptor_path.clone());

        match self.sign_step(job, &descriptor_path).await {
            Ok(path) => {
                tracing::info!(job_id = %job.job_id, output = %path.display(), "Video signed");
            }
            Err(e) => {
                tracing::error!(job_id = %job.job_id, error = %e, "Signing failed");
                return Err(e);
            }
        }

        let (manifest_filename, manifest_error) = match self.extract_step(job).await {
            StepOutcome::Succeeded(_) => (Some(job.manifest_filename()), None),
            StepOutcome::Degraded(reason) => {
                tracing::warn!(job_id = %job.job_id, reason = %reason, "Manifest extraction degraded");
                (None, Some(reason))
            }
            StepOutcome::Failed(e) => {
                tracing::error!(job_id = %job.job_id, error = %e, "Signed video unusable");
                return Err(e);
            }
        };

        job.commit();

        Ok(SignedVideo {
            job_id: job.job_id,
            original_filename: job.original_filename.clone(),
            file_size_bytes,
            signed_at: Utc::now(),
            video_filename: job.video_filename(),
            manifest_filename,
            manifest_error,
            request,
        })
    }

    async fn check_upload(&self, job: &SigningJob) -> Result<u64> {
        let size = tokio::fs::metadata(&job.input_path).await?.len();
        if size == 0 {
            return Err(Error::EmptyUpload);
        }
        if size > self.config.max_file_size_bytes() {
            return Err(Error::FileTooLarge {
                size_mb: size as f64 / (1024.0 * 1024.0),
                max_mb: self.config.max_file_size_mb,
            });
        }
        Ok(size)
    }

    async fn sign_step(&self, job: &mut SigningJob, descriptor: &Path) -> Result<PathBuf> {
        let output = job.output_video_path.clone();
        job.track_output(&output);

        match self.tool.sign(&job.input_path, &output, descriptor).await {
            SigningResult::Success { output_path, .. } => Ok(output_path),
            SigningResult::Failure { error, .. } => Err(Error::SigningFailed(error)),
            SigningResult::Timeout { limit } => Err(Error::SigningTimedOut(limit)),
        }
    }

    /// Extraction needs a non-empty signed video; without one the request
    /// fails. Any failure of the extraction itself only degrades it.
    async fn extract_step(&self, job: &mut SigningJob) -> StepOutcome<PathBuf> {
        match tokio::fs::metadata(&job.output_video_path).await {
            Ok(metadata) if metadata.len() > 0 => {}
            _ => {
                return StepOutcome::Failed(Error::SigningFailed(
                    "Signed video file was not created or is empty".to_string(),
                ))
            }
        }

        let output = job.output_manifest_path.clone();
        job.track_output(&output);

        let result = self.tool.extract(&job.output_video_path, &output).await;
        if let SigningResult::Success { output_path, .. } = result {
            return StepOutcome::Succeeded(output_path);
        }

        job.discard(&output).await;
        StepOutcome::Degraded(result.error().unwrap_or_default())
    }
}
