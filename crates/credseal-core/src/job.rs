use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

/// The files belonging to one signing request.
///
/// Every path the request creates is registered here as it is created.
/// [`SigningJob::cleanup`] removes temporary artifacts, plus outputs unless
/// the job was committed. Dropping a job that was never cleaned up (a
/// cancelled or panicking request) runs the same pass synchronously.
#[derive(Debug)]
pub struct SigningJob {
    pub job_id: Uuid,
    pub original_filename: String,
    pub input_path: PathBuf,
    pub output_video_path: PathBuf,
    pub output_manifest_path: PathBuf,
    pub manifest_descriptor_path: Option<PathBuf>,
    temporary: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    committed: bool,
}

impl SigningJob {
    /// Derive every path for a new job from a fresh UUID and the current time.
    /// The upload itself is registered as temporary straight away.
    pub fn new(upload_dir: &Path, original_filename: &str, extension: &str) -> Self {
        let job_id = Uuid::new_v4();
        let base = format!(
            "video-signed-{}-{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            job_id.simple()
        );

        let input_path = upload_dir.join(format!("temp_{job_id}{extension}"));

        Self {
            job_id,
            original_filename: original_filename.to_string(),
            output_video_path: upload_dir.join(format!("{base}{extension}")),
            output_manifest_path: upload_dir.join(format!("{base}.manifest.json")),
            manifest_descriptor_path: None,
            temporary: vec![input_path.clone()],
            input_path,
            outputs: Vec::new(),
            committed: false,
        }
    }

    /// Register a file that must not outlive the request.
    pub fn track_temp(&mut self, path: impl Into<PathBuf>) {
        self.temporary.push(path.into());
    }

    /// Register a file that survives only if the job is committed.
    pub fn track_output(&mut self, path: impl Into<PathBuf>) {
        self.outputs.push(path.into());
    }

    /// Remove an output now and stop tracking it.
    pub async fn discard(&mut self, path: &Path) {
        self.outputs.retain(|p| p != path);
        remove_artifact(self.job_id, path).await;
    }

    /// Keep the registered outputs. Temporary files are still removed.
    pub fn commit(&mut self) {
        self.committed = true;
    }

    pub fn video_filename(&self) -> String {
        file_name(&self.output_video_path)
    }

    pub fn manifest_filename(&self) -> String {
        file_name(&self.output_manifest_path)
    }

    /// Run the cleanup pass. Removal failures are logged, never returned.
    pub async fn cleanup(&mut self) {
        for path in self.pending_removals() {
            remove_artifact(self.job_id, &path).await;
        }
    }

    fn pending_removals(&mut self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.temporary.drain(..).collect();
        if self.committed {
            self.outputs.clear();
        } else {
            paths.append(&mut self.outputs);
        }
        paths
    }
}

impl Drop for SigningJob {
    fn drop(&mut self) {
        for path in self.pending_removals() {
            log_removal(self.job_id, &path, std::fs::remove_file(&path));
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn remove_artifact(job_id: Uuid, path: &Path) {
    log_removal(job_id, path, tokio::fs::remove_file(path).await);
}

fn log_removal(job_id: Uuid, path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(job_id = %job_id, path = %path.display(), "Removed artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            job_id = %job_id,
            path = %path.display(),
            error = %e,
            "Failed to remove artifact"
        ),
    }
}
