use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Container extensions accepted for signing, lowercase with leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".mp4", ".mov", ".m4v"];

/// How to launch the external signing tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Binary name or path (default: `c2patool`)
    pub program: PathBuf,
    /// Arguments placed before the tool's own, for wrappers such as `sh script`
    /// or a container runner
    #[serde(default)]
    pub launcher_args: Vec<String>,
    /// Directory the tool runs in. Defaults to the manifest directory, which
    /// is where key material referenced by name is expected to live.
    pub working_dir: Option<PathBuf>,
    /// Hard limit for the signing invocation
    pub sign_timeout: Duration,
    /// Hard limit for the manifest extraction/verification invocation
    pub extract_timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("c2patool"),
            launcher_args: Vec::new(),
            working_dir: None,
            sign_timeout: Duration::from_secs(300),
            extract_timeout: Duration::from_secs(60),
        }
    }
}

/// Everything the signing pipeline needs, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    pub app_name: String,
    pub app_version: String,
    /// Temporary uploads, signed videos and extracted manifests
    pub upload_dir: PathBuf,
    /// Ephemeral manifest descriptors
    pub manifest_dir: PathBuf,
    pub cert_path: PathBuf,
    pub private_key_path: PathBuf,
    /// Signing algorithm identifier written into every descriptor
    pub signing_alg: String,
    pub max_file_size_mb: u64,
    pub tool: ToolConfig,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            app_name: "C2PA Video Signing Service".to_string(),
            app_version: "1.0.0".to_string(),
            upload_dir: PathBuf::from("./files"),
            manifest_dir: PathBuf::from("./manifests"),
            cert_path: PathBuf::from("./certificates/certificate.pem"),
            private_key_path: PathBuf::from("./certificates/private_key.pem"),
            signing_alg: "es256".to_string(),
            max_file_size_mb: 500,
            tool: ToolConfig::default(),
        }
    }
}

impl SigningConfig {
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// `"<app name>/<version>"`, recorded as the claim generator
    pub fn claim_generator(&self) -> String {
        format!("{}/{}", self.app_name, self.app_version)
    }

    /// Directory the signing tool is launched from
    pub fn tool_working_dir(&self) -> &Path {
        self.tool
            .working_dir
            .as_deref()
            .unwrap_or(&self.manifest_dir)
    }

    /// Create the working directories and resolve every path to an absolute
    /// one, so descriptors and tool arguments stay valid regardless of the
    /// tool's working directory.
    pub fn prepare(mut self) -> Result<Self> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.manifest_dir)?;
        self.upload_dir = self.upload_dir.canonicalize()?;
        self.manifest_dir = self.manifest_dir.canonicalize()?;

        self.cert_path = canonical_credential(&self.cert_path)?;
        self.private_key_path = canonical_credential(&self.private_key_path)?;

        if let Some(dir) = &self.tool.working_dir {
            self.tool.working_dir = Some(dir.canonicalize()?);
        }

        Ok(self)
    }
}

fn canonical_credential(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(Error::MissingCredential(path.to_path_buf()));
    }
    Ok(path.canonicalize()?)
}
