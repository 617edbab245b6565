//! The external C2PA tool, behind a narrow seam.
//!
//! [`SigningTool`] has one method per tool mode. [`C2paTool`] drives the real
//! binary as a subprocess; tests substitute scripted implementations.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::ToolConfig;

/// Maximum stdout or stderr captured per stream (16 MiB).
const MAX_OUTPUT_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("Command failed with exit code {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
    #[error("Command timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Output from a finished tool process
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningResult {
    /// Exited zero and produced a non-empty file at `output_path`.
    Success {
        output_path: PathBuf,
        stdout: String,
        stderr: String,
    },
    /// Non-zero exit, missing/empty output, or the process could not run.
    Failure {
        error: String,
        stdout: String,
        stderr: String,
    },
    /// Killed after exceeding `limit`.
    Timeout { limit: Duration },
}

impl SigningResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            Self::Success { output_path, .. } => Some(output_path),
            _ => None,
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            Self::Success { stdout, .. } | Self::Failure { stdout, .. } => stdout,
            Self::Timeout { .. } => "",
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            Self::Success { stderr, .. } | Self::Failure { stderr, .. } => stderr,
            Self::Timeout { .. } => "",
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error.clone()),
            Self::Timeout { limit } => Some(format!("timed out after {}s", limit.as_secs())),
        }
    }

    fn failure(error: impl Into<String>, output: Option<&CommandOutput>) -> Self {
        Self::Failure {
            error: error.into(),
            stdout: output.map(|o| o.stdout.clone()).unwrap_or_default(),
            stderr: output.map(|o| o.stderr.clone()).unwrap_or_default(),
        }
    }
}

/// Result of inspecting a signed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait SigningTool: Send + Sync {
    /// Embed the manifest described at `manifest` into `input`, writing `output`.
    async fn sign(&self, input: &Path, output: &Path, manifest: &Path) -> SigningResult;

    /// Read the manifest embedded in `signed` and persist it at `output`.
    async fn extract(&self, signed: &Path, output: &Path) -> SigningResult;

    /// Check the signature embedded in `signed`.
    async fn verify(&self, signed: &Path) -> VerificationReport;
}

/// Spawn `cmd`, capture both streams and enforce `timeout`.
///
/// The child is killed when the timeout fires.
pub async fn run_tool(cmd: &mut Command, timeout: Duration) -> ToolResult<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            ToolError::CommandNotFound(cmd.as_std().get_program().to_string_lossy().into_owned())
        }
        _ => ToolError::Io(e),
    })?;

    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status?,
        Err(_elapsed) => {
            let _ = child.kill().await;
            return Err(ToolError::Timeout(timeout));
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    Ok(CommandOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}

/// `c2patool` driven as a subprocess
#[derive(Debug, Clone)]
pub struct C2paTool {
    config: ToolConfig,
    working_dir: PathBuf,
}

impl C2paTool {
    pub fn new(config: ToolConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            working_dir: working_dir.into(),
        }
    }

    fn build_command<I, A>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.launcher_args)
            .args(args)
            .current_dir(&self.working_dir);
        cmd
    }

    /// Confirm the tool can be found and answers `--version`; returns the
    /// version line it prints.
    pub async fn preflight(&self) -> ToolResult<String> {
        if self.config.launcher_args.is_empty() {
            which::which(&self.config.program).map_err(|_| {
                ToolError::CommandNotFound(self.config.program.to_string_lossy().into_owned())
            })?;
        }

        let mut cmd = self.build_command(["--version"]);
        let output = run_tool(&mut cmd, self.config.extract_timeout).await?;
        if !output.status.success() {
            return Err(ToolError::CommandFailed {
                code: output.status.code(),
                stderr: output.stderr,
            });
        }

        Ok(output.stdout.trim().to_string())
    }

    async fn inspect(&self, signed: &Path) -> ToolResult<CommandOutput> {
        let mut cmd = self.build_command([signed.as_os_str(), OsStr::new("--info")]);
        run_tool(&mut cmd, self.config.extract_timeout).await
    }
}

#[async_trait]
impl SigningTool for C2paTool {
    async fn sign(&self, input: &Path, output: &Path, manifest: &Path) -> SigningResult {
        let mut cmd = self.build_command([
            OsStr::new("-m"),
            manifest.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
            OsStr::new("-f"),
            input.as_os_str(),
        ]);
        tracing::debug!(command = ?cmd.as_std(), "Running signing tool");

        let result = match run_tool(&mut cmd, self.config.sign_timeout).await {
            Ok(result) => result,
            Err(ToolError::Timeout(limit)) => return SigningResult::Timeout { limit },
            Err(e) => return SigningResult::failure(e.to_string(), None),
        };

        if !result.status.success() {
            let error = if result.stderr.trim().is_empty() {
                format!("exited with {}", result.status)
            } else {
                result.stderr.trim().to_string()
            };
            return SigningResult::failure(error, Some(&result));
        }

        let written = tokio::fs::metadata(output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return SigningResult::failure(
                "Signed video file was not created or is empty",
                Some(&result),
            );
        }

        SigningResult::Success {
            output_path: output.to_path_buf(),
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }

    async fn extract(&self, signed: &Path, output: &Path) -> SigningResult {
        let result = match self.inspect(signed).await {
            Ok(result) => result,
            Err(ToolError::Timeout(limit)) => return SigningResult::Timeout { limit },
            Err(e) => return SigningResult::failure(e.to_string(), None),
        };

        if !result.status.success() {
            return SigningResult::failure(result.stderr.trim().to_string(), Some(&result));
        }
        if result.stdout.trim().is_empty() {
            return SigningResult::failure("No manifest data reported", Some(&result));
        }

        if let Err(e) = tokio::fs::write(output, result.stdout.as_bytes()).await {
            return SigningResult::failure(
                format!("Failed to write {}: {e}", output.display()),
                Some(&result),
            );
        }

        SigningResult::Success {
            output_path: output.to_path_buf(),
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }

    async fn verify(&self, signed: &Path) -> VerificationReport {
        match self.inspect(signed).await {
            Ok(output) if output.status.success() => VerificationReport {
                valid: true,
                message: "Video signature is valid".to_string(),
                info: Some(output.stdout),
                error: None,
            },
            Ok(output) => VerificationReport {
                valid: false,
                message: "Video signature verification failed".to_string(),
                info: None,
                error: Some(output.stderr.trim().to_string()),
            },
            Err(e) => VerificationReport {
                valid: false,
                message: "Verification process failed".to_string(),
                info: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A stand-in for c2patool, run through `sh` so nothing needs an exec bit.
    fn scripted_tool(dir: &TempDir, body: &str, timeout: Duration) -> C2paTool {
        let script = dir.path().join("fake-c2patool.sh");
        std::fs::write(&script, body).unwrap();
        let config = ToolConfig {
            program: PathBuf::from("sh"),
            launcher_args: vec![script.to_string_lossy().into_owned()],
            working_dir: None,
            sign_timeout: timeout,
            extract_timeout: timeout,
        };
        C2paTool::new(config, dir.path())
    }

    // Arguments arrive as: -m <manifest> -o <output> -f <input>
    const COPYING_SIGNER: &str = r#"cp "$6" "$4""#;

    fn input_video(dir: &TempDir) -> PathBuf {
        let input = dir.path().join("input.mp4");
        std::fs::write(&input, b"not really a video").unwrap();
        input
    }

    #[tokio::test]
    async fn test_sign_success_requires_output() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(&tmp, COPYING_SIGNER, Duration::from_secs(10));
        let input = input_video(&tmp);
        let output = tmp.path().join("signed.mp4");

        let result = tool.sign(&input, &output, &tmp.path().join("m.json")).await;

        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.output_path(), Some(output.as_path()));
        assert_eq!(std::fs::read(&output).unwrap(), b"not really a video");
    }

    #[tokio::test]
    async fn test_sign_exit_zero_without_output_is_failure() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(&tmp, "exit 0", Duration::from_secs(10));
        let input = input_video(&tmp);
        let output = tmp.path().join("signed.mp4");

        let result = tool.sign(&input, &output, &tmp.path().join("m.json")).await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("not created or is empty"));
    }

    #[tokio::test]
    async fn test_sign_empty_output_is_failure() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(&tmp, r#": > "$4""#, Duration::from_secs(10));
        let input = input_video(&tmp);
        let output = tmp.path().join("signed.mp4");

        let result = tool.sign(&input, &output, &tmp.path().join("m.json")).await;

        assert!(output.exists());
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_sign_nonzero_exit_carries_stderr() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(
            &tmp,
            "echo 'certificate expired' >&2; exit 3",
            Duration::from_secs(10),
        );
        let input = input_video(&tmp);

        let result = tool
            .sign(&input, &tmp.path().join("out.mp4"), &tmp.path().join("m.json"))
            .await;

        assert_eq!(result.error().as_deref(), Some("certificate expired"));
        assert!(result.stderr().contains("certificate expired"));
    }

    #[tokio::test]
    async fn test_sign_timeout() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(&tmp, "sleep 5", Duration::from_millis(200));
        let input = input_video(&tmp);

        let result = tool
            .sign(&input, &tmp.path().join("out.mp4"), &tmp.path().join("m.json"))
            .await;

        assert_eq!(
            result,
            SigningResult::Timeout {
                limit: Duration::from_millis(200)
            }
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_failure() {
        let tmp = TempDir::new().unwrap();
        let config = ToolConfig {
            program: PathBuf::from("definitely-not-a-real-c2patool"),
            ..Default::default()
        };
        let tool = C2paTool::new(config, tmp.path());
        let input = input_video(&tmp);

        let result = tool
            .sign(&input, &tmp.path().join("out.mp4"), &tmp.path().join("m.json"))
            .await;
        assert!(result.error().unwrap().contains("Command not found"));

        assert!(matches!(
            tool.preflight().await,
            Err(ToolError::CommandNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_writes_stdout() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(
            &tmp,
            r#"[ "$2" = "--info" ] && echo '{"active_manifest":"urn:1"}'"#,
            Duration::from_secs(10),
        );
        let signed = input_video(&tmp);
        let out = tmp.path().join("signed.manifest.json");

        let result = tool.extract(&signed, &out).await;

        assert!(result.is_success(), "{result:?}");
        assert!(std::fs::read_to_string(&out).unwrap().contains("urn:1"));
    }

    #[tokio::test]
    async fn test_extract_without_output_is_failure() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(&tmp, "exit 0", Duration::from_secs(10));
        let signed = input_video(&tmp);
        let out = tmp.path().join("signed.manifest.json");

        let result = tool.extract(&signed, &out).await;

        assert!(!result.is_success());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_verify_reports_validity() {
        let tmp = TempDir::new().unwrap();
        let signed = input_video(&tmp);

        let ok = scripted_tool(&tmp, "echo 'Manifest store: 1 manifest'", Duration::from_secs(10));
        let report = ok.verify(&signed).await;
        assert!(report.valid);
        assert!(report.info.unwrap().contains("Manifest store"));

        let bad = scripted_tool(&tmp, "echo 'No claim found' >&2; exit 1", Duration::from_secs(10));
        let report = bad.verify(&signed).await;
        assert!(!report.valid);
        assert_eq!(report.error.as_deref(), Some("No claim found"));
    }

    #[tokio::test]
    async fn test_preflight_returns_version() {
        let tmp = TempDir::new().unwrap();
        let tool = scripted_tool(&tmp, "echo 'c2patool 0.9.12'", Duration::from_secs(10));
        assert_eq!(tool.preflight().await.unwrap(), "c2patool 0.9.12");
    }
}
