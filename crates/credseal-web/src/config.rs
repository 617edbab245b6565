use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use credseal_core::{SigningConfig, ToolConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base for the download links handed back to clients
    pub public_url: String,
    pub signing: SigningConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: "http://localhost:8000".to_string(),
            signing: SigningConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment, after loading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SigningConfig::default();
        let tool_defaults = ToolConfig::default();

        let port = parse(&lookup, "PORT", 8000)?;
        let public_url = lookup("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let tool = ToolConfig {
            program: lookup("C2PATOOL_PATH").map_or(tool_defaults.program, PathBuf::from),
            launcher_args: Vec::new(),
            working_dir: lookup("C2PATOOL_WORKDIR").map(PathBuf::from),
            sign_timeout: Duration::from_secs(parse(
                &lookup,
                "SIGN_TIMEOUT_SECS",
                tool_defaults.sign_timeout.as_secs(),
            )?),
            extract_timeout: Duration::from_secs(parse(
                &lookup,
                "EXTRACT_TIMEOUT_SECS",
                tool_defaults.extract_timeout.as_secs(),
            )?),
        };

        let signing = SigningConfig {
            app_name: lookup("APP_NAME").unwrap_or(defaults.app_name),
            app_version: lookup("APP_VERSION").unwrap_or(defaults.app_version),
            upload_dir: lookup("UPLOAD_DIR").map_or(defaults.upload_dir, PathBuf::from),
            manifest_dir: lookup("MANIFEST_DIR").map_or(defaults.manifest_dir, PathBuf::from),
            cert_path: lookup("CERT_PATH").map_or(defaults.cert_path, PathBuf::from),
            private_key_path: lookup("PRIVATE_KEY_PATH")
                .map_or(defaults.private_key_path, PathBuf::from),
            signing_alg: lookup("SIGNING_ALG").unwrap_or(defaults.signing_alg),
            max_file_size_mb: parse(&lookup, "MAX_FILE_SIZE_MB", defaults.max_file_size_mb)?,
            tool,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            public_url,
            signing,
        })
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
