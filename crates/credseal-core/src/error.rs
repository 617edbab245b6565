use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// How an error should be reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unacceptable (400).
    Client,
    /// The requested path escapes the permitted directory (403).
    AccessDenied,
    /// The requested artifact does not exist (404).
    NotFound,
    /// Anything that went wrong on our side or in the signing tool (500).
    Server,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid file type '{extension}'. Allowed types: {}", allowed.join(", "))]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File too large ({size_mb:.1}MB). Maximum size: {max_mb}MB")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Uploaded file is empty")]
    EmptyUpload,

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Access denied")]
    AccessDenied,

    #[error("File not found")]
    FileNotFound,

    #[error("Failed to write manifest descriptor {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("c2patool failed: {0}")]
    SigningFailed(String),

    #[error("c2patool timed out after {}s", .0.as_secs())]
    SigningTimedOut(Duration),

    #[error("Signing tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Missing signing material: {0}")]
    MissingCredential(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidExtension { .. }
            | Self::FileTooLarge { .. }
            | Self::EmptyUpload
            | Self::InvalidField { .. }
            | Self::MissingField(_) => ErrorKind::Client,
            Self::AccessDenied => ErrorKind::AccessDenied,
            Self::FileNotFound => ErrorKind::NotFound,
            Self::ManifestWrite { .. }
            | Self::SigningFailed(_)
            | Self::SigningTimedOut(_)
            | Self::ToolUnavailable(_)
            | Self::MissingCredential(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Server,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_classified() {
        let err = Error::InvalidExtension {
            extension: ".avi".into(),
            allowed: vec![".mp4".into(), ".mov".into()],
        };
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(
            err.to_string(),
            "Invalid file type '.avi'. Allowed types: .mp4, .mov"
        );

        let err = Error::FileTooLarge {
            size_mb: 612.34,
            max_mb: 500,
        };
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(err.to_string(), "File too large (612.3MB). Maximum size: 500MB");
    }

    #[test]
    fn test_tool_errors_are_server_errors() {
        assert_eq!(
            Error::SigningFailed("bad cert".into()).kind(),
            ErrorKind::Server
        );
        let timeout = Error::SigningTimedOut(Duration::from_secs(300));
        assert_eq!(timeout.kind(), ErrorKind::Server);
        assert_eq!(timeout.to_string(), "c2patool timed out after 300s");
    }

    #[test]
    fn test_download_errors_classified() {
        assert_eq!(Error::AccessDenied.kind(), ErrorKind::AccessDenied);
        assert_eq!(Error::FileNotFound.kind(), ErrorKind::NotFound);
    }
}
