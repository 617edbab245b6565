use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Resolve an untrusted `filename` against `root`.
///
/// The joined path is canonicalized and must still live under the
/// canonicalized root; anything else is [`Error::AccessDenied`]. Names that
/// cannot be resolved at all (missing, malformed, too long), or that resolve
/// to something other than a regular file, are [`Error::FileNotFound`].
pub async fn resolve_download(root: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(Error::FileNotFound);
    }

    let candidate = root.join(filename);
    let resolved = match tokio::fs::canonicalize(&candidate).await {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(filename, error = %e, "Download name did not resolve");
            return Err(Error::FileNotFound);
        }
    };
    let allowed = tokio::fs::canonicalize(root).await?;

    if !resolved.starts_with(&allowed) {
        tracing::warn!(filename, resolved = %resolved.display(), "Rejected download outside output directory");
        return Err(Error::AccessDenied);
    }

    match tokio::fs::metadata(&resolved).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return Err(Error::FileNotFound),
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let files = tmp.path().join("files");
        std::fs::create_dir(&files).unwrap();
        std::fs::write(files.join("video-signed-1.mp4"), b"signed").unwrap();
        std::fs::write(tmp.path().join("secret.txt"), b"secret").unwrap();
        (tmp, files)
    }

    #[tokio::test]
    async fn test_resolves_existing_file() {
        let (_tmp, files) = layout();
        let path = resolve_download(&files, "video-signed-1.mp4").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"signed");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_tmp, files) = layout();
        let err = resolve_download(&files, "nope.mp4").await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound));
    }

    #[tokio::test]
    async fn test_traversal_is_denied() {
        let (_tmp, files) = layout();
        let err = resolve_download(&files, "../secret.txt").await.unwrap_err();
        assert!(matches!(err, Error::AccessDenied));

        let err = resolve_download(&files, "../../../../../../etc/passwd")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccessDenied | Error::FileNotFound));
    }

    #[tokio::test]
    async fn test_absolute_path_is_denied() {
        let (tmp, files) = layout();
        let secret = tmp.path().join("secret.txt");
        let err = resolve_download(&files, &secret.to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccessDenied));
    }

    #[tokio::test]
    async fn test_directories_are_not_served() {
        let (_tmp, files) = layout();
        assert!(matches!(
            resolve_download(&files, ".").await,
            Err(Error::FileNotFound)
        ));
        assert!(matches!(
            resolve_download(&files, "").await,
            Err(Error::FileNotFound)
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_names_are_not_found() {
        let (_tmp, files) = layout();
        let long_name = "a".repeat(300);

        for name in ["video-signed-1.mp4/x", "a\0b", long_name.as_str()] {
            let err = resolve_download(&files, name).await.unwrap_err();
            assert!(matches!(err, Error::FileNotFound), "{name:?} -> {err}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_denied() {
        let (tmp, files) = layout();
        std::os::unix::fs::symlink(tmp.path().join("secret.txt"), files.join("link.txt")).unwrap();

        let err = resolve_download(&files, "link.txt").await.unwrap_err();
        assert!(matches!(err, Error::AccessDenied));
    }
}
