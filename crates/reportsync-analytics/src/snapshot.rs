use std::path::Path;

use crate::error::AnalyticsError;

/// Overwrite `path` with the raw report bytes, creating the parent directory
/// when needed.
///
/// # Errors
///
/// Returns [`AnalyticsError::Snapshot`] if the directory or file cannot be written.
pub async fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), AnalyticsError> {
    let to_err = |source| AnalyticsError::Snapshot {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(to_err)?;
    }
    tokio::fs::write(path, bytes).await.map_err(to_err)?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote report snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("report.csv");

        write_snapshot(&path, b"a,b\n1,2\n3,4\n").await.unwrap();
        write_snapshot(&path, b"a,b\n9,9\n").await.unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, b"a,b\n9,9\n");
    }

    #[tokio::test]
    async fn unwritable_path_is_a_snapshot_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory cannot be overwritten as a file.
        let err = write_snapshot(dir.path(), b"x").await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Snapshot { .. }), "got: {err:?}");
    }
}
