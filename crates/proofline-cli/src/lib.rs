//! Helpers shared by the `proofline` binary.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use proofline_core::{UploadFile, UploadProgress};
use serde::Serialize;

/// Content type for a photo file, from its extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read a file from disk into an [`UploadFile`].
///
/// Unknown extensions get `application/octet-stream`, which validation rejects
/// with a per-file error instead of aborting the batch.
pub async fn load_upload_file(path: &Path) -> Result<UploadFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = content_type_for_path(path).unwrap_or("application/octet-stream");

    Ok(UploadFile::new(file_name, content_type, Bytes::from(data)))
}

/// One progress line, e.g. `[2/5] 40% group.png`.
pub fn format_progress(progress: &UploadProgress) -> String {
    format!(
        "[{}/{}] {:>3}% {}",
        progress.completed,
        progress.total,
        (progress.overall_progress * 100.0).round() as u32,
        progress.current_file_name
    )
}

pub fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays parseable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(
            content_type_for_path(&PathBuf::from("a/B.JPG")),
            Some("image/jpeg")
        );
        assert_eq!(
            content_type_for_path(&PathBuf::from("x.webp")),
            Some("image/webp")
        );
        assert_eq!(content_type_for_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(content_type_for_path(&PathBuf::from("noext")), None);
    }

    #[tokio::test]
    async fn loads_file_with_guessed_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.png");
        tokio::fs::write(&path, b"fake").await.unwrap();

        let file = load_upload_file(&path).await.unwrap();
        assert_eq!(file.file_name, "group.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size(), 4);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_upload_file(&dir.path().join("gone.jpg"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gone.jpg"));
    }

    #[test]
    fn progress_line_shows_percentage() {
        let progress = UploadProgress {
            current_index: 1,
            current_file_name: "b.jpg".to_string(),
            uploaded_ids: vec![Uuid::new_v4()],
            completed: 2,
            total: 5,
            overall_progress: 0.4,
        };
        assert_eq!(format_progress(&progress), "[2/5]  40% b.jpg");
    }
}
