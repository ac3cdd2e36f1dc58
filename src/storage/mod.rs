use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Upload body as it arrives from the client, chunk by chunk.
pub type UploadBody<'a> = BoxStream<'a, io::Result<Bytes>>;

/// Filesystem areas shared by every job: raw uploads, processed outputs and
/// the error log. Paths are keyed by the upload filename, so two concurrent
/// jobs with the same name write to the same files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    processed_dir: PathBuf,
    error_log: PathBuf,
}

impl ArtifactStore {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
        error_log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            processed_dir: processed_dir.into(),
            error_log: error_log.into(),
        }
    }

    pub async fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.upload_dir).await?;
        fs::create_dir_all(&self.processed_dir).await?;
        if let Some(parent) = self.error_log.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn error_log_path(&self) -> &Path {
        &self.error_log
    }

    pub fn raw_path(&self, filename: &str) -> PathBuf {
        self.upload_dir.join(filename)
    }

    pub fn audio_path(&self, filename: &str) -> PathBuf {
        self.processed_dir.join(format!("{}.mp3", filename))
    }

    pub fn compressed_name(filename: &str) -> String {
        format!("compressed_{}", filename)
    }

    pub fn compressed_path(&self, filename: &str) -> PathBuf {
        self.processed_dir.join(Self::compressed_name(filename))
    }

    /// Writes `body` into the raw upload area chunk by chunk and returns the
    /// written path. A body that breaks off midway leaves no file behind.
    pub async fn save_upload(&self, filename: &str, mut body: UploadBody<'_>) -> io::Result<PathBuf> {
        if !self.upload_dir.exists() {
            fs::create_dir_all(&self.upload_dir).await?;
        }

        let dest = self.raw_path(filename);
        let mut file = fs::File::create(&dest).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    if let Err(remove) = fs::remove_file(&dest).await {
                        warn!("Failed to remove partial upload {}: {}", dest.display(), remove);
                    }
                    return Err(e);
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("Saved upload {} ({} bytes)", dest.display(), written);
        Ok(dest)
    }

    /// Overwrites the error log; only the latest failure is kept.
    pub async fn record_failure(&self, detail: &str) -> io::Result<()> {
        fs::write(&self.error_log, detail).await
    }
}

/// Reduces a client supplied name to its final path component.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let candidate = name.rsplit(|c: char| c == '/' || c == '\\').next()?.trim();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return None;
    }
    Some(candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(
            dir.path().join("uploads"),
            dir.path().join("processed"),
            dir.path().join("backend_error.log"),
        )
    }

    #[test]
    fn test_artifact_layout() {
        let store = ArtifactStore::new("uploads", "processed", "backend_error.log");

        assert_eq!(store.raw_path("class.mkv"), PathBuf::from("uploads/class.mkv"));
        assert_eq!(store.audio_path("class.mkv"), PathBuf::from("processed/class.mkv.mp3"));
        assert_eq!(
            store.compressed_path("class.mkv"),
            PathBuf::from("processed/compressed_class.mkv")
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("class.mp4"), Some("class.mp4".to_string()));
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd".to_string()));
        assert_eq!(sanitize_filename("C:\\videos\\week 1.mkv"), Some("week 1.mkv".to_string()));
        assert_eq!(sanitize_filename("videos/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("   "), None);
    }

    #[tokio::test]
    async fn test_save_upload_streams_bytes() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.ensure_dirs().await?;

        let chunks = vec![
            Ok(Bytes::from_static(b"fake ")),
            Ok(Bytes::from_static(b"video ")),
            Ok(Bytes::from_static(b"bytes")),
        ];
        let path = store.save_upload("lesson.mp4", stream::iter(chunks).boxed()).await?;

        assert_eq!(path, dir.path().join("uploads/lesson.mp4"));
        assert_eq!(fs::read(&path).await?, b"fake video bytes");
        Ok(())
    }

    #[tokio::test]
    async fn test_broken_upload_leaves_no_file() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.ensure_dirs().await?;

        let chunks = vec![
            Ok(Bytes::from_static(b"first half")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ];
        let err = store
            .save_upload("lesson.mp4", stream::iter(chunks).boxed())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(!dir.path().join("uploads/lesson.mp4").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_failure_keeps_latest_only() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.ensure_dirs().await?;

        store.record_failure("first failure with a long detail").await?;
        store.record_failure("second").await?;

        let logged = fs::read_to_string(store.error_log_path()).await?;
        assert_eq!(logged, "second");
        Ok(())
    }
}
