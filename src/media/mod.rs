use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

pub const AUDIO_BITRATE: &str = "128k";
pub const TARGET_HEIGHT: u32 = 720;
pub const VIDEO_CRF: &str = "28";
pub const VIDEO_PRESET: &str = "veryfast";

// keep the end of stderr, that's where ffmpeg reports the actual failure
const STDERR_TAIL_CHARS: usize = 2000;

/// Local media transcoding. Both operations resolve only once the
/// underlying process has exited.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn extract_audio(&self, source: &Path, dest: &Path) -> Result<PathBuf>;
    async fn compress_video(&self, source: &Path, dest: &Path) -> Result<PathBuf>;
}

pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    async fn run(&self, action: &'static str, source: &Path, args: Vec<OsString>) -> Result<()> {
        debug!("Running {} {:?}", self.binary.display(), args);

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PipelineError::Transcode {
                action,
                path: source.to_path_buf(),
                reason: format!("failed to execute {}: {}", self.binary.display(), e),
            })?;

        if !output.status.success() {
            return Err(PipelineError::Transcode {
                action,
                path: source.to_path_buf(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    output.status,
                    stderr_tail(&output.stderr)
                ),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_audio(&self, source: &Path, dest: &Path) -> Result<PathBuf> {
        info!("Extracting audio from {}", source.display());
        self.run("extract audio from", source, extract_audio_args(source, dest))
            .await?;
        info!("Audio extracted: {}", dest.display());
        Ok(dest.to_path_buf())
    }

    async fn compress_video(&self, source: &Path, dest: &Path) -> Result<PathBuf> {
        info!("Compressing {} to {}p", source.display(), TARGET_HEIGHT);
        self.run("compress", source, compress_video_args(source, dest))
            .await?;
        info!("Compressed video ready: {}", dest.display());
        Ok(dest.to_path_buf())
    }
}

/// Audio only, fixed bitrate, overwrite.
pub fn extract_audio_args(source: &Path, dest: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        source.into(),
        "-vn".into(),
        "-ab".into(),
        AUDIO_BITRATE.into(),
        "-y".into(),
        dest.into(),
    ]
}

/// 720p with even auto width, x264 at a fixed CRF, AAC audio.
pub fn compress_video_args(source: &Path, dest: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        source.into(),
        "-vf".into(),
        format!("scale=-2:{}", TARGET_HEIGHT).into(),
        "-c:v".into(),
        "libx264".into(),
        "-crf".into(),
        VIDEO_CRF.into(),
        "-preset".into(),
        VIDEO_PRESET.into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        AUDIO_BITRATE.into(),
        "-y".into(),
        dest.into(),
    ]
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}
