use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt::Display;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{ErrorKind, PipelineError};
use crate::storage::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    Setup,
    PersistUpload,
    ExtractAudio,
    UploadAudio,
    AwaitReady,
    Transcribe,
    NormalizeTranscription,
    Summarize,
    NormalizeSummary,
    CompressVideo,
    Done,
}

impl Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed(String),
}

/// One processing request, mutated in place as stages complete.
#[derive(Debug, Clone)]
pub struct Job {
    pub run_id: Uuid,
    pub filename: String,
    pub raw_path: PathBuf,
    pub audio_path: PathBuf,
    pub compressed_path: PathBuf,
    pub stage: JobStage,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(filename: &str, store: &ArtifactStore) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            filename: filename.to_string(),
            raw_path: store.raw_path(filename),
            audio_path: store.audio_path(filename),
            compressed_path: store.compressed_path(filename),
            stage: JobStage::Setup,
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn enter(&mut self, stage: JobStage) {
        self.stage = stage;
    }

    /// Wraps `source` as a failure of the current stage.
    pub fn failure(&self, source: impl Into<PipelineError>) -> StageFailure {
        StageFailure {
            stage: self.stage,
            source: source.into(),
        }
    }

    pub fn succeed(&mut self) {
        self.stage = JobStage::Done;
        self.status = JobStatus::Succeeded;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, failure: &StageFailure) {
        self.status = JobStatus::Failed(failure.to_string());
        self.finished_at = Some(Utc::now());
    }

    /// Failure detail once the job has failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Failed(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}

/// Terminal failure of a job: the stage that failed and why.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct StageFailure {
    pub stage: JobStage,
    #[source]
    pub source: PipelineError,
}

impl StageFailure {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Message safe to hand to an untrusted caller.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Configuration => {
                "Server configuration error: the inference service is not configured".to_string()
            }
            _ => format!("Video processing failed at stage {}", self.stage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySection {
    pub title: String,
    // total seconds, as instructed by the summary prompt
    pub start: f64,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    #[serde(default)]
    pub sections: Vec<SummarySection>,
    #[serde(default, rename = "keyPoints")]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub video_id: String,
    pub title: String,
    pub video_url: String,
    pub transcription: TranscriptionResult,
    pub summary: SummaryResult,
}
