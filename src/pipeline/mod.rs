use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use types::{
    Job, JobResult, JobStage, JobStatus, StageFailure, SummaryResult, SummarySection,
    TranscriptSegment, TranscriptionResult,
};

use crate::config::API_KEY_VAR;
use crate::error::PipelineError;
use crate::gemini::{self, prompts, InferenceClient, PollPolicy, ResponseFormat, AUDIO_MIME_TYPE};
use crate::media::Transcoder;
use crate::normalize;
use crate::storage::{sanitize_filename, ArtifactStore, UploadBody};

/// Mount point of the processed directory on the HTTP side.
pub const STATIC_PREFIX: &str = "/static";

/// Inference backend handed to the pipeline at construction.
#[derive(Clone)]
pub enum Inference {
    Ready(Arc<dyn InferenceClient>),
    Unconfigured,
}

pub struct Pipeline {
    store: ArtifactStore,
    transcoder: Arc<dyn Transcoder>,
    inference: Inference,
    poll: PollPolicy,
}

impl Pipeline {
    pub fn new(
        store: ArtifactStore,
        transcoder: Arc<dyn Transcoder>,
        inference: Inference,
        poll: PollPolicy,
    ) -> Self {
        Self {
            store,
            transcoder,
            inference,
            poll,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Runs one job end to end.
    ///
    /// On failure the full detail goes to the log and the error sink; the
    /// returned [`StageFailure`] still carries it, callers facing untrusted
    /// clients should only show [`StageFailure::public_message`].
    pub async fn process(
        &self,
        filename: &str,
        body: UploadBody<'_>,
    ) -> Result<JobResult, StageFailure> {
        let filename = sanitize_filename(filename).unwrap_or_default();
        let mut job = Job::new(&filename, &self.store);
        let span = info_span!("job", file = %job.filename, run = %job.run_id);

        async {
            info!("Starting processing for {}", job.filename);
            let outcome = self.run_stages(&mut job, body).await;

            match outcome {
                Ok(result) => {
                    job.succeed();
                    info!("Job finished in {} ms", job.elapsed_ms());
                    Ok(result)
                }
                Err(failure) => {
                    job.fail(&failure);
                    let detail = job.error().unwrap_or_default().to_string();
                    error!("Job failed after {} ms: {}", job.elapsed_ms(), detail);
                    if let Err(e) = self.store.record_failure(&detail).await {
                        warn!("Failed to write error log {}: {}", self.store.error_log_path().display(), e);
                    }
                    Err(failure)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        body: UploadBody<'_>,
    ) -> Result<JobResult, StageFailure> {
        let client = match &self.inference {
            Inference::Ready(client) => client.clone(),
            Inference::Unconfigured => {
                return Err(job.failure(PipelineError::Configuration(format!(
                    "missing {}, set it in the environment or the key file",
                    API_KEY_VAR
                ))));
            }
        };
        if job.filename.is_empty() {
            return Err(job.failure(PipelineError::Unexpected(
                "upload has no usable filename".to_string(),
            )));
        }

        job.enter(JobStage::PersistUpload);
        self.store
            .save_upload(&job.filename, body)
            .await
            .map_err(|e| job.failure(e))?;

        job.enter(JobStage::ExtractAudio);
        self.transcoder
            .extract_audio(&job.raw_path, &job.audio_path)
            .await
            .map_err(|e| job.failure(e))?;

        job.enter(JobStage::UploadAudio);
        let handle = client
            .upload(&job.audio_path, AUDIO_MIME_TYPE)
            .await
            .map_err(|e| job.failure(e))?;

        job.enter(JobStage::AwaitReady);
        let handle = gemini::await_ready(client.as_ref(), handle, &self.poll)
            .await
            .map_err(|e| job.failure(e))?;

        job.enter(JobStage::Transcribe);
        info!("Remote audio ready, transcribing");
        let raw_transcription = client
            .generate(prompts::TRANSCRIPTION_PROMPT, &handle, ResponseFormat::Json)
            .await
            .map_err(|e| job.failure(e))?;

        job.enter(JobStage::NormalizeTranscription);
        let transcription =
            normalize::normalize_transcription(&raw_transcription).map_err(|e| job.failure(e))?;

        job.enter(JobStage::Summarize);
        info!("Generating structured summary");
        let raw_summary = client
            .generate(prompts::SUMMARY_PROMPT, &handle, ResponseFormat::Json)
            .await
            .map_err(|e| job.failure(e))?;

        job.enter(JobStage::NormalizeSummary);
        let summary = normalize::normalize_summary(&raw_summary).map_err(|e| job.failure(e))?;

        // only spend transcoding time once both AI stages went through
        job.enter(JobStage::CompressVideo);
        self.transcoder
            .compress_video(&job.raw_path, &job.compressed_path)
            .await
            .map_err(|e| job.failure(e))?;

        Ok(JobResult {
            video_id: job.filename.clone(),
            title: job.filename.clone(),
            video_url: static_url(&ArtifactStore::compressed_name(&job.filename)),
            transcription,
            summary,
        })
    }
}

/// Public URL of a file in the processed directory.
pub fn static_url(name: &str) -> String {
    format!("{}/{}", STATIC_PREFIX, urlencoding::encode(name))
}
