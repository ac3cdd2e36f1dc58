use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

pub mod client;
pub mod prompts;
pub mod types;


pub use client::GeminiClient;
pub use types::{FileState, ModelInfo, RemoteFileHandle, ResponseFormat};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "models/gemini-3-flash-preview";
pub const AUDIO_MIME_TYPE: &str = "audio/mp3";

/// Remote inference service holding the uploaded audio.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFileHandle>;
    async fn get_file(&self, name: &str) -> Result<RemoteFileHandle>;
    async fn generate(
        &self,
        prompt: &str,
        file: &RemoteFileHandle,
        format: ResponseFormat,
    ) -> Result<String>;
}

/// Plain-text listing of `models`, one block per model.
pub fn format_model_listing(models: &[ModelInfo]) -> String {
    let mut out = String::from("-------- AVAILABLE MODELS --------\n");
    for model in models {
        out.push_str(&format!("Name: {}\n", model.name));
        out.push_str(&format!("Display Name: {}\n", model.display_name));
        out.push_str(&"-".repeat(30));
        out.push('\n');
    }
    out
}

/// How long and how often to check an uploaded file's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(600),
        }
    }
}

/// Polls `handle` until the remote side reports it `ACTIVE`.
///
/// `FAILED` is terminal. Any other state is re-checked every
/// `policy.interval` until `policy.max_wait` has passed.
pub async fn await_ready(
    client: &dyn InferenceClient,
    handle: RemoteFileHandle,
    policy: &PollPolicy,
) -> Result<RemoteFileHandle> {
    let started = Instant::now();
    let mut current = handle;

    loop {
        match current.state {
            FileState::Active => {
                info!("Remote file {} is active", current.name);
                return Ok(current);
            }
            FileState::Failed => {
                warn!("Remote file {} failed processing", current.name);
                return Err(PipelineError::RemoteAssetFailed { name: current.name });
            }
            state => {
                let waited = started.elapsed();
                if waited >= policy.max_wait {
                    return Err(PipelineError::RemoteAssetTimeout {
                        name: current.name,
                        waited,
                    });
                }
                info!("Waiting for remote file {} ({})", current.name, state);
            }
        }

        sleep(policy.interval).await;
        current = client.get_file(&current.name).await?;
    }
}
