use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{PipelineError, Result};
use crate::gemini::{FileState, InferenceClient, RemoteFileHandle, ResponseFormat};
use crate::media::Transcoder;
use crate::storage::UploadBody;

pub const TRANSCRIPTION_JSON: &str =
    r#"{"text":"hola a todos","segments":[{"start":0.0,"end":1.2,"text":"hola"},{"start":1.2,"end":2.5,"text":"a todos"}]}"#;

pub const SUMMARY_JSON: &str = r#"```json
{"summary":"Clase de prueba","sections":[{"title":"Inicio","start":0.0,"content":"Saludo"},{"title":"Tema","start":90.0,"content":"Contenido"}],"keyPoints":["uno","dos","tres"]}
```"#;

/// Upload body delivered as a single chunk.
pub fn body(bytes: &'static [u8]) -> UploadBody<'static> {
    stream::iter(vec![Ok(Bytes::from_static(bytes))]).boxed()
}

/// Writes placeholder files instead of running ffmpeg.
#[derive(Default)]
pub struct FakeTranscoder {
    pub fail_extract: bool,
    pub fail_compress: bool,
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeTranscoder {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn extract_audio(&self, source: &Path, dest: &Path) -> Result<PathBuf> {
        self.calls.lock().unwrap().push("extract_audio");
        if self.fail_extract {
            return Err(PipelineError::Transcode {
                action: "extract audio from",
                path: source.to_path_buf(),
                reason: "ffmpeg exited with exit status: 1".to_string(),
            });
        }
        tokio::fs::write(dest, b"mp3").await?;
        Ok(dest.to_path_buf())
    }

    async fn compress_video(&self, source: &Path, dest: &Path) -> Result<PathBuf> {
        self.calls.lock().unwrap().push("compress_video");
        if self.fail_compress {
            return Err(PipelineError::Transcode {
                action: "compress",
                path: source.to_path_buf(),
                reason: "ffmpeg exited with exit status: 1".to_string(),
            });
        }
        tokio::fs::write(dest, b"mp4").await?;
        Ok(dest.to_path_buf())
    }
}

/// Scripted inference service: file states are handed out in order on each
/// status check, generation answers are popped per call.
pub struct FakeInference {
    upload_state: FileState,
    states: Mutex<VecDeque<FileState>>,
    answers: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeInference {
    pub fn new(upload_state: FileState, states: &[FileState], answers: &[&str]) -> Self {
        Self {
            upload_state,
            states: Mutex::new(states.iter().copied().collect()),
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Active right after upload, answering with valid transcription and summary.
    pub fn happy() -> Self {
        Self::new(FileState::Active, &[], &[TRANSCRIPTION_JSON, SUMMARY_JSON])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn handle(state: FileState) -> RemoteFileHandle {
        RemoteFileHandle {
            name: "files/fake-audio".to_string(),
            uri: "https://example.invalid/files/fake-audio".to_string(),
            mime_type: "audio/mp3".to_string(),
            state,
        }
    }
}

#[async_trait]
impl InferenceClient for FakeInference {
    async fn upload(&self, _path: &Path, _mime_type: &str) -> Result<RemoteFileHandle> {
        self.calls.lock().unwrap().push("upload".to_string());
        Ok(Self::handle(self.upload_state))
    }

    async fn get_file(&self, _name: &str) -> Result<RemoteFileHandle> {
        self.calls.lock().unwrap().push("get_file".to_string());
        let state = self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FileState::Processing);
        Ok(Self::handle(state))
    }

    async fn generate(
        &self,
        _prompt: &str,
        file: &RemoteFileHandle,
        _format: ResponseFormat,
    ) -> Result<String> {
        self.calls.lock().unwrap().push("generate".to_string());
        assert_eq!(file.state, FileState::Active, "generation against a file that is not active");
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PipelineError::RemoteService("no scripted answer left".to_string()))
    }
}
