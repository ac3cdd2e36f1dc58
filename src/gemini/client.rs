use async_trait::async_trait;
use reqwest::{header::HeaderValue, Response};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::types::{
    Content, FileData, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    ListModelsResponse, ModelInfo, Part, RemoteFileHandle, ResponseFormat, UploadMetadata,
    UploadResponse, UploadStartRequest,
};
use super::{InferenceClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::config::ApiKey;
use crate::error::{PipelineError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// REST client for the Gemini file and generation APIs.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: ApiKey,
}

impl GeminiClient {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        // accept both "gemini-x" and "models/gemini-x"
        self.model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{}", model)
        };
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Models usable with `generateContent`, across all result pages.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/v1beta/models", self.base_url))
                .header(API_KEY_HEADER, self.api_key.expose())
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = check_status("list models", request.send().await?).await?;
            let page: ListModelsResponse = response.json().await?;
            models.extend(
                page.models
                    .into_iter()
                    .filter(ModelInfo::supports_generate_content),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(models)
    }

    async fn start_upload(&self, display_name: &str, size: usize, mime_type: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, self.api_key.expose())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await?;
        let response = check_status("start upload", response).await?;

        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|value: &HeaderValue| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::RemoteService(format!(
                    "start upload response is missing the {} header",
                    UPLOAD_URL_HEADER
                ))
            })
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFileHandle> {
        let bytes = fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        info!("Uploading {} ({} bytes) to Gemini", path.display(), bytes.len());
        let upload_url = self.start_upload(&display_name, bytes.len(), mime_type).await?;

        let response = self
            .http
            .post(&upload_url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let response = check_status("upload", response).await?;
        let uploaded: UploadResponse = response.json().await?;

        info!("Uploaded as {} ({})", uploaded.file.name, uploaded.file.state);
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFileHandle> {
        let response = self
            .http
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .header(API_KEY_HEADER, self.api_key.expose())
            .send()
            .await?;
        let response = check_status("get file", response).await?;
        let file: RemoteFileHandle = response.json().await?;
        debug!("Remote file {} is {}", file.name, file.state);
        Ok(file)
    }

    async fn generate(
        &self,
        prompt: &str,
        file: &RemoteFileHandle,
        format: ResponseFormat,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::File {
                        file_data: FileData {
                            mime_type: &file.mime_type,
                            file_uri: &file.uri,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: format.mime_type(),
            },
        };

        debug!("Generating with {} against {}", self.model, file.name);
        let response = self
            .http
            .post(format!("{}/v1beta/{}:generateContent", self.base_url, self.model))
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&request)
            .send()
            .await?;
        let response = check_status("generate content", response).await?;
        let body: GenerateContentResponse = response.json().await?;

        let candidate = body.candidates.into_iter().next().ok_or_else(|| {
            PipelineError::malformed("generation", "response contains no candidates")
        })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(PipelineError::malformed(
                "generation",
                format!(
                    "candidate has no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            ));
        }

        Ok(text)
    }
}

async fn check_status(operation: &str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(PipelineError::RemoteService(format!(
        "{} returned {}: {}",
        operation, status, body
    )))
}
