#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use clipsum_rs::config::{Credentials, Settings, API_KEY_VAR};
use clipsum_rs::gemini::GeminiClient;
use clipsum_rs::media::FfmpegTranscoder;
use clipsum_rs::pipeline::{Inference, Pipeline};
use clipsum_rs::storage::ArtifactStore;
use clipsum_rs::{init_env, utils::logger, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    init_env();
    let _guard = logger::init("./logs".to_string())?;

    info!("Starting video digest service ({})", env!("GIT_HASH"));
    let settings = Settings::from_env()?;

    let store = ArtifactStore::new(
        settings.upload_dir.clone(),
        settings.processed_dir.clone(),
        settings.error_log.clone(),
    );
    store.ensure_dirs().await?;
    info!(
        "Uploads in {}, processed files in {}",
        store.upload_dir().display(),
        store.processed_dir().display()
    );

    let transcoder = FfmpegTranscoder::new(settings.ffmpeg_path.clone());

    let inference = match settings.credentials.clone() {
        Credentials::Configured(key) => {
            let client = GeminiClient::new(key)
                .with_base_url(settings.gemini.base_url.clone())
                .with_model(settings.gemini.model.clone());
            info!("Using model {}", client.model());
            Inference::Ready(Arc::new(client))
        }
        Credentials::Unconfigured => {
            warn!(
                "{} is not set, every processing request will fail until it is configured",
                API_KEY_VAR
            );
            Inference::Unconfigured
        }
    };

    let pipeline = Pipeline::new(store, Arc::new(transcoder), inference, settings.gemini.poll);
    let ctx = Arc::new(AppContext {
        pipeline: Arc::new(pipeline),
        max_upload_bytes: settings.max_upload_bytes,
    });

    match clipsum_rs::web::start_server(ctx, settings.bind_addr).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
