//! Writes the models usable for content generation to `models.txt`.

use anyhow::{bail, Result};
use tracing::info;

use clipsum_rs::config::{Credentials, Settings, API_KEY_VAR};
use clipsum_rs::gemini::{format_model_listing, GeminiClient};
use clipsum_rs::init_env;

const OUTPUT_FILE: &str = "models.txt";

#[tokio::main]
async fn main() -> Result<()> {
    init_env();
    tracing_subscriber::fmt().with_target(false).init();

    let settings = Settings::from_env()?;
    let key = match settings.credentials {
        Credentials::Configured(key) => key,
        Credentials::Unconfigured => bail!("No API key found, set {}", API_KEY_VAR),
    };

    let client = GeminiClient::new(key).with_base_url(settings.gemini.base_url);
    let models = client.list_models().await?;

    tokio::fs::write(OUTPUT_FILE, format_model_listing(&models)).await?;
    info!("{} models written to {}", models.len(), OUTPUT_FILE);

    Ok(())
}
