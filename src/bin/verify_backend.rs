//! Manual smoke test: posts a local video to a running server and prints the
//! digest it returns.
//!
//! Usage: `verify-backend <video> [url]`, the url defaults to
//! `http://localhost:8000/process`.

use anyhow::{bail, Context, Result};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_URL: &str = "http://localhost:8000/process";
const OUTPUT_FILE: &str = "backend_response.json";
const TIMEOUT: Duration = Duration::from_secs(600);

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("mkv") => "video/x-matroska",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let Some(video) = args.next() else {
        bail!("usage: verify-backend <video> [url]");
    };
    let url = args.next().unwrap_or_else(|| DEFAULT_URL.to_string());
    let video = Path::new(&video);

    info!("Target video: {}", video.display());
    let bytes = tokio::fs::read(video)
        .await
        .with_context(|| format!("cannot read {}", video.display()))?;
    let filename = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());

    let part = Part::bytes(bytes).file_name(filename).mime_str(mime_for(video))?;
    let form = Form::new().part("file", part);

    info!("Sending to {}, this can take several minutes", url);
    let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("cannot reach {}, is the server running?", url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("Server error ({}): {}", status, body);
        bail!("processing failed with {}", status);
    }

    let data: Value = response.json().await?;
    tokio::fs::write(OUTPUT_FILE, serde_json::to_string_pretty(&data)?).await?;
    info!("Response saved to {}", OUTPUT_FILE);

    println!("Video ID: {}", data["videoId"].as_str().unwrap_or("-"));
    println!("Video URL: {}", data["videoUrl"].as_str().unwrap_or("-"));

    let summary = data["summary"]["summary"].as_str().unwrap_or_default();
    let head: String = summary.chars().take(200).collect();
    println!("\nSummary: {}...", head);

    println!("\nSections:");
    let sections = data["summary"]["sections"].as_array().cloned().unwrap_or_default();
    for section in sections.iter().take(3) {
        println!(
            " - [{}s] {}",
            section["start"],
            section["title"].as_str().unwrap_or_default()
        );
    }

    Ok(())
}
