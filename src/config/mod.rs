use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use std::env;
use std::fmt::Debug;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::gemini::{PollPolicy, DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const BIND_ADDR: &str = "0.0.0.0:8000";
const UPLOAD_DIR: &str = "./uploads";
const PROCESSED_DIR: &str = "./processed";
const ERROR_LOG_PATH: &str = "./backend_error.log";
const KEY_FILE: &str = "./.env";
const FFMPEG: &str = "ffmpeg";
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) => value,
        Err(_) => dotenv::var(key).unwrap_or_else(|_| default.to_string()),
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key).or_else(|_| dotenv::var(key)) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

pub static UPLOAD_PATH: Lazy<String> = Lazy::new(|| env_or("UPLOAD_DIR", UPLOAD_DIR));

pub static PROCESSED_PATH: Lazy<String> = Lazy::new(|| env_or("PROCESSED_DIR", PROCESSED_DIR));

pub static ERROR_LOG: Lazy<String> = Lazy::new(|| env_or("ERROR_LOG_PATH", ERROR_LOG_PATH));

pub static KEY_FILE_PATH: Lazy<String> = Lazy::new(|| env_or("GEMINI_KEY_FILE", KEY_FILE));

pub static FFMPEG_PATH: Lazy<String> = Lazy::new(|| env_or("FFMPEG_PATH", FFMPEG));

/// Secret for the inference service. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(***)")
    }
}

/// Whether the inference service can be reached at all. A missing key does
/// not stop the server, every job fails with a configuration error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Configured(ApiKey),
    Unconfigured,
}

impl Credentials {
    /// The environment value wins; otherwise the key is looked up in the
    /// key=value file at `key_file`.
    pub fn resolve(env_value: Option<String>, key_file: &Path) -> Self {
        if let Some(key) = env_value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            return Credentials::Configured(ApiKey(key));
        }

        match read_key_file(key_file) {
            Some(key) => {
                info!("API key loaded from {}", key_file.display());
                Credentials::Configured(ApiKey(key))
            }
            None => Credentials::Unconfigured,
        }
    }

    pub fn from_env() -> Self {
        Self::resolve(env::var(API_KEY_VAR).ok(), Path::new(KEY_FILE_PATH.as_str()))
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Credentials::Configured(_))
    }
}

fn read_key_file(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }

    let entries = match dotenv::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read key file {}: {}", path.display(), e);
            return None;
        }
    };

    for entry in entries {
        match entry {
            Ok((key, value)) if key == API_KEY_VAR => {
                let value = value.trim().trim_matches('"').to_string();
                return (!value.is_empty()).then_some(value);
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping unreadable line in {}: {}", path.display(), e);
            }
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub poll: PollPolicy,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub error_log: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub max_upload_bytes: usize,
    pub gemini: GeminiSettings,
    pub credentials: Credentials,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let poll = PollPolicy {
            interval: Duration::from_secs(parse_env("GEMINI_POLL_INTERVAL_SECS", 2u64)?),
            max_wait: Duration::from_secs(parse_env("GEMINI_MAX_WAIT_SECS", 600u64)?),
        };

        Ok(Self {
            bind_addr: parse_env("BIND_ADDR", SocketAddr::from_str(BIND_ADDR)?)?,
            upload_dir: PathBuf::from(UPLOAD_PATH.as_str()),
            processed_dir: PathBuf::from(PROCESSED_PATH.as_str()),
            error_log: PathBuf::from(ERROR_LOG.as_str()),
            ffmpeg_path: PathBuf::from(FFMPEG_PATH.as_str()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", MAX_UPLOAD_BYTES)?,
            gemini: GeminiSettings {
                base_url: env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
                model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
                poll,
            },
            credentials: Credentials::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_env_value_wins() {
        let dir = TempDir::new().unwrap();
        let key_file = dir.path().join(".env");
        fs::write(&key_file, "GEMINI_API_KEY=from-file\n").unwrap();

        let credentials = Credentials::resolve(Some("from-env".to_string()), &key_file);
        assert_eq!(credentials, Credentials::Configured(ApiKey::new("from-env")));
    }

    #[test]
    fn test_key_file_fallback() {
        let dir = TempDir::new().unwrap();
        let key_file = dir.path().join(".env");
        fs::write(
            &key_file,
            "# local settings\nOTHER=1\nGEMINI_API_KEY=\"quoted-key\"\n",
        )
        .unwrap();

        let credentials = Credentials::resolve(None, &key_file);
        assert_eq!(credentials, Credentials::Configured(ApiKey::new("quoted-key")));

        // blank env values count as missing
        let credentials = Credentials::resolve(Some("  ".to_string()), &key_file);
        assert_eq!(credentials, Credentials::Configured(ApiKey::new("quoted-key")));
    }

    #[test]
    fn test_missing_key_is_unconfigured() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.env");
        assert_eq!(Credentials::resolve(None, &missing), Credentials::Unconfigured);

        let key_file = dir.path().join(".env");
        fs::write(&key_file, "OTHER=1\nGEMINI_API_KEY=\n").unwrap();
        assert!(!Credentials::resolve(None, &key_file).is_configured());
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret");
        assert!(!format!("{:?}", key).contains("super-secret"));
    }
}
