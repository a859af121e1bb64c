use std::path::{Path, PathBuf};
use std::time::Duration;

use client_logging::client_warn;
use docflow_client::{ApiSettings, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = ".docflow.ron";

/// Optional settings file; every field falls back to a default and the
/// `DOCFLOW_*` environment variables win over the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SettingsFile {
    api_url: Option<String>,
    bearer_token: Option<String>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub poll_interval: Duration,
    /// Where the session state file lives.
    pub session_dir: PathBuf,
}

pub fn load() -> AppConfig {
    let session_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let file = read_settings_file(&session_dir.join(CONFIG_FILENAME));

    let mut api = ApiSettings::default();
    if let Some(url) = file.api_url {
        api.base_url = url;
    }
    if let Some(token) = file.bearer_token {
        api.bearer_token = Some(token);
    }
    if let Ok(url) = std::env::var("DOCFLOW_API_URL") {
        api.base_url = url;
    }
    if let Ok(token) = std::env::var("DOCFLOW_TOKEN") {
        api.bearer_token = Some(token);
    }

    let poll_interval = std::env::var("DOCFLOW_POLL_INTERVAL_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .or(file.poll_interval_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL);

    AppConfig {
        api,
        poll_interval,
        session_dir,
    }
}

fn read_settings_file(path: &Path) -> SettingsFile {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return SettingsFile::default();
        }
        Err(err) => {
            client_warn!("Failed to read settings from {:?}: {}", path, err);
            return SettingsFile::default();
        }
    };
    match ron::from_str(&content) {
        Ok(file) => file,
        Err(err) => {
            client_warn!("Failed to parse settings from {:?}: {}", path, err);
            SettingsFile::default()
        }
    }
}
