use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub replicate: ReplicateConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub art: ArtConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_model_version")]
    pub model_version: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Generation parameters sent with every prediction. Only the prompt varies
/// between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model_version: String,
    pub duration: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub classifier_free_guidance: u32,
    pub output_format: String,
    pub normalization_strategy: String,
    pub continuation: bool,
    pub multi_band_diffusion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_art_url")]
    pub url: String,
    #[serde(default)]
    pub save_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl ReplicateConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AudioConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_version: "stereo-melody-large".to_string(),
            duration: 8,
            top_k: 250,
            top_p: 0.0,
            temperature: 1.0,
            classifier_free_guidance: 3,
            output_format: "wav".to_string(),
            normalization_strategy: "peak".to_string(),
            continuation: false,
            multi_band_diffusion: false,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_duration_secs: default_max_duration_secs(),
            max_attempts: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_art_url(),
            save_path: None,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

// meta/musicgen
fn default_model_version() -> String {
    "671ac645ce5e552cc63a54a2bbff63fcf798043055d2dac5fc9e36a837eedcfb".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_duration_secs() -> u64 {
    300
}

fn default_volume() -> f32 {
    1.0
}

fn default_download_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_art_url() -> String {
    "https://picsum.photos/512".to_string()
}

fn default_database_path() -> String {
    "history.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}
