//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use streamkit_ipc::{ids::DEFAULT_ID_TIMEOUT, Provider, Settings};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Application data directory; store documents live in its `Config/`.
    pub data_dir: PathBuf,

    /// How long to wait for the id issuer, in milliseconds.
    pub id_timeout_ms: u64,

    /// What a freshly constructed pipeline is made of.
    pub defaults: PipelineDefaults,
}

impl PipelineConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Issuer timeout as a duration.
    pub fn id_timeout(&self) -> Duration {
        Duration::from_millis(self.id_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: streamkit_store::default_data_dir(),
            id_timeout_ms: DEFAULT_ID_TIMEOUT.as_millis() as u64,
            defaults: PipelineDefaults::default(),
        }
    }
}

/// Destination of a freshly constructed pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDefaults {
    /// Engine service type.
    pub service_type: String,

    /// Ingest server URL.
    pub server: String,

    /// Stream key.
    pub key: String,

    /// Display name of the service.
    pub service: String,

    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ProviderDefaults {
    fn default() -> Self {
        Self {
            service_type: "rtmp_common".to_string(),
            server: "rtmp://live.twitch.tv/app".to_string(),
            key: String::new(),
            service: "Twitch".to_string(),
            username: None,
            password: None,
        }
    }
}

impl ProviderDefaults {
    /// Engine settings for the service.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("server".into(), Value::String(self.server.clone()));
        settings.insert("key".into(), Value::String(self.key.clone()));
        settings.insert("service".into(), Value::String(self.service.clone()));
        if let Some(ref username) = self.username {
            settings.insert("username".into(), Value::String(username.clone()));
        }
        if let Some(ref password) = self.password {
            settings.insert("password".into(), Value::String(password.clone()));
        }
        settings
    }

    /// Copy the descriptive fields onto a constructed provider.
    pub fn describe(&self, provider: Provider) -> Provider {
        Provider {
            key: Some(self.key.clone()),
            url: Some(self.server.clone()),
            username: self.username.clone(),
            password: self.password.clone(),
            provider_name: Some(self.service.clone()),
            ..provider
        }
    }
}

/// Entities of a freshly constructed pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    pub output_type: String,
    pub output_settings: Settings,
    pub provider: ProviderDefaults,
    pub audio_encoder_type: String,
    pub audio_encoder_settings: Settings,
    pub video_encoder_type: String,
    pub video_encoder_settings: Settings,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            output_type: "rtmp_output".to_string(),
            output_settings: Settings::new(),
            provider: ProviderDefaults::default(),
            audio_encoder_type: "mf_aac".to_string(),
            audio_encoder_settings: Settings::new(),
            video_encoder_type: "obs_x264".to_string(),
            video_encoder_settings: Settings::new(),
        }
    }
}
