//! Entity types shared by the registries, the orchestrator and the UI.

use serde::{Deserialize, Serialize};

/// Opaque engine settings. Passed to the engine unexamined.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Which half of an encoder pair an encoder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncoderKind {
    /// Audio compression.
    Audio,

    /// Video compression.
    Video,
}

impl EncoderKind {
    /// Returns a lowercase name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// An audio or video encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoder {
    /// Registry-wide unique id (`encoder_<n>`).
    pub unique_id: String,

    /// Audio or video.
    pub kind: EncoderKind,

    /// Engine implementation name (e.g. "obs_x264").
    #[serde(rename = "type")]
    pub type_id: String,

    /// Engine settings.
    #[serde(default)]
    pub settings: Settings,
}

impl Encoder {
    /// Create an encoder description. Does not touch the engine.
    pub fn new(
        kind: EncoderKind,
        type_id: impl Into<String>,
        unique_id: impl Into<String>,
        settings: Settings,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            kind,
            type_id: type_id.into(),
            settings,
        }
    }
}

/// A streaming destination (the engine calls these services).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Registry-wide unique id (`provider_<n>`).
    pub unique_id: String,

    /// Engine service implementation name (e.g. "rtmp_common").
    #[serde(rename = "type")]
    pub type_id: String,

    /// Engine settings.
    #[serde(default)]
    pub settings: Settings,

    /// Stream key.
    pub key: Option<String>,

    /// Ingest URL of the provider.
    pub url: Option<String>,

    /// Login name, if the provider needs one.
    pub username: Option<String>,

    /// Login password, if the provider needs one.
    pub password: Option<String>,

    /// Display name of the provider, e.g. "Twitch".
    pub provider_name: Option<String>,
}

impl Provider {
    /// Create a provider description with no descriptive fields set.
    pub fn new(type_id: impl Into<String>, unique_id: impl Into<String>, settings: Settings) -> Self {
        Self {
            unique_id: unique_id.into(),
            type_id: type_id.into(),
            settings,
            ..Default::default()
        }
    }
}

/// A stream sink referencing an encoder pair and a provider by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    /// Registry-wide unique id (`output_<n>`).
    pub unique_id: String,

    /// Engine output implementation name (e.g. "rtmp_output").
    #[serde(rename = "type")]
    pub type_id: String,

    /// Engine settings.
    #[serde(default)]
    pub settings: Settings,

    /// Bound audio encoder, if any.
    pub audio_encoder_id: Option<String>,

    /// Bound video encoder, if any.
    pub video_encoder_id: Option<String>,

    /// Bound provider, if any.
    pub provider_id: Option<String>,

    /// Whether the output was started by this process. Never persisted.
    #[serde(skip)]
    pub active: bool,
}

impl Output {
    /// Create an unbound, inactive output description.
    pub fn new(type_id: impl Into<String>, unique_id: impl Into<String>, settings: Settings) -> Self {
        Self {
            unique_id: unique_id.into(),
            type_id: type_id.into(),
            settings,
            ..Default::default()
        }
    }
}
