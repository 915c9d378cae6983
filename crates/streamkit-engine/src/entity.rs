//! Persisted record shapes and engine-backed entity construction.

use serde::{Deserialize, Serialize};

use streamkit_ipc::{Encoder, EncoderKind, Output, Provider, Settings};
use streamkit_media::{EngineResult, HandleKind, MediaEngine};

/// Field of an output record holding the audio encoder id.
pub const AUDIO_ENCODER_FIELD: &str = "audioEncoder";

/// Field of an output record holding the video encoder id.
pub const VIDEO_ENCODER_FIELD: &str = "videoEncoder";

/// Field of an output record holding the provider id.
pub const PROVIDER_FIELD: &str = "provider";

/// Stored form of an encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EncoderRecord {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub settings: Settings,
}

impl EncoderRecord {
    pub fn into_encoder(self, kind: EncoderKind, unique_id: String) -> Encoder {
        Encoder::new(kind, self.type_id, unique_id, self.settings)
    }
}

impl From<&Encoder> for EncoderRecord {
    fn from(encoder: &Encoder) -> Self {
        Self {
            type_id: encoder.type_id.clone(),
            settings: encoder.settings.clone(),
        }
    }
}

/// Stored form of a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderRecord {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

impl ProviderRecord {
    pub fn into_provider(self, unique_id: String) -> Provider {
        Provider {
            unique_id,
            type_id: self.type_id,
            settings: self.settings,
            key: self.key,
            url: self.url,
            username: self.username,
            password: self.password,
            provider_name: self.provider_name,
        }
    }
}

impl From<&Provider> for ProviderRecord {
    fn from(provider: &Provider) -> Self {
        Self {
            type_id: provider.type_id.clone(),
            settings: provider.settings.clone(),
            key: provider.key.clone(),
            url: provider.url.clone(),
            username: provider.username.clone(),
            password: provider.password.clone(),
            provider_name: provider.provider_name.clone(),
        }
    }
}

/// Stored form of an output. Has no `active` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OutputRecord {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_encoder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_encoder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl From<&Output> for OutputRecord {
    fn from(output: &Output) -> Self {
        Self {
            type_id: output.type_id.clone(),
            settings: output.settings.clone(),
            audio_encoder: output.audio_encoder_id.clone(),
            video_encoder: output.video_encoder_id.clone(),
            provider: output.provider_id.clone(),
        }
    }
}

/// Settings argument for engine creation. Empty settings mean "use the
/// implementation defaults".
pub(crate) fn settings_arg(settings: &Settings) -> Option<&Settings> {
    (!settings.is_empty()).then_some(settings)
}

/// Create the engine encoder, then describe it.
pub fn construct_encoder(
    engine: &dyn MediaEngine,
    kind: EncoderKind,
    type_id: &str,
    unique_id: &str,
    settings: Settings,
) -> EngineResult<Encoder> {
    engine.create(
        HandleKind::encoder(kind),
        type_id,
        unique_id,
        settings_arg(&settings),
    )?;
    Ok(Encoder::new(kind, type_id, unique_id, settings))
}

/// Create the engine service, then describe it as a provider.
pub fn construct_provider(
    engine: &dyn MediaEngine,
    type_id: &str,
    unique_id: &str,
    settings: Settings,
) -> EngineResult<Provider> {
    engine.create(
        HandleKind::Service,
        type_id,
        unique_id,
        settings_arg(&settings),
    )?;
    Ok(Provider::new(type_id, unique_id, settings))
}

/// Create the engine output, then describe it.
pub fn construct_output(
    engine: &dyn MediaEngine,
    type_id: &str,
    unique_id: &str,
    settings: Settings,
) -> EngineResult<Output> {
    engine.create(
        HandleKind::Output,
        type_id,
        unique_id,
        settings_arg(&settings),
    )?;
    Ok(Output::new(type_id, unique_id, settings))
}
