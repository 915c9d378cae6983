//! Entity registries and pipeline orchestration for streamkit.
//!
//! Each registry owns one category of entities (encoders, providers,
//! outputs) across three layers that must agree: reactive state, a JSON
//! store document, and objects in the media engine. The orchestrator sits on
//! top and keeps exactly one pipeline alive across restarts.

mod builder;
mod config;
mod context;
mod encoders;
mod entity;
mod error;
mod orchestrator;
mod outputs;
mod providers;
mod reducer;
mod registries;
mod service;

pub use builder::{PipelineBuilder, PipelineIds};
pub use config::{PipelineConfig, PipelineDefaults, ProviderDefaults};
pub use context::PipelineContext;
pub use encoders::{EncoderRegistry, EncoderState, AUDIO_ENCODERS_STORE, VIDEO_ENCODERS_STORE};
pub use entity::{
    construct_encoder, construct_output, construct_provider, AUDIO_ENCODER_FIELD,
    PROVIDER_FIELD, VIDEO_ENCODER_FIELD,
};
pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineOrchestrator, PIPELINE_OUTPUT_KEY, PIPELINE_STORE};
pub use outputs::{OutputRegistry, OutputState, AUDIO_TRACK, OUTPUTS_STORE};
pub use providers::{ProviderRegistry, ProviderState, PROVIDERS_STORE};
pub use reducer::{Dispatcher, Reducer};
pub use registries::Registries;
pub use service::PipelineService;

use streamkit_ipc::{PipelineCommand, PipelineEvent};
use crossbeam_channel::{Receiver, Sender};

/// Result type for registry and pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Create a pipeline service with IPC channels.
pub fn create_service(
    pipeline: Pipeline,
    command_rx: Receiver<PipelineCommand>,
    event_tx: Sender<PipelineEvent>,
) -> PipelineService {
    PipelineService::new(pipeline, command_rx, event_tx)
}
