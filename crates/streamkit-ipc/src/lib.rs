//! Shared types for streamkit.
//!
//! This crate defines the entity types, the change events registries publish,
//! the front-end command/event messages of the pipeline service, and the
//! unique id issuer.

mod commands;
mod events;
pub mod ids;
mod state;
mod types;

pub use commands::PipelineCommand;
pub use events::{EncoderEvent, OutputEvent, PipelineEvent, ProviderEvent};
pub use ids::{IdCategory, IdClient, IdError, IdIssuer, IdRequest, IdServer};
pub use state::{BuildPhase, PipelineState};
pub use types::{Encoder, EncoderKind, Output, Provider, Settings};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (front end → service).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (service → front end, registry → observer).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<PipelineCommand>, Receiver<PipelineCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<PipelineEvent>, Receiver<PipelineEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
