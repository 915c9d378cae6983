//! Change events applied to registry state and published to observers.

use serde::{Deserialize, Serialize};

use crate::state::PipelineState;
use crate::types::{Encoder, EncoderKind, Output, Provider};

/// Changes to the encoder registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EncoderEvent {
    /// Persisted encoders of one kind were bulk-loaded at startup.
    Loaded {
        kind: EncoderKind,
        encoders: Vec<Encoder>,
    },

    /// An encoder was registered.
    Added(Encoder),

    /// An encoder was removed.
    Removed { kind: EncoderKind, unique_id: String },
}

/// Changes to the provider registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProviderEvent {
    /// Persisted providers were bulk-loaded at startup.
    Loaded(Vec<Provider>),

    /// A provider was registered.
    Added(Provider),

    /// A provider was removed.
    Removed { unique_id: String },
}

/// Changes to the output registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputEvent {
    /// Persisted outputs were bulk-loaded at startup.
    Loaded(Vec<Output>),

    /// An output was registered.
    Added(Output),

    /// An output was removed.
    Removed { unique_id: String },

    /// The encoder references of an output changed.
    EncodersUpdated {
        unique_id: String,
        audio_encoder_id: Option<String>,
        video_encoder_id: Option<String>,
    },

    /// The provider reference of an output changed.
    ServiceUpdated {
        unique_id: String,
        provider_id: Option<String>,
    },

    /// The output was started.
    Started { unique_id: String },

    /// The output was stopped.
    Stopped { unique_id: String },
}

/// Events the pipeline service sends to its front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<PipelineState>,

        /// Current state.
        current: Box<PipelineState>,
    },

    /// Error occurred.
    Error {
        /// Whether the error is recoverable.
        recoverable: bool,

        /// Error message.
        message: String,
    },

    /// Service is ready to take commands.
    Ready,

    /// Service has shut down.
    Shutdown,
}
