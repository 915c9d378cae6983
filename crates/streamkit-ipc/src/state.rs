//! Pipeline state machine types.

use serde::{Deserialize, Serialize};

/// The current state of the managed pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Registries and pipeline have not been initialized yet.
    #[default]
    Uninitialized,

    /// A fresh pipeline is being constructed.
    Building {
        /// Current construction phase.
        phase: BuildPhase,
    },

    /// The pipeline exists and its output is stopped.
    Idle {
        /// Managed output id.
        output_id: String,
    },

    /// The pipeline output is running.
    Live {
        /// Managed output id.
        output_id: String,
    },

    /// Initialization or a command failed.
    Error {
        /// Error message.
        message: String,

        /// Whether the service can keep taking commands.
        recoverable: bool,
    },
}

impl PipelineState {
    /// Returns true if the pipeline output is running.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Returns true if the pipeline exists and is stopped.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }

    /// Returns true if the pipeline is in an error state.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns the managed output id, if there is one.
    pub fn output_id(&self) -> Option<&str> {
        match self {
            Self::Idle { output_id } | Self::Live { output_id } => Some(output_id),
            _ => None,
        }
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Building { .. } => "Building",
            Self::Idle { .. } => "Idle",
            Self::Live { .. } => "Live",
            Self::Error { .. } => "Error",
        }
    }
}

/// Construction phases of a fresh pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildPhase {
    /// Registering the destination service.
    RegisterProvider,

    /// Registering the audio encoder.
    RegisterAudioEncoder,

    /// Registering the video encoder.
    RegisterVideoEncoder,

    /// Registering the output.
    RegisterOutput,

    /// Binding the provider to the output.
    BindService,

    /// Binding the encoders to the output.
    BindEncoders,

    /// Persisting the pipeline pointer.
    Commit,
}

impl BuildPhase {
    /// The first phase of construction.
    pub const FIRST: Self = Self::RegisterProvider;

    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::RegisterProvider => Some(Self::RegisterAudioEncoder),
            Self::RegisterAudioEncoder => Some(Self::RegisterVideoEncoder),
            Self::RegisterVideoEncoder => Some(Self::RegisterOutput),
            Self::RegisterOutput => Some(Self::BindService),
            Self::BindService => Some(Self::BindEncoders),
            Self::BindEncoders => Some(Self::Commit),
            Self::Commit => None,
        }
    }

    /// Returns the previous phase, if any (for rollback).
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::RegisterProvider => None,
            Self::RegisterAudioEncoder => Some(Self::RegisterProvider),
            Self::RegisterVideoEncoder => Some(Self::RegisterAudioEncoder),
            Self::RegisterOutput => Some(Self::RegisterVideoEncoder),
            Self::BindService => Some(Self::RegisterOutput),
            Self::BindEncoders => Some(Self::BindService),
            Self::Commit => Some(Self::BindEncoders),
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::RegisterProvider => "Registering provider",
            Self::RegisterAudioEncoder => "Registering audio encoder",
            Self::RegisterVideoEncoder => "Registering video encoder",
            Self::RegisterOutput => "Registering output",
            Self::BindService => "Binding service",
            Self::BindEncoders => "Binding encoders",
            Self::Commit => "Saving pipeline",
        }
    }
}
