//! Media engine boundary.
//!
//! The engine owns the live encoder, output and service objects. This crate
//! describes what the registries need from it ([`MediaEngine`]) and provides
//! [`MemoryEngine`], an in-process engine with a fixed type catalog.

mod error;
mod memory;

pub use error::EngineError;
pub use memory::{MemoryEngine, OutputBindings};

use std::fmt;

use serde::{Deserialize, Serialize};
use streamkit_ipc::{EncoderKind, Settings};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Audio encoder types known to the default catalog.
pub const AUDIO_ENCODER_TYPES: &[&str] = &["mf_aac", "ffmpeg_aac"];

/// Video encoder types known to the default catalog.
pub const VIDEO_ENCODER_TYPES: &[&str] = &["obs_x264", "ffmpeg_nvenc"];

/// Output types known to the default catalog.
pub const OUTPUT_TYPES: &[&str] = &["rtmp_output", "ffmpeg_output"];

/// Service types known to the default catalog.
pub const SERVICE_TYPES: &[&str] = &["rtmp_common", "rtmp_custom"];

/// Category of live engine object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    AudioEncoder,
    VideoEncoder,
    Output,
    /// Streaming destination, registered as a provider.
    Service,
}

impl HandleKind {
    /// Handle kind for an encoder kind.
    pub fn encoder(kind: EncoderKind) -> Self {
        match kind {
            EncoderKind::Audio => Self::AudioEncoder,
            EncoderKind::Video => Self::VideoEncoder,
        }
    }

    /// Returns a lowercase name for messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::AudioEncoder => "audio encoder",
            Self::VideoEncoder => "video encoder",
            Self::Output => "output",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a live engine object, looked up by unique id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    kind: HandleKind,
    name: String,
}

impl Handle {
    /// Create a handle reference. Only engines should mint these.
    pub fn new(kind: HandleKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Kind of the referenced object.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Unique id the object was created under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fail unless this handle is of the expected kind.
    pub fn expect_kind(&self, expected: HandleKind) -> EngineResult<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(EngineError::WrongKind {
                expected,
                actual: self.kind,
            })
        }
    }
}

/// Operations the registries need from the media engine.
pub trait MediaEngine: Send + Sync {
    /// Construct a live object. Fails if `type_id` is unknown for `kind` or
    /// `unique_id` is already bound.
    fn create(
        &self,
        kind: HandleKind,
        type_id: &str,
        unique_id: &str,
        settings: Option<&Settings>,
    ) -> EngineResult<Handle>;

    /// Look up a live object. Never fails.
    fn from_name(&self, kind: HandleKind, unique_id: &str) -> Option<Handle>;

    /// Destroy a live object.
    fn release(&self, handle: &Handle) -> EngineResult<()>;

    /// Start an output.
    fn start_output(&self, output: &Handle) -> EngineResult<()>;

    /// Stop an output.
    fn stop_output(&self, output: &Handle) -> EngineResult<()>;

    /// Bind an audio encoder to a track of an output.
    fn set_audio_encoder(&self, output: &Handle, encoder: &Handle, track: usize)
        -> EngineResult<()>;

    /// Bind the video encoder of an output.
    fn set_video_encoder(&self, output: &Handle, encoder: &Handle) -> EngineResult<()>;

    /// Bind the service (destination) of an output.
    fn set_service(&self, output: &Handle, service: &Handle) -> EngineResult<()>;

    /// Look up a live object, treating a miss as an error.
    fn resolve(&self, kind: HandleKind, unique_id: &str) -> EngineResult<Handle> {
        self.from_name(kind, unique_id)
            .ok_or_else(|| EngineError::HandleNotFound {
                kind,
                unique_id: unique_id.to_string(),
            })
    }
}
