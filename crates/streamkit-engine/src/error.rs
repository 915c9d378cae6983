//! Error types for registry and pipeline operations.

use thiserror::Error;

use streamkit_ipc::{BuildPhase, IdError};
use streamkit_media::EngineError;
use streamkit_store::StoreError;

/// Errors surfaced by the registries and the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The media engine rejected an operation.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A store document could not be read or written.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No id could be obtained from the issuer.
    #[error("ID issuance failed: {0}")]
    Ids(#[from] IdError),

    /// The registry has no entity with this id.
    #[error("Unknown {kind} {unique_id}")]
    UnknownEntity {
        kind: &'static str,
        unique_id: String,
    },

    /// Fresh pipeline construction failed and was rolled back.
    #[error("Pipeline construction failed while {}: {source}", .phase.name().to_lowercase())]
    Construction {
        phase: BuildPhase,
        #[source]
        source: Box<PipelineError>,
    },

    /// The orchestrator was already initialized.
    #[error("Pipeline already initialized")]
    AlreadyInitialized,

    /// No pipeline output exists yet.
    #[error("No pipeline output")]
    NoPipeline,
}
