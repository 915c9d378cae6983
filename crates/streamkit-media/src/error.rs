//! Error types for the media engine boundary.

use thiserror::Error;

use crate::HandleKind;

/// Errors the media engine reports.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No implementation of this type exists for the handle kind.
    #[error("Unknown {kind} type: {type_id}")]
    UnknownType { kind: HandleKind, type_id: String },

    /// A live handle with this id already exists.
    #[error("{kind} {unique_id} already exists")]
    DuplicateId { kind: HandleKind, unique_id: String },

    /// No live handle with this id exists.
    #[error("No live {kind} named {unique_id}")]
    HandleNotFound { kind: HandleKind, unique_id: String },

    /// A handle of the wrong kind was passed.
    #[error("Expected a {expected} handle, got {actual}")]
    WrongKind {
        expected: HandleKind,
        actual: HandleKind,
    },
}
