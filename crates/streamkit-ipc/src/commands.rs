//! Commands sent from the front end to the pipeline service.

use serde::{Deserialize, Serialize};

/// Commands that the front end can send to the pipeline service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineCommand {
    /// Start the managed output.
    Start,

    /// Stop the managed output.
    Stop,

    /// Request the current pipeline state.
    GetState,

    /// Shut the service down.
    Shutdown,
}
