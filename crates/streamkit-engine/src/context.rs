//! Collaborators shared by the registries and the orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use streamkit_ipc::IdIssuer;
use streamkit_media::MediaEngine;
use streamkit_store::{JsonStore, StoreResult};

/// The engine, the id issuer and the location of the store documents.
#[derive(Clone)]
pub struct PipelineContext {
    engine: Arc<dyn MediaEngine>,
    ids: Arc<dyn IdIssuer>,
    data_dir: PathBuf,
}

impl PipelineContext {
    /// Bundle the collaborators.
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        ids: Arc<dyn IdIssuer>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            ids,
            data_dir: data_dir.into(),
        }
    }

    /// The media engine.
    pub fn engine(&self) -> &Arc<dyn MediaEngine> {
        &self.engine
    }

    /// The id issuer.
    pub fn ids(&self) -> &Arc<dyn IdIssuer> {
        &self.ids
    }

    /// Open a named store document under the data directory.
    pub fn open_store(&self, name: &str) -> StoreResult<JsonStore> {
        JsonStore::open(&self.data_dir, name)
    }
}
