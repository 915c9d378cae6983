//! Pipeline orchestrator.
//!
//! The pipeline is one output bound to one provider and one encoder pair.
//! The orchestrator remembers it by the output id stored under
//! [`PIPELINE_OUTPUT_KEY`], adopts it on startup when the output is still
//! live, and otherwise builds a fresh one.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use streamkit_ipc::{BuildPhase, IdIssuer};
use streamkit_media::MediaEngine;
use streamkit_store::JsonStore;

use crate::builder::{PipelineBuilder, PipelineIds};
use crate::config::PipelineDefaults;
use crate::context::PipelineContext;
use crate::registries::Registries;
use crate::{PipelineError, PipelineResult};

/// Store document holding the pipeline pointer.
pub const PIPELINE_STORE: &str = "Pipeline";

/// Key of the pipeline output id in [`PIPELINE_STORE`].
pub const PIPELINE_OUTPUT_KEY: &str = "pipelineOutputId";

/// Finds or builds the pipeline and drives its output.
pub struct PipelineOrchestrator {
    engine: Arc<dyn MediaEngine>,
    ids: Arc<dyn IdIssuer>,
    store: JsonStore,
    defaults: PipelineDefaults,
    pipeline_output_id: Option<String>,
}

impl PipelineOrchestrator {
    /// Open the pipeline store. No pipeline is chosen until [`init`](Self::init).
    pub fn new(ctx: &PipelineContext, defaults: PipelineDefaults) -> PipelineResult<Self> {
        Ok(Self {
            engine: Arc::clone(ctx.engine()),
            ids: Arc::clone(ctx.ids()),
            store: ctx.open_store(PIPELINE_STORE)?,
            defaults,
            pipeline_output_id: None,
        })
    }

    /// Adopt the stored pipeline or build a fresh one.
    ///
    /// The registries must already be initialized.
    pub fn init(&mut self, registries: &mut Registries) -> PipelineResult<()> {
        self.init_with(registries, &mut |_: BuildPhase| {})
    }

    /// Like [`init`](Self::init), reporting each construction phase as it
    /// begins.
    #[instrument(name = "init_pipeline", skip_all)]
    pub fn init_with(
        &mut self,
        registries: &mut Registries,
        on_phase: &mut dyn FnMut(BuildPhase),
    ) -> PipelineResult<()> {
        if self.pipeline_output_id.is_some() {
            return Err(PipelineError::AlreadyInitialized);
        }

        if let Some(stored) = self.store.document().get(PIPELINE_OUTPUT_KEY).cloned() {
            if let Some(output_id) = stored
                .as_str()
                .filter(|id| registries.outputs.is_output(id))
            {
                info!(output = output_id, "Adopting stored pipeline");
                self.pipeline_output_id = Some(output_id.to_string());
                return Ok(());
            }

            warn!(pointer = %stored, "Stored pipeline output is gone, discarding pointer");
            self.store.delete(PIPELINE_OUTPUT_KEY)?;
        }

        let ids = PipelineIds::issue(self.ids.as_ref())?;
        info!(
            output = %ids.output,
            provider = %ids.provider,
            audio_encoder = %ids.audio_encoder,
            video_encoder = %ids.video_encoder,
            "Constructing fresh pipeline"
        );

        let output_id = PipelineBuilder::new(
            registries,
            self.engine.as_ref(),
            &self.defaults,
            &mut self.store,
            ids,
        )
        .with_phase_hook(on_phase)
        .build()?;

        self.pipeline_output_id = Some(output_id);
        Ok(())
    }

    /// Start the pipeline output.
    pub fn start(&self, registries: &mut Registries) -> PipelineResult<()> {
        registries.outputs.start(self.require_output()?)
    }

    /// Stop the pipeline output.
    pub fn stop(&self, registries: &mut Registries) -> PipelineResult<()> {
        registries.outputs.stop(self.require_output()?)
    }

    /// Whether the pipeline output was started by this process.
    pub fn is_active(&self, registries: &Registries) -> bool {
        self.pipeline_output_id
            .as_deref()
            .is_some_and(|id| registries.outputs.is_output_active(id))
    }

    /// The pipeline output id, once initialized.
    pub fn output_id(&self) -> Option<&str> {
        self.pipeline_output_id.as_deref()
    }

    fn require_output(&self) -> PipelineResult<&str> {
        self.output_id().ok_or(PipelineError::NoPipeline)
    }
}

/// The registries together with the orchestrator that manages them.
pub struct Pipeline {
    registries: Registries,
    orchestrator: PipelineOrchestrator,
    registries_loaded: bool,
}

impl Pipeline {
    /// Open every store. Nothing is loaded until [`startup`](Self::startup).
    pub fn new(ctx: &PipelineContext, defaults: PipelineDefaults) -> PipelineResult<Self> {
        Ok(Self {
            registries: Registries::new(ctx)?,
            orchestrator: PipelineOrchestrator::new(ctx, defaults)?,
            registries_loaded: false,
        })
    }

    /// Restore the registries, then adopt or build the pipeline.
    pub fn startup(&mut self) -> PipelineResult<()> {
        self.startup_with(&mut |_: BuildPhase| {})
    }

    /// Like [`startup`](Self::startup), reporting construction phases.
    ///
    /// A failed pipeline construction leaves the registries loaded, so the
    /// call may be retried.
    pub fn startup_with(&mut self, on_phase: &mut dyn FnMut(BuildPhase)) -> PipelineResult<()> {
        if !self.registries_loaded {
            self.registries.init()?;
            self.registries_loaded = true;
        }
        self.orchestrator.init_with(&mut self.registries, on_phase)
    }

    /// Start the pipeline output.
    pub fn start(&mut self) -> PipelineResult<()> {
        self.orchestrator.start(&mut self.registries)
    }

    /// Stop the pipeline output.
    pub fn stop(&mut self) -> PipelineResult<()> {
        self.orchestrator.stop(&mut self.registries)
    }

    /// Whether the pipeline output is running.
    pub fn is_active(&self) -> bool {
        self.orchestrator.is_active(&self.registries)
    }

    /// The pipeline output id, once started up.
    pub fn output_id(&self) -> Option<&str> {
        self.orchestrator.output_id()
    }

    /// The entity registries.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Mutable access to the entity registries.
    pub fn registries_mut(&mut self) -> &mut Registries {
        &mut self.registries
    }
}
