//! The three entity registries, initialized together.

use tracing::instrument;

use crate::context::PipelineContext;
use crate::encoders::EncoderRegistry;
use crate::outputs::OutputRegistry;
use crate::providers::ProviderRegistry;
use crate::PipelineResult;

/// Encoder, provider and output registries.
pub struct Registries {
    pub encoders: EncoderRegistry,
    pub providers: ProviderRegistry,
    pub outputs: OutputRegistry,
}

impl Registries {
    /// Open every registry's store.
    pub fn new(ctx: &PipelineContext) -> PipelineResult<Self> {
        Ok(Self {
            encoders: EncoderRegistry::new(ctx)?,
            providers: ProviderRegistry::new(ctx)?,
            outputs: OutputRegistry::new(ctx)?,
        })
    }

    /// Restore all registries. Outputs go last since rebinding them checks
    /// the other two.
    #[instrument(name = "init_registries", skip(self))]
    pub fn init(&mut self) -> PipelineResult<()> {
        self.providers.init()?;
        self.encoders.init()?;
        self.outputs.init(&self.encoders, &self.providers)
    }
}
