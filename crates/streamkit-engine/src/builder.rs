//! Transactional construction of a fresh pipeline.

use tracing::{debug, error, info, instrument, warn};

use streamkit_ipc::{BuildPhase, EncoderKind, IdCategory, IdError, IdIssuer};
use streamkit_media::MediaEngine;
use streamkit_store::JsonStore;

use crate::config::PipelineDefaults;
use crate::entity::{construct_encoder, construct_output, construct_provider};
use crate::orchestrator::PIPELINE_OUTPUT_KEY;
use crate::registries::Registries;
use crate::{PipelineError, PipelineResult};

/// Ids issued for a fresh pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineIds {
    pub output: String,
    pub provider: String,
    pub audio_encoder: String,
    pub video_encoder: String,
}

impl PipelineIds {
    /// Request the four ids a pipeline needs.
    pub fn issue(ids: &dyn IdIssuer) -> Result<Self, IdError> {
        Ok(Self {
            output: ids.unique_id(IdCategory::Output)?,
            provider: ids.unique_id(IdCategory::Provider)?,
            audio_encoder: ids.unique_id(IdCategory::Encoder)?,
            video_encoder: ids.unique_id(IdCategory::Encoder)?,
        })
    }
}

/// Which entities have an engine object so far.
#[derive(Debug, Default)]
struct BuiltEntities {
    provider: bool,
    audio_encoder: bool,
    video_encoder: bool,
    output: bool,
    committed: bool,
}

/// Builds provider, encoders and output, binds them, then saves the
/// pipeline pointer. Any failure undoes every step already taken.
pub struct PipelineBuilder<'a> {
    registries: &'a mut Registries,
    engine: &'a dyn MediaEngine,
    defaults: &'a PipelineDefaults,
    pipeline_store: &'a mut JsonStore,
    ids: PipelineIds,
    built: BuiltEntities,
    current_phase: Option<BuildPhase>,
    on_phase: Option<&'a mut dyn FnMut(BuildPhase)>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        registries: &'a mut Registries,
        engine: &'a dyn MediaEngine,
        defaults: &'a PipelineDefaults,
        pipeline_store: &'a mut JsonStore,
        ids: PipelineIds,
    ) -> Self {
        Self {
            registries,
            engine,
            defaults,
            pipeline_store,
            ids,
            built: BuiltEntities::default(),
            current_phase: None,
            on_phase: None,
        }
    }

    /// Call `hook` as each phase begins.
    pub fn with_phase_hook(mut self, hook: &'a mut dyn FnMut(BuildPhase)) -> Self {
        self.on_phase = Some(hook);
        self
    }

    /// Run every phase in order. Returns the output id on success.
    #[instrument(name = "build_pipeline", skip_all)]
    pub fn build(mut self) -> PipelineResult<String> {
        let mut phase = BuildPhase::FIRST;

        loop {
            self.current_phase = Some(phase);
            if let Some(hook) = self.on_phase.as_mut() {
                hook(phase);
            }

            if let Err(e) = self.run_phase(phase) {
                error!(phase = phase.name(), "Pipeline construction failed: {}", e);
                self.rollback();
                return Err(PipelineError::Construction {
                    phase,
                    source: Box::new(e),
                });
            }

            match phase.next() {
                Some(next) => phase = next,
                None => break,
            }
        }

        info!(output = %self.ids.output, "Pipeline constructed");
        Ok(self.ids.output)
    }

    fn run_phase(&mut self, phase: BuildPhase) -> PipelineResult<()> {
        debug!("Building phase: {}", phase.name());

        match phase {
            BuildPhase::RegisterProvider => self.register_provider(),
            BuildPhase::RegisterAudioEncoder => self.register_encoder(EncoderKind::Audio),
            BuildPhase::RegisterVideoEncoder => self.register_encoder(EncoderKind::Video),
            BuildPhase::RegisterOutput => self.register_output(),
            BuildPhase::BindService => self
                .registries
                .outputs
                .set_output_service(&self.ids.output, &self.ids.provider),
            BuildPhase::BindEncoders => self.registries.outputs.set_output_encoders(
                &self.ids.output,
                &self.ids.audio_encoder,
                &self.ids.video_encoder,
            ),
            BuildPhase::Commit => self.commit(),
        }
    }

    fn register_provider(&mut self) -> PipelineResult<()> {
        let defaults = &self.defaults.provider;
        let provider = construct_provider(
            self.engine,
            &defaults.service_type,
            &self.ids.provider,
            defaults.settings(),
        )?;
        self.built.provider = true;

        self.registries.providers.add(defaults.describe(provider))
    }

    fn register_encoder(&mut self, kind: EncoderKind) -> PipelineResult<()> {
        let defaults = self.defaults;
        let (type_id, settings, unique_id) = match kind {
            EncoderKind::Audio => (
                &defaults.audio_encoder_type,
                &defaults.audio_encoder_settings,
                &self.ids.audio_encoder,
            ),
            EncoderKind::Video => (
                &defaults.video_encoder_type,
                &defaults.video_encoder_settings,
                &self.ids.video_encoder,
            ),
        };

        let encoder = construct_encoder(self.engine, kind, type_id, unique_id, settings.clone())?;
        match kind {
            EncoderKind::Audio => self.built.audio_encoder = true,
            EncoderKind::Video => self.built.video_encoder = true,
        }

        self.registries.encoders.add(encoder)
    }

    fn register_output(&mut self) -> PipelineResult<()> {
        let output = construct_output(
            self.engine,
            &self.defaults.output_type,
            &self.ids.output,
            self.defaults.output_settings.clone(),
        )?;
        self.built.output = true;

        self.registries.outputs.add(output)
    }

    fn commit(&mut self) -> PipelineResult<()> {
        self.pipeline_store
            .set(PIPELINE_OUTPUT_KEY, &self.ids.output)?;
        self.built.committed = true;
        Ok(())
    }

    /// Undo from the current phase backwards.
    fn rollback(&mut self) {
        if let Some(mut phase) = self.current_phase {
            loop {
                info!("Rolling back phase: {}", phase.name());
                self.rollback_phase(phase);

                match phase.previous() {
                    Some(prev) => phase = prev,
                    None => break,
                }
            }
        }

        self.current_phase = None;
    }

    fn rollback_phase(&mut self, phase: BuildPhase) {
        let result = match phase {
            BuildPhase::Commit => {
                if std::mem::take(&mut self.built.committed) {
                    self.pipeline_store
                        .delete(PIPELINE_OUTPUT_KEY)
                        .map(|_| ())
                        .map_err(PipelineError::from)
                } else {
                    Ok(())
                }
            }
            // Bindings disappear with the output.
            BuildPhase::BindEncoders | BuildPhase::BindService => Ok(()),
            BuildPhase::RegisterOutput => {
                if std::mem::take(&mut self.built.output) {
                    self.registries.outputs.remove(&self.ids.output)
                } else {
                    Ok(())
                }
            }
            BuildPhase::RegisterVideoEncoder => {
                if std::mem::take(&mut self.built.video_encoder) {
                    self.registries
                        .encoders
                        .remove_video_encoder(&self.ids.video_encoder)
                } else {
                    Ok(())
                }
            }
            BuildPhase::RegisterAudioEncoder => {
                if std::mem::take(&mut self.built.audio_encoder) {
                    self.registries
                        .encoders
                        .remove_audio_encoder(&self.ids.audio_encoder)
                } else {
                    Ok(())
                }
            }
            BuildPhase::RegisterProvider => {
                if std::mem::take(&mut self.built.provider) {
                    self.registries.providers.remove(&self.ids.provider)
                } else {
                    Ok(())
                }
            }
        };

        if let Err(e) = result {
            warn!(phase = phase.name(), "Rollback step failed: {}", e);
        }
    }
}
