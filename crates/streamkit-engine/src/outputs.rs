//! Output registry: outputs, their bindings and their running state.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use streamkit_ipc::{Output, OutputEvent};
use streamkit_media::{HandleKind, MediaEngine};
use streamkit_store::JsonStore;

use crate::context::PipelineContext;
use crate::encoders::EncoderRegistry;
use crate::entity::{
    settings_arg, OutputRecord, AUDIO_ENCODER_FIELD, PROVIDER_FIELD, VIDEO_ENCODER_FIELD,
};
use crate::providers::ProviderRegistry;
use crate::reducer::{Dispatcher, Reducer};
use crate::{PipelineError, PipelineResult};

/// Store document holding outputs.
pub const OUTPUTS_STORE: &str = "Outputs";

/// Track the audio encoder is bound to.
pub const AUDIO_TRACK: usize = 0;

/// Reactive output state, in registration order.
#[derive(Debug, Clone, Default)]
pub struct OutputState {
    pub outputs: IndexMap<String, Output>,
}

impl Reducer for OutputState {
    type Event = OutputEvent;

    fn reduce(mut self, event: &OutputEvent) -> Self {
        match event {
            OutputEvent::Loaded(outputs) => {
                for output in outputs {
                    self.outputs.insert(output.unique_id.clone(), output.clone());
                }
            }
            OutputEvent::Added(output) => {
                self.outputs.insert(output.unique_id.clone(), output.clone());
            }
            OutputEvent::Removed { unique_id } => {
                self.outputs.shift_remove(unique_id);
            }
            OutputEvent::EncodersUpdated {
                unique_id,
                audio_encoder_id,
                video_encoder_id,
            } => {
                if let Some(output) = self.outputs.get_mut(unique_id) {
                    output.audio_encoder_id = audio_encoder_id.clone();
                    output.video_encoder_id = video_encoder_id.clone();
                }
            }
            OutputEvent::ServiceUpdated {
                unique_id,
                provider_id,
            } => {
                if let Some(output) = self.outputs.get_mut(unique_id) {
                    output.provider_id = provider_id.clone();
                }
            }
            OutputEvent::Started { unique_id } => {
                if let Some(output) = self.outputs.get_mut(unique_id) {
                    output.active = true;
                }
            }
            OutputEvent::Stopped { unique_id } => {
                if let Some(output) = self.outputs.get_mut(unique_id) {
                    output.active = false;
                }
            }
        }
        self
    }
}

/// Owns output entities across reactive state, store and engine.
pub struct OutputRegistry {
    engine: Arc<dyn MediaEngine>,
    store: JsonStore,
    dispatcher: Dispatcher<OutputState>,
}

impl OutputRegistry {
    /// Open the output store. Nothing is loaded until [`init`](Self::init).
    pub fn new(ctx: &PipelineContext) -> PipelineResult<Self> {
        Ok(Self {
            engine: Arc::clone(ctx.engine()),
            store: ctx.open_store(OUTPUTS_STORE)?,
            dispatcher: Dispatcher::new(),
        })
    }

    /// Load persisted outputs, recreate their engine objects and rebind the
    /// references that still resolve.
    ///
    /// Outputs come back with no references set; only references whose
    /// targets are live get bound again. Dangling references are dropped from
    /// the store.
    #[instrument(name = "init_outputs", skip_all)]
    pub fn init(
        &mut self,
        encoders: &EncoderRegistry,
        providers: &ProviderRegistry,
    ) -> PipelineResult<()> {
        let records = self.store.entries::<OutputRecord>()?;

        let outputs: Vec<Output> = records
            .iter()
            .map(|(id, record)| {
                Output::new(record.type_id.clone(), id.clone(), record.settings.clone())
            })
            .collect();
        self.dispatcher.dispatch(OutputEvent::Loaded(outputs.clone()));

        for output in &outputs {
            self.engine.create(
                HandleKind::Output,
                &output.type_id,
                &output.unique_id,
                settings_arg(&output.settings),
            )?;
        }

        self.discard_stale()?;

        for (unique_id, record) in records {
            if !self.contains(&unique_id) {
                continue;
            }
            self.restore_encoders(&unique_id, &record, encoders)?;
            self.restore_service(&unique_id, &record, providers)?;
        }

        info!(outputs = self.outputs().len(), "Outputs restored");
        Ok(())
    }

    fn discard_stale(&mut self) -> PipelineResult<()> {
        let stale: Vec<String> = self
            .outputs()
            .keys()
            .filter(|id| !self.is_output(id))
            .cloned()
            .collect();

        for unique_id in stale {
            warn!(%unique_id, "Discarding output with no engine object");
            self.dispatcher.dispatch(OutputEvent::Removed {
                unique_id: unique_id.clone(),
            });
            self.store.delete(&unique_id)?;
        }
        Ok(())
    }

    fn restore_encoders(
        &mut self,
        unique_id: &str,
        record: &OutputRecord,
        encoders: &EncoderRegistry,
    ) -> PipelineResult<()> {
        match (&record.audio_encoder, &record.video_encoder) {
            (None, None) => Ok(()),
            (Some(audio), Some(video))
                if encoders.is_audio_encoder(audio) && encoders.is_video_encoder(video) =>
            {
                self.set_output_encoders(unique_id, audio, video)
            }
            (audio, video) => {
                warn!(
                    output = unique_id,
                    ?audio,
                    ?video,
                    "Dropping unresolved encoder references"
                );
                self.store.delete_field(unique_id, AUDIO_ENCODER_FIELD)?;
                self.store.delete_field(unique_id, VIDEO_ENCODER_FIELD)?;
                Ok(())
            }
        }
    }

    fn restore_service(
        &mut self,
        unique_id: &str,
        record: &OutputRecord,
        providers: &ProviderRegistry,
    ) -> PipelineResult<()> {
        match &record.provider {
            None => Ok(()),
            Some(provider) if providers.is_provider(provider) => {
                self.set_output_service(unique_id, provider)
            }
            Some(provider) => {
                warn!(output = unique_id, %provider, "Dropping unresolved provider reference");
                self.store.delete_field(unique_id, PROVIDER_FIELD)?;
                Ok(())
            }
        }
    }

    /// Register an output whose engine object already exists.
    pub fn add(&mut self, output: Output) -> PipelineResult<()> {
        debug!(unique_id = %output.unique_id, "Adding output");

        let record = OutputRecord::from(&output);
        let unique_id = output.unique_id.clone();
        self.dispatcher.dispatch(OutputEvent::Added(output));
        self.store.set(&unique_id, &record)?;
        Ok(())
    }

    /// Release the engine object, then forget the output.
    pub fn remove(&mut self, unique_id: &str) -> PipelineResult<()> {
        let handle = self.engine.resolve(HandleKind::Output, unique_id)?;
        self.engine.release(&handle)?;

        self.dispatcher.dispatch(OutputEvent::Removed {
            unique_id: unique_id.to_string(),
        });
        self.store.delete(unique_id)?;

        debug!(unique_id, "Removed output");
        Ok(())
    }

    /// Bind an encoder pair to an output.
    ///
    /// The encoder ids are not checked against the encoder registry; callers
    /// check `is_audio_encoder`/`is_video_encoder` first. Ids with no live
    /// engine object fail the call.
    pub fn set_output_encoders(
        &mut self,
        unique_id: &str,
        audio_encoder_id: &str,
        video_encoder_id: &str,
    ) -> PipelineResult<()> {
        self.ensure_known(unique_id)?;

        let audio = self
            .engine
            .resolve(HandleKind::AudioEncoder, audio_encoder_id)?;
        let video = self
            .engine
            .resolve(HandleKind::VideoEncoder, video_encoder_id)?;
        let output = self.engine.resolve(HandleKind::Output, unique_id)?;

        self.engine.set_audio_encoder(&output, &audio, AUDIO_TRACK)?;
        self.engine.set_video_encoder(&output, &video)?;

        self.dispatcher.dispatch(OutputEvent::EncodersUpdated {
            unique_id: unique_id.to_string(),
            audio_encoder_id: Some(audio_encoder_id.to_string()),
            video_encoder_id: Some(video_encoder_id.to_string()),
        });
        self.store
            .set_field(unique_id, AUDIO_ENCODER_FIELD, &audio_encoder_id)?;
        self.store
            .set_field(unique_id, VIDEO_ENCODER_FIELD, &video_encoder_id)?;

        debug!(
            output = unique_id,
            audio = audio_encoder_id,
            video = video_encoder_id,
            "Bound encoders"
        );
        Ok(())
    }

    /// Bind a provider's service to an output.
    pub fn set_output_service(&mut self, unique_id: &str, provider_id: &str) -> PipelineResult<()> {
        self.ensure_known(unique_id)?;

        let service = self.engine.resolve(HandleKind::Service, provider_id)?;
        let output = self.engine.resolve(HandleKind::Output, unique_id)?;

        self.engine.set_service(&output, &service)?;

        self.dispatcher.dispatch(OutputEvent::ServiceUpdated {
            unique_id: unique_id.to_string(),
            provider_id: Some(provider_id.to_string()),
        });
        self.store.set_field(unique_id, PROVIDER_FIELD, &provider_id)?;

        debug!(output = unique_id, provider = provider_id, "Bound service");
        Ok(())
    }

    /// Start an output.
    pub fn start(&mut self, unique_id: &str) -> PipelineResult<()> {
        let output = self.engine.resolve(HandleKind::Output, unique_id)?;
        self.engine.start_output(&output)?;

        self.dispatcher.dispatch(OutputEvent::Started {
            unique_id: unique_id.to_string(),
        });
        Ok(())
    }

    /// Stop an output.
    pub fn stop(&mut self, unique_id: &str) -> PipelineResult<()> {
        let output = self.engine.resolve(HandleKind::Output, unique_id)?;
        self.engine.stop_output(&output)?;

        self.dispatcher.dispatch(OutputEvent::Stopped {
            unique_id: unique_id.to_string(),
        });
        Ok(())
    }

    /// Whether this process started the output. False for unknown ids.
    pub fn is_output_active(&self, unique_id: &str) -> bool {
        self.output(unique_id).is_some_and(|output| output.active)
    }

    /// Whether the engine has a live output with this id.
    pub fn is_output(&self, unique_id: &str) -> bool {
        self.engine
            .from_name(HandleKind::Output, unique_id)
            .is_some()
    }

    /// Registered output with its current bindings.
    pub fn output(&self, unique_id: &str) -> Option<&Output> {
        self.outputs().get(unique_id)
    }

    /// All outputs, in registration order.
    pub fn outputs(&self) -> &IndexMap<String, Output> {
        &self.dispatcher.state().outputs
    }

    /// Receive every change applied from now on.
    pub fn subscribe(&mut self) -> Receiver<OutputEvent> {
        self.dispatcher.subscribe()
    }

    fn contains(&self, unique_id: &str) -> bool {
        self.outputs().contains_key(unique_id)
    }

    fn ensure_known(&self, unique_id: &str) -> PipelineResult<()> {
        if self.contains(unique_id) {
            Ok(())
        } else {
            Err(PipelineError::UnknownEntity {
                kind: "output",
                unique_id: unique_id.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamkit_ipc::Settings;

    #[test]
    fn test_reducer_ignores_updates_for_unknown_outputs() {
        let state = OutputState::default()
            .reduce(&OutputEvent::Added(Output::new(
                "rtmp_output",
                "output_1",
                Settings::new(),
            )))
            .reduce(&OutputEvent::Started {
                unique_id: "output_9".into(),
            })
            .reduce(&OutputEvent::ServiceUpdated {
                unique_id: "output_1".into(),
                provider_id: Some("provider_1".into()),
            });

        assert_eq!(state.outputs.len(), 1);
        let output = &state.outputs["output_1"];
        assert!(!output.active);
        assert_eq!(output.provider_id.as_deref(), Some("provider_1"));
    }
}
