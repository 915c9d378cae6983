//! Audio and video encoder registry.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use streamkit_ipc::{Encoder, EncoderEvent, EncoderKind};
use streamkit_media::{EngineError, HandleKind, MediaEngine};
use streamkit_store::JsonStore;

use crate::context::PipelineContext;
use crate::entity::{settings_arg, EncoderRecord};
use crate::reducer::{Dispatcher, Reducer};
use crate::PipelineResult;

/// Store document holding audio encoders.
pub const AUDIO_ENCODERS_STORE: &str = "AudioEncoders";

/// Store document holding video encoders.
pub const VIDEO_ENCODERS_STORE: &str = "VideoEncoders";

/// Reactive encoder state, in registration order.
#[derive(Debug, Clone, Default)]
pub struct EncoderState {
    pub audio: IndexMap<String, Encoder>,
    pub video: IndexMap<String, Encoder>,
}

impl EncoderState {
    fn map_mut(&mut self, kind: EncoderKind) -> &mut IndexMap<String, Encoder> {
        match kind {
            EncoderKind::Audio => &mut self.audio,
            EncoderKind::Video => &mut self.video,
        }
    }

    /// Encoders of one kind.
    pub fn encoders(&self, kind: EncoderKind) -> &IndexMap<String, Encoder> {
        match kind {
            EncoderKind::Audio => &self.audio,
            EncoderKind::Video => &self.video,
        }
    }
}

impl Reducer for EncoderState {
    type Event = EncoderEvent;

    fn reduce(mut self, event: &EncoderEvent) -> Self {
        match event {
            EncoderEvent::Loaded { kind, encoders } => {
                let map = self.map_mut(*kind);
                for encoder in encoders {
                    map.insert(encoder.unique_id.clone(), encoder.clone());
                }
            }
            EncoderEvent::Added(encoder) => {
                self.map_mut(encoder.kind)
                    .insert(encoder.unique_id.clone(), encoder.clone());
            }
            EncoderEvent::Removed { kind, unique_id } => {
                self.map_mut(*kind).shift_remove(unique_id);
            }
        }
        self
    }
}

/// Owns encoder entities across reactive state, store and engine.
pub struct EncoderRegistry {
    engine: Arc<dyn MediaEngine>,
    audio_store: JsonStore,
    video_store: JsonStore,
    dispatcher: Dispatcher<EncoderState>,
}

impl EncoderRegistry {
    /// Open the encoder stores. Nothing is loaded until [`init`](Self::init).
    pub fn new(ctx: &PipelineContext) -> PipelineResult<Self> {
        Ok(Self {
            engine: Arc::clone(ctx.engine()),
            audio_store: ctx.open_store(AUDIO_ENCODERS_STORE)?,
            video_store: ctx.open_store(VIDEO_ENCODERS_STORE)?,
            dispatcher: Dispatcher::new(),
        })
    }

    /// Load persisted encoders and recreate their engine objects.
    ///
    /// Engine rejection of a persisted entry aborts startup.
    #[instrument(name = "init_encoders", skip(self))]
    pub fn init(&mut self) -> PipelineResult<()> {
        for kind in [EncoderKind::Audio, EncoderKind::Video] {
            self.restore(kind)?;
        }

        info!(
            audio = self.state().audio.len(),
            video = self.state().video.len(),
            "Encoders restored"
        );
        Ok(())
    }

    fn restore(&mut self, kind: EncoderKind) -> PipelineResult<()> {
        let encoders: Vec<Encoder> = self
            .store(kind)
            .entries::<EncoderRecord>()?
            .into_iter()
            .map(|(id, record)| record.into_encoder(kind, id))
            .collect();

        self.dispatcher.dispatch(EncoderEvent::Loaded {
            kind,
            encoders: encoders.clone(),
        });

        for encoder in &encoders {
            self.engine.create(
                HandleKind::encoder(kind),
                &encoder.type_id,
                &encoder.unique_id,
                settings_arg(&encoder.settings),
            )?;
        }

        self.discard_stale(kind)
    }

    fn discard_stale(&mut self, kind: EncoderKind) -> PipelineResult<()> {
        let stale: Vec<String> = self
            .state()
            .encoders(kind)
            .keys()
            .filter(|id| !self.is_encoder(kind, id))
            .cloned()
            .collect();

        for unique_id in stale {
            warn!(kind = kind.name(), %unique_id, "Discarding encoder with no engine object");
            self.dispatcher.dispatch(EncoderEvent::Removed {
                kind,
                unique_id: unique_id.clone(),
            });
            self.store_mut(kind).delete(&unique_id)?;
        }
        Ok(())
    }

    /// Register an encoder whose engine object already exists.
    pub fn add(&mut self, encoder: Encoder) -> PipelineResult<()> {
        debug!(kind = encoder.kind.name(), unique_id = %encoder.unique_id, "Adding encoder");

        let record = EncoderRecord::from(&encoder);
        let (kind, unique_id) = (encoder.kind, encoder.unique_id.clone());
        self.dispatcher.dispatch(EncoderEvent::Added(encoder));
        self.store_mut(kind).set(&unique_id, &record)?;
        Ok(())
    }

    /// Register an audio encoder. Fails for a video encoder.
    pub fn add_audio_encoder(&mut self, encoder: Encoder) -> PipelineResult<()> {
        expect_kind(EncoderKind::Audio, &encoder)?;
        self.add(encoder)
    }

    /// Register a video encoder. Fails for an audio encoder.
    pub fn add_video_encoder(&mut self, encoder: Encoder) -> PipelineResult<()> {
        expect_kind(EncoderKind::Video, &encoder)?;
        self.add(encoder)
    }

    /// Release the engine object, then forget the encoder.
    pub fn remove(&mut self, kind: EncoderKind, unique_id: &str) -> PipelineResult<()> {
        let handle = self.engine.resolve(HandleKind::encoder(kind), unique_id)?;
        self.engine.release(&handle)?;

        self.dispatcher.dispatch(EncoderEvent::Removed {
            kind,
            unique_id: unique_id.to_string(),
        });
        self.store_mut(kind).delete(unique_id)?;

        debug!(kind = kind.name(), unique_id, "Removed encoder");
        Ok(())
    }

    /// Remove an audio encoder.
    pub fn remove_audio_encoder(&mut self, unique_id: &str) -> PipelineResult<()> {
        self.remove(EncoderKind::Audio, unique_id)
    }

    /// Remove a video encoder.
    pub fn remove_video_encoder(&mut self, unique_id: &str) -> PipelineResult<()> {
        self.remove(EncoderKind::Video, unique_id)
    }

    /// Whether the engine has a live encoder of this kind.
    pub fn is_encoder(&self, kind: EncoderKind, unique_id: &str) -> bool {
        self.engine
            .from_name(HandleKind::encoder(kind), unique_id)
            .is_some()
    }

    /// Whether the engine has a live audio encoder with this id.
    pub fn is_audio_encoder(&self, unique_id: &str) -> bool {
        self.is_encoder(EncoderKind::Audio, unique_id)
    }

    /// Whether the engine has a live video encoder with this id.
    pub fn is_video_encoder(&self, unique_id: &str) -> bool {
        self.is_encoder(EncoderKind::Video, unique_id)
    }

    /// Registered audio encoder, from reactive state.
    pub fn audio_encoder(&self, unique_id: &str) -> Option<&Encoder> {
        self.state().audio.get(unique_id)
    }

    /// Registered video encoder, from reactive state.
    pub fn video_encoder(&self, unique_id: &str) -> Option<&Encoder> {
        self.state().video.get(unique_id)
    }

    /// Current reactive state.
    pub fn state(&self) -> &EncoderState {
        self.dispatcher.state()
    }

    /// Receive every change applied from now on.
    pub fn subscribe(&mut self) -> Receiver<EncoderEvent> {
        self.dispatcher.subscribe()
    }

    fn store(&self, kind: EncoderKind) -> &JsonStore {
        match kind {
            EncoderKind::Audio => &self.audio_store,
            EncoderKind::Video => &self.video_store,
        }
    }

    fn store_mut(&mut self, kind: EncoderKind) -> &mut JsonStore {
        match kind {
            EncoderKind::Audio => &mut self.audio_store,
            EncoderKind::Video => &mut self.video_store,
        }
    }
}

fn expect_kind(expected: EncoderKind, encoder: &Encoder) -> Result<(), EngineError> {
    if encoder.kind == expected {
        Ok(())
    } else {
        Err(EngineError::WrongKind {
            expected: HandleKind::encoder(expected),
            actual: HandleKind::encoder(encoder.kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamkit_ipc::Settings;

    fn encoder(kind: EncoderKind, id: &str) -> Encoder {
        Encoder::new(kind, "mf_aac", id, Settings::new())
    }

    #[test]
    fn test_reducer_keeps_kinds_apart_and_order() {
        let state = EncoderState::default()
            .reduce(&EncoderEvent::Added(encoder(EncoderKind::Audio, "encoder_3")))
            .reduce(&EncoderEvent::Added(encoder(EncoderKind::Audio, "encoder_1")))
            .reduce(&EncoderEvent::Added(encoder(EncoderKind::Video, "encoder_2")));

        let audio: Vec<&str> = state.audio.keys().map(String::as_str).collect();
        assert_eq!(audio, ["encoder_3", "encoder_1"]);
        assert_eq!(state.video.len(), 1);

        let state = state.reduce(&EncoderEvent::Removed {
            kind: EncoderKind::Video,
            unique_id: "encoder_3".into(),
        });
        assert_eq!(state.audio.len(), 2);
    }
}
