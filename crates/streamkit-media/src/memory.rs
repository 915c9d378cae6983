//! In-process media engine.

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;
use tracing::{debug, info};

use streamkit_ipc::Settings;

use crate::{
    EngineError, EngineResult, Handle, HandleKind, MediaEngine, AUDIO_ENCODER_TYPES, OUTPUT_TYPES,
    SERVICE_TYPES, VIDEO_ENCODER_TYPES,
};

/// What an output is currently wired to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBindings {
    /// Audio encoder id per track.
    pub audio_tracks: BTreeMap<usize, String>,

    /// Video encoder id.
    pub video_encoder: Option<String>,

    /// Service id.
    pub service: Option<String>,

    /// Whether the output is running.
    pub active: bool,
}

#[derive(Debug)]
struct LiveObject {
    type_id: String,
    settings: Settings,
    bindings: OutputBindings,
}

#[derive(Debug, Default)]
struct Inner {
    catalog: HashMap<HandleKind, HashSet<String>>,
    objects: HashMap<(HandleKind, String), LiveObject>,
}

impl Inner {
    fn object_mut(&mut self, handle: &Handle) -> EngineResult<&mut LiveObject> {
        self.objects
            .get_mut(&(handle.kind(), handle.name().to_string()))
            .ok_or_else(|| EngineError::HandleNotFound {
                kind: handle.kind(),
                unique_id: handle.name().to_string(),
            })
    }

    fn ensure_live(&self, handle: &Handle) -> EngineResult<()> {
        if self
            .objects
            .contains_key(&(handle.kind(), handle.name().to_string()))
        {
            Ok(())
        } else {
            Err(EngineError::HandleNotFound {
                kind: handle.kind(),
                unique_id: handle.name().to_string(),
            })
        }
    }

    /// Resolve an output handle and a live target of the given kind.
    fn bind_target(
        &mut self,
        output: &Handle,
        target: &Handle,
        expected: HandleKind,
    ) -> EngineResult<&mut OutputBindings> {
        output.expect_kind(HandleKind::Output)?;
        target.expect_kind(expected)?;
        self.ensure_live(target)?;
        Ok(&mut self.object_mut(output)?.bindings)
    }
}

/// Media engine that keeps its objects in memory.
///
/// Objects can only be created from types in the catalog. Bindings and the
/// running flag of outputs are tracked so callers can inspect the wiring.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    inner: Mutex<Inner>,
}

impl MemoryEngine {
    /// Create an engine with the default type catalog.
    pub fn new() -> Self {
        let engine = Self::empty();
        for (kind, types) in [
            (HandleKind::AudioEncoder, AUDIO_ENCODER_TYPES),
            (HandleKind::VideoEncoder, VIDEO_ENCODER_TYPES),
            (HandleKind::Output, OUTPUT_TYPES),
            (HandleKind::Service, SERVICE_TYPES),
        ] {
            for type_id in types {
                engine.register_type(kind, type_id);
            }
        }
        engine
    }

    /// Create an engine that knows no types.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a type to the catalog.
    pub fn register_type(&self, kind: HandleKind, type_id: &str) {
        self.inner
            .lock()
            .catalog
            .entry(kind)
            .or_default()
            .insert(type_id.to_string());
    }

    /// Total number of live objects.
    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Type and settings a live object was created with.
    pub fn describe(&self, kind: HandleKind, unique_id: &str) -> Option<(String, Settings)> {
        self.inner
            .lock()
            .objects
            .get(&(kind, unique_id.to_string()))
            .map(|obj| (obj.type_id.clone(), obj.settings.clone()))
    }

    /// Current wiring of a live output.
    pub fn output_bindings(&self, unique_id: &str) -> Option<OutputBindings> {
        self.inner
            .lock()
            .objects
            .get(&(HandleKind::Output, unique_id.to_string()))
            .map(|obj| obj.bindings.clone())
    }
}

impl MediaEngine for MemoryEngine {
    fn create(
        &self,
        kind: HandleKind,
        type_id: &str,
        unique_id: &str,
        settings: Option<&Settings>,
    ) -> EngineResult<Handle> {
        let mut inner = self.inner.lock();

        let known = inner
            .catalog
            .get(&kind)
            .is_some_and(|types| types.contains(type_id));
        if !known {
            return Err(EngineError::UnknownType {
                kind,
                type_id: type_id.to_string(),
            });
        }

        let key = (kind, unique_id.to_string());
        if inner.objects.contains_key(&key) {
            return Err(EngineError::DuplicateId {
                kind,
                unique_id: unique_id.to_string(),
            });
        }

        inner.objects.insert(
            key,
            LiveObject {
                type_id: type_id.to_string(),
                settings: settings.cloned().unwrap_or_default(),
                bindings: OutputBindings::default(),
            },
        );

        debug!(%kind, type_id, unique_id, "Created engine object");
        Ok(Handle::new(kind, unique_id))
    }

    fn from_name(&self, kind: HandleKind, unique_id: &str) -> Option<Handle> {
        let inner = self.inner.lock();
        inner
            .objects
            .contains_key(&(kind, unique_id.to_string()))
            .then(|| Handle::new(kind, unique_id))
    }

    fn release(&self, handle: &Handle) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        inner
            .objects
            .remove(&(handle.kind(), handle.name().to_string()))
            .ok_or_else(|| EngineError::HandleNotFound {
                kind: handle.kind(),
                unique_id: handle.name().to_string(),
            })?;

        debug!(kind = %handle.kind(), unique_id = handle.name(), "Released engine object");
        Ok(())
    }

    fn start_output(&self, output: &Handle) -> EngineResult<()> {
        output.expect_kind(HandleKind::Output)?;
        let mut inner = self.inner.lock();
        inner.object_mut(output)?.bindings.active = true;

        info!(output = output.name(), "Output started");
        Ok(())
    }

    fn stop_output(&self, output: &Handle) -> EngineResult<()> {
        output.expect_kind(HandleKind::Output)?;
        let mut inner = self.inner.lock();
        inner.object_mut(output)?.bindings.active = false;

        info!(output = output.name(), "Output stopped");
        Ok(())
    }

    fn set_audio_encoder(
        &self,
        output: &Handle,
        encoder: &Handle,
        track: usize,
    ) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        let bindings = inner.bind_target(output, encoder, HandleKind::AudioEncoder)?;
        bindings
            .audio_tracks
            .insert(track, encoder.name().to_string());
        Ok(())
    }

    fn set_video_encoder(&self, output: &Handle, encoder: &Handle) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        let bindings = inner.bind_target(output, encoder, HandleKind::VideoEncoder)?;
        bindings.video_encoder = Some(encoder.name().to_string());
        Ok(())
    }

    fn set_service(&self, output: &Handle, service: &Handle) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        let bindings = inner.bind_target(output, service, HandleKind::Service)?;
        bindings.service = Some(service.name().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_unknown_type_and_duplicates() {
        let engine = MemoryEngine::new();

        let err = engine
            .create(HandleKind::VideoEncoder, "mf_aac", "encoder_1", None)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownType { .. }));

        engine
            .create(HandleKind::VideoEncoder, "obs_x264", "encoder_1", None)
            .unwrap();
        let err = engine
            .create(HandleKind::VideoEncoder, "obs_x264", "encoder_1", None)
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateId { .. }));
    }

    #[test]
    fn test_lookup_is_per_kind() {
        let engine = MemoryEngine::new();
        engine
            .create(HandleKind::AudioEncoder, "mf_aac", "encoder_1", None)
            .unwrap();

        assert!(engine.from_name(HandleKind::AudioEncoder, "encoder_1").is_some());
        assert!(engine.from_name(HandleKind::VideoEncoder, "encoder_1").is_none());
    }

    #[test]
    fn test_bindings_and_release() {
        let engine = MemoryEngine::new();
        let output = engine
            .create(HandleKind::Output, "rtmp_output", "output_1", None)
            .unwrap();
        let audio = engine
            .create(HandleKind::AudioEncoder, "mf_aac", "encoder_1", None)
            .unwrap();
        let service = engine
            .create(HandleKind::Service, "rtmp_common", "provider_1", None)
            .unwrap();

        engine.set_audio_encoder(&output, &audio, 0).unwrap();
        engine.set_service(&output, &service).unwrap();
        let err = engine.set_video_encoder(&output, &audio).unwrap_err();
        assert!(matches!(err, EngineError::WrongKind { .. }));

        let bindings = engine.output_bindings("output_1").unwrap();
        assert_eq!(bindings.audio_tracks.get(&0).map(String::as_str), Some("encoder_1"));
        assert_eq!(bindings.service.as_deref(), Some("provider_1"));

        engine.release(&audio).unwrap();
        assert!(engine.release(&audio).is_err());
        assert_eq!(engine.object_count(), 2);
    }
}
