//! Shared fixtures for the registry and pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;

use streamkit_engine::{PipelineContext, VIDEO_ENCODERS_STORE, AUDIO_ENCODERS_STORE};
use streamkit_ipc::{IdCategory, IdError, IdIssuer, Settings};
use streamkit_media::{EngineResult, Handle, HandleKind, MediaEngine, MemoryEngine};
use streamkit_store::document_path;

/// Issues `prefix_N` ids from per-category counters and counts requests.
#[derive(Debug, Default)]
pub struct CountingIssuer {
    counters: Mutex<HashMap<IdCategory, u64>>,
}

impl CountingIssuer {
    /// Total number of ids handed out.
    pub fn issued(&self) -> u64 {
        self.counters.lock().values().sum()
    }
}

impl IdIssuer for CountingIssuer {
    fn next_id(&self, category: IdCategory) -> Result<u64, IdError> {
        let mut counters = self.counters.lock();
        let counter = counters.entry(category).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

/// Issuer whose process is gone.
pub struct DeadIssuer;

impl IdIssuer for DeadIssuer {
    fn next_id(&self, _category: IdCategory) -> Result<u64, IdError> {
        Err(IdError::Unavailable)
    }
}

/// Wraps a [`MemoryEngine`], logging every call and checking that encoders
/// are on disk by the time they are bound.
pub struct RecordingEngine {
    inner: MemoryEngine,
    data_dir: PathBuf,
    calls: Mutex<Vec<String>>,
    unpersisted_binds: Mutex<Vec<String>>,
}

impl RecordingEngine {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            inner: MemoryEngine::new(),
            data_dir: data_dir.to_path_buf(),
            calls: Mutex::new(Vec::new()),
            unpersisted_binds: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &MemoryEngine {
        &self.inner
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Encoders that were bound before their store entry existed.
    pub fn unpersisted_binds(&self) -> Vec<String> {
        self.unpersisted_binds.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn check_persisted(&self, store: &str, encoder: &Handle) {
        if read_document(&self.data_dir, store).get(encoder.name()).is_none() {
            self.unpersisted_binds.lock().push(encoder.name().to_string());
        }
    }
}

impl MediaEngine for RecordingEngine {
    fn create(
        &self,
        kind: HandleKind,
        type_id: &str,
        unique_id: &str,
        settings: Option<&Settings>,
    ) -> EngineResult<Handle> {
        self.record(format!("create {kind} {unique_id}"));
        self.inner.create(kind, type_id, unique_id, settings)
    }

    fn from_name(&self, kind: HandleKind, unique_id: &str) -> Option<Handle> {
        self.inner.from_name(kind, unique_id)
    }

    fn release(&self, handle: &Handle) -> EngineResult<()> {
        self.record(format!("release {} {}", handle.kind(), handle.name()));
        self.inner.release(handle)
    }

    fn start_output(&self, output: &Handle) -> EngineResult<()> {
        self.record(format!("start {}", output.name()));
        self.inner.start_output(output)
    }

    fn stop_output(&self, output: &Handle) -> EngineResult<()> {
        self.record(format!("stop {}", output.name()));
        self.inner.stop_output(output)
    }

    fn set_audio_encoder(
        &self,
        output: &Handle,
        encoder: &Handle,
        track: usize,
    ) -> EngineResult<()> {
        self.record(format!("bind audio {} {}", output.name(), encoder.name()));
        self.check_persisted(AUDIO_ENCODERS_STORE, encoder);
        self.inner.set_audio_encoder(output, encoder, track)
    }

    fn set_video_encoder(&self, output: &Handle, encoder: &Handle) -> EngineResult<()> {
        self.record(format!("bind video {} {}", output.name(), encoder.name()));
        self.check_persisted(VIDEO_ENCODERS_STORE, encoder);
        self.inner.set_video_encoder(output, encoder)
    }

    fn set_service(&self, output: &Handle, service: &Handle) -> EngineResult<()> {
        self.record(format!("bind service {} {}", output.name(), service.name()));
        self.inner.set_service(output, service)
    }
}

/// A data directory plus the collaborators of one simulated process.
pub struct Harness {
    pub dir: TempDir,
    pub engine: Arc<MemoryEngine>,
    pub ids: Arc<CountingIssuer>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            engine: Arc::new(MemoryEngine::new()),
            ids: Arc::new(CountingIssuer::default()),
        }
    }

    /// Simulate a new process over the same data directory.
    pub fn restart(&mut self) {
        self.engine = Arc::new(MemoryEngine::new());
        self.ids = Arc::new(CountingIssuer::default());
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn context(&self) -> PipelineContext {
        let engine: Arc<dyn MediaEngine> = self.engine.clone();
        let ids: Arc<dyn IdIssuer> = self.ids.clone();
        PipelineContext::new(engine, ids, self.data_dir())
    }

    /// Current contents of a store document.
    pub fn document(&self, name: &str) -> Value {
        read_document(self.data_dir(), name)
    }

    /// Seed a store document before the registries open it.
    pub fn write_document(&self, name: &str, document: Value) {
        let path = document_path(self.data_dir(), name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    }
}

/// Read a store document from disk. A missing file reads as `{}`.
pub fn read_document(data_dir: &Path, name: &str) -> Value {
    match std::fs::read_to_string(document_path(data_dir, name)) {
        Ok(text) => serde_json::from_str(&text).unwrap(),
        Err(_) => Value::Object(Default::default()),
    }
}

/// Settings from a JSON object literal.
pub fn settings(value: Value) -> Settings {
    match value {
        Value::Object(map) => map,
        other => panic!("settings must be an object, got {other}"),
    }
}
