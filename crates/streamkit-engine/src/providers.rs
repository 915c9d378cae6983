//! Provider (streaming destination) registry.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use streamkit_ipc::{Provider, ProviderEvent};
use streamkit_media::{HandleKind, MediaEngine};
use streamkit_store::JsonStore;

use crate::context::PipelineContext;
use crate::entity::{settings_arg, ProviderRecord};
use crate::reducer::{Dispatcher, Reducer};
use crate::PipelineResult;

/// Store document holding providers.
pub const PROVIDERS_STORE: &str = "Providers";

/// Reactive provider state, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ProviderState {
    pub providers: IndexMap<String, Provider>,
}

impl Reducer for ProviderState {
    type Event = ProviderEvent;

    fn reduce(mut self, event: &ProviderEvent) -> Self {
        match event {
            ProviderEvent::Loaded(providers) => {
                for provider in providers {
                    self.providers
                        .insert(provider.unique_id.clone(), provider.clone());
                }
            }
            ProviderEvent::Added(provider) => {
                self.providers
                    .insert(provider.unique_id.clone(), provider.clone());
            }
            ProviderEvent::Removed { unique_id } => {
                self.providers.shift_remove(unique_id);
            }
        }
        self
    }
}

/// Owns provider entities across reactive state, store and engine.
pub struct ProviderRegistry {
    engine: Arc<dyn MediaEngine>,
    store: JsonStore,
    dispatcher: Dispatcher<ProviderState>,
}

impl ProviderRegistry {
    /// Open the provider store. Nothing is loaded until [`init`](Self::init).
    pub fn new(ctx: &PipelineContext) -> PipelineResult<Self> {
        Ok(Self {
            engine: Arc::clone(ctx.engine()),
            store: ctx.open_store(PROVIDERS_STORE)?,
            dispatcher: Dispatcher::new(),
        })
    }

    /// Load persisted providers and recreate their engine services.
    #[instrument(name = "init_providers", skip(self))]
    pub fn init(&mut self) -> PipelineResult<()> {
        let providers: Vec<Provider> = self
            .store
            .entries::<ProviderRecord>()?
            .into_iter()
            .map(|(id, record)| record.into_provider(id))
            .collect();

        self.dispatcher
            .dispatch(ProviderEvent::Loaded(providers.clone()));

        for provider in &providers {
            self.engine.create(
                HandleKind::Service,
                &provider.type_id,
                &provider.unique_id,
                settings_arg(&provider.settings),
            )?;
        }

        let stale: Vec<String> = self
            .providers()
            .keys()
            .filter(|id| !self.is_provider(id))
            .cloned()
            .collect();
        for unique_id in stale {
            warn!(%unique_id, "Discarding provider with no engine service");
            self.dispatcher.dispatch(ProviderEvent::Removed {
                unique_id: unique_id.clone(),
            });
            self.store.delete(&unique_id)?;
        }

        info!(providers = self.providers().len(), "Providers restored");
        Ok(())
    }

    /// Register a provider whose engine service already exists.
    pub fn add(&mut self, provider: Provider) -> PipelineResult<()> {
        debug!(unique_id = %provider.unique_id, "Adding provider");

        let record = ProviderRecord::from(&provider);
        let unique_id = provider.unique_id.clone();
        self.dispatcher.dispatch(ProviderEvent::Added(provider));
        self.store.set(&unique_id, &record)?;
        Ok(())
    }

    /// Release the engine service, then forget the provider.
    pub fn remove(&mut self, unique_id: &str) -> PipelineResult<()> {
        let handle = self.engine.resolve(HandleKind::Service, unique_id)?;
        self.engine.release(&handle)?;

        self.dispatcher.dispatch(ProviderEvent::Removed {
            unique_id: unique_id.to_string(),
        });
        self.store.delete(unique_id)?;

        debug!(unique_id, "Removed provider");
        Ok(())
    }

    /// Whether the engine has a live service with this id.
    pub fn is_provider(&self, unique_id: &str) -> bool {
        self.engine
            .from_name(HandleKind::Service, unique_id)
            .is_some()
    }

    /// Registered provider, from reactive state.
    pub fn provider(&self, unique_id: &str) -> Option<&Provider> {
        self.providers().get(unique_id)
    }

    /// All providers, in registration order.
    pub fn providers(&self) -> &IndexMap<String, Provider> {
        &self.dispatcher.state().providers
    }

    /// Receive every change applied from now on.
    pub fn subscribe(&mut self) -> Receiver<ProviderEvent> {
        self.dispatcher.subscribe()
    }
}
