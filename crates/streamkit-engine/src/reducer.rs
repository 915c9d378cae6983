//! Synchronous state dispatch.

use std::fmt;
use std::mem;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::warn;

use streamkit_ipc::EVENT_CHANNEL_CAPACITY;

/// A state value that folds events into its next version.
pub trait Reducer: Default {
    /// Events this state reacts to.
    type Event: Clone + fmt::Debug;

    /// Produce the next state.
    fn reduce(self, event: &Self::Event) -> Self;
}

/// Owns a registry state and is the only place it changes.
///
/// Every applied event is also offered to subscribers.
pub struct Dispatcher<R: Reducer> {
    state: R,
    subscribers: Vec<Sender<R::Event>>,
}

impl<R: Reducer> Dispatcher<R> {
    /// Start from the default state.
    pub fn new() -> Self {
        Self {
            state: R::default(),
            subscribers: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &R {
        &self.state
    }

    /// Apply an event, then publish it.
    pub fn dispatch(&mut self, event: R::Event) {
        let state = mem::take(&mut self.state);
        self.state = state.reduce(&event);
        self.publish(event);
    }

    /// Receive every event applied from now on.
    pub fn subscribe(&mut self) -> Receiver<R::Event> {
        let (tx, rx) = crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY);
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: R::Event) {
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Subscriber is full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl<R: Reducer> Default for Dispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}
