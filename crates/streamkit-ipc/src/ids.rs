//! Unique id issuance.
//!
//! Ids come from a single issuer that owns one counter per category. Clients
//! reach it over a bounded request channel and block for the reply, up to a
//! timeout.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Channel capacity for id requests.
pub const ID_CHANNEL_CAPACITY: usize = 16;

/// Default time to wait for the issuer.
pub const DEFAULT_ID_TIMEOUT: Duration = Duration::from_secs(5);

/// Entity category an id is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdCategory {
    /// Audio and video encoders share one namespace.
    Encoder,
    Output,
    Provider,
}

impl IdCategory {
    /// Textual prefix of ids in this category.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Encoder => "encoder",
            Self::Output => "output",
            Self::Provider => "provider",
        }
    }

    /// Format a counter value as a unique id, e.g. `output_3`.
    pub fn format(self, counter: u64) -> String {
        format!("{}_{}", self.prefix(), counter)
    }
}

/// Errors returned when requesting an id.
#[derive(Debug, Error)]
pub enum IdError {
    /// The issuer has gone away.
    #[error("ID issuer unavailable")]
    Unavailable,

    /// The issuer did not answer in time.
    #[error("ID issuer did not reply within {0:?}")]
    Timeout(Duration),
}

/// A request for the next id in a category.
#[derive(Debug)]
pub struct IdRequest {
    /// Requested category.
    pub category: IdCategory,

    /// Where the issuer sends the counter value.
    pub reply: Sender<u64>,
}

/// Source of unique ids.
pub trait IdIssuer: Send + Sync {
    /// Request the next counter value in a category. Blocks.
    fn next_id(&self, category: IdCategory) -> Result<u64, IdError>;

    /// Request the next formatted unique id in a category.
    fn unique_id(&self, category: IdCategory) -> Result<String, IdError> {
        Ok(category.format(self.next_id(category)?))
    }
}

/// Creates a bounded id request channel.
pub fn id_channel() -> (Sender<IdRequest>, Receiver<IdRequest>) {
    crossbeam_channel::bounded(ID_CHANNEL_CAPACITY)
}

/// Issuer thread owning the per-category counters.
pub struct IdServer {
    handle: Option<JoinHandle<()>>,
}

impl IdServer {
    /// Spawn the issuer. It runs until every request sender is dropped.
    pub fn spawn(requests: Receiver<IdRequest>) -> Self {
        let handle = thread::spawn(move || serve(requests));
        Self {
            handle: Some(handle),
        }
    }

    /// Wait for the issuer thread to exit.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(requests: Receiver<IdRequest>) {
    info!("ID issuer starting");
    let mut counters: HashMap<IdCategory, u64> = HashMap::new();

    for request in requests.iter() {
        let counter = counters.entry(request.category).or_insert(0);
        *counter += 1;
        debug!(category = request.category.prefix(), id = *counter, "Issued id");

        // The requester may have timed out already.
        let _ = request.reply.send(*counter);
    }

    info!("ID issuer stopped");
}

/// Blocking client of an [`IdServer`].
#[derive(Debug, Clone)]
pub struct IdClient {
    requests: Sender<IdRequest>,
    timeout: Duration,
}

impl IdClient {
    /// Create a client that waits at most `timeout` for each reply.
    pub fn new(requests: Sender<IdRequest>, timeout: Duration) -> Self {
        Self { requests, timeout }
    }
}

impl IdIssuer for IdClient {
    fn next_id(&self, category: IdCategory) -> Result<u64, IdError> {
        let (reply, reply_rx) = crossbeam_channel::bounded(1);

        self.requests
            .send_timeout(IdRequest { category, reply }, self.timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => IdError::Timeout(self.timeout),
                SendTimeoutError::Disconnected(_) => IdError::Unavailable,
            })?;

        reply_rx.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => IdError::Timeout(self.timeout),
            RecvTimeoutError::Disconnected => IdError::Unavailable,
        })
    }
}
