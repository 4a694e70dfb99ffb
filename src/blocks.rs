//! Block arrival event sources
//!
//! `BlockEventSource` is the subscribe/unsubscribe seam the tracker uses to
//! learn about new latest blocks; one source per configured network.
//! `PollingBlockSource` is the production implementation: a tokio interval
//! loop that polls the provider and fires listeners once per new block.

use crate::rpc::Provider;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Callback invoked with the new latest block number.
pub type BlockListener = Arc<dyn Fn(u64) + Send + Sync>;

/// Handle identifying one registered listener. Sources mint these however
/// they like; the tracker only stores and returns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Source of "latest block" events for one network.
///
/// Registration and removal are synchronous; removing an unknown id is a
/// no-op. Listeners may fire (from events already in flight) after removal.
pub trait BlockEventSource: Send + Sync {
    /// Register a listener for latest-block events.
    fn add_listener(&self, listener: BlockListener) -> ListenerId;

    /// Remove a previously registered listener.
    fn remove_listener(&self, id: ListenerId);
}

/// Polls a provider for new blocks and fans events out to listeners.
pub struct PollingBlockSource {
    provider: Arc<dyn Provider>,
    interval: Duration,
    listeners: Mutex<HashMap<ListenerId, BlockListener>>,
    next_id: AtomicU64,
    last_seen: Mutex<Option<u64>>,
}

impl PollingBlockSource {
    /// Create a new polling source over the given provider.
    pub fn new(provider: Arc<dyn Provider>, interval: Duration) -> Self {
        Self {
            provider,
            interval,
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            last_seen: Mutex::new(None),
        }
    }

    /// Run the polling loop.
    ///
    /// Fires each registered listener once per newly observed block number.
    /// Poll failures are logged and the loop keeps going; the provider owns
    /// retry and timeout policy.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;

            let header = match self.provider.latest_block().await {
                Ok(header) => header,
                Err(err) => {
                    warn!("Failed to poll latest block: {:#}", err);
                    continue;
                }
            };

            let is_new = {
                let mut last = self.last_seen.lock().unwrap();
                if last.map_or(true, |n| header.number > n) {
                    *last = Some(header.number);
                    true
                } else {
                    false
                }
            };

            if !is_new {
                continue;
            }

            debug!("New latest block {}", header.number);

            // Snapshot listeners so callbacks run without the lock held.
            let listeners: Vec<BlockListener> =
                self.listeners.lock().unwrap().values().cloned().collect();
            for listener in listeners {
                listener(header.number);
            }
        }
    }
}

impl BlockEventSource for PollingBlockSource {
    fn add_listener(&self, listener: BlockListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().unwrap().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().remove(&id);
    }
}
