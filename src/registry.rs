//! Network client registry
//!
//! Resolves an opaque network-client id to the chain id, provider, and
//! block event source for that configured endpoint.

use crate::blocks::BlockEventSource;
use crate::rpc::Provider;
use crate::types::{ChainId, NetworkClientId};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// The collaborators bound to one configured network endpoint.
#[derive(Clone)]
pub struct NetworkClient {
    /// Chain id of the network this client talks to.
    pub chain_id: ChainId,
    /// JSON-RPC provider for the endpoint.
    pub provider: Arc<dyn Provider>,
    /// Latest-block event source for the endpoint.
    pub block_source: Arc<dyn BlockEventSource>,
}

/// Resolves network-client ids.
///
/// Lookup failures propagate to the caller unchanged; the tracker performs
/// no id validation of its own.
pub trait NetworkRegistry: Send + Sync {
    /// Resolve a network-client id to its client bundle.
    fn get_network_client_by_id(&self, id: &str) -> Result<NetworkClient>;
}

/// Map-backed registry over a fixed set of configured networks.
pub struct StaticRegistry {
    clients: HashMap<NetworkClientId, NetworkClient>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Register a network client under an id, replacing any previous entry.
    pub fn insert(&mut self, id: impl Into<NetworkClientId>, client: NetworkClient) {
        self.clients.insert(id.into(), client);
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkRegistry for StaticRegistry {
    fn get_network_client_by_id(&self, id: &str) -> Result<NetworkClient> {
        self.clients
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown network client id: {}", id))
    }
}
