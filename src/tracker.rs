//! Account balance tracker
//!
//! Owns per-network block subscriptions and a cache of account balances
//! partitioned by chain. Each latest-block event (or explicit call)
//! triggers a refresh cycle for one network: fetch the block gas limit,
//! fetch balances for the tracked accounts, merge into cached state.
//!
//! Balances come either from the batched balance-checker contract (one
//! `eth_call` for all accounts, on chains that have it deployed) or from
//! per-account `eth_getBalance` calls.

use crate::blocks::{BlockEventSource, BlockListener, ListenerId};
use crate::checker;
use crate::context::{is_local_network, TrackerContext};
use crate::error::TrackerError;
use crate::registry::NetworkRegistry;
use crate::rpc::Provider;
use crate::types::{ChainId, NetworkClientId};
use alloy_primitives::{Address, U256};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One tracked account. `balance` is None when unknown: either never
/// fetched, or explicitly cleared because single-account mode only
/// refreshes the selected address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackedAccount {
    pub address: Address,
    pub balance: Option<U256>,
}

/// Read-only snapshot of tracker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    /// Accounts on the currently active chain.
    pub accounts: HashMap<Address, TrackedAccount>,
    /// Accounts partitioned by chain id.
    pub accounts_by_chain_id: HashMap<ChainId, HashMap<Address, TrackedAccount>>,
    /// Gas limit from the last default-network refresh.
    pub current_block_gas_limit: Option<U256>,
    /// Last-observed gas limit per chain id.
    pub current_block_gas_limit_by_chain_id: HashMap<ChainId, U256>,
}

/// Opaque handle returned by `start_polling_by_network_client_id`,
/// redeemable exactly once via `stop_polling_by_polling_token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollingToken(u64);

struct TrackerState {
    accounts: HashMap<Address, TrackedAccount>,
    accounts_by_chain: HashMap<ChainId, HashMap<Address, TrackedAccount>>,
    current_block_gas_limit: Option<U256>,
    gas_limit_by_chain: HashMap<ChainId, U256>,
}

/// One active non-default subscription. At most one block listener exists
/// per network-client id; `tokens` holds the outstanding handles of every
/// caller that requested it.
struct Subscription {
    network_client_id: NetworkClientId,
    block_source: Arc<dyn BlockEventSource>,
    listener: ListenerId,
    tokens: HashSet<PollingToken>,
}

struct SubscriptionTable {
    default_listener: Option<ListenerId>,
    // Creation order matters: update_accounts_all_active_networks walks
    // subscriptions oldest-first.
    active: Vec<Subscription>,
    next_token: u64,
}

impl SubscriptionTable {
    fn mint_token(&mut self) -> PollingToken {
        let token = PollingToken(self.next_token);
        self.next_token += 1;
        token
    }
}

/// Event-driven balance poller over injected provider, block-source,
/// registry, and context collaborators.
pub struct AccountTracker {
    provider: Arc<dyn Provider>,
    block_source: Arc<dyn BlockEventSource>,
    registry: Arc<dyn NetworkRegistry>,
    context: Arc<dyn TrackerContext>,
    state: Mutex<TrackerState>,
    subs: Mutex<SubscriptionTable>,
}

impl AccountTracker {
    /// Create a tracker seeded with a snapshot of the currently known
    /// accounts (no balances). The default provider and block source are
    /// the globally selected network's.
    pub fn new(
        provider: Arc<dyn Provider>,
        block_source: Arc<dyn BlockEventSource>,
        registry: Arc<dyn NetworkRegistry>,
        context: Arc<dyn TrackerContext>,
        initial_accounts: &[Address],
    ) -> Self {
        let seeded: HashMap<Address, TrackedAccount> = initial_accounts
            .iter()
            .map(|&address| {
                (
                    address,
                    TrackedAccount {
                        address,
                        balance: None,
                    },
                )
            })
            .collect();
        let mut accounts_by_chain = HashMap::new();
        accounts_by_chain.insert(context.current_chain_id(), seeded.clone());

        Self {
            provider,
            block_source,
            registry,
            context,
            state: Mutex::new(TrackerState {
                accounts: seeded,
                accounts_by_chain,
                current_block_gas_limit: None,
                gas_limit_by_chain: HashMap::new(),
            }),
            subs: Mutex::new(SubscriptionTable {
                default_listener: None,
                active: Vec::new(),
                next_token: 0,
            }),
        }
    }

    /// Subscribe to the default network's block source and trigger one
    /// unscoped refresh. Any previous default listener is torn down first,
    /// so repeated calls restart the subscription.
    pub fn start(self: &Arc<Self>) {
        {
            let mut subs = self.subs.lock().unwrap();
            if let Some(id) = subs.default_listener.take() {
                self.block_source.remove_listener(id);
            }
            let listener = self.block_listener(None);
            subs.default_listener = Some(self.block_source.add_listener(listener));
        }
        debug!("Started default-network block subscription");
        self.spawn_refresh(None);
    }

    /// Unsubscribe from the default network's block source.
    pub fn stop(&self) {
        let mut subs = self.subs.lock().unwrap();
        if let Some(id) = subs.default_listener.take() {
            self.block_source.remove_listener(id);
        }
    }

    /// Begin polling the network behind `network_client_id`.
    ///
    /// The first caller for an id registers a block listener and triggers
    /// one refresh scoped to that network; later callers share the
    /// listener. Every call returns a distinct token.
    pub fn start_polling_by_network_client_id(
        self: &Arc<Self>,
        network_client_id: &str,
    ) -> Result<PollingToken, TrackerError> {
        let token = {
            let mut subs = self.subs.lock().unwrap();
            let token = subs.mint_token();

            if let Some(sub) = subs
                .active
                .iter_mut()
                .find(|s| s.network_client_id == network_client_id)
            {
                sub.tokens.insert(token);
                return Ok(token);
            }

            let client = self
                .registry
                .get_network_client_by_id(network_client_id)
                .map_err(TrackerError::Registry)?;
            let listener = self.block_listener(Some(network_client_id.to_string()));
            let listener_id = client.block_source.add_listener(listener);
            subs.active.push(Subscription {
                network_client_id: network_client_id.to_string(),
                block_source: client.block_source,
                listener: listener_id,
                tokens: HashSet::from([token]),
            });
            token
        };

        debug!("Started block subscription for {}", network_client_id);
        self.spawn_refresh(Some(network_client_id.to_string()));
        Ok(token)
    }

    /// Redeem a polling token. When the last token for a network-client id
    /// is redeemed, its block listener is removed.
    pub fn stop_polling_by_polling_token(
        &self,
        token: Option<PollingToken>,
    ) -> Result<(), TrackerError> {
        let token = token.ok_or(TrackerError::MissingPollingToken)?;

        let mut subs = self.subs.lock().unwrap();
        let pos = subs
            .active
            .iter()
            .position(|s| s.tokens.contains(&token))
            .ok_or(TrackerError::UnknownPollingToken)?;

        subs.active[pos].tokens.remove(&token);
        if subs.active[pos].tokens.is_empty() {
            let sub = subs.active.remove(pos);
            sub.block_source.remove_listener(sub.listener);
            debug!("Stopped block subscription for {}", sub.network_client_id);
        }
        Ok(())
    }

    /// Tear down every non-default subscription, discarding all
    /// outstanding tokens regardless of refcount.
    pub fn stop_all_polling(&self) {
        let mut subs = self.subs.lock().unwrap();
        for sub in subs.active.drain(..) {
            sub.block_source.remove_listener(sub.listener);
        }
    }

    /// Run one refresh cycle: the default network when `network_client_id`
    /// is None, otherwise the network the registry resolves the id to.
    ///
    /// No-op until onboarding has completed. An RPC failure aborts the
    /// cycle and propagates; state already written earlier in the cycle
    /// (the gas limit) is not rolled back.
    pub async fn update_accounts(
        &self,
        network_client_id: Option<&str>,
    ) -> Result<(), TrackerError> {
        if !self.context.completed_onboarding() {
            return Ok(());
        }

        let (chain_id, provider) = match network_client_id {
            Some(id) => {
                let client = self
                    .registry
                    .get_network_client_by_id(id)
                    .map_err(TrackerError::Registry)?;
                (client.chain_id, client.provider)
            }
            None => (self.context.current_chain_id(), self.provider.clone()),
        };

        let header = provider
            .latest_block()
            .await
            .map_err(TrackerError::Upstream)?;
        {
            let mut state = self.state.lock().unwrap();
            state.gas_limit_by_chain.insert(chain_id, header.gas_limit);
            if network_client_id.is_none() {
                state.current_block_gas_limit = Some(header.gas_limit);
            }
        }

        // The accounts to refresh: the chain's bucket, or just the selected
        // account when the chain has no entries yet. Selected is always
        // included.
        let selected = self.context.selected_account();
        let mut addresses: Vec<Address> = {
            let state = self.state.lock().unwrap();
            match state.accounts_by_chain.get(&chain_id) {
                Some(bucket) if !bucket.is_empty() => bucket.keys().copied().collect(),
                _ => vec![selected],
            }
        };
        if !addresses.contains(&selected) {
            addresses.push(selected);
        }

        let multi = self.context.use_multi_account_balance_checker();
        // The batch contract is never deployed on local test networks even
        // if the chain id says otherwise.
        let contract = checker::address_for_chain(chain_id)
            .filter(|_| !is_local_network(&self.context.network_identifier()));

        let fetched = match contract {
            Some(contract) => {
                self.fetch_via_checker(provider.as_ref(), contract, &addresses, selected, multi)
                    .await?
            }
            None => {
                self.fetch_via_rpc(provider.as_ref(), &addresses, selected, multi)
                    .await?
            }
        };

        let mut state = self.state.lock().unwrap();
        {
            let bucket = state.accounts_by_chain.entry(chain_id).or_default();
            for &(address, balance) in &fetched {
                bucket.insert(address, TrackedAccount { address, balance });
            }
        }
        if chain_id == self.context.current_chain_id() {
            for (address, balance) in fetched {
                state
                    .accounts
                    .insert(address, TrackedAccount { address, balance });
            }
        }
        Ok(())
    }

    /// Refresh the default network, then every network with an active
    /// subscription, in subscription-creation order. Sequential to bound
    /// peak RPC load.
    pub async fn update_accounts_all_active_networks(&self) -> Result<(), TrackerError> {
        self.update_accounts(None).await?;

        let ids: Vec<NetworkClientId> = {
            let subs = self.subs.lock().unwrap();
            subs.active
                .iter()
                .map(|s| s.network_client_id.clone())
                .collect()
        };
        for id in ids {
            self.update_accounts(Some(&id)).await?;
        }
        Ok(())
    }

    /// Drop an account from the unscoped map and every chain bucket.
    pub fn on_account_removed(&self, address: Address) {
        let mut state = self.state.lock().unwrap();
        state.accounts.remove(&address);
        for bucket in state.accounts_by_chain.values_mut() {
            bucket.remove(&address);
        }
    }

    /// Empty every account bucket. Chain keys survive with empty contents;
    /// gas limits are untouched.
    pub fn clear_accounts(&self) {
        let mut state = self.state.lock().unwrap();
        state.accounts.clear();
        for bucket in state.accounts_by_chain.values_mut() {
            bucket.clear();
        }
    }

    /// Clone out the current tracker state.
    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.lock().unwrap();
        TrackerSnapshot {
            accounts: state.accounts.clone(),
            accounts_by_chain_id: state.accounts_by_chain.clone(),
            current_block_gas_limit: state.current_block_gas_limit,
            current_block_gas_limit_by_chain_id: state.gas_limit_by_chain.clone(),
        }
    }

    /// Batched strategy: one contract call for every address, or for the
    /// selected address only (others explicitly unknown) in
    /// single-account mode.
    async fn fetch_via_checker(
        &self,
        provider: &dyn Provider,
        contract: Address,
        addresses: &[Address],
        selected: Address,
        multi: bool,
    ) -> Result<Vec<(Address, Option<U256>)>, TrackerError> {
        if multi {
            let fetched = checker::fetch_balances(provider, contract, addresses)
                .await
                .map_err(TrackerError::Upstream)?;
            Ok(fetched
                .into_iter()
                .map(|(address, balance)| (address, Some(balance)))
                .collect())
        } else {
            let fetched =
                checker::fetch_balances(provider, contract, std::slice::from_ref(&selected))
                    .await
                    .map_err(TrackerError::Upstream)?;
            let selected_balance = fetched.into_iter().next().map(|(_, balance)| balance);
            Ok(addresses
                .iter()
                .map(|&address| {
                    if address == selected {
                        (address, selected_balance)
                    } else {
                        (address, None)
                    }
                })
                .collect())
        }
    }

    /// Direct strategy: concurrent `eth_getBalance` per address, or the
    /// selected address only (others explicitly unknown) in
    /// single-account mode.
    async fn fetch_via_rpc(
        &self,
        provider: &dyn Provider,
        addresses: &[Address],
        selected: Address,
        multi: bool,
    ) -> Result<Vec<(Address, Option<U256>)>, TrackerError> {
        if multi {
            let balances = try_join_all(addresses.iter().map(|&address| provider.get_balance(address)))
                .await
                .map_err(TrackerError::Upstream)?;
            Ok(addresses
                .iter()
                .copied()
                .zip(balances.into_iter().map(Some))
                .collect())
        } else {
            let balance = provider
                .get_balance(selected)
                .await
                .map_err(TrackerError::Upstream)?;
            Ok(addresses
                .iter()
                .map(|&address| {
                    if address == selected {
                        (address, Some(balance))
                    } else {
                        (address, None)
                    }
                })
                .collect())
        }
    }

    /// Listener fired on each latest-block event. Spawns the refresh so
    /// the event source is never blocked; failures have no caller to
    /// propagate to, so they are logged here.
    fn block_listener(self: &Arc<Self>, network_client_id: Option<NetworkClientId>) -> BlockListener {
        let weak = Arc::downgrade(self);
        Arc::new(move |_block_number| {
            let Some(tracker) = weak.upgrade() else {
                return;
            };
            let id = network_client_id.clone();
            tokio::spawn(async move {
                if let Err(err) = tracker.update_accounts(id.as_deref()).await {
                    warn!("Balance refresh failed: {}", err);
                }
            });
        })
    }

    /// Fire-and-forget refresh cycle, used by `start` and the first
    /// polling call per network.
    fn spawn_refresh(self: &Arc<Self>, network_client_id: Option<NetworkClientId>) {
        let tracker = self.clone();
        tokio::spawn(async move {
            if let Err(err) = tracker.update_accounts(network_client_id.as_deref()).await {
                warn!("Balance refresh failed: {}", err);
            }
        });
    }
}
