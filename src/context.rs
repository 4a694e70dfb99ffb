//! Wallet context queried by the tracker
//!
//! Synchronous accessors for the state the tracker does not own: the
//! selected account, the active chain, the network identifier, and the
//! preference/onboarding flags that gate refresh behavior.

use alloy_primitives::Address;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::types::ChainId;

/// Read-only view of wallet state consulted on every refresh cycle.
pub trait TrackerContext: Send + Sync {
    /// Address of the currently selected account.
    fn selected_account(&self) -> Address;

    /// Chain id of the globally selected network.
    fn current_chain_id(&self) -> ChainId;

    /// Identifier of the globally selected network endpoint, used to
    /// detect local/test networks (e.g. an RPC URL).
    fn network_identifier(&self) -> String;

    /// Whether balances may be fetched for all tracked accounts, or only
    /// the selected one.
    fn use_multi_account_balance_checker(&self) -> bool;

    /// Whether onboarding has completed. Refresh cycles no-op until it has.
    fn completed_onboarding(&self) -> bool;
}

/// Whether a network identifier names a local test network, where the
/// balance-checker contract is never deployed.
pub fn is_local_network(identifier: &str) -> bool {
    identifier.contains("localhost") || identifier.contains("127.0.0.1")
}

/// Concrete context backed by atomics, for the daemon and tests.
pub struct StaticContext {
    selected: Mutex<Address>,
    chain_id: AtomicU64,
    network_identifier: Mutex<String>,
    multi_account: AtomicBool,
    onboarded: AtomicBool,
}

impl StaticContext {
    pub fn new(
        selected: Address,
        chain_id: ChainId,
        network_identifier: String,
        multi_account: bool,
    ) -> Self {
        Self {
            selected: Mutex::new(selected),
            chain_id: AtomicU64::new(chain_id),
            network_identifier: Mutex::new(network_identifier),
            multi_account: AtomicBool::new(multi_account),
            onboarded: AtomicBool::new(true),
        }
    }

    /// Change the selected account.
    pub fn set_selected_account(&self, address: Address) {
        *self.selected.lock().unwrap() = address;
    }

    /// Flip the onboarding-completed flag.
    pub fn set_completed_onboarding(&self, done: bool) {
        self.onboarded.store(done, Ordering::Relaxed);
    }

    /// Flip the multi-account balance fetching flag.
    pub fn set_use_multi_account_balance_checker(&self, enabled: bool) {
        self.multi_account.store(enabled, Ordering::Relaxed);
    }
}

impl TrackerContext for StaticContext {
    fn selected_account(&self) -> Address {
        *self.selected.lock().unwrap()
    }

    fn current_chain_id(&self) -> ChainId {
        self.chain_id.load(Ordering::Relaxed)
    }

    fn network_identifier(&self) -> String {
        self.network_identifier.lock().unwrap().clone()
    }

    fn use_multi_account_balance_checker(&self) -> bool {
        self.multi_account.load(Ordering::Relaxed)
    }

    fn completed_onboarding(&self) -> bool {
        self.onboarded.load(Ordering::Relaxed)
    }
}
