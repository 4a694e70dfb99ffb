//! Tally - multi-network account balance tracker
//!
//! This library keeps cached ETH balances for a set of tracked accounts
//! across one or more networks. It subscribes to latest-block events per
//! network and refreshes balances on each block, batching through an
//! on-chain balance-checker contract where one is deployed.

pub mod blocks;
pub mod checker;
pub mod context;
pub mod error;
pub mod registry;
pub mod rpc;
pub mod tracker;
pub mod types;
pub mod watchlist;

// Re-export the main types for convenience
pub use blocks::{BlockEventSource, BlockListener, ListenerId, PollingBlockSource};
pub use context::{StaticContext, TrackerContext};
pub use error::TrackerError;
pub use registry::{NetworkClient, NetworkRegistry, StaticRegistry};
pub use rpc::{Provider, RpcClient};
pub use tracker::{AccountTracker, PollingToken, TrackedAccount, TrackerSnapshot};
pub use types::{BlockHeader, ChainId, NetworkClientId};
