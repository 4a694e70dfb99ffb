//! Batched balance-checker contract accessor
//!
//! Some chains have a deployed helper contract that returns balances for
//! many addresses in a single `eth_call`, cutting a refresh cycle from N
//! RPC round trips to one. This module knows where that contract lives,
//! how to encode the `balances(address[],address[])` call, and how to
//! decode its `uint256[]` return data.

use crate::rpc::Provider;
use crate::types::ChainId;
use alloy_primitives::{address, Address, U256};
use anyhow::{Context, Result};

/// Selector for `balances(address[] users, address[] tokens)`.
const BALANCES_SELECTOR: [u8; 4] = [0xf0, 0x00, 0x2e, 0xa9];

/// Deployed balance-checker contract for a chain, if any.
///
/// Chains absent from this table fall back to per-account `eth_getBalance`.
pub fn address_for_chain(chain_id: ChainId) -> Option<Address> {
    match chain_id {
        // Ethereum mainnet
        1 => Some(address!("b1f8e55c7f64d203c1400b9d8555d050f94adf39")),
        // Optimism
        10 => Some(address!("b1c568e9c3e6bdaf755a60c7418c269eb11524fc")),
        // BNB Smart Chain
        56 => Some(address!("2352c63a83f9fd126af8676146721fa00924d7e4")),
        // Polygon
        137 => Some(address!("2352c63a83f9fd126af8676146721fa00924d7e4")),
        // Arbitrum One
        42161 => Some(address!("151e24a486d7258dd7c33fb67e4bb01919b7b32c")),
        // Avalanche C-Chain
        43114 => Some(address!("d023d153a0dfa485130ecfde2faa7e612ef94818")),
        _ => None,
    }
}

/// Encode calldata for `balances(users, [ETH])`.
pub fn encode_balances_call(users: &[Address]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * (4 + users.len()));
    data.extend_from_slice(&BALANCES_SELECTOR);

    // Heads: offsets of the two dynamic arrays, relative to the start of
    // the argument block.
    let users_offset = U256::from(0x40u64);
    let tokens_offset = U256::from(0x40 + 32 * (1 + users.len()));
    data.extend_from_slice(&users_offset.to_be_bytes::<32>());
    data.extend_from_slice(&tokens_offset.to_be_bytes::<32>());

    // users: length then left-padded addresses
    data.extend_from_slice(&U256::from(users.len()).to_be_bytes::<32>());
    for user in users {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(user.as_slice());
        data.extend_from_slice(&word);
    }

    // tokens: address zero, meaning native ETH to the checker contract
    data.extend_from_slice(&U256::from(1u64).to_be_bytes::<32>());
    data.extend_from_slice(&[0u8; 32]);

    data
}

/// Decode the `uint256[]` return data from a `balances` call.
///
/// Expects exactly `expected` entries (one token queried per user).
pub fn decode_balances_return(data: &[u8], expected: usize) -> Result<Vec<U256>> {
    let word = |i: usize| -> Result<U256> {
        let start = i * 32;
        let end = start + 32;
        if data.len() < end {
            anyhow::bail!(
                "Balance checker return data truncated: {} bytes, need {}",
                data.len(),
                end
            );
        }
        Ok(U256::from_be_slice(&data[start..end]))
    };

    let offset: usize = word(0)?
        .try_into()
        .ok()
        .filter(|o: &usize| o % 32 == 0)
        .context("Invalid array offset in balance checker return data")?;
    let len_index = offset / 32;
    let len: usize = word(len_index)?
        .try_into()
        .map_err(|_| anyhow::anyhow!("Array length overflows usize"))?;
    if len != expected {
        anyhow::bail!(
            "Balance checker returned {} balances, expected {}",
            len,
            expected
        );
    }

    (0..len).map(|i| word(len_index + 1 + i)).collect()
}

/// Fetch ETH balances for `users` in one contract call.
///
/// Results are paired with the queried addresses in query order.
pub async fn fetch_balances(
    provider: &dyn Provider,
    contract: Address,
    users: &[Address],
) -> Result<Vec<(Address, U256)>> {
    let calldata = encode_balances_call(users);
    let ret = provider
        .call(contract, calldata)
        .await
        .context("Balance checker call failed")?;
    let balances = decode_balances_return(&ret, users.len())?;
    Ok(users.iter().copied().zip(balances).collect())
}
