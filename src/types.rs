//! Ethereum JSON-RPC types
//!
//! Type definitions for the block header fields the tracker consumes,
//! plus hex string parsing helpers shared across the crate.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer};

/// Network-client identifier: selects a configured network endpoint.
/// Multiple network clients may share a chain id.
pub type NetworkClientId = String;

/// Chain identifier distinguishing one blockchain network from another.
pub type ChainId = u64;

/// Latest-block header slice returned from `eth_getBlockByNumber`.
///
/// Only the fields the refresh cycle reads; everything else in the
/// RPC response is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    /// Block number (hex string in JSON, parsed to u64)
    #[serde(rename = "number", deserialize_with = "deserialize_hex_u64")]
    pub number: u64,

    /// Block gas limit (hex string in JSON)
    #[serde(rename = "gasLimit", deserialize_with = "deserialize_hex_u256")]
    pub gas_limit: U256,
}

/// Pad an odd-length hex string with a leading zero.
/// This handles cases where RPC returns hex strings without leading zeros.
pub fn pad_hex_string(s: &str) -> String {
    if s.is_empty() {
        return s.to_string();
    }
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse a `0x`-prefixed (or bare) hex string into U256.
///
/// Empty strings decode to zero.
pub fn parse_hex_u256(s: &str) -> anyhow::Result<U256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(U256::ZERO);
    }
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s)?;
    Ok(U256::from_be_slice(&bytes))
}

/// Deserialize a hex string to u64.
fn deserialize_hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    u64::from_str_radix(s, 16).map_err(serde::de::Error::custom)
}

/// Deserialize a hex string to U256.
fn deserialize_hex_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_hex_u256(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_header_deserialization() {
        let json = serde_json::json!({
            "number": "0x12d687",
            "gasLimit": "0x111111",
            "hash": "0xdeadbeef"
        });
        let header: BlockHeader = serde_json::from_value(json).unwrap();
        assert_eq!(header.number, 0x12d687);
        assert_eq!(header.gas_limit, U256::from(0x111111u64));
    }

    #[test]
    fn test_parse_hex_u256() {
        assert_eq!(parse_hex_u256("0xabc").unwrap(), U256::from(0xabcu64));
        assert_eq!(parse_hex_u256("abc").unwrap(), U256::from(0xabcu64));
        assert_eq!(parse_hex_u256("0x").unwrap(), U256::ZERO);
        assert_eq!(parse_hex_u256("").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_pad_hex_string() {
        assert_eq!(pad_hex_string("abc"), "0abc");
        assert_eq!(pad_hex_string("abcd"), "abcd");
        assert_eq!(pad_hex_string(""), "");
    }
}
