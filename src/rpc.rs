//! JSON-RPC provider interface and HTTP client
//!
//! `Provider` is the seam between the tracker and a network endpoint:
//! one instance per configured network. `RpcClient` is the production
//! implementation over HTTP; tests substitute stub providers.

use crate::types::{parse_hex_u256, pad_hex_string, BlockHeader};
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// A JSON-RPC client for a single network endpoint.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Fetch the latest balance of an address (`eth_getBalance`).
    async fn get_balance(&self, address: Address) -> Result<U256>;

    /// Execute a read-only contract call (`eth_call`) at the latest block.
    /// Returns the raw ABI-encoded return data.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>>;

    /// Fetch the latest block header (`eth_getBlockByNumber("latest")`).
    async fn latest_block(&self) -> Result<BlockHeader>;
}

/// JSON-RPC client for Ethereum nodes over HTTP.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Make a JSON-RPC call.
    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to send RPC request")?;

        let json: Value = response
            .json()
            .await
            .context("Failed to parse RPC response")?;

        // Check for RPC error
        if let Some(error) = json.get("error") {
            anyhow::bail!("RPC error: {}", error);
        }

        // Extract result
        json.get("result")
            .cloned()
            .context("RPC response missing 'result' field")
    }
}

#[async_trait]
impl Provider for RpcClient {
    async fn get_balance(&self, address: Address) -> Result<U256> {
        let addr_str = format!("0x{:x}", address);
        let params = json!([addr_str, "latest"]);
        let result = self.rpc("eth_getBalance", params).await?;

        let balance_str = result
            .as_str()
            .context("Balance response is not a string")?;
        parse_hex_u256(balance_str).context("Failed to decode balance hex")
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let params = json!([
            {
                "to": format!("0x{:x}", to),
                "data": format!("0x{}", hex::encode(&data)),
            },
            "latest"
        ]);
        let result = self.rpc("eth_call", params).await?;

        let ret_str = result
            .as_str()
            .context("Call response is not a string")?;
        let ret_str = ret_str.strip_prefix("0x").unwrap_or(ret_str);
        if ret_str.is_empty() {
            return Ok(Vec::new());
        }
        let ret_str = pad_hex_string(ret_str);
        hex::decode(&ret_str).context("Failed to decode call return data hex")
    }

    async fn latest_block(&self) -> Result<BlockHeader> {
        let params = json!(["latest", false]);
        let result = self.rpc("eth_getBlockByNumber", params).await?;
        serde_json::from_value(result).context("Failed to deserialize block header")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_formatting() {
        let addr_bytes = hex::decode("0742d35Cc6634C0532925a3b844Bc9e7595f0bEb").unwrap();
        let addr = Address::from_slice(&addr_bytes);
        assert_eq!(
            format!("0x{:x}", addr),
            "0x0742d35cc6634c0532925a3b844bc9e7595f0beb"
        );
    }

    #[test]
    fn test_call_data_formatting() {
        let data = vec![0xf0u8, 0x00, 0x2e, 0xa9];
        assert_eq!(format!("0x{}", hex::encode(&data)), "0xf0002ea9");
    }
}
