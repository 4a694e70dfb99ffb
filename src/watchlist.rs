//! Watchlist loading
//!
//! The daemon seeds the tracker with accounts read from a plain text
//! file: one hex address per line, `#` lines and blanks ignored.

use crate::types::pad_hex_string;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read the tracked-account list from `path`.
///
/// Fails on the first malformed entry, naming the offending line, and on
/// an empty list: a tracker with nothing to track is a configuration
/// mistake worth surfacing at startup.
pub fn load_watchlist(path: &Path) -> Result<Vec<Address>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read watchlist file: {:?}", path))?;

    let mut accounts = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }

        let address = parse_address(entry)
            .with_context(|| format!("Watchlist line {}: bad address {:?}", line_no + 1, entry))?;
        accounts.push(address);
    }

    if accounts.is_empty() {
        anyhow::bail!("Watchlist {:?} contains no addresses", path);
    }

    Ok(accounts)
}

/// Parse a 20-byte hex address, with or without the `0x` prefix.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(pad_hex_string(s))
        .with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!(
            "Address must be 20 bytes (40 hex chars), got {} bytes",
            bytes.len()
        );
    }

    Ok(Address::from_slice(&bytes))
}
