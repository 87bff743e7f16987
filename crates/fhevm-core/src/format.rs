//! Display and parsing helpers for handles, addresses and amounts

use alloy_primitives::U256;

use crate::{validation, Error, Result};

/// Format a handle as 0x followed by 64 hex digits
pub fn format_handle(handle: U256) -> String {
    format!("0x{}", hex::encode(handle.to_be_bytes::<32>()))
}

/// Parse a handle from a decimal or 0x-prefixed hex string
pub fn parse_handle(s: &str) -> Result<U256> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    if digits.is_empty() {
        return Err(Error::InvalidHandle("empty handle".to_string()));
    }
    let parsed = U256::from_str_radix(digits, radix);
    parsed.map_err(|e| Error::InvalidHandle(format!("{}: {}", s, e)))
}

/// `0x1234...abcd` form of a valid address; other input is returned as-is
///
/// Both ends are clamped to the address, so a large `chars` never panics.
pub fn shorten_address(address: &str, chars: usize) -> String {
    if !validation::is_valid_address(address) {
        return address.to_string();
    }
    let head = &address[..(chars + 2).min(address.len())];
    let tail = &address[address.len().saturating_sub(chars)..];
    format!("{}...{}", head, tail)
}

/// Keep `start` leading and `end` trailing characters
pub fn truncate_address(address: &str, start: usize, end: usize) -> String {
    if !address.is_ascii() || address.len() < start + end {
        return address.to_string();
    }
    format!("{}...{}", &address[..start], &address[address.len() - end..])
}

/// Mask the middle of a secret, showing `visible` characters at each end
pub fn mask_sensitive_data(data: &str, visible: usize) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= visible * 2 {
        return data.to_string();
    }
    let start: String = chars[..visible].iter().collect();
    let end: String = chars[chars.len() - visible..].iter().collect();
    let masked = "*".repeat((chars.len() - visible * 2).min(10));
    format!("{}{}{}", start, masked, end)
}

/// Render a wei gas price in Gwei with two decimals
pub fn format_gas_price(gas_price_wei: u128) -> String {
    let gwei = gas_price_wei as f64 / 1e9;
    format!("{:.2} Gwei", gwei)
}
