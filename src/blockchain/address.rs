//! Address-format predicate for EVM chains.
//!
//! Accepts 40 hex digits with an optional `0x` prefix. All-lowercase and
//! all-uppercase forms are accepted as-is; mixed case must be a valid EIP-55
//! checksum.

use alloy::primitives::Address;

/// Parse an address, enforcing the checksum when the input is mixed case.
pub fn parse_address(input: &str) -> Option<Address> {
    let hex = input.strip_prefix("0x").unwrap_or(input);
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let address: Address = format!("0x{}", hex).parse().ok()?;

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None).strip_prefix("0x") != Some(hex) {
        return None;
    }

    Some(address)
}

pub fn is_address(input: &str) -> bool {
    parse_address(input).is_some()
}
