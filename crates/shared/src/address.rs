//! Account address helpers.
//!
//! Aptos addresses are 32 bytes rendered as `0x`-prefixed hex; the node and
//! wallets emit both the short form (`0xa`) and the zero-padded long form.

use crate::{Error, Result};

/// Parse and return the zero-padded, lowercase long form of an address
pub fn standardize_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| Error::InvalidAddress(format!("Address must start with 0x: {}", address)))?;

    if hex_part.is_empty() || hex_part.len() > 64 {
        return Err(Error::InvalidAddress(format!(
            "Address must have 1 to 64 hex digits: {}",
            address
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidAddress(format!(
            "Address must contain only hexadecimal characters: {}",
            address
        )));
    }

    Ok(format!("0x{:0>64}", hex_part.to_lowercase()))
}

/// Compare two addresses ignoring case and zero padding.
///
/// Strings that are not addresses compare verbatim.
pub fn addresses_equal(a: &str, b: &str) -> bool {
    match (standardize_address(a), standardize_address(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub fn is_hex_address(value: &str) -> bool {
    standardize_address(value).is_ok()
}
