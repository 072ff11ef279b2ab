use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{PaymentError, Result};

pub const EXPLORER_BASE_URL: &str = "https://explorer.aptoslabs.com";

/// Render a base-unit amount as a decimal string with trailing zeros removed.
///
/// `format_amount(150_000_000, 8) == "1.5"`
pub fn format_amount(amount: u64, decimals: u8) -> String {
    match Decimal::try_from_i128_with_scale(i128::from(amount), u32::from(decimals)) {
        Ok(value) => value.normalize().to_string(),
        // Scales beyond what Decimal can hold; no registered token gets here
        Err(_) => amount.to_string(),
    }
}

/// Parse a user-entered decimal amount into base units. Digits beyond the
/// token's precision are truncated.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<u64> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::InvalidAmount("amount is empty".to_string()));
    }

    let value = Decimal::from_str(trimmed)
        .map_err(|_| PaymentError::InvalidAmount(format!("'{}' is not a number", trimmed)))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PaymentError::InvalidAmount(format!("'{}' is negative", trimmed)));
    }

    let multiplier = 10u64
        .checked_pow(u32::from(decimals))
        .map(Decimal::from)
        .ok_or_else(|| PaymentError::InvalidAmount(format!("unsupported precision {}", decimals)))?;

    value
        .checked_mul(multiplier)
        .and_then(|base_units| base_units.trunc().to_u64())
        .ok_or_else(|| PaymentError::InvalidAmount(format!("'{}' is too large", trimmed)))
}

/// Shorten an address to `0x1234...abcd`
pub fn format_address(address: &str) -> String {
    format_address_with(address, 6, 4)
}

pub fn format_address_with(address: &str, start_chars: usize, end_chars: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= start_chars + end_chars {
        return address.to_string();
    }

    let start: String = chars[..start_chars].iter().collect();
    let end: String = chars[chars.len() - end_chars..].iter().collect();
    format!("{}...{}", start, end)
}

/// `Jan 5, 2024, 03:04 PM` (UTC)
pub fn format_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%b %-d, %Y, %I:%M %p").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn format_relative_time(timestamp: i64) -> String {
    format_relative_time_at(timestamp, Utc::now().timestamp())
}

pub fn format_relative_time_at(timestamp: i64, now: i64) -> String {
    let diff = now - timestamp;
    let minutes = diff.div_euclid(60);
    let hours = diff.div_euclid(3600);
    let days = diff.div_euclid(86400);

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        format_date(timestamp)
    }
}

/// Expiry instant `seconds` after `start`, clamped to `i64::MAX`. The
/// contract takes the expiry as a u64, so any value can show up on chain.
pub fn expiry_after(start: i64, seconds: u64) -> i64 {
    start.saturating_add(i64::try_from(seconds).unwrap_or(i64::MAX))
}

pub fn is_expired(expires_at: i64) -> bool {
    is_expired_at(expires_at, Utc::now().timestamp())
}

/// A request is expired once the current second is strictly past `expires_at`
pub fn is_expired_at(expires_at: i64, now: i64) -> bool {
    now > expires_at
}

pub fn get_time_remaining(expires_at: i64) -> String {
    get_time_remaining_at(expires_at, Utc::now().timestamp())
}

pub fn get_time_remaining_at(expires_at: i64, now: i64) -> String {
    if is_expired_at(expires_at, now) {
        return "Expired".to_string();
    }

    let remaining = expires_at.saturating_sub(now);
    let days = remaining / 86400;
    let hours = (remaining % 86400) / 3600;
    let minutes = (remaining % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn explorer_transaction_url(hash: &str, network: &str) -> String {
    format!("{}/txn/{}?network={}", EXPLORER_BASE_URL, hash, network)
}

pub fn explorer_account_url(address: &str, network: &str) -> String {
    format!("{}/account/{}?network={}", EXPLORER_BASE_URL, address, network)
}
