//! Decoders for values read out of transaction arguments, events and view
//! results.
//!
//! Move values reach the client in several JSON shapes depending on where
//! they were read from: an `Object<T>` argument may be a bare address string
//! or `{"inner": addr}`, an event field may be `{"address": addr}`, and an
//! `Option<address>` is `{"vec": [addr]}`. Everything is normalized here so
//! the rest of the crate only sees strings.

use serde::Deserialize;
use serde_json::Value;
use shared::models::PaymentRequest;

use crate::error::{PaymentError, Result};

/// Any of the JSON shapes an address can take
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AddressRef {
    Plain(String),
    Inner { inner: String },
    Address { address: String },
    Vec { vec: Vec<String> },
}

impl AddressRef {
    pub fn into_address(self) -> Option<String> {
        match self {
            AddressRef::Plain(address)
            | AddressRef::Inner { inner: address }
            | AddressRef::Address { address } => Some(address),
            AddressRef::Vec { vec } => vec.into_iter().next(),
        }
    }
}

/// Normalize an address value in any supported shape.
///
/// Unrecognized shapes, and an empty `{"vec": []}`, are rejected so callers
/// pick their fallback explicitly.
pub fn normalize_address(value: &Value) -> Result<String> {
    AddressRef::deserialize(value)
        .ok()
        .and_then(AddressRef::into_address)
        .filter(|address| !address.is_empty())
        .ok_or_else(|| PaymentError::UnrecognizedAddressShape(value.to_string()))
}

/// Decode a Move `Option<address>`; `{"vec": []}` and `null` are `None`
pub fn optional_address(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => normalize_address(value).ok(),
    }
}

/// Last-resort scan of an event payload for something that looks like an
/// object address: the first `0x` string longer than 10 characters
pub fn find_address_like(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.starts_with("0x") && s.len() > 10 => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(find_address_like),
        Value::Object(map) => map.values().find_map(find_address_like),
        _ => None,
    }
}

/// Hex-encode memo text as the contract expects it (`0x`-prefixed UTF-8)
pub fn encode_memo(memo: &str) -> String {
    format!("0x{}", hex::encode(memo.as_bytes()))
}

/// Decode a hex-encoded UTF-8 memo, with or without `0x`.
///
/// Input that is not valid hex or not valid UTF-8 is returned unchanged.
pub fn decode_memo(hex_memo: &str) -> String {
    let clean = hex_memo.strip_prefix("0x").unwrap_or(hex_memo);
    hex::decode(clean)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| hex_memo.to_string())
}

/// Memo as stored on chain: `vector<u8>` renders as `0x…` hex, while older
/// records may hold the text itself
pub fn decode_stored_memo(memo: &str) -> String {
    if memo.starts_with("0x") {
        decode_memo(memo)
    } else {
        memo.to_string()
    }
}

/// Move `u64` values are JSON strings; some sources emit numbers
pub fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Timestamps are `u64` seconds on chain but compared as signed values
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    parse_u64(value).and_then(|v| i64::try_from(v).ok())
}

/// Parse the result array of the `get_request` view function.
///
/// An empty result means the address holds no request.
pub fn parse_request_view(result: &[Value]) -> Result<Option<PaymentRequest>> {
    let Some(data) = result.first() else {
        return Ok(None);
    };

    let field = |name: &str| data.get(name);
    let missing = |name: &str| {
        PaymentError::Chain(shared::Error::Serialization(format!(
            "get_request result is missing '{}'",
            name
        )))
    };

    let payee = field("payee")
        .map(normalize_address)
        .transpose()?
        .ok_or_else(|| missing("payee"))?;
    let token = field("token")
        .map(normalize_address)
        .transpose()?
        .ok_or_else(|| missing("token"))?;

    Ok(Some(PaymentRequest {
        payee,
        token,
        amount: field("amount").and_then(parse_u64).unwrap_or(0),
        memo: field("memo")
            .and_then(Value::as_str)
            .map(decode_stored_memo)
            .unwrap_or_default(),
        created_at: field("created_at").and_then(parse_timestamp).unwrap_or(0),
        expires_at: field("expires_at").and_then(parse_timestamp).unwrap_or(0),
        paid: field("paid").and_then(Value::as_bool).unwrap_or(false),
        payer: optional_address(field("payer")),
    }))
}
