//! Shareable payment links.
//!
//! A link is `<base>/pay/<request id>` with optional query parameters that
//! let the payment page show the request before the on-chain record loads.

use serde::{Deserialize, Serialize};
use shared::models::{PaymentRequest, ShareOptions, TokenInfo};
use shared::tokens::TokenRegistry;
use url::Url;

use crate::error::{PaymentError, Result};
use crate::format::parse_amount;

/// Shown as the payee until the authoritative record is loaded
pub const PLACEHOLDER_PAYEE: &str = "0x1234567890abcdef1234567890abcdef12345678";

/// A hinted request is displayed as created this many seconds ago
const HINT_CREATED_AGO_SECS: i64 = 300;

const HINT_DEFAULT_EXPIRY_SECS: i64 = 86400;

/// Display hint carried in a payment link's query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkParams {
    /// Decimal amount as typed by the requester, e.g. `"5"`
    pub amount: Option<String>,
    /// Token symbol or metadata address
    pub token: Option<String>,
    pub memo: Option<String>,
    pub payee: Option<String>,
    pub expires_at: Option<i64>,
}

impl LinkParams {
    /// The hint is only trusted when amount, token and memo are all present
    pub fn is_complete(&self) -> bool {
        [&self.amount, &self.token, &self.memo]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// Build `<base>/pay/<id>` with the present, non-empty parameters
pub fn generate_payment_url(base_url: &str, request_id: &str, params: &LinkParams) -> Result<String> {
    let mut url = Url::parse(base_url)
        .map_err(|e| PaymentError::InvalidLink(format!("bad base URL '{}': {}", base_url, e)))?;
    url.set_query(None);
    url.set_fragment(None);
    // Pushed as a segment so '/', '?' and '#' in the id stay percent-encoded
    url.path_segments_mut()
        .map_err(|_| PaymentError::InvalidLink(format!("base URL '{}' cannot hold a path", base_url)))?
        .pop_if_empty()
        .push("pay")
        .push(request_id);

    {
        let mut query = url.query_pairs_mut();
        let text_params = [
            ("amount", &params.amount),
            ("token", &params.token),
            ("memo", &params.memo),
            ("payee", &params.payee),
        ];
        for (key, value) in text_params {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.append_pair(key, value);
            }
        }
        if let Some(expires_at) = params.expires_at.filter(|t| *t != 0) {
            query.append_pair("expires_at", &expires_at.to_string());
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url.to_string())
}

/// Split a payment URL back into its request id and display hint
pub fn parse_payment_url(payment_url: &str) -> Result<(String, LinkParams)> {
    let url = Url::parse(payment_url)
        .map_err(|e| PaymentError::InvalidLink(format!("'{}': {}", payment_url, e)))?;

    let mut segments = url
        .path_segments()
        .ok_or_else(|| PaymentError::InvalidLink(format!("'{}' has no path", payment_url)))?;
    let request_id = match (segments.next(), segments.next()) {
        (Some("pay"), Some(id)) if !id.is_empty() => urlencoding::decode(id)
            .map_err(|e| PaymentError::InvalidLink(format!("'{}': {}", payment_url, e)))?
            .into_owned(),
        _ => {
            return Err(PaymentError::InvalidLink(format!(
                "'{}' is not a /pay/<id> link",
                payment_url
            )))
        }
    };

    let mut params = LinkParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "amount" => params.amount = Some(value.into_owned()),
            "token" => params.token = Some(value.into_owned()),
            "memo" => params.memo = Some(value.into_owned()),
            "payee" => params.payee = Some(value.into_owned()),
            "expires_at" => params.expires_at = value.parse().ok(),
            _ => {}
        }
    }

    Ok((request_id, params))
}

/// Provisional request built from a complete link hint.
///
/// Unknown tokens fall back to the registry default, like the payment page
/// does while it waits for the chain.
pub fn request_from_hint(
    params: &LinkParams,
    registry: &TokenRegistry,
    now: i64,
) -> Result<Option<PaymentRequest>> {
    if !params.is_complete() {
        return Ok(None);
    }
    let (Some(amount), Some(token), Some(memo)) = (&params.amount, &params.token, &params.memo)
    else {
        return Ok(None);
    };

    let token = registry.find_or_default(token);

    Ok(Some(PaymentRequest {
        payee: params
            .payee
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_PAYEE.to_string()),
        token: token.address.clone(),
        amount: parse_amount(amount, token.decimals)?,
        memo: memo.clone(),
        created_at: now - HINT_CREATED_AGO_SECS,
        expires_at: params
            .expires_at
            .unwrap_or(now + HINT_DEFAULT_EXPIRY_SECS),
        paid: false,
        payer: None,
    }))
}

pub fn generate_share_text(amount: &str, token_symbol: &str, memo: &str, url: &str) -> String {
    format!(
        " Payment Request: {} {}\n {}\n\n Pay here: {}",
        amount, token_symbol, memo, url
    )
}

pub fn whatsapp_url(text: &str) -> String {
    format!("https://wa.me/?text={}", urlencoding::encode(text))
}

pub fn telegram_url(text: &str) -> String {
    format!("https://t.me/share/url?text={}", urlencoding::encode(text))
}

pub fn sms_url(text: &str) -> String {
    format!("sms:?body={}", urlencoding::encode(text))
}

pub fn email_url(subject: &str, body: &str) -> String {
    format!(
        "mailto:?subject={}&body={}",
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}

/// Pre-filled share intents for a payment link; disabled channels are `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLinks {
    pub text: String,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    pub sms: Option<String>,
    pub email: Option<String>,
    /// Plain URL for the clipboard
    pub copy: Option<String>,
}

impl ShareLinks {
    pub fn build(
        url: &str,
        amount: &str,
        token: &TokenInfo,
        memo: &str,
        options: &ShareOptions,
    ) -> Self {
        let text = generate_share_text(amount, &token.symbol, memo, url);
        let subject = format!("Payment Request: {} {}", amount, token.symbol);

        Self {
            whatsapp: options.whatsapp.then(|| whatsapp_url(&text)),
            telegram: options.telegram.then(|| telegram_url(&text)),
            sms: options.sms.then(|| sms_url(&text)),
            email: options.email.then(|| email_url(&subject, &text)),
            copy: options.copy.then(|| url.to_string()),
            text,
        }
    }
}
