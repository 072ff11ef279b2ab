use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::TokenRegistry;

pub const UNKNOWN_COUNTERPARTY: &str = "Unknown";

// Payment request models

/// On-chain payment request as returned by the `get_request` view function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payee: String,
    /// Fungible asset metadata address
    pub token: String,
    /// Amount in base units
    pub amount: u64,
    pub memo: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub paid: bool,
    pub payer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequestParams {
    pub token: String,
    pub amount: u64,
    pub memo: String,
    pub expires_in_seconds: u64,
}

/// Outcome of a confirmed `create_payment_request` transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRequest {
    pub transaction_hash: String,
    /// Request object address, when the creation event could be decoded
    pub request_object: Option<String>,
}

impl CreatedRequest {
    /// Identifier to put in a payment link: the object address, or the hash
    pub fn request_id(&self) -> &str {
        self.request_object
            .as_deref()
            .unwrap_or(&self.transaction_hash)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    /// `data:image/png;base64,...` rendering of `url`
    pub qr_code: String,
}

// Token models

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub icon: Option<String>,
}

// History models

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Sent,
    Received,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Sent => "sent",
            HistoryKind::Received => "received",
        }
    }
}

impl std::fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistoryKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(HistoryKind::Sent),
            "received" => Ok(HistoryKind::Received),
            other => Err(crate::Error::Validation(format!("Unknown history type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Expired,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "expired" => Ok(PaymentStatus::Expired),
            "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
            other => Err(crate::Error::Validation(format!("Unknown payment status: {}", other))),
        }
    }
}

/// Raw row produced by history reconstruction, before display resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub kind: HistoryKind,
    pub amount: u64,
    /// Token metadata address as seen on chain
    pub token: String,
    pub memo: String,
    pub date: DateTime<Utc>,
    pub paid: bool,
    pub cancelled: bool,
    pub payer: Option<String>,
    pub payee: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
    pub transaction_hash: String,
    pub request_address: Option<String>,
}

impl HistoryRecord {
    pub fn status_at(&self, now: i64) -> PaymentStatus {
        if self.cancelled {
            PaymentStatus::Cancelled
        } else if self.paid {
            PaymentStatus::Completed
        } else if self.expires_at < now {
            PaymentStatus::Expired
        } else {
            PaymentStatus::Pending
        }
    }

    pub fn counterparty(&self) -> String {
        let known = match self.kind {
            HistoryKind::Sent => self.payee.as_ref(),
            HistoryKind::Received => self.payer.as_ref(),
        };
        known
            .filter(|addr| !addr.is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_COUNTERPARTY.to_string())
    }

    /// Resolve the token against the registry and compute status at `now`
    pub fn to_history(&self, registry: &TokenRegistry, now: i64) -> PaymentHistory {
        PaymentHistory {
            id: self.id.clone(),
            kind: self.kind,
            amount: self.amount,
            token: registry.find_or_default(&self.token).clone(),
            memo: self.memo.clone(),
            date: self.date,
            status: self.status_at(now),
            counterparty: self.counterparty(),
            transaction_hash: Some(self.transaction_hash.clone()),
        }
    }
}

/// History entry as displayed and exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistory {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub amount: u64,
    pub token: TokenInfo,
    pub memo: String,
    pub date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub counterparty: String,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareOptions {
    pub whatsapp: bool,
    pub telegram: bool,
    pub sms: bool,
    pub email: bool,
    pub copy: bool,
}

impl Default for ShareOptions {
    fn default() -> Self {
        Self {
            whatsapp: true,
            telegram: true,
            sms: true,
            email: true,
            copy: true,
        }
    }
}
