//! Payment history rebuilt from an account's transaction log.
//!
//! There is no index to query, so history is derived from the account's own
//! contract calls: creating a request yields a `received` entry, paying one
//! yields a `sent` entry, and a payment into one of the user's requests
//! yields a second `received` entry that also settles the matching creation
//! entry.

use blockchain::{ChainClient, Transaction};
use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::address::addresses_equal;
use shared::models::{HistoryKind, HistoryRecord, PaymentRequest};
use shared::tokens::APT_METADATA_ADDRESS;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::decode::{decode_memo, normalize_address, parse_request_view, parse_u64};
use crate::error::{PaymentError, Result};
use crate::format::expiry_after;
use crate::payload::{
    calls_function, PayloadBuilder, CANCEL_REQUEST_FUNCTION, CREATE_REQUEST_FUNCTION,
    PAYMENT_PAID_EVENT, PAY_REQUEST_FUNCTION, REQUEST_CREATED_EVENT,
};

pub const DEFAULT_REQUEST_MEMO: &str = "Payment request";
pub const DEFAULT_SENT_MEMO: &str = "Payment sent";
pub const DEFAULT_RECEIVED_MEMO: &str = "Payment received";

/// Accumulates history entries while walking an account's transactions
pub struct HistoryReconstructor<'a> {
    client: &'a dyn ChainClient,
    payloads: &'a PayloadBuilder,
    user: String,
    default_expiry_seconds: u64,
    records: Vec<HistoryRecord>,
}

impl<'a> HistoryReconstructor<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        payloads: &'a PayloadBuilder,
        user: &str,
        default_expiry_seconds: u64,
    ) -> Self {
        Self {
            client,
            payloads,
            user: user.to_string(),
            default_expiry_seconds,
            records: Vec::new(),
        }
    }

    /// Fold every successful user transaction into the history. A
    /// transaction that cannot be decoded is logged and skipped.
    pub async fn apply_all(&mut self, transactions: &[Transaction]) {
        for transaction in transactions {
            if !transaction.is_user_transaction() || !transaction.is_successful() {
                continue;
            }

            if let Err(e) = self.apply(transaction).await {
                warn!(
                    "Skipping transaction {} while rebuilding history: {}",
                    transaction.hash, e
                );
            }
        }
    }

    pub async fn apply(&mut self, transaction: &Transaction) -> Result<()> {
        let Some(function) = transaction.function_name() else {
            return Ok(());
        };

        if calls_function(function, CREATE_REQUEST_FUNCTION) {
            self.apply_create(transaction).await
        } else if calls_function(function, PAY_REQUEST_FUNCTION) && !transaction.events.is_empty() {
            self.apply_payment(transaction).await
        } else if calls_function(function, CANCEL_REQUEST_FUNCTION) {
            self.apply_cancel(transaction);
            Ok(())
        } else {
            Ok(())
        }
    }

    /// Deduplicated entries, newest first
    pub fn finish(self) -> Vec<HistoryRecord> {
        dedup_and_sort(self.records)
    }

    async fn apply_create(&mut self, transaction: &Transaction) -> Result<()> {
        let (created_at, date) = commit_time(transaction)?;
        let args = transaction.arguments();

        let token = args
            .first()
            .and_then(|v| normalize_address(v).ok())
            .unwrap_or_else(|| APT_METADATA_ADDRESS.to_string());
        let amount = args.get(1).and_then(parse_u64).unwrap_or(0);
        let memo = args
            .get(2)
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(decode_memo)
            .unwrap_or_else(|| DEFAULT_REQUEST_MEMO.to_string());
        let expiry_seconds = args
            .get(3)
            .and_then(parse_u64)
            .unwrap_or(self.default_expiry_seconds);

        let request_address = transaction
            .find_event(REQUEST_CREATED_EVENT)
            .and_then(|event| event.field("request"))
            .and_then(|value| normalize_address(value).ok());

        let on_chain = match &request_address {
            Some(address) => match self.view_request(address).await {
                Ok(request) => request,
                Err(e) => {
                    debug!("Could not check status of request {}: {}", address, e);
                    None
                }
            },
            None => None,
        };

        let expires_at = on_chain
            .as_ref()
            .map(|r| r.expires_at)
            .filter(|t| *t > 0)
            .unwrap_or_else(|| expiry_after(created_at, expiry_seconds));

        self.records.push(HistoryRecord {
            id: format!("{}_create", transaction.hash),
            kind: HistoryKind::Received,
            amount,
            token,
            memo,
            date,
            paid: on_chain.as_ref().map(|r| r.paid).unwrap_or(false),
            cancelled: false,
            payer: None,
            payee: Some(self.user.clone()),
            created_at,
            expires_at,
            transaction_hash: transaction.hash.clone(),
            request_address,
        });

        Ok(())
    }

    async fn apply_payment(&mut self, transaction: &Transaction) -> Result<()> {
        let Some(event) = transaction.find_event(PAYMENT_PAID_EVENT) else {
            return Ok(());
        };
        let (created_at, date) = commit_time(transaction)?;

        let amount = event.field("amount").and_then(parse_u64).unwrap_or(0);
        let payer = event.field("payer").and_then(|v| normalize_address(v).ok());
        let request_address = event.field("request").and_then(|v| normalize_address(v).ok());

        let user_paid = payer
            .as_deref()
            .is_some_and(|payer| addresses_equal(payer, &self.user));

        if user_paid {
            // Request details only enrich the entry; the payment happened regardless
            let request = match &request_address {
                Some(address) => self.view_request(address).await.unwrap_or_else(|e| {
                    debug!("Could not fetch request {} for payment: {}", address, e);
                    None
                }),
                None => None,
            };

            self.records.push(HistoryRecord {
                id: format!("{}_pay", transaction.hash),
                kind: HistoryKind::Sent,
                amount,
                token: request
                    .as_ref()
                    .map(|r| r.token.clone())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| APT_METADATA_ADDRESS.to_string()),
                memo: request
                    .as_ref()
                    .map(|r| r.memo.clone())
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_SENT_MEMO.to_string()),
                date,
                paid: true,
                cancelled: false,
                payer: Some(self.user.clone()),
                payee: request.map(|r| r.payee),
                created_at,
                expires_at: created_at,
                transaction_hash: transaction.hash.clone(),
                request_address,
            });
            return Ok(());
        }

        let Some(address) = request_address else {
            return Ok(());
        };
        let Some(request) = self.view_request(&address).await? else {
            return Ok(());
        };
        if !addresses_equal(&request.payee, &self.user) {
            return Ok(());
        }

        self.records.push(HistoryRecord {
            id: format!("{}_receive", transaction.hash),
            kind: HistoryKind::Received,
            amount,
            token: Some(request.token)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| APT_METADATA_ADDRESS.to_string()),
            memo: Some(request.memo)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_RECEIVED_MEMO.to_string()),
            date,
            paid: true,
            cancelled: false,
            payer,
            payee: Some(self.user.clone()),
            created_at,
            expires_at: created_at,
            transaction_hash: transaction.hash.clone(),
            request_address: Some(address),
        });

        // Settle the creation entry this payment most likely belongs to.
        // Matching is by (payee, amount, unpaid) and can pick the wrong entry
        // when two open requests share payee and amount.
        let user = self.user.clone();
        if let Some(created) = self.records.iter_mut().find(|r| {
            r.kind == HistoryKind::Received
                && !r.paid
                && r.amount == amount
                && r.payee.as_deref().is_some_and(|p| addresses_equal(p, &user))
        }) {
            created.paid = true;
        }

        Ok(())
    }

    fn apply_cancel(&mut self, transaction: &Transaction) {
        let Some(address) = transaction
            .arguments()
            .first()
            .and_then(|v| normalize_address(v).ok())
        else {
            return;
        };

        let created = self.records.iter_mut().find(|r| {
            r.id.ends_with("_create")
                && r.request_address
                    .as_deref()
                    .is_some_and(|a| addresses_equal(a, &address))
        });

        match created {
            Some(record) => record.cancelled = true,
            None => debug!("Cancelled request {} not found in history window", address),
        }
    }

    async fn view_request(&self, address: &str) -> Result<Option<PaymentRequest>> {
        let result = self.client.view(&self.payloads.get_request(address)).await?;
        parse_request_view(&result)
    }
}

/// Drop repeated ids (first occurrence wins) and order newest first
pub fn dedup_and_sort(records: Vec<HistoryRecord>) -> Vec<HistoryRecord> {
    let mut seen = HashSet::new();
    let mut unique: Vec<HistoryRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();

    unique.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    unique
}

/// Commit time as whole seconds and as a timestamp
fn commit_time(transaction: &Transaction) -> Result<(i64, DateTime<Utc>)> {
    let micros = transaction.timestamp_micros().ok_or_else(|| {
        PaymentError::Chain(shared::Error::Serialization(format!(
            "transaction {} has no timestamp",
            transaction.hash
        )))
    })?;

    let seconds = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    let date = DateTime::<Utc>::from_timestamp(seconds, nanos).ok_or_else(|| {
        PaymentError::Chain(shared::Error::Serialization(format!(
            "transaction {} has an out of range timestamp",
            transaction.hash
        )))
    })?;

    Ok((seconds, date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, created_at: i64) -> HistoryRecord {
        HistoryRecord {
            id: id.to_string(),
            kind: HistoryKind::Received,
            amount: 1,
            token: "0xa".to_string(),
            memo: String::new(),
            date: DateTime::<Utc>::from_timestamp(created_at, 0).unwrap(),
            paid: false,
            cancelled: false,
            payer: None,
            payee: None,
            created_at,
            expires_at: created_at,
            transaction_hash: id.to_string(),
            request_address: None,
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut first = record("0x1_create", 10);
        first.memo = "first".to_string();
        let mut second = record("0x1_create", 10);
        second.memo = "second".to_string();

        let result = dedup_and_sort(vec![first, second]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].memo, "first");
    }

    #[test]
    fn test_sort_newest_first() {
        let result = dedup_and_sort(vec![
            record("a", 10),
            record("b", 30),
            record("c", 20),
        ]);
        let ids: Vec<_> = result.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_commit_time_from_micros() {
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "type": "user_transaction",
            "hash": "0x1",
            "timestamp": "1700000000500000"
        }))
        .unwrap();

        let (seconds, date) = commit_time(&tx).unwrap();
        assert_eq!(seconds, 1_700_000_000);
        assert_eq!(date.timestamp_millis(), 1_700_000_000_500);
    }
}
