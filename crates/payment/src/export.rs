use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{HistoryKind, PaymentHistory, PaymentStatus};
use tracing::{error, info};

use crate::error::{PaymentError, Result};
use crate::format::format_amount;

/// Search and facet filters over displayed history. `None` means "all".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Case-insensitive substring of the memo or counterparty
    pub search: Option<String>,
    pub status: Option<PaymentStatus>,
    #[serde(rename = "type")]
    pub kind: Option<HistoryKind>,
    pub token_symbol: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, item: &PaymentHistory) -> bool {
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !item.memo.to_lowercase().contains(&term)
                && !item.counterparty.to_lowercase().contains(&term)
            {
                return false;
            }
        }

        self.status.map_or(true, |status| item.status == status)
            && self.kind.map_or(true, |kind| item.kind == kind)
            && self
                .token_symbol
                .as_deref()
                .map_or(true, |symbol| item.token.symbol == symbol)
    }

    pub fn apply(&self, history: &[PaymentHistory]) -> Vec<PaymentHistory> {
        history.iter().filter(|item| self.matches(item)).cloned().collect()
    }
}

/// Counts shown under the history table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl HistorySummary {
    pub fn of(history: &[PaymentHistory]) -> Self {
        Self {
            total: history.len(),
            completed: history
                .iter()
                .filter(|h| h.status == PaymentStatus::Completed)
                .count(),
            pending: history
                .iter()
                .filter(|h| h.status == PaymentStatus::Pending)
                .count(),
        }
    }
}

pub const CSV_HEADER: [&str; 7] = [
    "Date",
    "Type",
    "Amount",
    "Token",
    "Memo",
    "Status",
    "Transaction Hash",
];

/// Render history rows as CSV, one row per entry in the given order
pub fn export_csv(history: &[PaymentHistory]) -> Result<Vec<u8>> {
    if history.is_empty() {
        return Err(PaymentError::NothingToExport);
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for item in history {
        wtr.write_record([
            item.date.to_rfc3339_opts(SecondsFormat::Millis, true),
            item.kind.to_string(),
            format_amount(item.amount, item.token.decimals),
            item.token.symbol.clone(),
            item.memo.clone(),
            item.status.to_string(),
            item.transaction_hash.clone().unwrap_or_default(),
        ])?;
    }

    let csv_bytes = wtr.into_inner().map_err(|e| {
        error!("Failed to finalize CSV: {}", e);
        PaymentError::Export(format!("Failed to finalize CSV: {}", e))
    })?;

    info!("Exported {} history entries as CSV ({} bytes)", history.len(), csv_bytes.len());

    Ok(csv_bytes)
}

/// `aptos-payme-history-2024-01-05.csv`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("aptos-payme-history-{}.csv", now.format("%Y-%m-%d"))
}
