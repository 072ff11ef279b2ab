//! Payment requests on the PayMe contract: creating, resolving, paying and
//! cancelling requests, rebuilding an account's payment history from its
//! transactions, and producing shareable links, QR codes and CSV exports.

pub mod decode;
pub mod error;
pub mod export;
pub mod format;
pub mod history;
pub mod link;
pub mod payload;
pub mod qr;
pub mod service;

pub use decode::{decode_memo, encode_memo, normalize_address, AddressRef};
pub use error::{ErrorCategory, PaymentError, Result};
pub use export::{export_csv, export_file_name, HistoryFilter, HistorySummary};
pub use format::{
    format_address, format_amount, format_date, format_relative_time, get_time_remaining,
    is_expired, parse_amount,
};
pub use history::{dedup_and_sort, HistoryReconstructor};
pub use link::{generate_payment_url, parse_payment_url, LinkParams, ShareLinks};
pub use payload::PayloadBuilder;
pub use qr::QrCodeService;
pub use service::{
    resolve_recipient, ActionState, CreatedPaymentLink, NewPaymentRequest, PaymentPageView,
    PaymentService, TokenBalance, TransferReceipt,
};
