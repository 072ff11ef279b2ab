use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Another action is already in progress")]
    ActionInFlight,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Name service lookups are not supported: {0}")]
    UnsupportedNameService(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Payment request already paid: {0}")]
    AlreadyPaid(String),

    #[error("Payment request expired: {0}")]
    RequestExpired(String),

    #[error("Cannot pay own payment request: {0}")]
    OwnRequest(String),

    #[error("Invalid memo: {0}")]
    InvalidMemo(String),

    #[error("Payment request not found: {0}")]
    RequestNotFound(String),

    #[error("Unrecognized address shape: {0}")]
    UnrecognizedAddressShape(String),

    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Invalid payment link: {0}")]
    InvalidLink(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("QR code error: {0}")]
    QrCode(String),

    #[error("No history entries to export")]
    NothingToExport,

    #[error("Export error: {0}")]
    Export(String),

    #[error(transparent)]
    Chain(#[from] shared::Error),
}

impl From<csv::Error> for PaymentError {
    fn from(err: csv::Error) -> Self {
        PaymentError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

impl PaymentError {
    /// Message suitable for showing inline next to the action that failed
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::WalletNotConnected => {
                "Please connect your wallet first.".to_string()
            }
            PaymentError::ActionInFlight => {
                "Another transaction is still being processed. Please wait for it to finish.".to_string()
            }
            PaymentError::InvalidAmount(details) => {
                format!("Invalid amount: {}. Please enter a positive number.", details)
            }
            PaymentError::InvalidRecipient(addr) => {
                format!("Invalid recipient address: '{}'. Please check the address and try again.", addr)
            }
            PaymentError::UnsupportedNameService(name) => {
                format!("'{}' looks like an ANS name. Name lookups are not supported yet, please use the 0x address.", name)
            }
            PaymentError::InsufficientBalance { required, available } => {
                format!(
                    "Insufficient balance. You need {} but only have {} available.",
                    required, available
                )
            }
            PaymentError::AlreadyPaid(id) => {
                format!("Payment request '{}' has already been paid.", id)
            }
            PaymentError::RequestExpired(id) => {
                format!("Payment request '{}' has expired.", id)
            }
            PaymentError::OwnRequest(_) => {
                "You cannot pay your own request.".to_string()
            }
            PaymentError::InvalidMemo(details) => {
                format!("Invalid memo: {}.", details)
            }
            PaymentError::RequestNotFound(id) => {
                format!("Payment request '{}' not found. The link may be wrong or the request may not exist yet.", id)
            }
            PaymentError::UnrecognizedAddressShape(_) => {
                "The transaction data could not be read.".to_string()
            }
            PaymentError::UnknownToken(token) => {
                format!("Token '{}' is not supported.", token)
            }
            PaymentError::InvalidLink(details) => {
                format!("Invalid payment link: {}.", details)
            }
            PaymentError::TransactionFailed(reason) => {
                format!("Transaction failed: {}. Please try again.", reason)
            }
            PaymentError::QrCode(details) => {
                format!("QR code error: {}.", details)
            }
            PaymentError::NothingToExport => {
                "There is no history to export.".to_string()
            }
            PaymentError::Export(details) => {
                format!("Export failed: {}.", details)
            }
            PaymentError::Chain(err) => match err {
                shared::Error::WalletNotConnected => "Please connect your wallet first.".to_string(),
                shared::Error::TransactionFailed(reason) => {
                    format!("Transaction failed: {}. Please try again.", reason)
                }
                shared::Error::TransactionTimeout(hash) => {
                    format!("Transaction {} is taking longer than expected. Check the explorer before retrying.", hash)
                }
                shared::Error::InvalidAddress(details) => {
                    format!("{}. Please check the address and try again.", details)
                }
                _ => format!("Network error: {}. Please check your connection and try again.", err),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PaymentError::WalletNotConnected => ErrorCategory::Wallet,
            PaymentError::ActionInFlight => ErrorCategory::Conflict,
            PaymentError::InvalidAmount(_) => ErrorCategory::Validation,
            PaymentError::InvalidRecipient(_) => ErrorCategory::Validation,
            PaymentError::UnsupportedNameService(_) => ErrorCategory::Validation,
            PaymentError::InsufficientBalance { .. } => ErrorCategory::Validation,
            PaymentError::AlreadyPaid(_) => ErrorCategory::Conflict,
            PaymentError::RequestExpired(_) => ErrorCategory::Conflict,
            PaymentError::OwnRequest(_) => ErrorCategory::Validation,
            PaymentError::InvalidMemo(_) => ErrorCategory::Validation,
            PaymentError::RequestNotFound(_) => ErrorCategory::NotFound,
            PaymentError::UnrecognizedAddressShape(_) => ErrorCategory::Decode,
            PaymentError::UnknownToken(_) => ErrorCategory::Validation,
            PaymentError::InvalidLink(_) => ErrorCategory::Validation,
            PaymentError::TransactionFailed(_) => ErrorCategory::Transaction,
            PaymentError::QrCode(_) => ErrorCategory::Internal,
            PaymentError::NothingToExport => ErrorCategory::Validation,
            PaymentError::Export(_) => ErrorCategory::Internal,
            PaymentError::Chain(err) => match err {
                shared::Error::WalletNotConnected | shared::Error::Wallet(_) => ErrorCategory::Wallet,
                shared::Error::TransactionFailed(_) => ErrorCategory::Transaction,
                shared::Error::TransactionTimeout(_) => ErrorCategory::Timeout,
                shared::Error::TransactionNotFound(_) => ErrorCategory::NotFound,
                shared::Error::InvalidAddress(_) | shared::Error::Validation(_) => {
                    ErrorCategory::Validation
                }
                shared::Error::Serialization(_)
                | shared::Error::Config(_)
                | shared::Error::Internal(_) => ErrorCategory::Internal,
                shared::Error::AptosRpc(_)
                | shared::Error::AptosApi { .. }
                | shared::Error::CircuitBreakerOpen(_) => ErrorCategory::Network,
            },
        }
    }
}

/// Error categories for logging and HTTP mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Wallet,
    Conflict,
    Transaction,
    Network,
    Timeout,
    Decode,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Wallet => write!(f, "wallet"),
            ErrorCategory::Conflict => write!(f, "conflict"),
            ErrorCategory::Transaction => write!(f, "transaction"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Decode => write!(f, "decode"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}
