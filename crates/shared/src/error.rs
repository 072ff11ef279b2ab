use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Aptos RPC error: {0}")]
    AptosRpc(String),

    #[error("Aptos API error ({status}): {message}")]
    AptosApi { status: u16, message: String },

    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Timed out waiting for transaction: {0}")]
    TransactionTimeout(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Transport failures, rate limiting and node-side errors are worth retrying;
    /// client errors (bad address, missing resource, aborted view) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::AptosRpc(_) => true,
            Error::AptosApi { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
