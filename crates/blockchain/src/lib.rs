pub mod circuit_breaker;
pub mod client;
pub mod retry;
pub mod types;
pub mod wallet;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{AptosClient, ChainClient};
pub use retry::{retry_with_backoff, retry_with_backoff_if, RetryConfig};
pub use types::*;
pub use wallet::{LocalKeyWallet, WalletAdapter, WalletSession};
