use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::config::{AptosConfig, TransactionConfig};
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::retry::{retry_with_backoff_if, RetryConfig};
use crate::types::{
    AccountResource, ApiErrorBody, GasEstimation, PendingTransaction, SubmitTransactionRequest,
    Transaction, ViewRequest,
};

/// Read side of the chain the payment service depends on.
///
/// Implemented by [`AptosClient`] against a fullnode and by in-memory mocks in
/// tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Execute a view function and return its result array
    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>>;

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Transaction>;

    /// Most recent transactions sent by `address`, newest last
    async fn get_account_transactions(&self, address: &str, limit: u32) -> Result<Vec<Transaction>>;

    /// Block until the transaction is committed. A committed but failed
    /// transaction is returned as [`Error::TransactionFailed`].
    async fn wait_for_transaction(&self, hash: &str) -> Result<Transaction>;

    /// Balance of `asset` (coin type or fungible asset metadata address) in base units
    async fn get_balance(&self, address: &str, asset: &str) -> Result<u64>;
}

/// Aptos fullnode REST client with primary and fallback endpoints.
///
/// Each endpoint sits behind its own circuit breaker; retryable failures on
/// the primary fail over to the fallback when one is configured.
pub struct AptosClient {
    http: reqwest::Client,
    primary_url: String,
    fallback_url: Option<String>,
    primary_circuit_breaker: Arc<CircuitBreaker>,
    fallback_circuit_breaker: Option<Arc<CircuitBreaker>>,
    retry_config: RetryConfig,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl AptosClient {
    pub fn new(node_url: String, fallback_url: Option<String>) -> Self {
        Self::new_with_config(
            node_url,
            fallback_url,
            RetryConfig::default(),
            CircuitBreakerConfig::default(),
        )
    }

    pub fn new_with_config(
        node_url: String,
        fallback_url: Option<String>,
        retry_config: RetryConfig,
        circuit_breaker_config: CircuitBreakerConfig,
    ) -> Self {
        info!("Initializing Aptos client with primary node: {}", node_url);

        let primary_circuit_breaker = Arc::new(CircuitBreaker::new(
            format!("aptos-primary-{}", node_url),
            circuit_breaker_config.clone(),
        ));

        let fallback_circuit_breaker = fallback_url.as_ref().map(|url| {
            info!("Configuring fallback node: {}", url);
            Arc::new(CircuitBreaker::new(
                format!("aptos-fallback-{}", url),
                circuit_breaker_config,
            ))
        });

        Self {
            http: reqwest::Client::new(),
            primary_url: node_url.trim_end_matches('/').to_string(),
            fallback_url: fallback_url.map(|u| u.trim_end_matches('/').to_string()),
            primary_circuit_breaker,
            fallback_circuit_breaker,
            retry_config,
            wait_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn from_config(aptos: &AptosConfig, transactions: &TransactionConfig) -> Self {
        Self::new(aptos.node_url.clone(), aptos.fallback_node_url.clone())
            .with_wait_timeout(Duration::from_secs(transactions.wait_timeout_secs))
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn node_url(&self) -> &str {
        &self.primary_url
    }

    /// Current sequence number of an on-chain account
    pub async fn get_sequence_number(&self, address: &str) -> Result<u64> {
        let account: AccountResource = self
            .request("get_account", Method::GET, &format!("/accounts/{}", address), None)
            .await?;

        account.sequence_number.parse().map_err(|_| {
            Error::Serialization(format!(
                "Invalid sequence number for {}: {}",
                address, account.sequence_number
            ))
        })
    }

    pub async fn estimate_gas_price(&self) -> Result<u64> {
        let estimation: GasEstimation = self
            .request("estimate_gas_price", Method::GET, "/estimate_gas_price", None)
            .await?;
        Ok(estimation.gas_estimate)
    }

    /// BCS signing message for an unsigned submission, as raw bytes
    pub async fn encode_submission(&self, transaction: &SubmitTransactionRequest) -> Result<Vec<u8>> {
        let body = serde_json::to_value(transaction)?;
        let encoded: String = self
            .request(
                "encode_submission",
                Method::POST,
                "/transactions/encode_submission",
                Some(body),
            )
            .await?;

        hex::decode(encoded.trim_start_matches("0x"))
            .map_err(|e| Error::Serialization(format!("Invalid signing message: {}", e)))
    }

    /// Submit a signed transaction. Submissions are never retried.
    pub async fn submit_transaction(
        &self,
        transaction: &SubmitTransactionRequest,
    ) -> Result<PendingTransaction> {
        let body = serde_json::to_value(transaction)?;
        let pending: PendingTransaction = self
            .request_with(
                &RetryConfig::none(),
                "submit_transaction",
                Method::POST,
                "/transactions",
                Some(body),
            )
            .await?;

        info!("Transaction submitted: {}", pending.hash);
        Ok(pending)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        operation_name: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        self.request_with(&self.retry_config, operation_name, method, path, body)
            .await
    }

    /// Run a request against the primary node, failing over to the fallback
    /// node when the primary is unreachable or its circuit is open
    async fn request_with<T: DeserializeOwned>(
        &self,
        retry_config: &RetryConfig,
        operation_name: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        debug!("{} {}", method, path);

        let primary_result = self
            .execute_with_circuit_breaker(
                &self.primary_circuit_breaker,
                retry_config,
                operation_name,
                || {
                    Self::send(
                        self.http.clone(),
                        method.clone(),
                        format!("{}{}", self.primary_url, path),
                        body.clone(),
                    )
                },
            )
            .await;

        let error = match primary_result {
            Ok(value) => return Ok(value),
            Err(e) if !Self::should_fail_over(&e) => return Err(e),
            Err(e) => e,
        };

        let (Some(fallback_url), Some(fallback_cb)) =
            (&self.fallback_url, &self.fallback_circuit_breaker)
        else {
            return Err(error);
        };

        warn!(
            "Primary node failed for {}: {}, attempting fallback",
            operation_name, error
        );

        self.execute_with_circuit_breaker(fallback_cb, retry_config, operation_name, || {
            Self::send(
                self.http.clone(),
                method.clone(),
                format!("{}{}", fallback_url, path),
                body.clone(),
            )
        })
        .await
        .map_err(|fallback_error| {
            error!(
                "Both primary and fallback nodes failed for {}: {}",
                operation_name, fallback_error
            );
            fallback_error
        })
    }

    fn should_fail_over(error: &Error) -> bool {
        error.is_retryable() || matches!(error, Error::CircuitBreakerOpen(_))
    }

    async fn execute_with_circuit_breaker<F, Fut, T>(
        &self,
        circuit_breaker: &CircuitBreaker,
        retry_config: &RetryConfig,
        operation_name: &str,
        operation: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if !circuit_breaker.is_request_allowed().await {
            error!(
                "Circuit breaker '{}' is open for operation: {}",
                circuit_breaker.name(),
                operation_name
            );
            return Err(Error::CircuitBreakerOpen(format!(
                "Circuit breaker is open for {}",
                operation_name
            )));
        }

        let result =
            retry_with_backoff_if(operation_name, retry_config, operation, Error::is_retryable)
                .await;

        // Only node-side failures count against the endpoint
        match &result {
            Ok(_) => circuit_breaker.record_success().await,
            Err(e) if e.is_retryable() => circuit_breaker.record_failure().await,
            Err(_) => circuit_breaker.record_success().await,
        }

        result
    }

    async fn send<T: DeserializeOwned>(
        http: reqwest::Client,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<T> {
        let mut request = http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::AptosRpc(format!("Failed to send request to {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return Err(Error::AptosApi {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse response from {}: {}", url, e)))
    }
}

#[async_trait]
impl ChainClient for AptosClient {
    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>> {
        debug!("View call: {}", request.function);
        let body = serde_json::to_value(request)?;
        self.request("view", Method::POST, "/view", Some(body)).await
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Transaction> {
        self.request(
            "get_transaction_by_hash",
            Method::GET,
            &format!("/transactions/by_hash/{}", hash),
            None,
        )
        .await
        .map_err(|e| match e {
            Error::AptosApi { status: 404, .. } => Error::TransactionNotFound(hash.to_string()),
            other => other,
        })
    }

    async fn get_account_transactions(&self, address: &str, limit: u32) -> Result<Vec<Transaction>> {
        let result = self
            .request(
                "get_account_transactions",
                Method::GET,
                &format!("/accounts/{}/transactions?limit={}", address, limit),
                None,
            )
            .await;

        match result {
            // Accounts that never transacted do not exist on chain yet
            Err(Error::AptosApi { status: 404, .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<Transaction> {
        let deadline = tokio::time::Instant::now() + self.wait_timeout;

        loop {
            match self.get_transaction_by_hash(hash).await {
                Ok(tx) if !tx.is_pending() => {
                    if tx.is_successful() {
                        debug!("Transaction {} committed", hash);
                        return Ok(tx);
                    }
                    let vm_status = tx
                        .vm_status
                        .clone()
                        .unwrap_or_else(|| "unknown VM status".to_string());
                    warn!("Transaction {} failed: {}", hash, vm_status);
                    return Err(Error::TransactionFailed(vm_status));
                }
                Ok(_) | Err(Error::TransactionNotFound(_)) => {}
                Err(e) => return Err(e),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::TransactionTimeout(hash.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_balance(&self, address: &str, asset: &str) -> Result<u64> {
        let value: Value = self
            .request(
                "get_balance",
                Method::GET,
                &format!("/accounts/{}/balance/{}", address, asset),
                None,
            )
            .await?;

        parse_balance(&value)
    }
}

/// The balance endpoint returns a bare number; some node versions quote it
fn parse_balance(value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::Serialization(format!("Unexpected balance value: {}", value)))
}
