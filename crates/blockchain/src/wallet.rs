//! Wallet adapters and the session handle that carries the connected account.
//!
//! The session is passed explicitly to whatever needs signing capability;
//! there is no process-wide wallet state.

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use sha3::{Digest, Sha3_256};
use shared::config::TransactionConfig;
use shared::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::AptosClient;
use crate::types::{
    AccountInfo, EntryFunctionPayload, PendingTransaction, SubmitTransactionRequest,
    TransactionSignature,
};

/// Prefix some tools put in front of exported ed25519 private keys
const PRIVATE_KEY_PREFIX: &str = "ed25519-priv-";

/// Single-signer authentication scheme byte appended before hashing
const ED25519_SCHEME: u8 = 0x00;

/// A wallet that can hold an account and sign entry function payloads
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<AccountInfo>;

    async fn disconnect(&self) -> Result<()>;

    /// Connected account, if any
    async fn account(&self) -> Option<AccountInfo>;

    async fn sign_and_submit_transaction(
        &self,
        payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction>;
}

struct Connection {
    adapter: Arc<dyn WalletAdapter>,
    account: AccountInfo,
}

/// Connection state plus signing capability, shared by every action that
/// writes to the chain
#[derive(Default)]
pub struct WalletSession {
    adapters: Vec<Arc<dyn WalletAdapter>>,
    connection: RwLock<Option<Connection>>,
}

impl WalletSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn WalletAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Names of wallets that can be connected
    pub fn available_wallets(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    /// Connect the named wallet, replacing any existing connection
    pub async fn connect(&self, name: &str) -> Result<AccountInfo> {
        let adapter = self
            .adapters
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| Error::Wallet(format!("Wallet not available: {}", name)))?;

        let mut connection = self.connection.write().await;
        // Keep the old connection until its adapter has disconnected
        if let Some(previous) = connection.as_ref() {
            debug!("Disconnecting {} before switching wallets", previous.adapter.name());
            previous.adapter.disconnect().await?;
        }
        *connection = None;

        let account = adapter.connect().await?;
        info!("Wallet {} connected: {}", adapter.name(), account.address);

        *connection = Some(Connection {
            adapter,
            account: account.clone(),
        });
        Ok(account)
    }

    pub async fn disconnect(&self) -> Result<()> {
        let mut connection = self.connection.write().await;
        if let Some(previous) = connection.as_ref() {
            previous.adapter.disconnect().await?;
            info!("Wallet {} disconnected", previous.adapter.name());
        }
        *connection = None;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    pub async fn account(&self) -> Option<AccountInfo> {
        self.connection
            .read()
            .await
            .as_ref()
            .map(|c| c.account.clone())
    }

    /// Name of the connected wallet
    pub async fn wallet_name(&self) -> Option<String> {
        self.connection
            .read()
            .await
            .as_ref()
            .map(|c| c.adapter.name().to_string())
    }

    pub async fn require_account(&self) -> Result<AccountInfo> {
        self.account().await.ok_or(Error::WalletNotConnected)
    }

    pub async fn sign_and_submit_transaction(
        &self,
        payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction> {
        let adapter = self
            .connection
            .read()
            .await
            .as_ref()
            .map(|c| c.adapter.clone())
            .ok_or(Error::WalletNotConnected)?;

        debug!("Submitting {} through {}", payload.function, adapter.name());
        adapter.sign_and_submit_transaction(payload).await
    }
}

/// Wallet backed by an ed25519 private key held by the server.
///
/// Signs through the node's JSON encoding endpoint so no BCS serializer is
/// needed locally.
pub struct LocalKeyWallet {
    name: String,
    signing_key: SigningKey,
    address: String,
    client: Arc<AptosClient>,
    max_gas_amount: u64,
    expiration_secs: u64,
    connected: AtomicBool,
}

impl LocalKeyWallet {
    pub const DEFAULT_NAME: &'static str = "Local Key";

    /// Build a wallet from a hex private key, with or without `0x` and
    /// `ed25519-priv-` prefixes. The address is derived from the key unless
    /// given explicitly (rotated keys keep their original address).
    pub fn from_private_key(
        private_key: &str,
        address: Option<String>,
        client: Arc<AptosClient>,
        transactions: &TransactionConfig,
    ) -> Result<Self> {
        let signing_key = parse_private_key(private_key)?;
        let address = match address {
            Some(address) => shared::address::standardize_address(&address)?,
            None => derive_address(&signing_key),
        };

        Ok(Self {
            name: Self::DEFAULT_NAME.to_string(),
            signing_key,
            address,
            client,
            max_gas_amount: transactions.max_gas_amount,
            expiration_secs: transactions.expiration_secs,
            connected: AtomicBool::new(false),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().to_bytes()))
    }

    fn account_info(&self) -> AccountInfo {
        AccountInfo {
            address: self.address.clone(),
            public_key: Some(self.public_key_hex()),
        }
    }

    fn sign(&self, message: &[u8]) -> TransactionSignature {
        let signature = self.signing_key.sign(message);
        TransactionSignature {
            public_key: self.public_key_hex(),
            signature: format!("0x{}", hex::encode(signature.to_bytes())),
        }
    }
}

#[async_trait]
impl WalletAdapter for LocalKeyWallet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<AccountInfo> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.account_info())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn account(&self) -> Option<AccountInfo> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.account_info())
    }

    async fn sign_and_submit_transaction(
        &self,
        payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::WalletNotConnected);
        }

        let sequence_number = self.client.get_sequence_number(&self.address).await?;
        let gas_unit_price = self.client.estimate_gas_price().await?;
        let expiration = chrono::Utc::now().timestamp() as u64 + self.expiration_secs;

        let mut request = SubmitTransactionRequest {
            sender: self.address.clone(),
            sequence_number: sequence_number.to_string(),
            max_gas_amount: self.max_gas_amount.to_string(),
            gas_unit_price: gas_unit_price.to_string(),
            expiration_timestamp_secs: expiration.to_string(),
            payload: payload.clone(),
            signature: None,
        };

        let signing_message = self.client.encode_submission(&request).await?;
        request.signature = Some(self.sign(&signing_message));

        self.client.submit_transaction(&request).await
    }
}

fn parse_private_key(private_key: &str) -> Result<SigningKey> {
    let trimmed = private_key.trim();
    let trimmed = trimmed.strip_prefix(PRIVATE_KEY_PREFIX).unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let bytes = hex::decode(trimmed)
        .map_err(|e| Error::Config(format!("Private key is not valid hex: {}", e)))?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
        Error::Config(format!("Private key must be 32 bytes, got {}", bytes.len()))
    })?;

    Ok(SigningKey::from_bytes(&bytes))
}

/// Account address for a fresh single-key account:
/// `sha3_256(public_key || 0x00)`
pub fn derive_address(signing_key: &SigningKey) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(signing_key.verifying_key().to_bytes());
    hasher.update([ED25519_SCHEME]);
    format!("0x{}", hex::encode(hasher.finalize()))
}
