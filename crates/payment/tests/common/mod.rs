//! In-memory chain and wallet used by the payment integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use blockchain::{
    AccountInfo, ChainClient, EntryFunctionPayload, PendingTransaction, Transaction, ViewRequest,
    WalletAdapter, WalletSession,
};
use serde_json::{json, Value};
use shared::config::{AppConfig, ContractConfig};
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use payment::PaymentService;

pub const CONTRACT: &str = "0x8e";
pub const USER: &str = "0xa11ce";
pub const OTHER: &str = "0xb0b";

/// Expiry far enough ahead that a request stays payable
pub const FAR_FUTURE: i64 = 4_000_000_000;

pub fn contract() -> ContractConfig {
    ContractConfig {
        address: CONTRACT.to_string(),
        module: "payme".to_string(),
    }
}

pub fn function(name: &str) -> String {
    format!("{}::payme::{}", CONTRACT, name)
}

/// Chain state served from maps; anything not registered behaves like a
/// missing resource on a real node
#[derive(Default)]
pub struct MockChainClient {
    requests: Mutex<HashMap<String, Value>>,
    transactions: Mutex<HashMap<String, Transaction>>,
    account_transactions: Mutex<HashMap<String, Vec<Transaction>>>,
    balances: Mutex<HashMap<(String, String), u64>>,
    failing_accounts: Mutex<Vec<String>>,
    view_calls: AtomicUsize,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the `get_request` view result for an object address
    pub fn add_request(&self, address: &str, request: Value) {
        self.requests
            .lock()
            .unwrap()
            .insert(address.to_string(), request);
    }

    pub fn set_paid(&self, address: &str, payer: &str) {
        if let Some(request) = self.requests.lock().unwrap().get_mut(address) {
            request["paid"] = json!(true);
            request["payer"] = json!({"vec": [payer]});
        }
    }

    pub fn add_transaction(&self, transaction: Transaction) {
        self.transactions
            .lock()
            .unwrap()
            .insert(transaction.hash.clone(), transaction);
    }

    pub fn set_account_transactions(&self, address: &str, transactions: Vec<Transaction>) {
        self.account_transactions
            .lock()
            .unwrap()
            .insert(address.to_string(), transactions);
    }

    pub fn fail_account(&self, address: &str) {
        self.failing_accounts
            .lock()
            .unwrap()
            .push(address.to_string());
    }

    pub fn set_balance(&self, address: &str, asset: &str, amount: u64) {
        self.balances
            .lock()
            .unwrap()
            .insert((address.to_string(), asset.to_string()), amount);
    }

    pub fn view_calls(&self) -> usize {
        self.view_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        let address = request
            .arguments
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default();

        match self.requests.lock().unwrap().get(address) {
            Some(request) => Ok(vec![request.clone()]),
            None => Err(Error::AptosApi {
                status: 400,
                message: format!("resource not found at {}", address),
            }),
        }
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Transaction> {
        self.transactions
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::TransactionNotFound(hash.to_string()))
    }

    async fn get_account_transactions(&self, address: &str, limit: u32) -> Result<Vec<Transaction>> {
        if self.failing_accounts.lock().unwrap().iter().any(|a| a == address) {
            return Err(Error::AptosRpc("connection reset".to_string()));
        }

        let transactions = self
            .account_transactions
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default();
        let skip = transactions.len().saturating_sub(limit as usize);
        Ok(transactions.into_iter().skip(skip).collect())
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<Transaction> {
        let transaction = self
            .transactions
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .unwrap_or_else(|| user_transaction(hash, 1_700_000_000, "0x1::noop::noop", vec![], json!([])));

        if transaction.is_successful() {
            Ok(transaction)
        } else {
            Err(Error::TransactionFailed(
                transaction
                    .vm_status
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            ))
        }
    }

    async fn get_balance(&self, address: &str, asset: &str) -> Result<u64> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(address.to_string(), asset.to_string()))
            .copied()
            .unwrap_or(0))
    }
}

/// Wallet that records payloads and hands out `0xtx1`, `0xtx2`, ... as hashes
pub struct MockWallet {
    address: String,
    connected: Mutex<bool>,
    submitted: Mutex<Vec<EntryFunctionPayload>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockWallet {
    pub const NAME: &'static str = "Petra";

    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            connected: Mutex::new(false),
            submitted: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Park every submission until the gate is notified
    pub fn hold_submissions(&self, gate: Arc<Notify>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn submitted(&self) -> Vec<EntryFunctionPayload> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn connect(&self) -> Result<AccountInfo> {
        *self.connected.lock().unwrap() = true;
        Ok(AccountInfo {
            address: self.address.clone(),
            public_key: None,
        })
    }

    async fn disconnect(&self) -> Result<()> {
        *self.connected.lock().unwrap() = false;
        Ok(())
    }

    async fn account(&self) -> Option<AccountInfo> {
        self.connected.lock().unwrap().then(|| AccountInfo {
            address: self.address.clone(),
            public_key: None,
        })
    }

    async fn sign_and_submit_transaction(
        &self,
        payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(payload.clone());
        Ok(PendingTransaction {
            hash: format!("0xtx{}", submitted.len()),
        })
    }
}

pub struct Harness {
    pub chain: Arc<MockChainClient>,
    pub wallet: Arc<MockWallet>,
    pub session: Arc<WalletSession>,
    pub service: PaymentService,
}

pub fn harness(user: &str) -> Harness {
    let chain = Arc::new(MockChainClient::new());
    let wallet = Arc::new(MockWallet::new(user));
    let session = Arc::new(WalletSession::new().with_adapter(wallet.clone()));
    let service = PaymentService::new(
        chain.clone(),
        session.clone(),
        contract(),
        AppConfig::default(),
        "testnet",
    );

    Harness {
        chain,
        wallet,
        session,
        service,
    }
}

pub async fn connected_harness(user: &str) -> Harness {
    let harness = harness(user);
    harness.session.connect(MockWallet::NAME).await.unwrap();
    harness
}

/// `get_request` view result in the node's JSON rendering
pub fn request_view(payee: &str, amount: u64, memo: &str, created_at: i64, expires_at: i64) -> Value {
    json!({
        "payee": payee,
        "token": {"inner": "0xa"},
        "amount": amount.to_string(),
        "memo": memo,
        "created_at": created_at.to_string(),
        "expires_at": expires_at.to_string(),
        "paid": false,
        "payer": {"vec": []}
    })
}

pub fn user_transaction(
    hash: &str,
    timestamp_secs: i64,
    function: &str,
    arguments: Vec<Value>,
    events: Value,
) -> Transaction {
    serde_json::from_value(json!({
        "type": "user_transaction",
        "hash": hash,
        "version": "1",
        "success": true,
        "vm_status": "Executed successfully",
        "timestamp": (timestamp_secs * 1_000_000).to_string(),
        "payload": {
            "type": "entry_function_payload",
            "function": function,
            "type_arguments": [],
            "arguments": arguments
        },
        "events": events
    }))
    .unwrap()
}

/// Creation transaction announcing `request` in its event
pub fn create_transaction(
    hash: &str,
    timestamp_secs: i64,
    request: &str,
    amount: u64,
    memo_hex: &str,
) -> Transaction {
    user_transaction(
        hash,
        timestamp_secs,
        &function("create_payment_request"),
        vec![
            json!({"inner": "0xa"}),
            json!(amount.to_string()),
            json!(memo_hex),
            json!("86400"),
        ],
        json!([{
            "type": format!("{}::payme::PaymentRequestCreated", CONTRACT),
            "data": {"request": {"inner": request}, "payee": USER, "amount": amount.to_string()}
        }]),
    )
}

/// Payment transaction emitting `PaymentPaid`
pub fn pay_transaction(
    hash: &str,
    timestamp_secs: i64,
    request: &str,
    payer: &str,
    amount: u64,
) -> Transaction {
    user_transaction(
        hash,
        timestamp_secs,
        &function("pay_request"),
        vec![json!(request)],
        json!([{
            "type": format!("{}::payme::PaymentPaid", CONTRACT),
            "data": {"request": {"inner": request}, "payer": payer, "amount": amount.to_string()}
        }]),
    )
}

pub fn cancel_transaction(hash: &str, timestamp_secs: i64, request: &str) -> Transaction {
    user_transaction(
        hash,
        timestamp_secs,
        &function("cancel_request"),
        vec![json!(request)],
        json!([]),
    )
}
