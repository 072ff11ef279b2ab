//! Payment request actions for one wallet session.
//!
//! Every write action follows the same sequence: require a connected account,
//! run the advisory guards, build the payload, sign and submit through the
//! session, then wait for the chain to confirm. Settlement rules (expiry,
//! double payment, amounts) are enforced by the contract; the checks here only
//! stop a transaction that would obviously be rejected.

use blockchain::{
    AccountInfo, ChainClient, EntryFunctionPayload, Transaction, WalletSession,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::address::{addresses_equal, is_hex_address};
use shared::config::{AppConfig, ContractConfig};
use shared::models::{
    CreatePaymentRequestParams, CreatedRequest, HistoryRecord, PaymentHistory, PaymentLink,
    PaymentRequest, ShareOptions, TokenInfo,
};
use shared::tokens::{is_native, TokenRegistry, APT_COIN_TYPE};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::decode::normalize_address;
use crate::error::{PaymentError, Result};
use crate::export::HistoryFilter;
use crate::format::{
    explorer_transaction_url, expiry_after, format_amount, get_time_remaining_at, is_expired_at,
    parse_amount,
};
use crate::history::HistoryReconstructor;
use crate::link::{generate_payment_url, request_from_hint, LinkParams, ShareLinks};
use crate::payload::{extract_request_object, transfer_payload, PayloadBuilder, PAYMENT_PAID_EVENT};
use crate::qr::QrCodeService;

pub const MAX_MEMO_CHARS: usize = 100;

/// Identifiers at least this long that start with `0x` may be transaction hashes
const MIN_HASH_LOOKUP_LEN: usize = 20;

/// Progress of the most recent write action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ActionState {
    Idle,
    Loading,
    Success,
    Error(String),
}

/// Request as typed into the create form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentRequest {
    /// Decimal amount in whole tokens, e.g. `"1.5"`
    pub amount: String,
    /// Token symbol or metadata address
    pub token: String,
    pub memo: String,
    #[serde(default)]
    pub expires_in_seconds: Option<u64>,
}

/// A confirmed request plus everything needed to share it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPaymentLink {
    pub request: CreatedRequest,
    pub link: PaymentLink,
    pub share: ShareLinks,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transaction_hash: String,
    pub recipient: String,
    pub amount: u64,
    pub token: TokenInfo,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: TokenInfo,
    pub balance: u64,
    pub formatted: String,
}

/// Everything the payment page shows for one request id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPageView {
    pub request_id: String,
    /// Resolved request object address; `None` while only the link hint is known
    pub request_address: Option<String>,
    pub request: PaymentRequest,
    pub token: TokenInfo,
    pub amount_display: String,
    pub time_remaining: String,
    pub expired: bool,
    /// Values come from the link hint, not from the chain
    pub provisional: bool,
    /// The connected account is the payee
    pub is_own_request: bool,
    pub payment_transaction_hash: Option<String>,
    pub explorer_url: Option<String>,
}

/// Clears the in-flight flag when the action finishes, however it finishes
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PaymentService {
    client: Arc<dyn ChainClient>,
    session: Arc<WalletSession>,
    payloads: PayloadBuilder,
    tokens: TokenRegistry,
    app: AppConfig,
    network: String,
    state: RwLock<ActionState>,
    in_flight: AtomicBool,
}

impl PaymentService {
    pub fn new(
        client: Arc<dyn ChainClient>,
        session: Arc<WalletSession>,
        contract: ContractConfig,
        app: AppConfig,
        network: impl Into<String>,
    ) -> Self {
        Self {
            client,
            session,
            tokens: TokenRegistry::for_contract(&contract.address),
            payloads: PayloadBuilder::new(contract),
            app,
            network: network.into(),
            state: RwLock::new(ActionState::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn app_config(&self) -> &AppConfig {
        &self.app
    }

    pub async fn action_state(&self) -> ActionState {
        self.state.read().await.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    // Write actions

    /// Submit `create_payment_request` and return the created object address
    pub async fn create_payment_request(
        &self,
        params: CreatePaymentRequestParams,
    ) -> Result<CreatedRequest> {
        self.run_action("create_payment_request", self.submit_create(params))
            .await
    }

    /// Create a request from form input and build its shareable link
    pub async fn request_payment(
        &self,
        input: NewPaymentRequest,
        share: ShareOptions,
    ) -> Result<CreatedPaymentLink> {
        self.run_action("request_payment", async {
            let account = self.require_account().await?;
            let token = self
                .tokens
                .find(&input.token)
                .ok_or_else(|| PaymentError::UnknownToken(input.token.clone()))?
                .clone();
            let amount = parse_amount(&input.amount, token.decimals)?;
            let expires_in_seconds = input
                .expires_in_seconds
                .unwrap_or(self.app.default_expiry_seconds);

            let request = self
                .submit_create(CreatePaymentRequestParams {
                    token: token.address.clone(),
                    amount,
                    memo: input.memo.clone(),
                    expires_in_seconds,
                })
                .await?;

            let expires_at = expiry_after(Utc::now().timestamp(), expires_in_seconds);
            let params = LinkParams {
                amount: Some(format_amount(amount, token.decimals)),
                token: Some(token.symbol.clone()),
                memo: Some(input.memo.clone()),
                payee: Some(account.address),
                expires_at: Some(expires_at),
            };
            let (link, share) = self.payment_link_for(request.request_id(), &params, &share)?;

            Ok(CreatedPaymentLink {
                request,
                link,
                share,
                expires_at,
            })
        })
        .await
    }

    /// Pay a request by object address or creation hash. Returns the
    /// payment transaction hash.
    pub async fn pay_request(&self, request_id: &str) -> Result<String> {
        self.run_action("pay_request", async {
            let account = self.require_account().await?;

            // Re-read the request right before paying; the link may be stale
            let (address, request) = self
                .lookup(request_id)
                .await
                .ok_or_else(|| PaymentError::RequestNotFound(request_id.to_string()))?;
            if request.paid {
                return Err(PaymentError::AlreadyPaid(address));
            }
            if is_expired_at(request.expires_at, Utc::now().timestamp()) {
                return Err(PaymentError::RequestExpired(address));
            }
            if addresses_equal(&account.address, &request.payee) {
                return Err(PaymentError::OwnRequest(address));
            }

            let token = self.tokens.find_or_default(&request.token);
            self.check_balance(&account.address, token, request.amount)
                .await?;

            let transaction = self
                .submit_and_wait(&self.payloads.pay_request(&address))
                .await?;
            info!("Paid request {} in {}", address, transaction.hash);
            Ok(transaction.hash)
        })
        .await
    }

    pub async fn cancel_request(&self, request_id: &str) -> Result<String> {
        self.run_action("cancel_request", async {
            self.require_account().await?;
            let address = self
                .resolve_object_address(request_id)
                .await
                .ok_or_else(|| PaymentError::RequestNotFound(request_id.to_string()))?;

            let transaction = self
                .submit_and_wait(&self.payloads.cancel_request(&address))
                .await?;
            info!("Cancelled request {} in {}", address, transaction.hash);
            Ok(transaction.hash)
        })
        .await
    }

    /// Send tokens directly to an address
    pub async fn transfer(
        &self,
        recipient: &str,
        token: &str,
        amount: &str,
    ) -> Result<TransferReceipt> {
        self.run_action("transfer", async {
            let account = self.require_account().await?;
            let token = self
                .tokens
                .find(token)
                .ok_or_else(|| PaymentError::UnknownToken(token.to_string()))?
                .clone();
            let recipient = resolve_recipient(recipient)?;
            let amount = parse_amount(amount, token.decimals)?;
            if amount == 0 {
                return Err(PaymentError::InvalidAmount(
                    "amount must be greater than zero".to_string(),
                ));
            }

            self.check_balance(&account.address, &token, amount).await?;

            let transaction = self
                .submit_and_wait(&transfer_payload(&recipient, &token.address, amount))
                .await?;
            info!(
                "Transferred {} {} to {} in {}",
                format_amount(amount, token.decimals),
                token.symbol,
                recipient,
                transaction.hash
            );

            Ok(TransferReceipt {
                explorer_url: explorer_transaction_url(&transaction.hash, &self.network),
                transaction_hash: transaction.hash,
                recipient,
                amount,
                token,
            })
        })
        .await
    }

    // Lookups

    /// Resolve a request by object address, or by the hash of the
    /// transaction that created it. Anything unresolvable is `None`.
    pub async fn get_payment_request(&self, request_id: &str) -> Result<Option<PaymentRequest>> {
        Ok(self.lookup(request_id).await.map(|(_, request)| request))
    }

    pub async fn resolve_object_address(&self, request_id: &str) -> Option<String> {
        self.lookup(request_id).await.map(|(address, _)| address)
    }

    /// Hash of the payer's transaction that settled the request, scanning
    /// the payer's recent transactions
    pub async fn find_payment_transaction_hash(
        &self,
        request_address: &str,
        payer: &str,
    ) -> Option<String> {
        let transactions = match self
            .client
            .get_account_transactions(payer, self.app.payment_lookup_limit)
            .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!("Could not load transactions of payer {}: {}", payer, e);
                return None;
            }
        };

        transactions
            .iter()
            .find(|tx| {
                tx.events.iter().any(|event| {
                    event.event_type.contains(PAYMENT_PAID_EVENT)
                        && event
                            .field("request")
                            .and_then(|v| normalize_address(v).ok())
                            .is_some_and(|a| addresses_equal(&a, request_address))
                })
            })
            .map(|tx| tx.hash.clone())
    }

    pub async fn load_payment_page(
        &self,
        request_id: &str,
        hint: &LinkParams,
    ) -> Result<PaymentPageView> {
        self.load_payment_page_at(request_id, hint, Utc::now().timestamp())
            .await
    }

    /// Payment page contents at `now`. The chain record wins over the link
    /// hint; the hint is only shown when the record cannot be resolved.
    pub async fn load_payment_page_at(
        &self,
        request_id: &str,
        hint: &LinkParams,
        now: i64,
    ) -> Result<PaymentPageView> {
        let (request_address, request, provisional) = match self.lookup(request_id).await {
            Some((address, request)) => (Some(address), request, false),
            None => {
                let request = request_from_hint(hint, &self.tokens, now)?
                    .ok_or_else(|| PaymentError::RequestNotFound(request_id.to_string()))?;
                debug!("Showing link hint for unresolved request {}", request_id);
                (None, request, true)
            }
        };

        let payment_transaction_hash = match (&request_address, &request.payer) {
            (Some(address), Some(payer)) if request.paid => {
                self.find_payment_transaction_hash(address, payer).await
            }
            _ => None,
        };

        let is_own_request = self
            .session
            .account()
            .await
            .is_some_and(|account| addresses_equal(&account.address, &request.payee));
        let token = self.tokens.find_or_default(&request.token).clone();

        Ok(PaymentPageView {
            request_id: request_id.to_string(),
            amount_display: format_amount(request.amount, token.decimals),
            time_remaining: get_time_remaining_at(request.expires_at, now),
            expired: is_expired_at(request.expires_at, now),
            explorer_url: payment_transaction_hash
                .as_deref()
                .map(|hash| explorer_transaction_url(hash, &self.network)),
            request_address,
            request,
            token,
            provisional,
            is_own_request,
            payment_transaction_hash,
        })
    }

    // History

    /// Rebuild the account's payment history from its recent transactions.
    /// Never fails: an unreadable account yields an empty list.
    pub async fn get_payment_history(&self, address: &str) -> Vec<HistoryRecord> {
        if address.trim().is_empty() {
            return Vec::new();
        }

        let transactions = match self
            .client
            .get_account_transactions(address, self.app.history_limit)
            .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!("Could not load transactions for {}: {}", address, e);
                return Vec::new();
            }
        };

        let mut reconstructor = HistoryReconstructor::new(
            self.client.as_ref(),
            &self.payloads,
            address,
            self.app.default_expiry_seconds,
        );
        reconstructor.apply_all(&transactions).await;
        let records = reconstructor.finish();

        info!(
            "Rebuilt {} history entries for {} from {} transactions",
            records.len(),
            address,
            transactions.len()
        );
        records
    }

    /// Display rows for the account, filtered
    pub async fn get_history_view(
        &self,
        address: &str,
        filter: &HistoryFilter,
        now: i64,
    ) -> Vec<PaymentHistory> {
        let history: Vec<PaymentHistory> = self
            .get_payment_history(address)
            .await
            .iter()
            .map(|record| record.to_history(&self.tokens, now))
            .collect();
        filter.apply(&history)
    }

    // Balances and links

    pub async fn get_balances(&self, address: &str) -> Vec<TokenBalance> {
        let mut balances = Vec::with_capacity(self.tokens.all().len());
        for token in self.tokens.all() {
            let balance = match self.client.get_balance(address, &balance_asset(token)).await {
                Ok(balance) => balance,
                Err(e) => {
                    warn!("Could not load {} balance of {}: {}", token.symbol, address, e);
                    0
                }
            };
            balances.push(TokenBalance {
                formatted: format_amount(balance, token.decimals),
                token: token.clone(),
                balance,
            });
        }
        balances
    }

    /// Payment URL, QR rendering and share intents for a request id
    pub fn payment_link_for(
        &self,
        request_id: &str,
        params: &LinkParams,
        options: &ShareOptions,
    ) -> Result<(PaymentLink, ShareLinks)> {
        let url = generate_payment_url(&self.app.payment_base_url, request_id, params)?;
        let qr_code = QrCodeService::generate_qr_code_data_url(&url)?;

        let token = params
            .token
            .as_deref()
            .map(|t| self.tokens.find_or_default(t))
            .unwrap_or_else(|| self.tokens.default_token());
        let share = ShareLinks::build(
            &url,
            params.amount.as_deref().unwrap_or_default(),
            token,
            params.memo.as_deref().unwrap_or_default(),
            options,
        );

        Ok((
            PaymentLink {
                id: request_id.to_string(),
                url,
                qr_code,
            },
            share,
        ))
    }

    pub fn payment_qr_png(&self, request_id: &str, params: &LinkParams) -> Result<Vec<u8>> {
        let url = generate_payment_url(&self.app.payment_base_url, request_id, params)?;
        QrCodeService::generate_qr_code_png(&url)
    }

    // Internals

    async fn run_action<T>(
        &self,
        name: &str,
        action: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Rejected {}: another action is in flight", name);
            return Err(PaymentError::ActionInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        *self.state.write().await = ActionState::Loading;
        let result = action.await;

        *self.state.write().await = match &result {
            Ok(_) => ActionState::Success,
            Err(e) => {
                warn!("{} failed [{}]: {}", name, e.category(), e);
                ActionState::Error(e.user_message())
            }
        };
        result
    }

    async fn submit_create(&self, params: CreatePaymentRequestParams) -> Result<CreatedRequest> {
        self.require_account().await?;
        validate_memo(&params.memo)?;
        if params.amount == 0 {
            return Err(PaymentError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        if self.tokens.find(&params.token).is_none() {
            return Err(PaymentError::UnknownToken(params.token));
        }

        let transaction = self
            .submit_and_wait(&self.payloads.create_payment_request(&params))
            .await?;

        let request_object = extract_request_object(&transaction);
        if request_object.is_none() {
            warn!(
                "Could not find request object in {}; the hash will identify the request",
                transaction.hash
            );
        }
        info!(
            "Created payment request {} in {}",
            request_object.as_deref().unwrap_or("<unknown>"),
            transaction.hash
        );

        Ok(CreatedRequest {
            transaction_hash: transaction.hash,
            request_object,
        })
    }

    async fn require_account(&self) -> Result<AccountInfo> {
        self.session
            .account()
            .await
            .ok_or(PaymentError::WalletNotConnected)
    }

    async fn submit_and_wait(&self, payload: &EntryFunctionPayload) -> Result<Transaction> {
        let pending = self.session.sign_and_submit_transaction(payload).await?;
        debug!("Submitted {} as {}", payload.function, pending.hash);

        self.client
            .wait_for_transaction(&pending.hash)
            .await
            .map_err(|e| match e {
                shared::Error::TransactionFailed(reason) => PaymentError::TransactionFailed(reason),
                other => PaymentError::Chain(other),
            })
    }

    /// Advisory balance check. A balance that cannot be read does not block
    /// the action; the chain rejects an underfunded transaction anyway.
    async fn check_balance(&self, address: &str, token: &TokenInfo, required: u64) -> Result<()> {
        let available = match self.client.get_balance(address, &balance_asset(token)).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Skipping balance check for {}: {}", address, e);
                return Ok(());
            }
        };

        if available < required {
            return Err(PaymentError::InsufficientBalance {
                required: format!("{} {}", format_amount(required, token.decimals), token.symbol),
                available: format!("{} {}", format_amount(available, token.decimals), token.symbol),
            });
        }
        Ok(())
    }

    /// Resolve an id to its object address and current record, following a
    /// creation hash at most once
    async fn lookup(&self, request_id: &str) -> Option<(String, PaymentRequest)> {
        match self.view_request(request_id).await {
            Ok(Some(request)) => return Some((request_id.to_string(), request)),
            Ok(None) => debug!("No request stored at {}", request_id),
            Err(e) => debug!("{} is not a request object: {}", request_id, e),
        }

        if !(request_id.starts_with("0x") && request_id.len() > MIN_HASH_LOOKUP_LEN) {
            return None;
        }

        let transaction = match self.client.get_transaction_by_hash(request_id).await {
            Ok(transaction) => transaction,
            Err(e) => {
                debug!("{} is not a transaction hash either: {}", request_id, e);
                return None;
            }
        };
        if !transaction.is_successful() {
            return None;
        }

        let address = extract_request_object(&transaction)?;
        match self.view_request(&address).await {
            Ok(request) => request.map(|request| (address, request)),
            Err(e) => {
                warn!("Request {} from {} could not be read: {}", address, request_id, e);
                None
            }
        }
    }

    async fn view_request(&self, address: &str) -> Result<Option<PaymentRequest>> {
        let result = self.client.view(&self.payloads.get_request(address)).await?;
        crate::decode::parse_request_view(&result)
    }
}

/// Memos are required and capped at `MAX_MEMO_CHARS` characters
pub fn validate_memo(memo: &str) -> Result<()> {
    if memo.trim().is_empty() {
        return Err(PaymentError::InvalidMemo("memo is required".to_string()));
    }
    let chars = memo.chars().count();
    if chars > MAX_MEMO_CHARS {
        return Err(PaymentError::InvalidMemo(format!(
            "memo is {} characters, the limit is {}",
            chars, MAX_MEMO_CHARS
        )));
    }
    Ok(())
}

/// Turn recipient input into an address. `.apt` names are recognised but
/// cannot be resolved yet.
pub fn resolve_recipient(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if is_hex_address(trimmed) {
        return Ok(trimmed.to_lowercase());
    }
    if trimmed.ends_with(".apt") {
        return Err(PaymentError::UnsupportedNameService(trimmed.to_string()));
    }
    Err(PaymentError::InvalidRecipient(trimmed.to_string()))
}

/// Asset identifier for the balance endpoint: the coin type for the native
/// token, the metadata address otherwise
fn balance_asset(token: &TokenInfo) -> String {
    if is_native(&token.address) {
        APT_COIN_TYPE.to_string()
    } else {
        token.address.clone()
    }
}
