use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use payment::format::explorer_transaction_url;
use payment::{
    export_csv, export_file_name, ActionState, CreatedPaymentLink, HistoryFilter, HistorySummary,
    LinkParams, NewPaymentRequest, PaymentPageView, TokenBalance, TransferReceipt,
};
use serde::{Deserialize, Serialize};
use shared::models::{HistoryKind, PaymentHistory, PaymentStatus, ShareOptions, TokenInfo};
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

// Response types
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletStatus {
    pub connected: bool,
    pub wallet: Option<String>,
    pub address: Option<String>,
    pub available: Vec<String>,
}

#[derive(Serialize)]
pub struct HomeResponse {
    pub name: String,
    pub description: String,
    pub network: String,
    pub tokens: Vec<TokenInfo>,
    pub wallet: WalletStatus,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub address: String,
    pub items: Vec<PaymentHistory>,
    pub summary: HistorySummary,
}

#[derive(Serialize)]
pub struct BalancesResponse {
    pub address: String,
    pub balances: Vec<TokenBalance>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub request_id: String,
    pub transaction_hash: String,
    pub explorer_url: String,
}

// Request types
#[derive(Deserialize)]
pub struct ConnectWalletRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateRequestBody {
    #[serde(flatten)]
    pub request: NewPaymentRequest,
    #[serde(default)]
    pub share: Option<ShareOptions>,
}

#[derive(Deserialize)]
pub struct SendRequest {
    /// `0x` address; name service handles are rejected
    pub recipient: String,
    pub token: String,
    pub amount: String,
}

/// Query string of the history page. Empty values and `all` mean no filter.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub address: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub token: Option<String>,
}

impl HistoryQuery {
    pub fn to_filter(&self) -> ApiResult<HistoryFilter> {
        let status = facet(&self.status)
            .map(|s| s.parse::<PaymentStatus>())
            .transpose()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let kind = facet(&self.kind)
            .map(|s| s.parse::<HistoryKind>())
            .transpose()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

        Ok(HistoryFilter {
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            status,
            kind,
            token_symbol: facet(&self.token).map(str::to_uppercase),
        })
    }
}

fn facet(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

async fn wallet_status(state: &AppState) -> WalletStatus {
    let session = state.payment_service.session();
    let account = session.account().await;

    WalletStatus {
        connected: account.is_some(),
        wallet: session.wallet_name().await,
        address: account.map(|a| a.address),
        available: session.available_wallets(),
    }
}

/// Explicit `address` query parameter, else the connected account
async fn target_address(state: &AppState, address: Option<String>) -> ApiResult<String> {
    if let Some(address) = address.filter(|a| !a.trim().is_empty()) {
        return Ok(address.trim().to_string());
    }

    state
        .payment_service
        .session()
        .account()
        .await
        .map(|a| a.address)
        .ok_or_else(|| {
            ApiError::InvalidInput("address is required when no wallet is connected".to_string())
        })
}

// Home
pub async fn home(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = &state.payment_service;

    Json(ApiResponse::success(HomeResponse {
        name: state.app_name.clone(),
        description: state.app_description.clone(),
        network: service.network().to_string(),
        tokens: service.tokens().all().to_vec(),
        wallet: wallet_status(&state).await,
    }))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let action: ActionState = state.payment_service.action_state().await;

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
            "network": state.payment_service.network(),
            "busy": state.payment_service.is_busy(),
            "last_action": action,
        })),
    )
}

// Wallet
pub async fn get_wallet(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(wallet_status(&state).await))
}

pub async fn connect_wallet(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConnectWalletRequest>,
) -> ApiResult<Json<ApiResponse<WalletStatus>>> {
    state.payment_service.session().connect(&payload.name).await?;
    Ok(Json(ApiResponse::success(wallet_status(&state).await)))
}

pub async fn disconnect_wallet(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<WalletStatus>>> {
    state.payment_service.session().disconnect().await?;
    Ok(Json(ApiResponse::success(wallet_status(&state).await)))
}

pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AddressQuery>,
) -> ApiResult<Json<ApiResponse<BalancesResponse>>> {
    let address = target_address(&state, query.address).await?;
    let balances = state.payment_service.get_balances(&address).await;
    Ok(Json(ApiResponse::success(BalancesResponse { address, balances })))
}

// Requests
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRequestBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CreatedPaymentLink>>)> {
    let created = state
        .payment_service
        .request_payment(payload.request, payload.share.unwrap_or_default())
        .await?;

    info!("Created payment request {}", created.request.request_id());
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn get_payment_page(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
    Query(hint): Query<LinkParams>,
) -> ApiResult<Json<ApiResponse<PaymentPageView>>> {
    let view = state
        .payment_service
        .load_payment_page(&request_id, &hint)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn pay_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<ApiResponse<TransactionResponse>>> {
    let hash = state.payment_service.pay_request(&request_id).await?;

    Ok(Json(ApiResponse::success(TransactionResponse {
        explorer_url: explorer_transaction_url(&hash, state.payment_service.network()),
        request_id,
        transaction_hash: hash,
    })))
}

pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<ApiResponse<TransactionResponse>>> {
    let hash = state.payment_service.cancel_request(&request_id).await?;

    Ok(Json(ApiResponse::success(TransactionResponse {
        explorer_url: explorer_transaction_url(&hash, state.payment_service.network()),
        request_id,
        transaction_hash: hash,
    })))
}

pub async fn get_request_qr(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
    Query(hint): Query<LinkParams>,
) -> ApiResult<impl IntoResponse> {
    let png = state.payment_service.payment_qr_png(&request_id, &hint)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

// Send
pub async fn send(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendRequest>,
) -> ApiResult<Json<ApiResponse<TransferReceipt>>> {
    let receipt = state
        .payment_service
        .transfer(&payload.recipient, &payload.token, &payload.amount)
        .await?;
    Ok(Json(ApiResponse::success(receipt)))
}

// History
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<HistoryResponse>>> {
    let filter = query.to_filter()?;
    let address = target_address(&state, query.address).await?;

    let items = state
        .payment_service
        .get_history_view(&address, &filter, Utc::now().timestamp())
        .await;
    let summary = HistorySummary::of(&items);

    Ok(Json(ApiResponse::success(HistoryResponse {
        address,
        items,
        summary,
    })))
}

pub async fn export_history_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.to_filter()?;
    let address = target_address(&state, query.address).await?;

    let now = Utc::now();
    let items = state
        .payment_service
        .get_history_view(&address, &filter, now.timestamp())
        .await;
    let csv_bytes = export_csv(&items)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export_file_name(now)),
            ),
        ],
        csv_bytes,
    ))
}
