use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, AppState};

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health_check))

        // Wallet
        .route("/wallet", get(handlers::get_wallet))
        .route("/wallet/connect", post(handlers::connect_wallet))
        .route("/wallet/disconnect", post(handlers::disconnect_wallet))
        .route("/balances", get(handlers::get_balances))

        // Requests
        .route("/request", post(handlers::create_request))
        .route(
            "/pay/:request_id",
            get(handlers::get_payment_page).post(handlers::pay_request),
        )
        .route("/pay/:request_id/cancel", post(handlers::cancel_request))
        .route("/pay/:request_id/qr.png", get(handlers::get_request_qr))

        // Transfers and history
        .route("/send", post(handlers::send))
        .route("/history", get(handlers::get_history))
        .route("/history/export.csv", get(handlers::export_history_csv))

        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
