use anyhow::Result;
use api::{logging, AppState};
use blockchain::{AptosClient, LocalKeyWallet, WalletSession};
use payment::PaymentService;
use shared::config::Config;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    logging::init_logging_for(&config.logging.format);
    tracing::info!("Starting {} API on {}", shared::config::APP_NAME, config.aptos.network);

    // Initialize Aptos client
    let aptos_client = Arc::new(AptosClient::from_config(&config.aptos, &config.transactions));
    tracing::info!(
        "Aptos client initialized (primary: {}, fallback: {})",
        config.aptos.node_url,
        config.aptos.fallback_node_url.as_deref().unwrap_or("none")
    );

    // Local signing wallet, if a key is configured
    let mut session = WalletSession::new();
    if let Some(private_key) = config.wallet.private_key.as_deref() {
        let wallet = LocalKeyWallet::from_private_key(
            private_key,
            config.wallet.address.clone(),
            aptos_client.clone(),
            &config.transactions,
        )?;
        tracing::info!("Local key wallet available for {}", wallet.address());
        session = session.with_adapter(Arc::new(wallet));
    } else {
        tracing::info!("No WALLET_PRIVATE_KEY set; write actions stay unavailable");
    }

    let payment_service = Arc::new(PaymentService::new(
        aptos_client,
        Arc::new(session),
        config.contract.clone(),
        config.app.clone(),
        config.aptos.network.clone(),
    ));
    tracing::info!("Payment service initialized for contract {}", config.contract.address);

    let app = api::create_router(Arc::new(AppState::new(payment_service)));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
