pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;

use payment::PaymentService;
use shared::config::{APP_DESCRIPTION, APP_NAME};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub payment_service: Arc<PaymentService>,
    pub app_name: String,
    pub app_description: String,
}

impl AppState {
    pub fn new(payment_service: Arc<PaymentService>) -> Self {
        Self {
            payment_service,
            app_name: APP_NAME.to_string(),
            app_description: APP_DESCRIPTION.to_string(),
        }
    }
}
