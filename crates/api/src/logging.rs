use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";
const DEFAULT_PRETTY_FILTER: &str = "debug,hyper=warn,reqwest=warn";

/// Initialize logging with structured output
pub fn init_logging() {
    // RUST_LOG wins over the default filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Logging initialized");
}

/// Initialize logging with pretty output for development
pub fn init_logging_pretty() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_PRETTY_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Logging initialized (pretty mode)");
}

/// Pick the subscriber from the `LOG_FORMAT` setting; anything other than
/// `pretty` gets JSON
pub fn init_logging_for(format: &str) {
    if format.eq_ignore_ascii_case("pretty") {
        init_logging_pretty();
    } else {
        init_logging();
    }
}
