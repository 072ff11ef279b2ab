use serde::Deserialize;
use std::env;

/// Deployed PayMe module address on testnet
pub const DEFAULT_CONTRACT_ADDRESS: &str =
    "0x8e1ae3070ec91bb532197041d01efa308b5eb02dda9c746c3ba43af7df730f4e";

pub const DEFAULT_PAYMENT_BASE_URL: &str = "https://payme.apt";

pub const APP_NAME: &str = "Aptos PayMe";
pub const APP_DESCRIPTION: &str = "PayPal.Me, But On-Chain";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub aptos: AptosConfig,
    pub contract: ContractConfig,
    pub app: AppConfig,
    pub transactions: TransactionConfig,
    pub wallet: WalletConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AptosConfig {
    pub node_url: String,
    pub fallback_node_url: Option<String>,
    pub network: String,
}

impl AptosConfig {
    /// Public fullnode REST endpoint for a named network
    pub fn default_node_url(network: &str) -> String {
        format!("https://fullnode.{}.aptoslabs.com/v1", network)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    pub module: String,
}

impl ContractConfig {
    /// Fully qualified `address::module::function` identifier
    pub fn function(&self, name: &str) -> String {
        format!("{}::{}::{}", self.address, self.module, name)
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            module: "payme".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub payment_base_url: String,
    /// Number of account transactions scanned when rebuilding history
    pub history_limit: u32,
    /// Number of payer transactions scanned when looking for a settlement hash
    pub payment_lookup_limit: u32,
    pub default_expiry_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            payment_base_url: DEFAULT_PAYMENT_BASE_URL.to_string(),
            history_limit: 50,
            payment_lookup_limit: 200,
            default_expiry_seconds: 86400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionConfig {
    pub wait_timeout_secs: u64,
    pub max_gas_amount: u64,
    /// Seconds added to the current time for a submission's expiration
    pub expiration_secs: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: 30,
            max_gas_amount: 200_000,
            expiration_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Hex-encoded ed25519 private key for the local signing wallet
    pub private_key: Option<String>,
    /// Account address; derived from the key when absent
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `json` for structured output, `pretty` for development
    pub format: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let network = env::var("APTOS_NETWORK").unwrap_or_else(|_| "testnet".to_string());

        Ok(Config {
            aptos: AptosConfig {
                node_url: env::var("APTOS_NODE_URL")
                    .unwrap_or_else(|_| AptosConfig::default_node_url(&network)),
                fallback_node_url: env::var("APTOS_NODE_FALLBACK_URL").ok(),
                network,
            },
            contract: ContractConfig {
                address: env::var("PAYME_CONTRACT_ADDRESS")
                    .unwrap_or_else(|_| DEFAULT_CONTRACT_ADDRESS.to_string()),
                module: env::var("PAYME_MODULE").unwrap_or_else(|_| "payme".to_string()),
            },
            app: AppConfig {
                payment_base_url: env::var("PAYMENT_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_PAYMENT_BASE_URL.to_string()),
                history_limit: env::var("HISTORY_LIMIT")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()?,
                payment_lookup_limit: env::var("PAYMENT_LOOKUP_LIMIT")
                    .unwrap_or_else(|_| "200".to_string())
                    .parse()?,
                default_expiry_seconds: env::var("DEFAULT_EXPIRY_SECONDS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()?,
            },
            transactions: TransactionConfig {
                wait_timeout_secs: env::var("TX_WAIT_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
                max_gas_amount: env::var("TX_MAX_GAS_AMOUNT")
                    .unwrap_or_else(|_| "200000".to_string())
                    .parse()?,
                expiration_secs: env::var("TX_EXPIRATION_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
            },
            wallet: WalletConfig {
                private_key: env::var("WALLET_PRIVATE_KEY").ok(),
                address: env::var("WALLET_ADDRESS").ok(),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()?,
            },
            logging: LoggingConfig {
                format: env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            },
        })
    }
}
