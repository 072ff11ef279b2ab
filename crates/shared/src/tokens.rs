use crate::address::addresses_equal;
use crate::models::TokenInfo;
use crate::{Error, Result};

/// Metadata object address of the native coin's fungible asset
pub const APT_METADATA_ADDRESS: &str = "0xa";

/// Legacy coin type of the native coin
pub const APT_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";

/// Static registry of tokens the client knows how to display.
///
/// The first entry is the default used when an on-chain token cannot be
/// matched.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: Vec<TokenInfo>,
}

impl TokenRegistry {
    /// Native coin plus the test stablecoin published under the contract
    pub fn for_contract(contract_address: &str) -> Self {
        Self {
            tokens: vec![
                TokenInfo {
                    address: APT_METADATA_ADDRESS.to_string(),
                    name: "Aptos".to_string(),
                    symbol: "APT".to_string(),
                    decimals: 8,
                    icon: Some("aptos.png".to_string()),
                },
                TokenInfo {
                    address: format!("{}::test_token", contract_address),
                    name: "Test USD".to_string(),
                    symbol: "TUSD".to_string(),
                    decimals: 6,
                    icon: Some("usdc.png".to_string()),
                },
            ],
        }
    }

    /// Registry over `tokens`; the first one becomes the default. An empty
    /// list is rejected since lookups always need a fallback.
    pub fn new(tokens: Vec<TokenInfo>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::Config("token registry needs at least one token".to_string()));
        }
        Ok(Self { tokens })
    }

    pub fn all(&self) -> &[TokenInfo] {
        &self.tokens
    }

    pub fn default_token(&self) -> &TokenInfo {
        // Non-empty, checked on construction
        &self.tokens[0]
    }

    pub fn find_by_address(&self, address: &str) -> Option<&TokenInfo> {
        self.tokens
            .iter()
            .find(|t| t.address == address || addresses_equal(&t.address, address))
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Option<&TokenInfo> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Look a token up by symbol or address, as accepted in payment links
    pub fn find(&self, symbol_or_address: &str) -> Option<&TokenInfo> {
        self.find_by_symbol(symbol_or_address)
            .or_else(|| self.find_by_address(symbol_or_address))
            .or_else(|| {
                if is_native(symbol_or_address) {
                    self.find_by_symbol("APT")
                } else {
                    None
                }
            })
    }

    /// Same as [`find`](Self::find) but falls back to the default token
    pub fn find_or_default(&self, symbol_or_address: &str) -> &TokenInfo {
        self.find(symbol_or_address)
            .unwrap_or_else(|| self.default_token())
    }
}

/// Whether a token reference denotes the native coin
pub fn is_native(token: &str) -> bool {
    token == APT_METADATA_ADDRESS
        || token.contains("aptos_coin")
        || addresses_equal(token, APT_METADATA_ADDRESS)
}

/// Metadata object address passed to the contract for a token reference
pub fn token_metadata_address(token: &str) -> String {
    if is_native(token) {
        APT_METADATA_ADDRESS.to_string()
    } else {
        token.to_string()
    }
}
