pub mod models;
pub mod error;
pub mod config;
pub mod address;
pub mod tokens;

pub use error::{Error, Result};
pub use models::*;
pub use tokens::{TokenRegistry, APT_COIN_TYPE, APT_METADATA_ADDRESS};
