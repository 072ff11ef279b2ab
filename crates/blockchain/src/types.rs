use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entry function call submitted through a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "entry_function_payload")]
pub struct EntryFunctionPayload {
    /// `address::module::function`
    pub function: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    /// JSON-encoded Move arguments (u64 as strings, addresses as hex strings)
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl EntryFunctionPayload {
    pub fn new(function: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            arguments,
        }
    }

    pub fn with_type_arguments(mut self, type_arguments: Vec<String>) -> Self {
        self.type_arguments = type_arguments;
        self
    }
}

/// Body of a `POST /view` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRequest {
    pub function: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl ViewRequest {
    pub fn new(function: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            arguments,
        }
    }
}

/// Hash returned by a wallet after submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Connected wallet account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: String,
    pub public_key: Option<String>,
}

/// Contract event attached to a committed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

impl Event {
    /// Field of the event payload, if present
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

/// Transaction as rendered by the node REST API.
///
/// Only the fields the client reads are modelled; pending, genesis and block
/// metadata transactions share the shape with most fields absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub hash: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub vm_status: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    /// Microseconds since the epoch, as a decimal string
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub payload: Option<TransactionPayload>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Transaction {
    pub const USER_TRANSACTION: &'static str = "user_transaction";
    pub const PENDING_TRANSACTION: &'static str = "pending_transaction";

    pub fn is_user_transaction(&self) -> bool {
        self.transaction_type == Self::USER_TRANSACTION
    }

    pub fn is_pending(&self) -> bool {
        self.transaction_type == Self::PENDING_TRANSACTION
    }

    pub fn is_successful(&self) -> bool {
        self.success == Some(true)
    }

    pub fn timestamp_micros(&self) -> Option<i64> {
        self.timestamp.as_deref().and_then(|t| t.parse().ok())
    }

    /// Commit time in whole seconds
    pub fn timestamp_secs(&self) -> Option<i64> {
        self.timestamp_micros().map(|us| us / 1_000_000)
    }

    pub fn function_name(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.function.as_deref())
    }

    pub fn arguments(&self) -> &[Value] {
        self.payload
            .as_ref()
            .map(|p| p.arguments.as_slice())
            .unwrap_or(&[])
    }

    /// First event whose type contains `fragment` (e.g. `PaymentPaid`)
    pub fn find_event(&self, fragment: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.event_type.contains(fragment))
    }
}

/// Signed submission body accepted by `POST /transactions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTransactionRequest {
    pub sender: String,
    pub sequence_number: String,
    pub max_gas_amount: String,
    pub gas_unit_price: String,
    pub expiration_timestamp_secs: String,
    pub payload: EntryFunctionPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<TransactionSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename = "ed25519_signature")]
pub struct TransactionSignature {
    pub public_key: String,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountResource {
    pub sequence_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasEstimation {
    pub gas_estimate: u64,
}

/// Error body returned by the node REST API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub vm_error_code: Option<u64>,
}
