use blockchain::{EntryFunctionPayload, Transaction, ViewRequest};
use serde_json::json;
use shared::config::ContractConfig;
use shared::models::CreatePaymentRequestParams;
use shared::tokens::{is_native, token_metadata_address, APT_COIN_TYPE};

use crate::decode::{encode_memo, find_address_like, normalize_address};

pub const CREATE_REQUEST_FUNCTION: &str = "create_payment_request";
pub const PAY_REQUEST_FUNCTION: &str = "pay_request";
pub const CANCEL_REQUEST_FUNCTION: &str = "cancel_request";
pub const GET_REQUEST_FUNCTION: &str = "get_request";

pub const REQUEST_CREATED_EVENT: &str = "PaymentRequestCreated";
pub const PAYMENT_PAID_EVENT: &str = "PaymentPaid";

const COIN_TRANSFER_FUNCTION: &str = "0x1::coin::transfer";
const FUNGIBLE_STORE_TRANSFER_FUNCTION: &str = "0x1::primary_fungible_store::transfer";
const FUNGIBLE_ASSET_METADATA: &str = "0x1::fungible_asset::Metadata";

/// Builds the contract's entry function and view payloads
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    contract: ContractConfig,
}

impl PayloadBuilder {
    pub fn new(contract: ContractConfig) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &ContractConfig {
        &self.contract
    }

    pub fn create_payment_request(&self, params: &CreatePaymentRequestParams) -> EntryFunctionPayload {
        EntryFunctionPayload::new(
            self.contract.function(CREATE_REQUEST_FUNCTION),
            vec![
                json!(token_metadata_address(&params.token)),
                json!(params.amount.to_string()),
                json!(encode_memo(&params.memo)),
                json!(params.expires_in_seconds.to_string()),
            ],
        )
    }

    pub fn pay_request(&self, request_address: &str) -> EntryFunctionPayload {
        EntryFunctionPayload::new(
            self.contract.function(PAY_REQUEST_FUNCTION),
            vec![json!(request_address)],
        )
    }

    pub fn cancel_request(&self, request_address: &str) -> EntryFunctionPayload {
        EntryFunctionPayload::new(
            self.contract.function(CANCEL_REQUEST_FUNCTION),
            vec![json!(request_address)],
        )
    }

    pub fn get_request(&self, request_address: &str) -> ViewRequest {
        ViewRequest::new(
            self.contract.function(GET_REQUEST_FUNCTION),
            vec![json!(request_address)],
        )
    }
}

/// Plain transfer: the legacy coin path for the native coin, the primary
/// fungible store for everything else
pub fn transfer_payload(recipient: &str, token: &str, amount: u64) -> EntryFunctionPayload {
    if is_native(token) {
        EntryFunctionPayload::new(
            COIN_TRANSFER_FUNCTION,
            vec![json!(recipient), json!(amount.to_string())],
        )
        .with_type_arguments(vec![APT_COIN_TYPE.to_string()])
    } else {
        EntryFunctionPayload::new(
            FUNGIBLE_STORE_TRANSFER_FUNCTION,
            vec![json!(token), json!(recipient), json!(amount.to_string())],
        )
        .with_type_arguments(vec![FUNGIBLE_ASSET_METADATA.to_string()])
    }
}

/// Request object address announced by a creation transaction.
///
/// Tries the event's `request` field in every known shape, then any
/// address-looking string in the event payload.
pub fn extract_request_object(transaction: &Transaction) -> Option<String> {
    let event = transaction.find_event(REQUEST_CREATED_EVENT)?;

    event
        .field("request")
        .and_then(|value| normalize_address(value).ok())
        .or_else(|| find_address_like(&event.data))
}

/// Whether an on-chain function identifier calls the given contract function
pub fn calls_function(function: &str, name: &str) -> bool {
    function.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn builder() -> PayloadBuilder {
        PayloadBuilder::new(ContractConfig {
            address: "0x8e".to_string(),
            module: "payme".to_string(),
        })
    }

    fn transaction(events: Value) -> Transaction {
        serde_json::from_value(json!({
            "type": "user_transaction",
            "hash": "0xhash",
            "success": true,
            "events": events
        }))
        .unwrap()
    }

    #[test]
    fn test_create_payload_arguments() {
        let payload = builder().create_payment_request(&CreatePaymentRequestParams {
            token: APT_COIN_TYPE.to_string(),
            amount: 100_000_000,
            memo: "lunch".to_string(),
            expires_in_seconds: 86400,
        });

        assert_eq!(payload.function, "0x8e::payme::create_payment_request");
        assert!(payload.type_arguments.is_empty());
        assert_eq!(
            payload.arguments,
            vec![json!("0xa"), json!("100000000"), json!("0x6c756e6368"), json!("86400")]
        );
    }

    #[test]
    fn test_pay_and_cancel_payloads() {
        let pay = builder().pay_request("0xreq");
        assert_eq!(pay.function, "0x8e::payme::pay_request");
        assert_eq!(pay.arguments, vec![json!("0xreq")]);

        let cancel = builder().cancel_request("0xreq");
        assert_eq!(cancel.function, "0x8e::payme::cancel_request");
    }

    #[test]
    fn test_view_request() {
        let view = builder().get_request("0xreq");
        assert_eq!(view.function, "0x8e::payme::get_request");
        assert_eq!(view.arguments, vec![json!("0xreq")]);
    }

    #[test]
    fn test_transfer_native_uses_coin_module() {
        let payload = transfer_payload("0xbob", "0xa", 5);
        assert_eq!(payload.function, "0x1::coin::transfer");
        assert_eq!(payload.type_arguments, vec![APT_COIN_TYPE.to_string()]);
        assert_eq!(payload.arguments, vec![json!("0xbob"), json!("5")]);
    }

    #[test]
    fn test_transfer_fungible_asset() {
        let payload = transfer_payload("0xbob", "0x8e::test_token", 5);
        assert_eq!(payload.function, "0x1::primary_fungible_store::transfer");
        assert_eq!(payload.type_arguments, vec!["0x1::fungible_asset::Metadata".to_string()]);
        assert_eq!(
            payload.arguments,
            vec![json!("0x8e::test_token"), json!("0xbob"), json!("5")]
        );
    }

    #[test]
    fn test_extract_request_object_shapes() {
        let tx = transaction(json!([
            {"type": "0x8e::payme::PaymentRequestCreated", "data": {"request": {"inner": "0xobject"}}}
        ]));
        assert_eq!(extract_request_object(&tx), Some("0xobject".to_string()));
    }

    #[test]
    fn test_extract_request_object_scans_payload() {
        let tx = transaction(json!([
            {"type": "0x8e::payme::PaymentRequestCreated", "data": {"amount": "1", "obj": {"id": "0x1234567890abcdef"}}}
        ]));
        assert_eq!(extract_request_object(&tx), Some("0x1234567890abcdef".to_string()));
    }

    #[test]
    fn test_extract_request_object_without_event() {
        let tx = transaction(json!([
            {"type": "0x1::fungible_asset::Withdraw", "data": {"store": "0x1234567890abcdef"}}
        ]));
        assert_eq!(extract_request_object(&tx), None);
    }
}
