// Router tests driving the HTTP surface against an in-memory chain

use api::{create_router, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use blockchain::{
    AccountInfo, ChainClient, EntryFunctionPayload, PendingTransaction, Transaction, ViewRequest,
    WalletAdapter, WalletSession,
};
use payment::PaymentService;
use serde_json::{json, Value};
use shared::config::{AppConfig, ContractConfig};
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const USER: &str = "0xa11ce";
const REQUEST: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

#[derive(Default)]
struct MockChain {
    requests: Mutex<HashMap<String, Value>>,
    account_transactions: Mutex<HashMap<String, Vec<Transaction>>>,
}

#[async_trait]
impl ChainClient for MockChain {
    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>> {
        let address = request
            .arguments
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default();
        self.requests
            .lock()
            .unwrap()
            .get(address)
            .map(|r| vec![r.clone()])
            .ok_or_else(|| Error::AptosApi {
                status: 400,
                message: "resource not found".to_string(),
            })
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Transaction> {
        Err(Error::TransactionNotFound(hash.to_string()))
    }

    async fn get_account_transactions(&self, address: &str, _limit: u32) -> Result<Vec<Transaction>> {
        Ok(self
            .account_transactions
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<Transaction> {
        Ok(transaction(hash, 1_700_000_000, "0x1::noop::noop", vec![], json!([])))
    }

    async fn get_balance(&self, _address: &str, _asset: &str) -> Result<u64> {
        Ok(1_000_000_000_000)
    }
}

struct MockWallet {
    connected: Mutex<bool>,
    submissions: Mutex<usize>,
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn name(&self) -> &str {
        "Petra"
    }

    async fn connect(&self) -> Result<AccountInfo> {
        *self.connected.lock().unwrap() = true;
        Ok(AccountInfo {
            address: USER.to_string(),
            public_key: None,
        })
    }

    async fn disconnect(&self) -> Result<()> {
        *self.connected.lock().unwrap() = false;
        Ok(())
    }

    async fn account(&self) -> Option<AccountInfo> {
        self.connected.lock().unwrap().then(|| AccountInfo {
            address: USER.to_string(),
            public_key: None,
        })
    }

    async fn sign_and_submit_transaction(
        &self,
        _payload: &EntryFunctionPayload,
    ) -> Result<PendingTransaction> {
        let mut submissions = self.submissions.lock().unwrap();
        *submissions += 1;
        Ok(PendingTransaction {
            hash: format!("0xtx{}", submissions),
        })
    }
}

fn transaction(hash: &str, timestamp_secs: i64, function: &str, arguments: Vec<Value>, events: Value) -> Transaction {
    serde_json::from_value(json!({
        "type": "user_transaction",
        "hash": hash,
        "version": "1",
        "success": true,
        "vm_status": "Executed successfully",
        "timestamp": (timestamp_secs * 1_000_000).to_string(),
        "payload": {
            "type": "entry_function_payload",
            "function": function,
            "type_arguments": [],
            "arguments": arguments
        },
        "events": events
    }))
    .unwrap()
}

fn open_request(expires_at: i64) -> Value {
    json!({
        "payee": "0xb0b",
        "token": {"inner": "0xa"},
        "amount": "100000000",
        "memo": "0x6c756e6368",
        "created_at": "1000",
        "expires_at": expires_at.to_string(),
        "paid": false,
        "payer": {"vec": []}
    })
}

struct TestApp {
    router: Router,
    chain: Arc<MockChain>,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec(), content_type)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body, _) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body, _) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn connect(&self) {
        let (status, _) = self.post("/wallet/connect", json!({"name": "petra"})).await;
        assert_eq!(status, StatusCode::OK);
    }
}

fn test_app() -> TestApp {
    let chain = Arc::new(MockChain::default());
    let wallet = Arc::new(MockWallet {
        connected: Mutex::new(false),
        submissions: Mutex::new(0),
    });
    let session = Arc::new(WalletSession::new().with_adapter(wallet));
    let service = PaymentService::new(
        chain.clone(),
        session,
        ContractConfig {
            address: "0x8e".to_string(),
            module: "payme".to_string(),
        },
        AppConfig::default(),
        "testnet",
    );

    TestApp {
        router: create_router(Arc::new(AppState::new(Arc::new(service)))),
        chain,
    }
}

#[tokio::test]
async fn test_home_lists_app_tokens_and_wallet() {
    let app = test_app();

    let (status, body) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Aptos PayMe");
    assert_eq!(body["data"]["network"], "testnet");
    assert_eq!(body["data"]["tokens"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["tokens"][0]["symbol"], "APT");
    assert_eq!(body["data"]["wallet"]["connected"], false);
    assert_eq!(body["data"]["wallet"]["available"], json!(["Petra"]));
}

#[tokio::test]
async fn test_health_reports_idle_service() {
    let app = test_app();

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["busy"], false);
    assert_eq!(body["last_action"]["state"], "idle");
}

#[tokio::test]
async fn test_wallet_connect_and_disconnect() {
    let app = test_app();

    let (status, body) = app.post("/wallet/connect", json!({"name": "Petra"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], true);
    assert_eq!(body["data"]["address"], USER);

    let (status, body) = app.post("/wallet/disconnect", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], false);

    let (status, body) = app.post("/wallet/connect", json!({"name": "Martian"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "wallet");
}

#[tokio::test]
async fn test_create_request_requires_wallet() {
    let app = test_app();

    let (status, body) = app
        .post("/request", json!({"amount": "2.5", "token": "APT", "memo": "dinner"}))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "wallet");
    assert_eq!(body["message"], "Please connect your wallet first.");
}

#[tokio::test]
async fn test_create_request_returns_link_and_share_intents() {
    let app = test_app();
    app.connect().await;

    let (status, body) = app
        .post(
            "/request",
            json!({
                "amount": "2.5",
                "token": "APT",
                "memo": "dinner",
                "share": {"whatsapp": true, "telegram": false, "sms": false, "email": false, "copy": true}
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    // No creation event from the mock node, so the hash stands in for the id
    assert_eq!(data["request"]["transaction_hash"], "0xtx1");
    assert!(data["link"]["url"]
        .as_str()
        .unwrap()
        .starts_with("https://payme.apt/pay/0xtx1?amount=2.5&token=APT&memo=dinner&payee=0xa11ce"));
    assert!(data["link"]["qr_code"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert!(data["share"]["whatsapp"].is_string());
    assert!(data["share"]["telegram"].is_null());
}

#[tokio::test]
async fn test_create_request_rejects_bad_amount() {
    let app = test_app();
    app.connect().await;

    let (status, body) = app
        .post("/request", json!({"amount": "abc", "token": "APT", "memo": "x"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_payment_page_reads_chain_record() {
    let app = test_app();
    app.chain
        .requests
        .lock()
        .unwrap()
        .insert(REQUEST.to_string(), open_request(4_000_000_000));

    let (status, body) = app.get(&format!("/pay/{}?amount=999&token=TUSD&memo=wrong", REQUEST)).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["provisional"], false);
    assert_eq!(data["amount_display"], "1");
    assert_eq!(data["token"]["symbol"], "APT");
    assert_eq!(data["request"]["memo"], "lunch");
    assert_eq!(data["expired"], false);
}

#[tokio::test]
async fn test_payment_page_falls_back_to_link_hint() {
    let app = test_app();

    let (status, body) = app.get("/pay/0xdeadbeef?amount=5&token=APT&memo=coffee").await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["provisional"], true);
    assert_eq!(data["amount_display"], "5");
    assert_eq!(data["request"]["memo"], "coffee");
    assert!(data["request_address"].is_null());
}

#[tokio::test]
async fn test_payment_page_not_found_without_hint() {
    let app = test_app();

    let (status, body) = app.get("/pay/0xdeadbeef").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_pay_and_cancel_submit_transactions() {
    let app = test_app();
    app.chain
        .requests
        .lock()
        .unwrap()
        .insert(REQUEST.to_string(), open_request(4_000_000_000));
    app.connect().await;

    let (status, body) = app.post(&format!("/pay/{}", REQUEST), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transaction_hash"], "0xtx1");
    assert_eq!(
        body["data"]["explorer_url"],
        "https://explorer.aptoslabs.com/txn/0xtx1?network=testnet"
    );

    let (status, body) = app.post(&format!("/pay/{}/cancel", REQUEST), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transaction_hash"], "0xtx2");
}

#[tokio::test]
async fn test_pay_unknown_request_is_not_found() {
    let app = test_app();
    app.connect().await;

    let (status, _) = app.post("/pay/0xdeadbeef", json!({})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_rejects_name_service_handles() {
    let app = test_app();
    app.connect().await;

    let (status, body) = app
        .post("/send", json!({"recipient": "alice.apt", "token": "APT", "amount": "1"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_send_transfers_tokens() {
    let app = test_app();
    app.connect().await;

    let (status, body) = app
        .post("/send", json!({"recipient": "0xb0b", "token": "APT", "amount": "0.25"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transaction_hash"], "0xtx1");
    assert_eq!(body["data"]["amount"], 25_000_000);
}

fn seed_history(app: &TestApp) {
    let create = transaction(
        "0xc1",
        1000,
        "0x8e::payme::create_payment_request",
        vec![
            json!({"inner": "0xa"}),
            json!("100000000"),
            json!("0x6c756e6368"),
            json!("86400"),
        ],
        json!([{
            "type": "0x8e::payme::PaymentRequestCreated",
            "data": {"request": {"inner": REQUEST}, "payee": USER, "amount": "100000000"}
        }]),
    );
    app.chain
        .account_transactions
        .lock()
        .unwrap()
        .insert(USER.to_string(), vec![create]);
}

#[tokio::test]
async fn test_history_lists_and_filters() {
    let app = test_app();
    seed_history(&app);

    let (status, body) = app.get(&format!("/history?address={}", USER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["memo"], "lunch");
    assert_eq!(body["data"]["summary"]["total"], 1);

    let (status, body) = app
        .get(&format!("/history?address={}&type=sent&status=all", USER))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (status, body) = app
        .get(&format!("/history?address={}&status=refunded", USER))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_history_uses_connected_account() {
    let app = test_app();
    seed_history(&app);

    let (status, _) = app.get("/history").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.connect().await;
    let (status, body) = app.get("/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["address"], USER);
}

#[tokio::test]
async fn test_history_export_csv() {
    let app = test_app();
    seed_history(&app);

    let request = Request::builder()
        .uri(format!("/history/export.csv?address={}", USER))
        .body(Body::empty())
        .unwrap();
    let (status, body, content_type) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv"));
    let csv = String::from_utf8(body).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Date,Type,Amount,Token,Memo,Status,Transaction Hash"));
    assert!(lines.next().unwrap().contains(",received,1,APT,lunch,"));
}

#[tokio::test]
async fn test_history_export_with_nothing_to_export() {
    let app = test_app();

    let (status, body) = app.get(&format!("/history/export.csv?address={}", USER)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "There is no history to export.");
}

#[tokio::test]
async fn test_request_qr_png() {
    let app = test_app();

    let request = Request::builder()
        .uri(format!("/pay/{}/qr.png?amount=1&token=APT&memo=lunch", REQUEST))
        .body(Body::empty())
        .unwrap();
    let (status, body, content_type) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(&body[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
}
