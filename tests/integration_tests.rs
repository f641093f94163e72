use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wallets::{app, App, AppState};
use wallets_client::{ClientError, WalletsClient};
use wallets_contract::{Contract, ValidationFailure};
use wallets_core::{NewWallet, StoreError, Wallet, WalletEnvelope, WalletId, WalletStore};
use wallets_memory::InMemoryWalletStore;

fn app_with(store: impl WalletStore + 'static, contract: Contract) -> App {
    app(AppState {
        store: Arc::new(store),
        contract: Arc::new(contract),
        metrics: None,
    })
}

fn setup() -> App {
    app_with(InMemoryWalletStore::new(), Contract::embedded().unwrap())
}

fn seeded() -> App {
    app_with(
        InMemoryWalletStore::with_seed(vec![NewWallet::new(
            "Personal Wallet",
            "HouseholdExpenses",
            "Blue",
        )]),
        Contract::embedded().unwrap(),
    )
}

async fn call(app: &App, method: Method, uri: &str, body: Option<&Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(value).unwrap())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_wallet(app: &App, id: &str) -> (StatusCode, Option<Wallet>) {
    let (status, body) = call(app, Method::GET, &format!("/wallets/{}", id), None).await;
    let wallet = (status == StatusCode::OK)
        .then(|| serde_json::from_slice::<WalletEnvelope>(&body).unwrap().wallet);
    (status, wallet)
}

fn contract_requiring_owner() -> Contract {
    let yaml = wallets_contract::WALLET_OPENAPI.replace(
        "        - id\n        - name\n",
        "        - id\n        - owner\n        - name\n",
    );
    Contract::from_yaml_str(&yaml).unwrap()
}

fn contract_requiring_owner_on_create() -> Contract {
    let yaml = wallets_contract::WALLET_OPENAPI.replace(
        "      required:\n        - name\n",
        "      required:\n        - owner\n        - name\n",
    );
    Contract::from_yaml_str(&yaml).unwrap()
}

/// Serves `app` on an ephemeral port and returns its base url.
async fn serve(app: App) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            axum::ServiceExt::<axum::extract::Request>::into_make_service(app),
        )
        .await
        .unwrap();
    });
    format!("http://{}", addr)
}

fn embedded_client(base_url: &str) -> WalletsClient {
    WalletsClient::new(base_url, Arc::new(Contract::embedded().unwrap())).unwrap()
}

fn failure(body: &[u8]) -> ValidationFailure {
    serde_json::from_slice(body).expect("expected a {message, errors} body")
}

fn paths(failure: &ValidationFailure) -> Vec<&str> {
    failure.errors.iter().map(|e| e.path.as_str()).collect()
}

#[tokio::test]
async fn test_create_then_get_round_trips_fields() {
    let app = setup();
    let payloads = [
        json!({"name": "test", "type": "Event", "colour_code": "Green"}),
        json!({"name": "Groceries", "type": "HouseholdExpenses", "colour_code": "Blue"}),
        json!({"name": "", "type": "Savings", "colour_code": "#00ff00", "note": "dropped"}),
    ];

    for (idx, payload) in payloads.iter().enumerate() {
        let (status, body) = call(&app, Method::POST, "/wallets", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.is_empty());

        let id = idx as WalletId + 1;
        let (status, wallet) = get_wallet(&app, &id.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        let wallet = wallet.unwrap();
        assert_eq!(wallet.id, id);
        assert_eq!(wallet.name, payload["name"]);
        assert_eq!(wallet.wallet_type, payload["type"]);
        assert_eq!(wallet.colour_code, payload["colour_code"]);
    }
}

#[tokio::test]
async fn test_scenario_valid_then_invalid_post() {
    let app = setup();

    let (status, _) = call(
        &app,
        Method::POST,
        "/wallets",
        Some(&json!({"name": "test", "type": "Event", "colour_code": "Green"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/wallets",
        Some(&json!({"name": "test", "body": "test", "description": "Yellow"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let failure = failure(&body);
    assert_eq!(paths(&failure), vec!["/body/type", "/body/colour_code"]);
    assert!(!failure.message.is_empty());

    // The rejected payload was never stored.
    let (status, _) = get_wallet(&app, "2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = seeded();
    for id in ["0", "2", "999", "-1"] {
        let (status, body) = call(&app, Method::GET, &format!("/wallets/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "id {}", id);
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn test_repeated_get_is_idempotent() {
    let app = seeded();
    let (_, first) = call(&app, Method::GET, "/wallets/1", None).await;
    let (_, second) = call(&app, Method::GET, "/wallets/1", None).await;
    assert_eq!(first, second);

    let envelope: WalletEnvelope = serde_json::from_slice(&first).unwrap();
    assert_eq!(envelope.wallet.name, "Personal Wallet");
    assert_eq!(envelope.wallet.wallet_type, "HouseholdExpenses");
    assert_eq!(envelope.wallet.colour_code, "Blue");
}

#[tokio::test]
async fn test_numeric_id_matching() {
    let app = seeded();
    let (status, wallet) = get_wallet(&app, "01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet.unwrap().id, 1);
}

#[tokio::test]
async fn test_non_integer_id_is_rejected_by_contract() {
    let app = seeded();
    let (status, body) = call(&app, Method::GET, "/wallets/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(paths(&failure(&body)), vec!["/params/id"]);
}

#[tokio::test]
async fn test_undeclared_method_and_media_type() {
    let app = seeded();

    let (status, body) = call(&app, Method::DELETE, "/wallets/1", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(failure(&body).errors.len(), 1);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/wallets")
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from("name=test"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_health_and_metrics_are_outside_the_contract() {
    let app = setup();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"status": "ok"}));

    // No recorder installed in tests.
    let (status, _) = call(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_response_violations_are_server_errors() {
    // The handler never emits `owner`, so every 200 breaks this contract.
    let stricter = contract_requiring_owner();
    let app = app_with(
        InMemoryWalletStore::with_seed(vec![NewWallet::new("a", "Event", "Red")]),
        stricter,
    );

    let (status, body) = call(&app, Method::GET, "/wallets/1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(paths(&failure(&body)), vec!["/response/wallet/owner"]);
}

struct BrokenStore;

impl WalletStore for BrokenStore {
    fn create(&self, _wallet: NewWallet) -> Result<Wallet, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn get_by_id(&self, _id: WalletId) -> Result<Wallet, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn list(&self) -> Result<Vec<Wallet>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Err(StoreError::Poisoned)
    }
}

#[tokio::test]
async fn test_store_failures_surface_as_500() {
    let app = app_with(BrokenStore, Contract::embedded().unwrap());
    let payload = json!({"name": "test", "type": "Event", "colour_code": "Green"});

    let (status, _) = call(&app, Method::POST, "/wallets", Some(&payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // An empty 500 is not a declared response for GET either.
    let (status, _) = call(&app, Method::GET, "/wallets/1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_client_and_server_agree() {
    let app = setup();
    let client = embedded_client("http://localhost:3000");

    let payloads = [
        json!({"name": "test", "type": "Event", "colour_code": "Green"}),
        json!({"name": "test", "body": "test", "description": "Yellow"}),
        json!({"name": "test", "type": "Event"}),
        json!({"name": "test", "colour_code": "Green"}),
        json!({"type": "Event", "colour_code": "Green"}),
        json!({"name": 1, "type": ["Event"], "colour_code": null}),
        json!({}),
        json!([]),
        json!("wallet"),
    ];

    for payload in &payloads {
        let (status, body) = call(&app, Method::POST, "/wallets", Some(payload)).await;
        let local = client.prepare(Method::POST, "/wallets", Some(payload));

        match local {
            Ok(_) => assert_eq!(status, StatusCode::CREATED, "payload {}", payload),
            Err(ClientError::Validation(client_failure)) => {
                assert_eq!(status, client_failure.status, "payload {}", payload);
                let server_failure = failure(&body);
                assert_eq!(server_failure.message, client_failure.message, "payload {}", payload);
                assert_eq!(server_failure.errors, client_failure.errors, "payload {}", payload);
            }
            Err(other) => panic!("unexpected client error {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_client_and_server_agree_on_paths() {
    let app = seeded();
    let client = embedded_client("http://localhost:3000");

    for id in ["1", "01", "abc", "1.5", "true"] {
        let path = format!("/wallets/{}", id);
        let (status, body) = call(&app, Method::GET, &path, None).await;
        match client.prepare(Method::GET, &path, None) {
            Ok(_) => assert_eq!(status, StatusCode::OK, "path {}", path),
            Err(ClientError::Validation(client_failure)) => {
                assert_eq!(status, client_failure.status, "path {}", path);
                assert_eq!(failure(&body).errors, client_failure.errors, "path {}", path);
            }
            Err(other) => panic!("unexpected client error {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_trailing_slash_routes_like_trimmed_path() {
    let app = seeded();
    let client = embedded_client("http://localhost:3000");
    let payload = json!({"name": "test", "type": "Event", "colour_code": "Green"});

    assert!(client.prepare(Method::POST, "/wallets/", Some(&payload)).is_ok());
    let (status, body) = call(&app, Method::POST, "/wallets/", Some(&payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.is_empty());

    assert!(client.prepare(Method::GET, "/wallets/2/", None).is_ok());
    let (status, wallet) = get_wallet(&app, "2/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet.unwrap().name, "test");

    let (status, wallet) = get_wallet(&app, "1/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet.unwrap().name, "Personal Wallet");
}

#[tokio::test]
async fn test_trailing_slash_rejections_agree() {
    let app = seeded();
    let client = embedded_client("http://localhost:3000");
    let invalid = json!({"name": "test", "body": "test", "description": "Yellow"});

    let (status, body) = call(&app, Method::POST, "/wallets/", Some(&invalid)).await;
    match client.prepare(Method::POST, "/wallets/", Some(&invalid)) {
        Err(ClientError::Validation(client_failure)) => {
            assert_eq!(status, client_failure.status);
            assert_eq!(failure(&body).errors, client_failure.errors);
        }
        other => panic!("expected local rejection, got {:?}", other),
    }

    let (status, body) = call(&app, Method::GET, "/wallets/abc/", None).await;
    match client.prepare(Method::GET, "/wallets/abc/", None) {
        Err(ClientError::Validation(client_failure)) => {
            assert_eq!(status, client_failure.status);
            assert_eq!(failure(&body).errors, client_failure.errors);
        }
        other => panic!("expected local rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_against_live_server() {
    let base_url = serve(setup()).await;
    let client = embedded_client(&base_url);

    client
        .create_wallet(&NewWallet::new("Groceries", "HouseholdExpenses", "Blue"))
        .await
        .unwrap();
    let wallet = client.get_wallet(1).await.unwrap();
    assert_eq!(wallet.id, 1);
    assert_eq!(wallet.name, "Groceries");
    assert_eq!(wallet.wallet_type, "HouseholdExpenses");
    assert_eq!(wallet.colour_code, "Blue");

    match client.get_wallet(99).await {
        Err(ClientError::NotFound(99)) => {}
        other => panic!("expected NotFound(99), got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_decodes_server_rejections() {
    // The server requires `owner`; the client's embedded contract does not,
    // so the request passes locally and the server's 400 comes back.
    let app = app_with(InMemoryWalletStore::new(), contract_requiring_owner_on_create());
    let client = embedded_client(&serve(app).await);

    match client.create_wallet(&NewWallet::new("a", "Event", "Red")).await {
        Err(ClientError::Rejected(failure)) => {
            assert_eq!(failure.status, StatusCode::BAD_REQUEST);
            assert_eq!(paths(&failure), vec!["/body/owner"]);
            assert!(!failure.message.is_empty());
        }
        other => panic!("expected Rejected, got {:?}", other),
    }

    // A response violation decodes the same way.
    let app = app_with(
        InMemoryWalletStore::with_seed(vec![NewWallet::new("a", "Event", "Red")]),
        contract_requiring_owner(),
    );
    let client = embedded_client(&serve(app).await);
    match client.get_wallet(1).await {
        Err(ClientError::Rejected(failure)) => {
            assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(paths(&failure), vec!["/response/wallet/owner"]);
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}
