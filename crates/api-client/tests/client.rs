use api_client::{AccountApi, TradovateClient};
use api_client::error::ApiError;
use configuration::AccountConfig;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn account_config() -> AccountConfig {
    AccountConfig {
        account_name: "Primary".to_string(),
        username: "trader-one".to_string(),
        password: "hunter2".to_string(),
        app_id: "Sample App".to_string(),
        app_version: "1.0".to_string(),
        cid: 8,
        sec: "f03741b6-f634-48d6-9308-c8fb871150c2".to_string(),
    }
}

fn client_for(server: &MockServer) -> TradovateClient {
    TradovateClient::with_base_url(account_config(), server.uri(), "ws://unused")
}

/// Mounts the two-step authentication flow (token grant + account list).
async fn mount_auth(server: &MockServer, expiration_time: &str, expected_auths: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/accesstokenrequest"))
        .and(body_partial_json(json!({
            "name": "trader-one",
            "appId": "Sample App",
            "cid": 8,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "test-token",
            "mdAccessToken": "test-md-token",
            "userId": 404,
            "expirationTime": expiration_time,
        })))
        .expect(expected_auths)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/account/list"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1001,
            "name": "DEMO1001",
            "userId": 404,
            "accountType": "Customer",
            "active": true,
            "cashBalance": 48250.5,
        }])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn authenticate_captures_account_identity() {
    let server = MockServer::start().await;
    mount_auth(&server, "2099-01-01T00:00:00Z", 1).await;

    let client = client_for(&server);
    let info = client.authenticate().await.unwrap();

    assert_eq!(info.id, 1001);
    assert_eq!(info.name, "DEMO1001");
    assert_eq!(client.account_id().await, Some(1001));
    assert!(!client.is_expired().await);
}

#[tokio::test]
async fn unauthenticated_session_counts_as_expired() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    assert!(client.is_expired().await);
    assert!(matches!(
        client.positions().await,
        Err(ApiError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn renew_is_a_noop_while_token_is_valid() {
    let server = MockServer::start().await;
    // expect(1): a second token request would fail verification on drop.
    mount_auth(&server, "2099-01-01T00:00:00Z", 1).await;

    let client = client_for(&server);
    client.authenticate().await.unwrap();
    client.renew_token().await.unwrap();
}

#[tokio::test]
async fn renew_reauthenticates_once_expired() {
    let server = MockServer::start().await;
    mount_auth(&server, "2020-01-01T00:00:00Z", 2).await;

    let client = client_for(&server);
    client.authenticate().await.unwrap();
    assert!(client.is_expired().await);
    client.renew_token().await.unwrap();
}

#[tokio::test]
async fn platform_error_text_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/accesstokenrequest"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errorText": "Incorrect username or password",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.authenticate().await {
        Err(ApiError::Platform(401, message)) => {
            assert_eq!(message, "Incorrect username or password");
        }
        other => panic!("expected platform error, got {other:?}"),
    }
}

#[tokio::test]
async fn place_order_attaches_the_account_id() {
    let server = MockServer::start().await;
    mount_auth(&server, "2099-01-01T00:00:00Z", 1).await;

    Mock::given(method("POST"))
        .and(path("/order/placeorder"))
        .and(body_partial_json(json!({
            "accountId": 1001,
            "action": "Buy",
            "symbol": "MESM4",
            "orderQty": 1,
            "orderType": "Limit",
            // Decimals go over the wire as strings, the way they serialize.
            "price": "5000",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orderId": 55 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.authenticate().await.unwrap();

    let spec = core_types::OrderSpec {
        action: core_types::OrderAction::Buy,
        symbol: "MESM4".to_string(),
        order_qty: 1,
        order_type: core_types::OrderType::Limit,
        price: Some(dec!(5000)),
    };
    let confirmation = client.place_order(&spec).await.unwrap();
    assert_eq!(confirmation.order_id, Some(55));
}

#[tokio::test]
async fn rejected_order_becomes_an_error() {
    let server = MockServer::start().await;
    mount_auth(&server, "2099-01-01T00:00:00Z", 1).await;

    Mock::given(method("POST"))
        .and(path("/order/placeorder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "failureReason": "UnknownReason",
            "failureText": "Insufficient funds",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.authenticate().await.unwrap();

    let spec = core_types::OrderSpec {
        action: core_types::OrderAction::Sell,
        symbol: "MESM4".to_string(),
        order_qty: 2,
        order_type: core_types::OrderType::Market,
        price: None,
    };
    match client.place_order(&spec).await {
        Err(ApiError::OrderRejected(reason)) => assert_eq!(reason, "Insufficient funds"),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn balance_is_fetched_for_the_authenticated_account() {
    let server = MockServer::start().await;
    mount_auth(&server, "2099-01-01T00:00:00Z", 1).await;

    Mock::given(method("GET"))
        .and(path("/cashBalance/getcashbalance"))
        .and(query_param("accountId", "1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cashBalance": 48250.5,
            "openPnL": -120.25,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.authenticate().await.unwrap();

    let balance = client.balance().await.unwrap();
    assert_eq!(balance.cash_balance, dec!(48250.5));
    assert_eq!(balance.open_pnl, Some(dec!(-120.25)));
}

#[tokio::test]
async fn summary_degrades_failed_sections_to_empty() {
    let server = MockServer::start().await;
    mount_auth(&server, "2099-01-01T00:00:00Z", 1).await;

    Mock::given(method("GET"))
        .and(path("/position/list"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server blew up"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/order/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9,
            "accountId": 1001,
            "contractId": 77,
            "action": "Sell",
            "ordStatus": "Working",
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cashBalance/getcashbalance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cashBalance": 10000,
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.authenticate().await.unwrap();

    let summary = client.account_summary().await;
    assert_eq!(summary.account_name, "Primary");
    assert_eq!(summary.account_id, Some(1001));
    // The failed positions sub-query degrades; everything else survives.
    assert!(summary.positions.is_empty());
    assert_eq!(summary.orders.len(), 1);
    assert_eq!(summary.cash_balance(), dec!(10000));
    assert!(summary.account_info.is_some());
}
