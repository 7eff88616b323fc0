mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use quest_ledger::store::MemoryStore;
use quest_ledger::{AppState, init_router};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{TestClock, accounts_on};

fn app(win: bool) -> Router {
    let clock = TestClock::at("2024-05-01T10:00:00Z");
    init_router(AppState {
        accounts: accounts_on(Arc::new(MemoryStore::new()), &clock, win),
    })
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header("x-user-id", user);
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn amount(v: &Value) -> Decimal {
    v.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app(true);
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn every_api_route_requires_a_user() {
    let app = app(true);
    let routes = [
        ("GET", "/api/dashboard"),
        ("GET", "/api/quests"),
        ("POST", "/api/quests/1/complete"),
        ("POST", "/api/roulette/play"),
        ("POST", "/api/wallet/deposit"),
        ("POST", "/api/wallet/withdraw"),
        ("GET", "/api/wallet/history"),
    ];

    for (method, uri) in routes {
        let (status, body) = call(&app, method, uri, None, Some(json!({ "amount": 10 }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert!(body["request_id"].is_string());
    }
}

#[tokio::test]
async fn dashboard_lazily_creates_the_account() {
    let app = app(true);
    let (status, body) = call(&app, "GET", "/api/dashboard", Some("ann"), None).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(amount(&data["balance"]["mainBalance"]), Decimal::ZERO);
    assert_eq!(data["completedQuestsCount"], 0);
    assert_eq!(data["totalQuestsCount"], 4);
    assert_eq!(data["nextResetTime"], "2024-05-02T00:00:00Z");
    assert!(body["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn deposit_withdraw_and_history_round_trip() {
    let app = app(true);

    let (status, body) = call(
        &app,
        "POST",
        "/api/wallet/deposit",
        Some("ben"),
        Some(json!({ "amount": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["data"]["mainBalance"]), Decimal::from(1000));
    assert_eq!(amount(&body["data"]["lockedBonus"]), Decimal::from(400));

    let (status, body) = call(
        &app,
        "POST",
        "/api/wallet/withdraw",
        Some("ben"),
        Some(json!({ "amount": "250.50" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["data"]["mainBalance"]), Decimal::new(74950, 2));

    let (status, body) = call(
        &app,
        "GET",
        "/api/wallet/history?per_page=1",
        Some("ben"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["type"], "withdrawal");
    assert_eq!(body["data"][0]["status"], "completed");
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn bad_amounts_are_client_errors() {
    let app = app(true);

    for payload in [
        json!({ "amount": 0 }),
        json!({ "amount": -5 }),
        json!({ "amount": "abc" }),
        json!({}),
        json!({ "amount": 0.001 }),
        json!({ "amount": "1000000000000000000" }),
    ] {
        let (status, body) = call(
            &app,
            "POST",
            "/api/wallet/deposit",
            Some("cat"),
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["code"], "BAD_AMOUNT");
    }
}

#[tokio::test]
async fn overdraft_is_reported_as_insufficient_funds() {
    let app = app(true);
    let (status, body) = call(
        &app,
        "POST",
        "/api/wallet/withdraw",
        Some("dee"),
        Some(json!({ "amount": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");
}

#[tokio::test]
async fn completing_a_quest_twice_conflicts() {
    let app = app(true);
    let (_, body) = call(&app, "GET", "/api/quests", Some("eve"), None).await;
    let id = body["data"][0]["id"].as_i64().unwrap();
    assert_eq!(body["data"][0]["type"], "video");
    assert_eq!(amount(&body["data"][0]["rewardAmount"]), Decimal::from(3500));

    let uri = format!("/api/quests/{id}/complete");
    let (status, body) = call(&app, "POST", &uri, Some("eve"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCompleted"], true);

    let (status, body) = call(&app, "POST", &uri, Some("eve"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "QUEST_ALREADY_COMPLETED");

    let (status, body) = call(&app, "POST", &uri, Some("fin"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "QUEST_NOT_FOUND");

    let (status, body) = call(&app, "POST", "/api/quests/abc/complete", Some("eve"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn roulette_reports_outcome_or_missing_bonus() {
    let app = app(false);

    let (status, body) = call(&app, "POST", "/api/roulette/play", Some("gil"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NO_LOCKED_BONUS");

    call(
        &app,
        "POST",
        "/api/wallet/deposit",
        Some("gil"),
        Some(json!({ "amount": 1000 })),
    )
    .await;
    let (status, body) = call(&app, "POST", "/api/roulette/play", Some("gil"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["won"], false);
    assert_eq!(amount(&body["data"]["amount"]), Decimal::ZERO);
    assert_eq!(amount(&body["data"]["newBalance"]["lockedBonus"]), Decimal::ZERO);
    assert_eq!(amount(&body["data"]["newBalance"]["mainBalance"]), Decimal::from(1000));
}

#[tokio::test]
async fn malformed_history_query_is_a_bad_request() {
    let app = app(true);

    for uri in [
        "/api/wallet/history?page=abc",
        "/api/wallet/history?per_page=-1",
    ] {
        let (status, body) = call(&app, "GET", uri, Some("hal"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["request_id"].is_string());
    }
}

#[tokio::test]
async fn deposit_over_the_balance_limit_is_refused() {
    let app = app(true);
    let (status, _) = call(
        &app,
        "POST",
        "/api/wallet/deposit",
        Some("ivy"),
        Some(json!({ "amount": "600000000000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        "/api/wallet/deposit",
        Some("ivy"),
        Some(json!({ "amount": "500000000000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BALANCE_LIMIT");
}
