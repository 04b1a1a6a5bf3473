use std::sync::Arc;

use axum::{Router, http::StatusCode};
use common::config::{AuthConfig, Config};
use common::test_helpers::{TestError, TestResult, create_test_connection, generate_unique_id, test_utils};
use common::test_assert_eq;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{
    auth::Authenticator,
    executable_utils::{AppState, router},
    storage::{PaymentsStorage, ProdStorage},
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_config() -> TestResult<Config> {
    Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/test.yaml"))
        .map_err(|e| TestError::generic(e.to_string()))
}

fn auth_config() -> TestResult<AuthConfig> {
    Ok(test_config()?.auth)
}

async fn test_app() -> TestResult<Router> {
    build_app(None).await
}

async fn build_app(prometheus: Option<PrometheusHandle>) -> TestResult<Router> {
    let config = test_config()?;
    let storage = ProdStorage::from_connection(create_test_connection().await?);
    storage
        .create_schema()
        .await
        .map_err(|e| TestError::generic(e.to_string()))?;
    let state = AppState::new(Arc::new(storage), &config.auth);
    Ok(router(state, &config.backend, prometheus))
}

async fn response_body_string(response: axum::response::Response) -> TestResult<String> {
    let bytes = response
        .into_body()
        .collect()
        .await
        .map_err(|e| TestError::generic(e.to_string()))?
        .to_bytes();
    String::from_utf8(bytes.to_vec()).map_err(|e| TestError::generic(e.to_string()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> TestResult<(StatusCode, Value)> {
    let body = body.map(|b| test_utils::serialize_json(&b)).transpose()?;
    let request = test_utils::build_request(method, uri, body, token)?;
    let response = app
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| TestError::generic(e.to_string()))?;

    let status = response.status();
    let text = response_body_string(response).await?;
    let json = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)?
    };
    Ok((status, json))
}

fn unique_email(prefix: &str) -> String {
    format!("{}@test.com", generate_unique_id(prefix))
}

async fn register_and_login(app: &Router, email: &str) -> TestResult<String> {
    let creds = json!({ "email": email, "password": "123456" });

    let (status, _) = send(app, "POST", "/auth/register", Some(creds.clone()), None).await?;
    test_utils::check_status_code(status, StatusCode::OK)?;

    let (status, body) = send(app, "POST", "/auth/login", Some(creds), None).await?;
    test_utils::check_status_code(status, StatusCode::OK)?;

    body["access_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TestError::assertion_failure("login response has no access_token"))
}

async fn create_order(app: &Router, token: &str, items: Value) -> TestResult<Value> {
    let payload = json!({
        "customer_id": "cust_X",
        "items": items,
        "shipping_address": "CL 1 #2-3"
    });
    let (status, body) = send(app, "POST", "/orders", Some(payload), Some(token)).await?;
    test_utils::check_status_code(status, StatusCode::OK)?;
    Ok(body)
}

#[test]
fn test_config_uses_cheap_hashing() -> TestResult {
    let config = test_config()?;
    test_assert_eq!(config.common.database_url, "sqlite::memory:");
    test_assert_eq!(config.auth.bcrypt_cost, 4);
    test_assert_eq!(config.backend.allowed_origins, vec!["*".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_health_check() -> TestResult {
    let app = test_app().await?;
    let request = test_utils::build_request("GET", "/health", None, None)?;

    let response = app
        .oneshot(request)
        .await
        .map_err(|e| TestError::generic(e.to_string()))?;

    test_utils::check_status_code(response.status(), StatusCode::OK)?;
    test_assert_eq!(response_body_string(response).await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_prometheus_route_gets_cors_headers() -> TestResult {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = build_app(Some(handle)).await?;
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/metrics")
        .header("Origin", "http://localhost:5173")
        .body(String::new())
        .map_err(TestError::from)?;

    let response = app
        .oneshot(request)
        .await
        .map_err(|e| TestError::generic(e.to_string()))?;

    test_utils::check_status_code(response.status(), StatusCode::OK)?;
    test_assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.as_bytes().to_vec()),
        Some(b"*".to_vec())
    );
    Ok(())
}

#[tokio::test]
async fn test_metrics_route_is_absent_without_recorder() -> TestResult {
    let app = test_app().await?;
    let request = test_utils::build_request("GET", "/metrics", None, None)?;

    let response = app
        .oneshot(request)
        .await
        .map_err(|e| TestError::generic(e.to_string()))?;

    test_utils::check_status_code(response.status(), StatusCode::NOT_FOUND)?;
    Ok(())
}

#[tokio::test]
async fn test_register_returns_public_user() -> TestResult {
    let app = test_app().await?;
    let email = unique_email("register");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        Some(json!({ "email": email, "password": "123456" })),
        None,
    )
    .await?;

    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["email"], json!(email));
    test_assert_eq!(body["id"].is_i64(), true);
    test_assert_eq!(body.get("password_hash"), None);
    test_assert_eq!(body.get("password"), None);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() -> TestResult {
    let app = test_app().await?;
    let creds = json!({ "email": "demo@test.com", "password": "123456" });

    let (status, _) = send(&app, "POST", "/auth/register", Some(creds.clone()), None).await?;
    test_utils::check_status_code(status, StatusCode::OK)?;

    let (status, body) = send(&app, "POST", "/auth/register", Some(creds), None).await?;
    test_utils::check_status_code(status, StatusCode::BAD_REQUEST)?;
    test_assert_eq!(body["detail"], json!("Email already registered"));
    Ok(())
}

#[tokio::test]
async fn test_register_validation_errors() -> TestResult {
    let app = test_app().await?;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        Some(json!({ "email": "not-an-email", "password": "123456" })),
        None,
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::UNPROCESSABLE_ENTITY)?;
    test_assert_eq!(body["detail"].is_string(), true);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        Some(json!({ "email": "short@test.com", "password": "12345" })),
        None,
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::UNPROCESSABLE_ENTITY)?;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        Some(json!({ "email": "missing@test.com" })),
        None,
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::UNPROCESSABLE_ENTITY)?;
    Ok(())
}

#[tokio::test]
async fn test_login_with_bad_credentials() -> TestResult {
    let app = test_app().await?;
    let email = unique_email("login");
    register_and_login(&app, &email).await?;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        Some(json!({ "email": email, "password": "wrong-password" })),
        None,
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::UNAUTHORIZED)?;
    test_assert_eq!(body["detail"], json!("Invalid credentials"));

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        Some(json!({ "email": "nobody@test.com", "password": "123456" })),
        None,
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::UNAUTHORIZED)?;
    test_assert_eq!(body["detail"], json!("Invalid credentials"));
    Ok(())
}

#[tokio::test]
async fn test_login_issues_bearer_token() -> TestResult {
    let app = test_app().await?;
    let email = unique_email("token");
    let creds = json!({ "email": email, "password": "123456" });
    send(&app, "POST", "/auth/register", Some(creds.clone()), None).await?;

    let (status, body) = send(&app, "POST", "/auth/login", Some(creds), None).await?;

    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["token_type"], json!("bearer"));
    test_assert_eq!(body["access_token"].as_str().map(|t| !t.is_empty()), Some(true));
    Ok(())
}

#[tokio::test]
async fn test_protected_routes_require_token() -> TestResult {
    let app = test_app().await?;

    let (status, body) = send(&app, "GET", "/metrics/summary", None, None).await?;
    test_utils::check_status_code(status, StatusCode::UNAUTHORIZED)?;
    test_assert_eq!(body["detail"], json!("Not authenticated"));

    let (status, body) = send(&app, "GET", "/orders/1", None, Some("garbage")).await?;
    test_utils::check_status_code(status, StatusCode::UNAUTHORIZED)?;
    test_assert_eq!(body["detail"], json!("Invalid token"));

    let (status, _) = send(
        &app,
        "POST",
        "/fraud/score",
        Some(json!({ "order_id": 1 })),
        None,
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::UNAUTHORIZED)?;
    Ok(())
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() -> TestResult {
    let app = test_app().await?;
    let token = Authenticator::from_config(&auth_config()?)
        .issue_token(999)
        .map_err(|e| TestError::generic(e.to_string()))?;

    let (status, body) = send(&app, "GET", "/metrics/summary", None, Some(&token)).await?;

    test_utils::check_status_code(status, StatusCode::UNAUTHORIZED)?;
    test_assert_eq!(body["detail"], json!("User not found"));
    Ok(())
}

#[tokio::test]
async fn test_create_and_get_order() -> TestResult {
    let app = test_app().await?;
    let token = register_and_login(&app, &unique_email("orders")).await?;

    let created = create_order(
        &app,
        &token,
        json!([
            { "sku": "SKU1", "qty": 2, "unit_price": 10.5 },
            { "sku": "SKU2", "qty": 1, "unit_price": 4.0 }
        ]),
    )
    .await?;

    test_assert_eq!(created["total_amount"].as_f64(), Some(25.0));
    test_assert_eq!(created["customer_id"], json!("cust_X"));
    test_assert_eq!(created["items"].as_array().map(Vec::len), Some(2));
    test_assert_eq!(created["items"][0]["sku"], json!("SKU1"));

    let uri = format!("/orders/{}", created["id"]);
    let (status, fetched) = send(&app, "GET", &uri, None, Some(&token)).await?;
    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(fetched, created);
    Ok(())
}

#[tokio::test]
async fn test_order_of_other_user_is_not_found() -> TestResult {
    let app = test_app().await?;
    let owner = register_and_login(&app, &unique_email("owner")).await?;
    let intruder = register_and_login(&app, &unique_email("intruder")).await?;

    let created = create_order(
        &app,
        &owner,
        json!([{ "sku": "SKU1", "qty": 1, "unit_price": 99.0 }]),
    )
    .await?;
    let uri = format!("/orders/{}", created["id"]);

    let (status, body) = send(&app, "GET", &uri, None, Some(&intruder)).await?;
    test_utils::check_status_code(status, StatusCode::NOT_FOUND)?;
    test_assert_eq!(body["detail"], json!("Order not found"));

    let (status, _) = send(&app, "GET", "/orders/4242", None, Some(&owner)).await?;
    test_utils::check_status_code(status, StatusCode::NOT_FOUND)?;
    Ok(())
}

#[tokio::test]
async fn test_create_payment() -> TestResult {
    let app = test_app().await?;
    let token = register_and_login(&app, &unique_email("payer")).await?;
    let order = create_order(
        &app,
        &token,
        json!([{ "sku": "SKU1", "qty": 1, "unit_price": 120.0 }]),
    )
    .await?;

    let (status, body) = send(
        &app,
        "POST",
        "/payments",
        Some(json!({
            "order_id": order["id"],
            "amount": 120.0,
            "method": "card",
            "provider": "stripe"
        })),
        Some(&token),
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["order_id"], order["id"]);
    test_assert_eq!(body["metadata"], json!({}));

    let (status, body) = send(
        &app,
        "POST",
        "/payments",
        Some(json!({
            "order_id": order["id"],
            "amount": 10.0,
            "method": "pse",
            "provider": "bank",
            "metadata": { "reference": "abc-1" }
        })),
        Some(&token),
    )
    .await?;
    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["metadata"], json!({ "reference": "abc-1" }));
    Ok(())
}

#[tokio::test]
async fn test_payment_for_foreign_order_is_rejected() -> TestResult {
    let app = test_app().await?;
    let owner = register_and_login(&app, &unique_email("owner")).await?;
    let other = register_and_login(&app, &unique_email("other")).await?;
    let order = create_order(
        &app,
        &owner,
        json!([{ "sku": "SKU1", "qty": 1, "unit_price": 50.0 }]),
    )
    .await?;

    let payment = json!({
        "order_id": order["id"],
        "amount": 50.0,
        "method": "cash",
        "provider": "store"
    });
    let (status, body) = send(&app, "POST", "/payments", Some(payment), Some(&other)).await?;

    test_utils::check_status_code(status, StatusCode::NOT_FOUND)?;
    test_assert_eq!(body["detail"], json!("Order not found"));
    Ok(())
}

#[tokio::test]
async fn test_fraud_flow_rejects_risky_order() -> TestResult {
    let app = test_app().await?;
    let token = register_and_login(&app, "demo@test.com").await?;
    let order = create_order(
        &app,
        &token,
        json!([{ "sku": "SKU1", "qty": 1, "unit_price": 350.0 }]),
    )
    .await?;

    let (status, body) = send(
        &app,
        "POST",
        "/fraud/score",
        Some(json!({
            "order_id": order["id"],
            "ip_country": "RU",
            "email_domain": "yopmail.com",
            "distance_km": 2000,
            "attempts_last_hour": 3
        })),
        Some(&token),
    )
    .await?;

    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["score"].as_f64(), Some(1.0));
    test_assert_eq!(body["decision"], json!("reject"));
    test_assert_eq!(
        body["reasons"],
        json!([
            "high_amount",
            "risky_country",
            "disposable_email",
            "ip_shipping_distance",
            "multiple_attempts"
        ])
    );
    Ok(())
}

#[tokio::test]
async fn test_fraud_score_for_unknown_order() -> TestResult {
    let app = test_app().await?;
    let token = register_and_login(&app, &unique_email("scorer")).await?;

    let (status, body) = send(
        &app,
        "POST",
        "/fraud/score",
        Some(json!({ "order_id": 9999 })),
        Some(&token),
    )
    .await?;

    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["score"].as_f64(), Some(1.0));
    test_assert_eq!(body["reasons"], json!(["order_not_found"]));
    test_assert_eq!(body["decision"], json!("reject"));
    Ok(())
}

#[tokio::test]
async fn test_fraud_score_uses_owner_history() -> TestResult {
    let app = test_app().await?;
    let token = register_and_login(&app, &unique_email("history")).await?;
    for _ in 0..3 {
        create_order(
            &app,
            &token,
            json!([{ "sku": "SKU1", "qty": 1, "unit_price": 20.0 }]),
        )
        .await?;
    }
    let big = create_order(
        &app,
        &token,
        json!([{ "sku": "SKU2", "qty": 1, "unit_price": 200.0 }]),
    )
    .await?;

    // Average is (20 * 3 + 200) / 4 = 65, and 200 > 2.5 * 65.
    let (status, body) = send(
        &app,
        "POST",
        "/fraud/score",
        Some(json!({ "order_id": big["id"] })),
        Some(&token),
    )
    .await?;

    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["reasons"], json!(["ticket_outlier"]));
    test_assert_eq!(body["score"].as_f64(), Some(0.2));
    test_assert_eq!(body["decision"], json!("approve"));
    Ok(())
}

#[tokio::test]
async fn test_metrics_summary() -> TestResult {
    let app = test_app().await?;
    let token = register_and_login(&app, &unique_email("metrics")).await?;

    let (status, body) = send(&app, "GET", "/metrics/summary", None, Some(&token)).await?;
    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(
        body,
        json!({
            "total_orders": 0,
            "total_payments": 0,
            "total_revenue": 0.0,
            "suspected_fraud_rate": 0.0
        })
    );

    let big = create_order(
        &app,
        &token,
        json!([{ "sku": "SKU1", "qty": 1, "unit_price": 350.0 }]),
    )
    .await?;
    create_order(
        &app,
        &token,
        json!([{ "sku": "SKU2", "qty": 2, "unit_price": 50.0 }]),
    )
    .await?;
    let payment = json!({
        "order_id": big["id"],
        "amount": 350.0,
        "method": "card",
        "provider": "stripe"
    });
    send(&app, "POST", "/payments", Some(payment), Some(&token)).await?;

    let (status, body) = send(&app, "GET", "/metrics/summary", None, Some(&token)).await?;
    test_utils::check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body["total_orders"], json!(2));
    test_assert_eq!(body["total_payments"], json!(1));
    test_assert_eq!(body["total_revenue"].as_f64(), Some(350.0));
    test_assert_eq!(body["suspected_fraud_rate"].as_f64(), Some(0.5));
    Ok(())
}
