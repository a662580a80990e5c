use axum::body::Body;
use axum::http::{Request, StatusCode};
use cafeflow::db::init_db;
use cafeflow::domain::{Money, Qty};
use cafeflow::{api, Notifier, Repository};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let notifier = Arc::new(Notifier::new(None));
    let app = api::create_router(api::AppState::new(repo.clone(), notifier));

    TestApp {
        app,
        repo,
        _temp: temp_dir,
    }
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Tea at 10 + 5% GST with a recipe backed by plenty of stock.
async fn seed_tea(repo: &Repository) -> Uuid {
    let tea = repo
        .create_product(
            "Tea",
            Money::from_str("10").unwrap(),
            Money::from_str("5").unwrap(),
        )
        .await
        .unwrap();
    let sugar = repo
        .create_ingredient("SUGAR", "kg", Qty::from_str("100").unwrap(), Qty::zero(), None)
        .await
        .unwrap();
    repo.set_recipe(tea.id, sugar.id, Qty::from_str("0.010").unwrap())
        .await
        .unwrap();
    tea.id
}

async fn create_takeaway(app: axum::Router) -> Uuid {
    let (status, body) = send(
        app,
        "POST",
        "/v1/orders",
        Some(json!({
            "orderType": "TAKEAWAY",
            "customerName": "Asha",
            "customerPhone": "9876543210"
        })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    Uuid::from_str(body["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_create_takeaway_order_assigns_order_number() {
    let test_app = setup_test_app().await;

    let (status, body) = send(
        test_app.app.clone(),
        "POST",
        "/v1/orders",
        Some(json!({
            "orderType": "TAKEAWAY",
            "customerName": "Asha",
            "customerPhone": "9876543210"
        })),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["orderId"], "ORD-000001");
}

#[tokio::test]
async fn test_takeaway_without_phone_is_rejected() {
    let test_app = setup_test_app().await;

    let (status, body) = send(
        test_app.app,
        "POST",
        "/v1/orders",
        Some(json!({"orderType": "TAKEAWAY", "customerName": "Asha"})),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_dine_in_requires_session() {
    let test_app = setup_test_app().await;

    let (status, _) = send(
        test_app.app,
        "POST",
        "/v1/orders",
        Some(json!({"orderType": "DINE_IN"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_items_endpoint_prices_with_gst() {
    let test_app = setup_test_app().await;
    let tea_id = seed_tea(&test_app.repo).await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    let (status, body) = send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": tea_id, "quantity": 2}]})),
        &[],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // 2 * (10 + 0.50 GST)
    assert_eq!(body["total"], "21.00");

    let (status, detail) = send(
        test_app.app,
        "GET",
        &format!("/v1/orders/{}", order_id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["totalAmount"], "21.00");
    let item = &detail["items"][0];
    assert_eq!(item["basePrice"], "10.00");
    assert_eq!(item["gstAmount"], "0.50");
    assert_eq!(item["priceAtTime"], "10.50");
}

#[tokio::test]
async fn test_resubmitting_items_replaces_previous_set() {
    let test_app = setup_test_app().await;
    let tea_id = seed_tea(&test_app.repo).await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": tea_id, "quantity": 5}]})),
        &[],
    )
    .await;
    let (_, body) = send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": tea_id, "quantity": 1}]})),
        &[],
    )
    .await;
    assert_eq!(body["total"], "10.50");

    let (_, detail) = send(
        test_app.app,
        "GET",
        &format!("/v1/orders/{}", order_id),
        None,
        &[],
    )
    .await;
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);
    assert_eq!(detail["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_item_with_both_product_and_combo_is_rejected() {
    let test_app = setup_test_app().await;
    let tea_id = seed_tea(&test_app.repo).await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    let (status, _) = send(
        test_app.app,
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": tea_id, "comboId": Uuid::new_v4(), "quantity": 1}]})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pay_returns_bill_number_and_second_pay_conflicts() {
    let test_app = setup_test_app().await;
    let tea_id = seed_tea(&test_app.repo).await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": tea_id, "quantity": 2}]})),
        &[],
    )
    .await;

    let (status, body) = send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/pay", order_id),
        Some(json!({"method": "CASH"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["billNumber"], "000000000001");
    assert_eq!(body["finalAmount"], "21.00");

    let (status, body) = send(
        test_app.app,
        "POST",
        &format!("/v1/orders/{}/pay", order_id),
        Some(json!({"method": "UPI"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_pay_with_unknown_method_is_rejected() {
    let test_app = setup_test_app().await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    let (status, _) = send(
        test_app.app,
        "POST",
        &format!("/v1/orders/{}/pay", order_id),
        Some(json!({"method": "CHEQUE"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pay_missing_recipe_returns_conflict() {
    let test_app = setup_test_app().await;
    let coffee = test_app
        .repo
        .create_product(
            "Coffee",
            Money::from_str("20").unwrap(),
            Money::from_str("5").unwrap(),
        )
        .await
        .unwrap();
    let order_id = create_takeaway(test_app.app.clone()).await;

    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": coffee.id, "quantity": 1}]})),
        &[],
    )
    .await;

    let (status, body) = send(
        test_app.app,
        "POST",
        &format!("/v1/orders/{}/pay", order_id),
        Some(json!({"method": "CASH"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Coffee"));
}

#[tokio::test]
async fn test_cancel_requires_admin_role() {
    let test_app = setup_test_app().await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    let (status, _) = send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/cancel", order_id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        test_app.app,
        "POST",
        &format!("/v1/orders/{}/cancel", order_id),
        None,
        &[("x-staff-role", "ADMIN"), ("x-staff-name", "asha")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
}

#[tokio::test]
async fn test_status_patch_moves_through_kitchen_states() {
    let test_app = setup_test_app().await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    let (status, body) = send(
        test_app.app.clone(),
        "PATCH",
        &format!("/v1/orders/{}/status", order_id),
        Some(json!({"status": "IN_PROGRESS"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_PROGRESS");

    // Terminal states are unreachable through this endpoint.
    let (status, _) = send(
        test_app.app,
        "PATCH",
        &format!("/v1/orders/{}/status", order_id),
        Some(json!({"status": "COMPLETED"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_pending_filter() {
    let test_app = setup_test_app().await;
    let tea_id = seed_tea(&test_app.repo).await;

    let open = create_takeaway(test_app.app.clone()).await;
    let paid = create_takeaway(test_app.app.clone()).await;
    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", paid),
        Some(json!({"items": [{"productId": tea_id, "quantity": 1}]})),
        &[],
    )
    .await;
    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/pay", paid),
        Some(json!({"method": "CASH"})),
        &[],
    )
    .await;

    let (status, body) = send(
        test_app.app.clone(),
        "GET",
        "/v1/orders?filter=pending",
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], open.to_string());

    let (_, body) = send(test_app.app, "GET", "/v1/orders?filter=paid", None, &[]).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], paid.to_string());
}

#[tokio::test]
async fn test_list_orders_unknown_filter_is_rejected() {
    let test_app = setup_test_app().await;
    let (status, _) = send(test_app.app, "GET", "/v1/orders?filter=archived", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invoice_only_available_after_completion() {
    let test_app = setup_test_app().await;
    let tea_id = seed_tea(&test_app.repo).await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": tea_id, "quantity": 2}], "discountAmount": 1.0})),
        &[],
    )
    .await;

    let (status, _) = send(
        test_app.app.clone(),
        "GET",
        &format!("/v1/orders/{}/invoice", order_id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/pay", order_id),
        Some(json!({"method": "CARD"})),
        &[],
    )
    .await;

    let (status, body) = send(
        test_app.app,
        "GET",
        &format!("/v1/orders/{}/invoice", order_id),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subtotal"], "20.00");
    assert_eq!(body["totalGst"], "1.00");
    assert_eq!(body["grandTotal"], "21.00");
    assert_eq!(body["discount"], "1.00");
    assert_eq!(body["finalAmount"], "20.00");
    assert_eq!(body["paymentMethod"], "CARD");
    assert_eq!(body["items"][0]["name"], "Tea");
}

#[tokio::test]
async fn test_send_invoice_fails_without_notify_endpoint() {
    let test_app = setup_test_app().await;
    let tea_id = seed_tea(&test_app.repo).await;
    let order_id = create_takeaway(test_app.app.clone()).await;

    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({"items": [{"productId": tea_id, "quantity": 1}]})),
        &[],
    )
    .await;
    send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/orders/{}/pay", order_id),
        Some(json!({"method": "CASH"})),
        &[],
    )
    .await;

    let (status, _) = send(
        test_app.app,
        "POST",
        &format!("/v1/orders/{}/send-invoice", order_id),
        None,
        &[],
    )
    .await;
    // No NOTIFY_URL configured: delivery fails, payment state is untouched.
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unknown_order_returns_not_found() {
    let test_app = setup_test_app().await;
    let (status, _) = send(
        test_app.app,
        "GET",
        &format!("/v1/orders/{}", Uuid::new_v4()),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
