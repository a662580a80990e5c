use axum::body::Body;
use axum::http::{Request, StatusCode};
use cafeflow::db::init_db;
use cafeflow::{api, Notifier, Repository};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
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
    let app = api::create_router(api::AppState::new(repo, notifier));
    TestApp {
        app,
        _temp: temp_dir,
    }
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
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

#[tokio::test]
async fn test_health_and_ready() {
    let test_app = setup_test_app().await;
    let (status, body) = send(test_app.app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(test_app.app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_list_tables() {
    let test_app = setup_test_app().await;

    let (status, created) = send(
        test_app.app.clone(),
        "POST",
        "/v1/tables",
        Some(json!({"number": "A1", "capacity": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["number"], "A1");
    assert_eq!(created["status"], "AVAILABLE");

    let (status, body) = send(test_app.app, "GET", "/v1/tables", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_table_number_conflicts() {
    let test_app = setup_test_app().await;

    send(
        test_app.app.clone(),
        "POST",
        "/v1/tables",
        Some(json!({"number": "A1", "capacity": 4})),
    )
    .await;
    let (status, _) = send(
        test_app.app,
        "POST",
        "/v1/tables",
        Some(json!({"number": "A1", "capacity": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_seating_flow_and_session_listing() {
    let test_app = setup_test_app().await;

    let (_, table) = send(
        test_app.app.clone(),
        "POST",
        "/v1/tables",
        Some(json!({"number": "A1", "capacity": 4})),
    )
    .await;
    let table_id = table["id"].as_str().unwrap().to_string();

    let (status, session) = send(
        test_app.app.clone(),
        "POST",
        &format!("/v1/tables/{}/sessions", table_id),
        Some(json!({"customerName": "Asha", "customerPhone": "9876543210", "guestCount": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(session["token"].as_str().unwrap().starts_with("T-"));
    assert_eq!(session["isActive"], true);

    // Table shows occupied with its session attached.
    let (_, tables) = send(test_app.app.clone(), "GET", "/v1/tables", None).await;
    assert_eq!(tables[0]["status"], "OCCUPIED");
    assert_eq!(tables[0]["session"]["customerName"], "Asha");

    let (status, sessions) = send(test_app.app.clone(), "GET", "/v1/sessions/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sessions.as_array().unwrap().len(), 1);

    // Seating an occupied table conflicts.
    let (status, _) = send(
        test_app.app,
        "POST",
        &format!("/v1/tables/{}/sessions", table_id),
        Some(json!({"customerName": "Ravi", "guestCount": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_guest_count_over_capacity_is_rejected() {
    let test_app = setup_test_app().await;

    let (_, table) = send(
        test_app.app.clone(),
        "POST",
        "/v1/tables",
        Some(json!({"number": "A1", "capacity": 2})),
    )
    .await;
    let table_id = table["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        test_app.app,
        "POST",
        &format!("/v1/tables/{}/sessions", table_id),
        Some(json!({"customerName": "Asha", "guestCount": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
