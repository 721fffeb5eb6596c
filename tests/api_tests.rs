//! Integration tests for authentication and catalog endpoints.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tower::ServiceExt;
use vastra::config::Config;
use vastra::db::Store;
use vastra::entities::{otp_requests, users};

async fn spawn_app() -> (Arc<vastra::api::AppState>, Router) {
    let db_path =
        std::env::temp_dir().join(format!("vastra-api-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    // Nothing in these tests may leave the process; point every external
    // collaborator at a closed local port.
    config.razorpay.base_url = "http://127.0.0.1:9".to_string();
    config.shiprocket.base_url = "http://127.0.0.1:9".to_string();
    config.google.tokeninfo_url = "http://127.0.0.1:9/tokeninfo".to_string();

    let state = vastra::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");

    (state.clone(), vastra::api::router(state))
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn latest_otp_code(store: &Store, email: &str) -> String {
    otp_requests::Entity::find()
        .filter(otp_requests::Column::Email.eq(email))
        .order_by_desc(otp_requests::Column::Id)
        .one(&store.conn)
        .await
        .unwrap()
        .expect("no OTP issued for address")
        .code
}

async fn login(app: &Router, store: &Store, email: &str) -> String {
    let response = request(
        app,
        "POST",
        "/api/auth/send-otp",
        None,
        Some(serde_json::json!({ "email": email })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let code = latest_otp_code(store, email).await;

    let response = request(
        app,
        "POST",
        "/api/auth/verify-otp",
        None,
        Some(serde_json::json!({ "email": email, "otp": code })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    body["data"]["access_token"].as_str().unwrap().to_string()
}

async fn promote_to_admin(store: &Store, email: &str) {
    let user = store
        .get_user_by_email(email)
        .await
        .unwrap()
        .expect("user should exist before promotion");
    let mut active: users::ActiveModel = user.into();
    active.is_admin = Set(true);
    active.update(&store.conn).await.unwrap();
}

#[tokio::test]
async fn health_is_public_and_reports_database() {
    let (_, app) = spawn_app().await;

    let response = request(&app, "GET", "/api/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[axum::http::header::CONTENT_TYPE],
        mime::APPLICATION_JSON.as_ref()
    );

    let body = json_body(response).await;
    assert!(body["success"].as_bool().unwrap_or(false));
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "reachable");
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let (state, app) = spawn_app().await;

    let response = request(&app, "GET", "/api/items", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = request(&app, "GET", "/api/items", Some("not-a-token"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = login(&app, state.store(), "renter@example.com").await;
    let response = request(&app, "GET", "/api/items", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn otp_flow_rejects_wrong_code_and_refresh_mints_access() {
    let (state, app) = spawn_app().await;
    let email = "otp-flow@example.com";

    let response = request(
        &app,
        "POST",
        "/api/auth/send-otp",
        None,
        Some(serde_json::json!({ "email": email })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = request(
        &app,
        "POST",
        "/api/auth/verify-otp",
        None,
        Some(serde_json::json!({ "email": email, "otp": "000000" })),
    )
    .await;
    // The seeded code is random six digits; flip it if the draw collides.
    let real_code = latest_otp_code(state.store(), email).await;
    if real_code == "000000" {
        assert_eq!(response.status(), StatusCode::OK);
    } else {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = request(
        &app,
        "POST",
        "/api/auth/verify-otp",
        None,
        Some(serde_json::json!({ "email": email, "otp": real_code })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = request(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(serde_json::json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let response = request(&app, "GET", "/api/orders", Some(&access), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let (_, app) = spawn_app().await;

    let response = request(
        &app,
        "POST",
        "/api/auth/send-otp",
        None,
        Some(serde_json::json!({ "email": "not-an-email" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_writes_are_admin_only() {
    let (state, app) = spawn_app().await;

    let renter = login(&app, state.store(), "renter@example.com").await;
    let category = serde_json::json!({ "name": "Lehengas" });

    let response = request(
        &app,
        "POST",
        "/api/categories",
        Some(&renter),
        Some(category.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    promote_to_admin(state.store(), "staff@example.com").await;
    let admin = login(&app, state.store(), "staff@example.com").await;

    let response = request(&app, "POST", "/api/categories", Some(&admin), Some(category)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["slug"], "lehengas");

    // Same name again collides on the derived slug.
    let response = request(
        &app,
        "POST",
        "/api/categories",
        Some(&admin),
        Some(serde_json::json!({ "name": "Lehengas" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn category_cannot_become_its_own_ancestor() {
    let (state, app) = spawn_app().await;

    promote_to_admin(state.store(), "staff@example.com").await;
    let admin = login(&app, state.store(), "staff@example.com").await;

    let response = request(
        &app,
        "POST",
        "/api/categories",
        Some(&admin),
        Some(serde_json::json!({ "name": "Ethnic" })),
    )
    .await;
    let parent_id = json_body(response).await["data"]["id"].as_i64().unwrap();

    let response = request(
        &app,
        "POST",
        "/api/categories",
        Some(&admin),
        Some(serde_json::json!({ "name": "Sarees", "parent_id": parent_id })),
    )
    .await;
    let child_id = json_body(response).await["data"]["id"].as_i64().unwrap();

    let response = request(
        &app,
        "PUT",
        &format!("/api/categories/{parent_id}"),
        Some(&admin),
        Some(serde_json::json!({ "name": "Ethnic", "parent_id": parent_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = request(
        &app,
        "PUT",
        &format!("/api/categories/{parent_id}"),
        Some(&admin),
        Some(serde_json::json!({ "name": "Ethnic", "parent_id": child_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn item_lifecycle_with_size_set_and_images() {
    let (state, app) = spawn_app().await;

    promote_to_admin(state.store(), "staff@example.com").await;
    let admin = login(&app, state.store(), "staff@example.com").await;

    let response = request(
        &app,
        "POST",
        "/api/categories",
        Some(&admin),
        Some(serde_json::json!({ "name": "Sherwanis" })),
    )
    .await;
    let category_id = json_body(response).await["data"]["id"].as_i64().unwrap();

    // An item must offer at least one size.
    let response = request(
        &app,
        "POST",
        "/api/items",
        Some(&admin),
        Some(serde_json::json!({
            "category_id": category_id,
            "name": "Ivory Sherwani",
            "sizes": [],
            "daily_rate": "150.00",
            "security_deposit": "500.00"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = request(
        &app,
        "POST",
        "/api/items",
        Some(&admin),
        Some(serde_json::json!({
            "category_id": category_id,
            "name": "Ivory Sherwani",
            "sizes": ["M", "L", "XL"],
            "daily_rate": "150.00",
            "security_deposit": "500.00"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let item_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["sizes"], serde_json::json!(["M", "L", "XL"]));

    let response = request(
        &app,
        "POST",
        &format!("/api/items/{item_id}/images"),
        Some(&admin),
        Some(serde_json::json!({ "image_url": "https://cdn.example.com/sherwani-front.jpg" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let renter = login(&app, state.store(), "renter@example.com").await;
    let response = request(&app, "GET", &format!("/api/items/{item_id}"), Some(&renter), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 1);

    // Category with items refuses deletion.
    let response = request(
        &app,
        "DELETE",
        &format!("/api/categories/{category_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = request(&app, "DELETE", &format!("/api/items/{item_id}"), Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = request(
        &app,
        "DELETE",
        &format!("/api/categories/{category_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
