//! Integration tests for the booking flow: quoting, order creation,
//! overlap rejection and per-user order visibility.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;
use vastra::config::Config;
use vastra::db::{ItemInput, Store};
use vastra::entities::{otp_requests, users};

async fn spawn_app() -> (Arc<vastra::api::AppState>, Router) {
    let db_path =
        std::env::temp_dir().join(format!("vastra-booking-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
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

    let code = otp_requests::Entity::find()
        .filter(otp_requests::Column::Email.eq(email))
        .order_by_desc(otp_requests::Column::Id)
        .one(&store.conn)
        .await
        .unwrap()
        .expect("no OTP issued for address")
        .code;

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

/// Seeds one category and one item directly; the tests exercise booking,
/// not catalog administration.
async fn seed_item(store: &Store, daily_rate: Decimal, deposit: Decimal) -> i32 {
    let category = store
        .create_category("Sarees", "sarees", None, None)
        .await
        .unwrap();
    store
        .create_item(ItemInput {
            category_id: category.id,
            name: "Banarasi Saree".to_string(),
            description: None,
            sizes: r#"["M","L"]"#.to_string(),
            daily_rate,
            security_deposit: deposit,
            available: true,
        })
        .await
        .unwrap()
        .id
}

fn order_body(item_id: i32, start: &str, end: &str, size: &str, quantity: i32) -> serde_json::Value {
    serde_json::json!({
        "start_date": start,
        "end_date": end,
        "items": [{ "item_id": item_id, "size": size, "quantity": quantity }]
    })
}

fn as_decimal(value: &serde_json::Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("monetary field should be a string")).unwrap()
}

#[tokio::test]
async fn quote_and_create_follow_the_pricing_law() {
    let (state, app) = spawn_app().await;
    let item_id = seed_item(state.store(), dec!(100), dec!(50)).await;
    let token = login(&app, state.store(), "renter@example.com").await;

    // Three inclusive days at 100/day, quantity two.
    let response = request(
        &app,
        "POST",
        "/api/orders/quote",
        Some(&token),
        Some(order_body(item_id, "2026-01-01", "2026-01-03", "M", 2)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["rental_days"], 3);
    assert_eq!(as_decimal(&body["data"]["total"]), dec!(600));
    assert_eq!(as_decimal(&body["data"]["deposit_total"]), dec!(100));

    // Quoting persists nothing.
    let response = request(&app, "GET", "/api/orders", Some(&token), None).await;
    assert_eq!(json_body(response).await["data"].as_array().unwrap().len(), 0);

    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(order_body(item_id, "2026-01-01", "2026-01-03", "M", 2)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let order_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["shipment_phase"], "not_created");
    assert_eq!(as_decimal(&body["data"]["total_price"]), dec!(600));
    assert_eq!(body["data"]["rental_days"], 3);

    let response = request(
        &app,
        "GET",
        &format!("/api/orders/{order_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn same_day_rental_costs_one_day() {
    let (state, app) = spawn_app().await;
    let item_id = seed_item(state.store(), dec!(250), dec!(0)).await;
    let token = login(&app, state.store(), "renter@example.com").await;

    let response = request(
        &app,
        "POST",
        "/api/orders/quote",
        Some(&token),
        Some(order_body(item_id, "2026-01-05", "2026-01-05", "L", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["rental_days"], 1);
    assert_eq!(as_decimal(&body["data"]["total"]), dec!(250));
}

#[tokio::test]
async fn overlapping_booking_is_rejected_sharing_an_endpoint_counts() {
    let (state, app) = spawn_app().await;
    let item_id = seed_item(state.store(), dec!(100), dec!(50)).await;
    let token = login(&app, state.store(), "renter@example.com").await;

    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(order_body(item_id, "2026-01-01", "2026-01-03", "M", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Overlaps the existing window, and a different size does not help;
    // the garment itself is out.
    let other = login(&app, state.store(), "other@example.com").await;
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&other),
        Some(order_body(item_id, "2026-01-02", "2026-01-04", "L", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Starting the day after the return is free.
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&other),
        Some(order_body(item_id, "2026-01-04", "2026-01-05", "L", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn booking_rejects_bad_drafts_with_field_errors() {
    let (state, app) = spawn_app().await;
    let item_id = seed_item(state.store(), dec!(100), dec!(50)).await;
    let token = login(&app, state.store(), "renter@example.com").await;

    // Size outside the item's set.
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(order_body(item_id, "2026-01-01", "2026-01-03", "XXL", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("XXL"));

    // Inverted date range.
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(order_body(item_id, "2026-01-03", "2026-01-01", "M", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Zero quantity.
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(order_body(item_id, "2026-01-01", "2026-01-03", "M", 0)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Empty line list.
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(serde_json::json!({
            "start_date": "2026-01-01",
            "end_date": "2026-01-03",
            "items": []
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown item.
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(order_body(999_999, "2026-01-01", "2026-01-03", "M", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() {
    let (state, app) = spawn_app().await;
    let item_id = seed_item(state.store(), dec!(100), dec!(50)).await;

    let owner = login(&app, state.store(), "owner@example.com").await;
    let response = request(
        &app,
        "POST",
        "/api/orders",
        Some(&owner),
        Some(order_body(item_id, "2026-01-01", "2026-01-03", "M", 1)),
    )
    .await;
    let order_id = json_body(response).await["data"]["id"].as_i64().unwrap();

    // A stranger sees neither the list entry nor the order itself.
    let stranger = login(&app, state.store(), "stranger@example.com").await;
    let response = request(&app, "GET", "/api/orders", Some(&stranger), None).await;
    assert_eq!(json_body(response).await["data"].as_array().unwrap().len(), 0);

    let response = request(
        &app,
        "GET",
        &format!("/api/orders/{order_id}"),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Administrators see every order.
    promote_to_admin(state.store(), "staff@example.com").await;
    let admin = login(&app, state.store(), "staff@example.com").await;
    let response = request(&app, "GET", "/api/orders", Some(&admin), None).await;
    assert_eq!(json_body(response).await["data"].as_array().unwrap().len(), 1);

    let response = request(
        &app,
        "GET",
        &format!("/api/orders/{order_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
