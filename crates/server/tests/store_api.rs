//! Storefront API tests: browsing, checkout and confirmation.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{recent_recording, TestFixture};
use mediastore_core::NotificationKind;

/// Sync one recent recording and return its catalog id.
async fn synced_recording(fixture: &TestFixture) -> i64 {
    fixture.add_recording(&recent_recording(2)).await;
    let report = fixture.sync().await;
    assert_eq!(report["added"], 1);

    let date = (Utc::now().date_naive() - Duration::days(2)).to_string();
    let response = fixture
        .get(&format!("/api/v1/store/recordings?date={}", date))
        .await;
    assert_status!(response, StatusCode::OK);
    response.body["recordings"][0]["id"].as_i64().unwrap()
}

async fn start_checkout(fixture: &TestFixture, catalog_id: i64) -> Value {
    let response = fixture
        .post("/api/v1/purchases", json!({ "catalog_id": catalog_id }))
        .await;
    assert_status!(response, StatusCode::CREATED);
    response.body
}

#[tokio::test]
async fn test_synced_recording_is_listed_with_price() {
    let fixture = TestFixture::new().await;
    fixture.add_recording(&recent_recording(2)).await;
    fixture.sync().await;

    let date = (Utc::now().date_naive() - Duration::days(2)).to_string();

    let response = fixture.get("/api/v1/store/dates").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["dates"], json!([date]));

    let response = fixture
        .get(&format!("/api/v1/store/recordings?date={}", date))
        .await;
    assert_status!(response, StatusCode::OK);
    let recording = &response.body["recordings"][0];
    assert_json_path!(recording, "duration_minutes", json!(90));
    assert_json_path!(recording, "price_minor", json!(50_000));
    assert_json_path!(recording, "price_display", json!("500.00 HKD"));
    assert_json_path!(recording, "available_days", json!(28));
    assert_json_path!(recording, "size", json!("100 MB"));

    // Internal fields stay private
    assert!(recording.get("full_path").is_none());
    assert!(recording.get("test_payment").is_none());

    let id = recording["id"].as_i64().unwrap();
    let response = fixture.get(&format!("/api/v1/store/recordings/{}", id)).await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "id", json!(id));
}

#[tokio::test]
async fn test_empty_store() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/store/dates").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["dates"], json!([]));

    let response = fixture.get("/api/v1/store/recordings?date=2024-03-01").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["recordings"], json!([]));

    let response = fixture.get("/api/v1/store/recordings/999").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_date_query_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/store/recordings?date=yesterday").await;
    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn test_purchase_and_confirm() {
    let fixture = TestFixture::new().await;
    let id = synced_recording(&fixture).await;

    let checkout = start_checkout(&fixture, id).await;
    let session_id = checkout["session_id"].as_str().unwrap().to_string();
    assert!(checkout["checkout_url"]
        .as_str()
        .unwrap()
        .starts_with("https://checkout.example.com/pay/"));

    // Not paid yet
    let confirm_path = format!("/api/v1/purchases/confirm?session_id={}", session_id);
    let response = fixture.get(&confirm_path).await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "result", json!("not_paid"));
    assert_json_path!(response.body, "payment_status", json!("unpaid"));
    assert!(fixture.remote.shares().await.is_empty());

    fixture
        .payments
        .mark_paid(&session_id, "Ada", "ada@example.com")
        .await;

    let response = fixture.get(&confirm_path).await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "result", json!("paid"));
    assert_json_path!(response.body, "duplicate", json!(false));
    let share_link = response.body["share_link"].clone();
    assert!(share_link.as_str().unwrap().starts_with("https://cloud.example.com/s/"));

    let expected_expiry = (Utc::now().date_naive() + Duration::days(30)).to_string();
    assert_json_path!(response.body, "share_expiry", json!(expected_expiry));

    let buyer = fixture
        .notifier
        .sent_of_kind(NotificationKind::PurchaseConfirmationBuyer)
        .await;
    assert_eq!(buyer.len(), 1);
    assert_eq!(
        fixture
            .notifier
            .sent_of_kind(NotificationKind::PurchaseConfirmationAdmin)
            .await
            .len(),
        1
    );

    // Coming back again returns the same link without a new share
    let response = fixture.get(&confirm_path).await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "duplicate", json!(true));
    assert_eq!(response.body["share_link"], share_link);
    assert_eq!(fixture.remote.shares().await.len(), 1);
    assert_eq!(
        fixture
            .notifier
            .sent_of_kind(NotificationKind::PurchaseConfirmationBuyer)
            .await
            .len(),
        1
    );
}

#[tokio::test]
async fn test_two_checkouts_share_one_product() {
    let fixture = TestFixture::new().await;
    let id = synced_recording(&fixture).await;

    let first = start_checkout(&fixture, id).await;
    let second = start_checkout(&fixture, id).await;

    assert_ne!(first["session_id"], second["session_id"]);
    assert_eq!(fixture.payments.products().await.len(), 1);
    assert_eq!(fixture.payments.prices().await.len(), 1);
}

#[tokio::test]
async fn test_honeypot_rejects_purchase() {
    let fixture = TestFixture::new().await;
    let id = synced_recording(&fixture).await;

    let response = fixture
        .post(
            "/api/v1/purchases",
            json!({ "catalog_id": id, "special_field": "http://spam.example" }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(fixture.payments.sessions().await.is_empty());

    // Whitespace counts as empty
    let response = fixture
        .post(
            "/api/v1/purchases",
            json!({ "catalog_id": id, "special_field": "  " }),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);
}

#[tokio::test]
async fn test_purchase_unknown_recording() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/purchases", json!({ "catalog_id": 42 }))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vanished_recording_leaves_the_store() {
    let fixture = TestFixture::new().await;
    let id = synced_recording(&fixture).await;

    fixture.remote.set_files(vec![]).await;
    let report = fixture.sync().await;
    assert_eq!(report["removed"], 1);

    let response = fixture.get(&format!("/api/v1/store/recordings/{}", id)).await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture
        .post("/api/v1/purchases", json!({ "catalog_id": id }))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.get("/api/v1/store/dates").await;
    assert_eq!(response.body["dates"], json!([]));
}

#[tokio::test]
async fn test_confirm_requires_known_session() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/purchases/confirm?session_id=").await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture
        .get("/api/v1/purchases/confirm?session_id=cs_test_unknown")
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_processor_failure_shows_generic_error() {
    let fixture = TestFixture::new().await;
    let id = synced_recording(&fixture).await;

    fixture
        .payments
        .set_next_error(mediastore_core::PaymentError::Transport(
            "connection reset".to_string(),
        ))
        .await;

    let response = fixture
        .post("/api/v1/purchases", json!({ "catalog_id": id }))
        .await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    let message = response.body["error"].as_str().unwrap();
    assert!(!message.contains("connection reset"));
}
