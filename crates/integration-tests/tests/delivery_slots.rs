//! Integration tests for the delivery slot endpoints.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (task db:start, bb-cli migrate)
//! - The storefront running with the default delivery schedule
//!   (Europe/Chisinau, 16:00-21:00, 30 minute slots, 90 minute buffer)
//!
//! Run with: cargo test -p balloon-boutique-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use balloon_boutique_core::delivery::DeliveryConfig;
use balloon_boutique_integration_tests::{
    TestContext, delivery_checkout, unique_future_date,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

/// ISO instant of the slot starting at `label` on `date`.
fn slot_iso(date: &str, label: &str) -> String {
    DeliveryConfig::default()
        .build_slots_for_date(date)
        .into_iter()
        .find(|s| s.label == label)
        .map(|s| s.iso())
        .expect("label is inside the delivery window")
}

fn availability(body: &Value) -> Vec<(String, bool)> {
    body["slots"]
        .as_array()
        .expect("slots array")
        .iter()
        .map(|s| {
            (
                s["label"].as_str().unwrap().to_string(),
                s["available"].as_bool().unwrap(),
            )
        })
        .collect()
}

// ============================================================================
// Slot listing
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_future_day_lists_whole_window() {
    let ctx = TestContext::new().await;
    let date = unique_future_date();

    let (status, body) = ctx
        .get_json(&format!("/api/delivery/slots?date={date}"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timezone"], "Europe/Chisinau");

    let slots = availability(&body);
    assert_eq!(slots.len(), 10);
    assert_eq!(slots[0].0, "16:00");
    assert_eq!(slots[9].0, "20:30");
    assert!(slots.iter().all(|(_, available)| *available));
    assert_eq!(body["slots"][0]["iso"], slot_iso(&date, "16:00"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_malformed_date_is_empty_not_error() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.get_json("/api/delivery/slots?date=31.12.2030").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_booking_blocks_slots_within_buffer() {
    let ctx = TestContext::new().await;
    let date = unique_future_date();
    let product_id = ctx.seed_product(Decimal::from(50), 10, None).await;

    let (status, _) = ctx
        .post_json(
            "/api/checkout",
            &delivery_checkout(product_id, 1, &slot_iso(&date, "18:00")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = ctx
        .get_json(&format!("/api/delivery/slots?date={date}"))
        .await;
    let slots = availability(&body);

    let taken: Vec<&str> = slots
        .iter()
        .filter(|(_, available)| !available)
        .map(|(label, _)| label.as_str())
        .collect();
    // Exactly 90 minutes away is still bookable
    assert_eq!(taken, ["17:00", "17:30", "18:00", "18:30", "19:00"]);
}

// ============================================================================
// Slot validation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_validate_accepts_free_slot() {
    let ctx = TestContext::new().await;
    let date = unique_future_date();
    let iso = slot_iso(&date, "16:30");

    let (status, body) = ctx
        .post_json("/api/delivery/validate", &json!({ "delivery_at": iso }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "16:30");
    assert_eq!(body["iso"], iso);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_validate_rejects_off_grid_and_taken_times() {
    let ctx = TestContext::new().await;
    let date = unique_future_date();
    let product_id = ctx.seed_product(Decimal::from(50), 10, None).await;

    // 16:10 local is inside the window but not a slot start
    let off_grid = chrono::DateTime::parse_from_rfc3339(&slot_iso(&date, "16:00"))
        .unwrap()
        .checked_add_signed(chrono::TimeDelta::minutes(10))
        .unwrap()
        .to_rfc3339();
    let (status, _) = ctx
        .post_json("/api/delivery/validate", &json!({ "delivery_at": off_grid }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .post_json(
            "/api/checkout",
            &delivery_checkout(product_id, 1, &slot_iso(&date, "20:00")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .post_json(
            "/api/delivery/validate",
            &json!({ "delivery_at": slot_iso(&date, "20:30") }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("20:30"));
}
