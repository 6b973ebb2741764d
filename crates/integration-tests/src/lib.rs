//! Integration tests for Balloon Boutique.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! task db:start
//! cargo run -p balloon-boutique-cli -- migrate
//!
//! # Start the storefront with a known admin token
//! STOREFRONT_ADMIN_TOKEN=... cargo run -p balloon-boutique-storefront
//!
//! # Run integration tests
//! cargo test -p balloon-boutique-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Storefront URL (default `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - Same database the storefront uses, for seeding
//! - `STOREFRONT_ADMIN_TOKEN` - Bearer token for `/api/admin`
//!
//! Tests seed their own catalog rows with unique slugs and book slots on a
//! far-future day picked per test, so they can run against a shared database.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use chrono::{NaiveDate, TimeDelta, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Shared handles for a test run against a live storefront.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub admin_token: String,
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to the storefront database and build an HTTP client.
    pub async fn new() -> Self {
        let _ = dotenvy::dotenv();

        let base_url = std::env::var("STOREFRONT_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let admin_token =
            std::env::var("STOREFRONT_ADMIN_TOKEN").expect("STOREFRONT_ADMIN_TOKEN must be set");
        let database_url = std::env::var("STOREFRONT_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("STOREFRONT_DATABASE_URL must be set");

        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to storefront database");

        Self {
            client: Client::new(),
            base_url,
            admin_token,
            pool,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a path and decode the JSON body.
    pub async fn get_json(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("request failed");
        let status = resp.status();
        (status, resp.json().await.expect("body is not JSON"))
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json(&self, path: &str, body: &Value) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("request failed");
        let status = resp.status();
        (status, resp.json().await.expect("body is not JSON"))
    }

    /// POST to an admin endpoint with the bearer token.
    pub async fn admin_post(&self, path: &str, body: &Value) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.admin_token)
            .json(body)
            .send()
            .await
            .expect("request failed");
        let status = resp.status();
        (status, resp.json().await.expect("body is not JSON"))
    }

    /// Insert a category group and one category inside it.
    pub async fn seed_taxonomy(&self) -> SeededTaxonomy {
        let tag = unique_tag();
        let group_id: i64 = sqlx::query_scalar(
            "INSERT INTO category_group (slug, name) VALUES ($1, $2) RETURNING id",
        )
        .bind(format!("group-{tag}"))
        .bind(format!("Group {tag}"))
        .fetch_one(&self.pool)
        .await
        .expect("insert category_group");

        let category_id: i64 = sqlx::query_scalar(
            "INSERT INTO category (group_id, slug, name) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(group_id)
        .bind(format!("category-{tag}"))
        .bind(format!("Category {tag}"))
        .fetch_one(&self.pool)
        .await
        .expect("insert category");

        SeededTaxonomy {
            group_id,
            category_id,
        }
    }

    /// Insert an active product without sizes.
    pub async fn seed_product(
        &self,
        price: Decimal,
        stock: i32,
        taxonomy: Option<&SeededTaxonomy>,
    ) -> i64 {
        let tag = unique_tag();
        let product_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO product (slug, name, price, stock, group_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(format!("balloon-{tag}"))
        .bind(format!("Balloon {tag}"))
        .bind(price)
        .bind(stock)
        .bind(taxonomy.map(|t| t.group_id))
        .fetch_one(&self.pool)
        .await
        .expect("insert product");

        if let Some(t) = taxonomy {
            sqlx::query("INSERT INTO product_category (product_id, category_id) VALUES ($1, $2)")
                .bind(product_id)
                .bind(t.category_id)
                .execute(&self.pool)
                .await
                .expect("insert product_category");
        }

        product_id
    }

    /// Current stock of a product.
    pub async fn stock_of(&self, product_id: i64) -> i32 {
        sqlx::query_scalar("SELECT stock FROM product WHERE id = $1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .expect("select stock")
    }
}

/// Ids of a seeded category group and category.
#[derive(Debug, Clone, Copy)]
pub struct SeededTaxonomy {
    pub group_id: i64,
    pub category_id: i64,
}

/// Short random tag for unique slugs.
#[must_use]
pub fn unique_tag() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A far-future store date unlikely to be shared with another test run.
#[must_use]
pub fn unique_future_date() -> String {
    let offset = 365 + (Uuid::new_v4().as_u128() % 20_000);
    let days = i64::try_from(offset).expect("offset fits in i64");
    let day: NaiveDate = (Utc::now() + TimeDelta::days(days)).date_naive();
    day.format("%Y-%m-%d").to_string()
}

/// Checkout body for a delivery order of one product line.
#[must_use]
pub fn delivery_checkout(product_id: i64, quantity: u32, delivery_at: &str) -> Value {
    serde_json::json!({
        "customer_name": "Ana Test",
        "email": "ana@example.md",
        "phone": "+37360000000",
        "delivery_type": "delivery",
        "delivery_at": delivery_at,
        "delivery_address": "Str. Test 1, Chisinau",
        "payment_method": "cash",
        "items": [{ "product_id": product_id, "size_id": null, "quantity": quantity }]
    })
}

/// Decimal out of a JSON string or number field.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
