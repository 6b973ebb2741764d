//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Database readiness check
//!
//! # Catalog
//! GET  /api/products                        - Filtered catalog
//! GET  /api/products/{id}                   - Product with effective price
//!
//! # Delivery
//! GET  /api/delivery/slots?date=YYYY-MM-DD  - Slots with availability
//! POST /api/delivery/validate               - Check a selected slot
//!
//! # Orders
//! POST /api/checkout                        - Place an order
//! GET  /api/orders/{id}?email=              - Order lookup
//!
//! # Admin (bearer token)
//! POST /api/admin/orders/{id}/status        - Status transition
//! POST /api/admin/orders/{id}/reschedule    - Move delivery slot
//! GET  /api/admin/discounts                 - List discounts
//! POST /api/admin/discounts                 - Create discount
//! ```

pub mod admin;
pub mod checkout;
pub mod delivery;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the delivery routes router.
pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/slots", get(delivery::slots))
        .route("/validate", post(delivery::validate))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}/status", post(admin::change_status))
        .route("/orders/{id}/reschedule", post(admin::reschedule))
        .route(
            "/discounts",
            get(admin::list_discounts).post(admin::create_discount),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/products", product_routes())
        .nest("/api/delivery", delivery_routes())
        .route("/api/checkout", post(checkout::create))
        .route("/api/orders/{id}", get(orders::show))
        .nest("/api/admin", admin_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::{
        body::Body,
        http::{Request, header},
        response::Response,
    };
    use balloon_boutique_core::delivery::DeliveryConfig;
    use balloon_boutique_core::order::DeliveryFee;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    const ADMIN_TOKEN: &str = "k3P9xQ2vL8mZ4tR7wY1bN6cF0hJ5sD2g";

    /// State whose pool never connects; only routes that reject before
    /// touching the database can be exercised.
    fn app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost:1/unused"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            admin_token: SecretString::from(ADMIN_TOKEN),
            delivery: DeliveryConfig::default(),
            delivery_fee: DeliveryFee::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/unused")
            .unwrap();
        routes().with_state(AppState::new(config, pool))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_date_returns_empty_slots() {
        let response = app()
            .oneshot(
                Request::get("/api/delivery/slots?date=2025-6-10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["date"], "2025-6-10");
        assert_eq!(body["timezone"], "Europe/Chisinau");
        assert_eq!(body["window_start"], "16:00");
        assert_eq!(body["window_end"], "21:00");
        assert_eq!(body["slots"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_validate_rejects_unparseable_time() {
        let response = app()
            .oneshot(post_json(
                "/api/delivery/validate",
                &serde_json::json!({ "delivery_at": "tomorrow at six" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid delivery time: tomorrow at six");
    }

    #[tokio::test]
    async fn test_checkout_rejects_bad_email_before_database() {
        let response = app()
            .oneshot(post_json(
                "/api/checkout",
                &serde_json::json!({
                    "customer_name": "Ana",
                    "email": "not-an-email",
                    "phone": "+37360000000",
                    "delivery_type": "pickup",
                    "payment_method": "cash",
                    "items": [{ "product_id": 1, "size_id": null, "quantity": 1 }]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_rejects_delivery_without_address() {
        let response = app()
            .oneshot(post_json(
                "/api/checkout",
                &serde_json::json!({
                    "customer_name": "Ana",
                    "email": "ana@example.md",
                    "phone": "+37360000000",
                    "delivery_type": "delivery",
                    "delivery_at": "2025-06-10T15:00:00.000Z",
                    "payment_method": "card",
                    "items": [{ "product_id": 1, "size_id": null, "quantity": 1 }]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "delivery orders need an address");
    }

    #[tokio::test]
    async fn test_admin_requires_token() {
        let missing = app()
            .oneshot(
                Request::get("/api/admin/discounts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app()
            .oneshot(
                Request::get("/api/admin/discounts")
                    .header(header::AUTHORIZATION, "Bearer not-the-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_create_discount_validates_terms() {
        let request = Request::post("/api/admin/discounts")
            .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({
                    "name": "Too generous",
                    "scope": "product",
                    "target_id": 1,
                    "percentage": "150"
                })
                .to_string(),
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_non_numeric_product_id_is_bad_request() {
        let response = app()
            .oneshot(
                Request::get("/api/products/heart-balloon")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
