//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use balloon_boutique_core::discount::Discount;

use crate::config::StorefrontConfig;
use crate::db::{DiscountRepository, RepositoryError};
use crate::services::OrderService;

const DISCOUNTS_KEY: &str = "enabled";

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    discounts: Cache<&'static str, Arc<[Discount]>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let discounts = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                discounts,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Order service bound to this state's pool and delivery rules.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        let config = self.config();
        OrderService::new(self.pool(), &config.delivery, config.delivery_fee)
    }

    /// Enabled discounts, cached for a minute.
    ///
    /// Time windows are checked by the caller, so a cached list never
    /// applies a discount outside its window.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the discounts cannot be loaded.
    pub async fn active_discounts(&self) -> Result<Arc<[Discount]>, RepositoryError> {
        if let Some(discounts) = self.inner.discounts.get(DISCOUNTS_KEY).await {
            debug!("Cache hit for discounts");
            return Ok(discounts);
        }

        let discounts: Arc<[Discount]> = DiscountRepository::new(self.pool())
            .list_enabled()
            .await?
            .into();
        self.inner
            .discounts
            .insert(DISCOUNTS_KEY, Arc::clone(&discounts))
            .await;
        Ok(discounts)
    }

    /// Drop cached discounts after an admin change.
    pub async fn invalidate_discounts(&self) {
        self.inner.discounts.invalidate_all();
        self.inner.discounts.run_pending_tasks().await;
    }
}
