//! Order repository.
//!
//! Reads go through the pool. Everything that books or frees a delivery slot
//! takes a `&mut PgConnection` so the caller can run it inside one
//! transaction together with [`OrderRepository::lock_schedule`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};

use balloon_boutique_core::delivery::Booking;
use balloon_boutique_core::{
    DeliveryType, Email, OrderId, OrderStatus, PaymentMethod, Price, ProductId, SizeId,
};

use super::{RepositoryError, non_negative, to_integer};
use crate::models::{NewOrder, Order, OrderItem};

/// Advisory lock key shared by every transaction that books a slot.
const SCHEDULE_LOCK_KEY: i64 = 0x0B41_100B;

const ORDER_COLUMNS: &str = "id, customer_name, email, phone, status, delivery_type, \
     delivery_at, delivery_address, payment_method, notes, subtotal, delivery_fee, total, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_name: String,
    email: Email,
    phone: String,
    status: OrderStatus,
    delivery_type: DeliveryType,
    delivery_at: Option<DateTime<Utc>>,
    delivery_address: Option<String>,
    payment_method: PaymentMethod,
    notes: Option<String>,
    subtotal: Price,
    delivery_fee: Price,
    total: Price,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            customer_name: self.customer_name,
            email: self.email,
            phone: self.phone,
            status: self.status,
            delivery_type: self.delivery_type,
            delivery_at: self.delivery_at,
            delivery_address: self.delivery_address,
            payment_method: self.payment_method,
            notes: self.notes,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_id: ProductId,
    size_id: Option<SizeId>,
    product_name: String,
    size_label: Option<String>,
    quantity: i32,
    original_unit_price: Price,
    unit_price: Price,
    discount_percent: Option<Decimal>,
    line_total: Price,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            size_id: row.size_id,
            product_name: row.product_name,
            size_label: row.size_label,
            quantity: non_negative("order item quantity", row.quantity)?,
            original_unit_price: row.original_unit_price,
            unit_price: row.unit_price,
            discount_percent: row.discount_percent,
            line_total: row.line_total,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: OrderId,
    delivery_at: DateTime<Utc>,
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = fetch_order_row(self.pool, id, false).await? else {
            return Ok(None);
        };
        let items = fetch_items(self.pool, id).await?;
        Ok(Some(row.into_order(items)))
    }

    /// Slot bookings with an instant in `[from, to]`.
    ///
    /// Only delivery orders that still hold their slot are returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bookings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        fetch_bookings(self.pool, from, to).await
    }

    /// Serialize slot booking until the surrounding transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the lock query fails.
    pub async fn lock_schedule(conn: &mut PgConnection) -> Result<(), RepositoryError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEDULE_LOCK_KEY)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// [`OrderRepository::bookings_between`] inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bookings_between_tx(
        conn: &mut PgConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        fetch_bookings(&mut *conn, from, to).await
    }

    /// Load an order and lock its row for update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_update(
        conn: &mut PgConnection,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = fetch_order_row(&mut *conn, id, true).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut *conn, id).await?;
        Ok(Some(row.into_order(items)))
    }

    /// Insert an order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO customer_order (
                customer_name, email, phone, status, delivery_type, delivery_at,
                delivery_address, payment_method, notes, subtotal, delivery_fee, total
            )
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&order.customer_name)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(order.delivery_type)
        .bind(order.delivery_at)
        .bind(order.delivery_address.as_deref())
        .bind(order.payment_method)
        .bind(order.notes.as_deref())
        .bind(order.quote.subtotal)
        .bind(order.quote.delivery_fee)
        .bind(order.quote.total)
        .fetch_one(&mut *conn)
        .await?;

        let mut items = Vec::with_capacity(order.quote.lines.len());
        for line in &order.quote.lines {
            let quantity = to_integer("quantity", line.quantity)?;
            sqlx::query(
                r"
                INSERT INTO order_item (
                    order_id, product_id, size_id, product_name, size_label, quantity,
                    original_unit_price, unit_price, discount_percent, line_total
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(row.id)
            .bind(line.product_id)
            .bind(line.size_id)
            .bind(&line.product_name)
            .bind(line.size_label.as_deref())
            .bind(quantity)
            .bind(line.original_unit_price)
            .bind(line.unit_price)
            .bind(line.discount_percent)
            .bind(line.line_total)
            .execute(&mut *conn)
            .await?;

            items.push(OrderItem {
                product_id: line.product_id,
                size_id: line.size_id,
                product_name: line.product_name.clone(),
                size_label: line.size_label.clone(),
                quantity: line.quantity,
                original_unit_price: line.original_unit_price,
                unit_price: line.unit_price,
                discount_percent: line.discount_percent,
                line_total: line.line_total,
            });
        }

        Ok(row.into_order(items))
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE customer_order SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Move an order to a new delivery instant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_delivery_at(
        conn: &mut PgConnection,
        id: OrderId,
        delivery_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE customer_order SET delivery_at = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(delivery_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn fetch_order_row<'e, E: PgExecutor<'e>>(
    executor: E,
    id: OrderId,
    for_update: bool,
) -> Result<Option<OrderRow>, RepositoryError> {
    let lock = if for_update { "FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = $1 {lock}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

async fn fetch_items<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT product_id, size_id, product_name, size_label, quantity,
               original_unit_price, unit_price, discount_percent, line_total
        FROM order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(OrderItem::try_from).collect()
}

async fn fetch_bookings<'e, E: PgExecutor<'e>>(
    executor: E,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Booking>, RepositoryError> {
    let rows = sqlx::query_as::<_, BookingRow>(
        r"
        SELECT id, delivery_at
        FROM customer_order
        WHERE delivery_type = 'delivery'
          AND status <> 'canceled'
          AND delivery_at IS NOT NULL
          AND delivery_at BETWEEN $1 AND $2
        ORDER BY delivery_at
        ",
    )
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Booking {
            order_id: r.id,
            delivery_at: r.delivery_at,
        })
        .collect())
}
