//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use balloon_boutique_core::order::OrderQuote;
use balloon_boutique_core::{
    DeliveryType, Email, OrderId, OrderStatus, PaymentMethod, Price, ProductId, SizeId,
};

/// A placed order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub email: Email,
    pub phone: String,
    pub status: OrderStatus,
    pub delivery_type: DeliveryType,
    /// Booked slot instant. Always set for delivery orders.
    pub delivery_at: Option<DateTime<Utc>>,
    pub delivery_address: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A priced line on a stored order.
///
/// Prices are copied at checkout time so later catalog or discount changes
/// don't alter past orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub size_id: Option<SizeId>,
    pub product_name: String,
    pub size_label: Option<String>,
    pub quantity: u32,
    pub original_unit_price: Price,
    pub unit_price: Price,
    pub discount_percent: Option<Decimal>,
    pub line_total: Price,
}

/// Everything needed to insert an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub email: Email,
    pub phone: String,
    pub delivery_type: DeliveryType,
    pub delivery_at: Option<DateTime<Utc>>,
    pub delivery_address: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub quote: OrderQuote,
}

