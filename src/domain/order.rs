use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use super::status::OrderStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Values for a fresh order row; status always starts out `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub payment_method: String,
    pub total_amount: BigDecimal,
    pub currency: String,
}

/// An order line joined with its product's category, used for metrics.
#[derive(Debug, Clone)]
pub struct CategorizedLine {
    pub product_id: i64,
    pub quantity: i32,
    pub price: BigDecimal,
    pub category: String,
}
