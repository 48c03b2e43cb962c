use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

pub const UNKNOWN_CATEGORY: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub category: String,
    pub sku: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Category label used for metrics; blank categories become `unknown`.
    pub fn category_label(&self) -> &str {
        category_label(&self.category)
    }
}

pub fn category_label(category: &str) -> &str {
    if category.trim().is_empty() {
        UNKNOWN_CATEGORY
    } else {
        category
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
