//! The metrics port: named counters, gauges and histograms with string
//! attributes. Export pipelines live behind this trait.

use std::fmt;

pub const ORDERS_CREATED: &str = "orders_created_total";
pub const REVENUE: &str = "revenue_total";
pub const PRODUCTS_VIEWED: &str = "products_viewed_total";
pub const CACHE_HITS: &str = "cache_hits_total";
pub const CACHE_MISSES: &str = "cache_misses_total";
pub const CART_ITEMS_COUNT: &str = "cart_items_count";
pub const ACTIVE_CARTS_COUNT: &str = "active_carts_count";
pub const ACTIVE_USERS_COUNT: &str = "active_users_count";
pub const INVENTORY_LEVEL: &str = "inventory_level";
pub const HTTP_REQUESTS: &str = "http.server.request.count";
pub const HTTP_REQUEST_ERRORS: &str = "http.server.request.error.count";
pub const HTTP_REQUEST_DURATION: &str = "http.server.request.duration";
pub const DB_QUERIES: &str = "db.client.queries.count";
pub const DB_QUERY_DURATION: &str = "db.client.queries.duration";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: &'static str,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: &'static str, value: impl ToString) -> Self {
        Self {
            key,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

pub trait MetricsEmitter: Send + Sync + 'static {
    fn emit(&self, kind: MetricKind, name: &'static str, value: f64, attributes: &[KeyValue]);

    fn add(&self, name: &'static str, value: f64, attributes: &[KeyValue]) {
        self.emit(MetricKind::Counter, name, value, attributes);
    }

    fn gauge(&self, name: &'static str, value: f64, attributes: &[KeyValue]) {
        self.emit(MetricKind::Gauge, name, value, attributes);
    }

    fn histogram(&self, name: &'static str, value: f64, attributes: &[KeyValue]) {
        self.emit(MetricKind::Histogram, name, value, attributes);
    }
}
