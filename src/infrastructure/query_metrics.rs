use std::sync::Arc;
use std::time::Instant;

use crate::domain::metrics::{KeyValue, MetricsEmitter, DB_QUERIES, DB_QUERY_DURATION};

/// Records a count and a duration (milliseconds) for every store call,
/// tagged with the operation, the main table and whether it succeeded.
#[derive(Clone)]
pub struct QueryMetrics {
    metrics: Arc<dyn MetricsEmitter>,
}

impl QueryMetrics {
    pub fn new(metrics: Arc<dyn MetricsEmitter>) -> Self {
        Self { metrics }
    }

    pub fn time<T, E>(
        &self,
        operation: &'static str,
        table: &'static str,
        query: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let started = Instant::now();
        let result = query();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let attributes = [
            KeyValue::new("db.system", "postgresql"),
            KeyValue::new("db.operation", operation),
            KeyValue::new("db.sql.table", table),
            KeyValue::new("status", if result.is_ok() { "ok" } else { "error" }),
        ];
        self.metrics.add(DB_QUERIES, 1.0, &attributes);
        self.metrics.histogram(DB_QUERY_DURATION, elapsed_ms, &attributes);
        result
    }
}
