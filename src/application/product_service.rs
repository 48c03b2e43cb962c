use std::sync::Arc;

use crate::domain::catalog::{Inventory, Product};
use crate::domain::errors::{DomainError, Entity};
use crate::domain::metrics::{
    KeyValue, MetricsEmitter, CACHE_HITS, CACHE_MISSES, INVENTORY_LEVEL, PRODUCTS_VIEWED,
};
use crate::domain::ports::ProductRepository;

use super::product_cache::ProductCache;

pub const DEFAULT_WAREHOUSE: &str = "WH-001";
pub const MAX_PAGE_SIZE: i64 = 100;

pub struct ProductService<R> {
    repo: R,
    cache: ProductCache,
    metrics: Arc<dyn MetricsEmitter>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repo: R, cache: ProductCache, metrics: Arc<dyn MetricsEmitter>) -> Self {
        Self {
            repo,
            cache,
            metrics,
        }
    }

    /// Looks the product up in the cache, falling back to the store on a miss
    /// and populating the cache with what it loaded.
    pub fn get_product(&self, id: i64) -> Result<Product, DomainError> {
        let product = match self.cache.get(id) {
            Some(product) => {
                log::debug!("product cache hit: product_id={id}");
                self.metrics.add(CACHE_HITS, 1.0, &[]);
                product
            }
            None => {
                log::debug!("product cache miss: product_id={id}");
                self.metrics.add(CACHE_MISSES, 1.0, &[]);
                let product = self
                    .repo
                    .find_by_id(id)?
                    .ok_or(DomainError::NotFound(Entity::Product))?;
                self.cache.put(id, product.clone());
                product
            }
        };

        self.metrics.add(
            PRODUCTS_VIEWED,
            1.0,
            &[
                KeyValue::new("product_id", id),
                KeyValue::new("product_category", product.category_label()),
            ],
        );
        Ok(product)
    }

    pub fn list_products(&self, limit: i64, offset: i64) -> Result<Vec<Product>, DomainError> {
        self.repo
            .list(limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
    }

    pub fn get_inventory(
        &self,
        product_id: i64,
        warehouse_id: &str,
    ) -> Result<Inventory, DomainError> {
        let inventory = self
            .repo
            .find_inventory(product_id, warehouse_id)?
            .ok_or(DomainError::NotFound(Entity::Inventory))?;

        self.metrics.gauge(
            INVENTORY_LEVEL,
            f64::from(inventory.quantity),
            &[
                KeyValue::new("product_id", product_id),
                KeyValue::new("warehouse_id", warehouse_id),
            ],
        );
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{InMemoryStore, RecordingMetrics};

    fn service(store: &InMemoryStore, metrics: &Arc<RecordingMetrics>) -> ProductService<InMemoryStore> {
        ProductService::new(
            store.clone(),
            ProductCache::new(Duration::from_secs(60)),
            metrics.clone(),
        )
    }

    #[test]
    fn miss_loads_from_store_then_hits() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        let product = store.add_product("Novel", "12.50", "books");
        let svc = service(&store, &metrics);

        let first = svc.get_product(product.id).unwrap();
        let second = svc.get_product(product.id).unwrap();

        assert_eq!(first, product);
        assert_eq!(second, product);
        assert_eq!(store.product_loads(), 1);
        assert_eq!(metrics.named(CACHE_MISSES).len(), 1);
        assert_eq!(metrics.named(CACHE_HITS).len(), 1);
    }

    #[test]
    fn every_successful_lookup_counts_a_view_with_category() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        let product = store.add_product("Lamp", "30.00", "");
        let svc = service(&store, &metrics);

        svc.get_product(product.id).unwrap();
        svc.get_product(product.id).unwrap();

        let views = metrics.named(PRODUCTS_VIEWED);
        assert_eq!(views.len(), 2);
        for view in views {
            assert_eq!(view.attr("product_category"), Some("unknown"));
            assert_eq!(view.attr("product_id"), Some(product.id.to_string().as_str()));
        }
    }

    #[test]
    fn cached_value_may_be_stale_until_expiry() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        let product = store.add_product("Mug", "5.00", "kitchen");
        let svc = service(&store, &metrics);

        svc.get_product(product.id).unwrap();
        store.set_price(product.id, "6.00");

        let cached = svc.get_product(product.id).unwrap();
        assert_eq!(cached.price, product.price);
    }

    #[test]
    fn missing_product_is_not_found_and_not_viewed() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        let svc = service(&store, &metrics);

        let err = svc.get_product(404).unwrap_err();

        assert!(matches!(err, DomainError::NotFound(Entity::Product)));
        assert_eq!(metrics.named(CACHE_MISSES).len(), 1);
        assert!(metrics.named(PRODUCTS_VIEWED).is_empty());
    }

    #[test]
    fn store_failure_on_miss_propagates() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        let product = store.add_product("Pen", "1.00", "office");
        store.fail(|f| f.product_lookup = true);
        let svc = service(&store, &metrics);

        let err = svc.get_product(product.id).unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
    }

    #[test]
    fn list_clamps_paging() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        for n in 0..3 {
            store.add_product(&format!("p{n}"), "1.00", "misc");
        }
        let svc = service(&store, &metrics);

        assert_eq!(svc.list_products(0, -5).unwrap().len(), 1);
        assert_eq!(svc.list_products(500, 1).unwrap().len(), 2);
    }

    #[test]
    fn inventory_lookup_records_gauge() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        let product = store.add_product("Chair", "45.00", "furniture");
        store.add_inventory(product.id, DEFAULT_WAREHOUSE, 17);
        let svc = service(&store, &metrics);

        let inventory = svc.get_inventory(product.id, DEFAULT_WAREHOUSE).unwrap();

        assert_eq!(inventory.quantity, 17);
        let gauges = metrics.named(INVENTORY_LEVEL);
        assert_eq!(gauges.len(), 1);
        assert_eq!(gauges[0].value, 17.0);
        assert_eq!(gauges[0].attr("warehouse_id"), Some(DEFAULT_WAREHOUSE));
    }

    #[test]
    fn unknown_warehouse_is_not_found() {
        let store = InMemoryStore::new();
        let metrics = RecordingMetrics::new();
        let product = store.add_product("Desk", "99.00", "furniture");
        let svc = service(&store, &metrics);

        let err = svc.get_inventory(product.id, "WH-404").unwrap_err();
        assert!(matches!(err, DomainError::NotFound(Entity::Inventory)));
        assert!(metrics.named(INVENTORY_LEVEL).is_empty());
    }
}
