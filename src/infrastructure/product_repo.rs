use diesel::dsl::exists;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::catalog::{Inventory, Product};
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::schema::{inventory, products};

use super::models::{InventoryRow, ProductRow};
use super::query_metrics::QueryMetrics;

pub struct DieselProductRepository {
    pool: DbPool,
    queries: QueryMetrics,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool, queries: QueryMetrics) -> Self {
        Self { pool, queries }
    }
}

impl ProductRepository for DieselProductRepository {
    fn find_by_id(&self, id: i64) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = self.queries.time("SELECT", "products", || {
            products::table
                .find(id)
                .select(ProductRow::as_select())
                .first(&mut conn)
                .optional()
        })?;
        Ok(row.map(Product::from))
    }

    fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = self.queries.time("SELECT", "products", || {
            products::table
                .select(ProductRow::as_select())
                .order(products::id.asc())
                .limit(limit)
                .offset(offset)
                .load(&mut conn)
        })?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn exists(&self, id: i64) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let found = self.queries.time("SELECT", "products", || {
            diesel::select(exists(products::table.find(id))).get_result(&mut conn)
        })?;
        Ok(found)
    }

    fn find_inventory(
        &self,
        product_id: i64,
        warehouse_id: &str,
    ) -> Result<Option<Inventory>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = self.queries.time("SELECT", "inventory", || {
            inventory::table
                .filter(inventory::product_id.eq(product_id))
                .filter(inventory::warehouse_id.eq(warehouse_id))
                .select(InventoryRow::as_select())
                .first(&mut conn)
                .optional()
        })?;
        Ok(row.map(Inventory::from))
    }
}
