use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartItem};
use crate::domain::errors::{DomainError, Entity};
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts, products};

use super::is_foreign_key_violation;
use super::models::{CartItemRow, CartRow, NewCartItemRow};
use super::query_metrics::QueryMetrics;

pub struct DieselCartRepository {
    pool: DbPool,
    queries: QueryMetrics,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool, queries: QueryMetrics) -> Self {
        Self { pool, queries }
    }
}

impl CartRepository for DieselCartRepository {
    fn get_or_create(&self, user_id: i64) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        // The unique constraint on carts.user_id makes concurrent first
        // requests converge on one row.
        self.queries
            .time("INSERT", "carts", || {
                diesel::insert_into(carts::table)
                    .values(carts::user_id.eq(user_id))
                    .on_conflict(carts::user_id)
                    .do_nothing()
                    .execute(&mut conn)
            })
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DomainError::NotFound(Entity::User)
                } else {
                    DomainError::from(e)
                }
            })?;

        let row = self.queries.time("SELECT", "carts", || {
            carts::table
                .filter(carts::user_id.eq(user_id))
                .select(CartRow::as_select())
                .first(&mut conn)
        })?;
        Ok(row.into())
    }

    fn add_item(&self, cart_id: i64, product_id: i64, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        self.queries
            .time("INSERT", "cart_items", || {
                diesel::insert_into(cart_items::table)
                    .values(&NewCartItemRow {
                        cart_id,
                        product_id,
                        quantity,
                    })
                    .on_conflict((cart_items::cart_id, cart_items::product_id))
                    .do_update()
                    .set((
                        cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)),
                        cart_items::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)
            })
            .map_err(|e| {
                // The product may have been deleted after the existence check.
                if is_foreign_key_violation(&e) {
                    DomainError::NotFound(Entity::Product)
                } else {
                    DomainError::from(e)
                }
            })?;
        Ok(())
    }

    fn remove_item(&self, cart_id: i64, product_id: i64) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        self.queries.time("DELETE", "cart_items", || {
            diesel::delete(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart_id))
                    .filter(cart_items::product_id.eq(product_id)),
            )
            .execute(&mut conn)
        })?;
        Ok(())
    }

    fn items_with_prices(&self, cart_id: i64) -> Result<Vec<(CartItem, BigDecimal)>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<(CartItemRow, BigDecimal)> = self.queries.time("SELECT", "cart_items", || {
            cart_items::table
                .inner_join(products::table)
                .filter(cart_items::cart_id.eq(cart_id))
                .order(cart_items::id.asc())
                .select((CartItemRow::as_select(), products::price))
                .load(&mut conn)
        })?;
        Ok(rows
            .into_iter()
            .map(|(item, price)| (item.into(), price))
            .collect())
    }

    fn count_items(&self, cart_id: i64) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        let count = self.queries.time("SELECT", "cart_items", || {
            cart_items::table
                .filter(cart_items::cart_id.eq(cart_id))
                .count()
                .get_result(&mut conn)
        })?;
        Ok(count)
    }

    fn count_active_carts(&self) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        let count = self.queries.time("SELECT", "cart_items", || {
            cart_items::table
                .select(diesel::dsl::count_distinct(cart_items::cart_id))
                .get_result(&mut conn)
        })?;
        Ok(count)
    }
}
