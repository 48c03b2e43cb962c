use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::cart::CartLine;
use crate::domain::errors::DomainError;
use crate::domain::order::{CategorizedLine, NewOrder, Order, OrderItem};
use crate::domain::ports::{OrderRepository, OrderTransaction};
use crate::domain::status::OrderStatus;
use crate::schema::{cart_items, carts, order_items, orders, products};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};
use super::query_metrics::QueryMetrics;
use super::transaction::ScopedTransaction;

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
    queries: QueryMetrics,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool, queries: QueryMetrics) -> Self {
        Self { pool, queries }
    }
}

impl OrderRepository for DieselOrderRepository {
    type Tx = DieselOrderTx;

    fn begin(&self) -> Result<Self::Tx, DomainError> {
        let conn = self.pool.get()?;
        Ok(DieselOrderTx {
            tx: ScopedTransaction::begin(conn)?,
            queries: self.queries.clone(),
        })
    }

    fn categories_for(&self, product_ids: &[i64]) -> Result<HashMap<i64, String>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<(i64, String)> = self.queries.time("SELECT", "products", || {
            products::table
                .filter(products::id.eq_any(product_ids))
                .select((products::id, products::category))
                .load(&mut conn)
        })?;
        Ok(rows.into_iter().collect())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = self.queries.time("SELECT", "orders", || {
            orders::table
                .find(id)
                .select(OrderRow::as_select())
                .first(&mut conn)
                .optional()
        })?;
        row.map(Order::try_from).transpose()
    }

    fn find_items(&self, order_id: i64) -> Result<Vec<OrderItem>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = self.queries.time("SELECT", "order_items", || {
            order_items::table
                .filter(order_items::order_id.eq(order_id))
                .order(order_items::id.asc())
                .select(OrderItemRow::as_select())
                .load(&mut conn)
        })?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    fn list_for_user(&self, user_id: i64) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = self.queries.time("SELECT", "orders", || {
            orders::table
                .filter(orders::user_id.eq(user_id))
                .order((orders::created_at.desc(), orders::id.desc()))
                .select(OrderRow::as_select())
                .load(&mut conn)
        })?;
        rows.into_iter().map(Order::try_from).collect()
    }

    fn update_status(
        &self,
        id: i64,
        status: OrderStatus,
        expected: Option<OrderStatus>,
    ) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let changes = (
            orders::status.eq(status.as_str()),
            orders::updated_at.eq(Utc::now()),
        );
        let updated = self.queries.time("UPDATE", "orders", || match expected {
            None => diesel::update(orders::table.find(id))
                .set(changes)
                .execute(&mut conn),
            Some(previous) => diesel::update(
                orders::table
                    .find(id)
                    .filter(orders::status.eq(previous.as_str())),
            )
            .set(changes)
            .execute(&mut conn),
        })?;
        Ok(updated > 0)
    }

    fn items_with_category(&self, order_id: i64) -> Result<Vec<CategorizedLine>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<(i64, i32, bigdecimal::BigDecimal, String)> =
            self.queries.time("SELECT", "order_items", || {
                order_items::table
                    .inner_join(products::table)
                    .filter(order_items::order_id.eq(order_id))
                    .order(order_items::id.asc())
                    .select((
                        order_items::product_id,
                        order_items::quantity,
                        order_items::price,
                        products::category,
                    ))
                    .load(&mut conn)
            })?;
        Ok(rows
            .into_iter()
            .map(|(product_id, quantity, price, category)| CategorizedLine {
                product_id,
                quantity,
                price,
                category,
            })
            .collect())
    }
}

// ── Unit of work ──────────────────────────────────────────────────────────────

/// Cart-to-order unit of work on one pooled connection. Rolled back on drop
/// unless committed.
pub struct DieselOrderTx {
    tx: ScopedTransaction,
    queries: QueryMetrics,
}

impl OrderTransaction for DieselOrderTx {
    fn cart_snapshot(&mut self, user_id: i64) -> Result<Vec<CartLine>, DomainError> {
        let conn = self.tx.conn();
        let rows: Vec<(i64, i32, bigdecimal::BigDecimal)> =
            self.queries.time("SELECT", "cart_items", || {
                cart_items::table
                    .inner_join(carts::table)
                    .inner_join(products::table)
                    .filter(carts::user_id.eq(user_id))
                    .order(cart_items::id.asc())
                    .select((cart_items::product_id, cart_items::quantity, products::price))
                    .load(conn)
            })?;
        Ok(rows
            .into_iter()
            .map(|(product_id, quantity, price)| CartLine {
                product_id,
                quantity,
                price,
            })
            .collect())
    }

    fn insert_order(&mut self, order: &NewOrder) -> Result<i64, DomainError> {
        let conn = self.tx.conn();
        let id = self.queries.time("INSERT", "orders", || {
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    user_id: order.user_id,
                    status: OrderStatus::Pending.as_str(),
                    payment_method: &order.payment_method,
                    total_amount: &order.total_amount,
                    currency: &order.currency,
                })
                .returning(orders::id)
                .get_result(conn)
        })?;
        Ok(id)
    }

    fn insert_order_items(
        &mut self,
        order_id: i64,
        lines: &[CartLine],
    ) -> Result<(), DomainError> {
        let rows: Vec<NewOrderItemRow<'_>> = lines
            .iter()
            .map(|line| NewOrderItemRow {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: &line.price,
            })
            .collect();
        let conn = self.tx.conn();
        self.queries.time("INSERT", "order_items", || {
            diesel::insert_into(order_items::table)
                .values(&rows)
                .execute(conn)
        })?;
        Ok(())
    }

    fn clear_cart(&mut self, user_id: i64) -> Result<usize, DomainError> {
        let conn = self.tx.conn();
        let removed = self.queries.time("DELETE", "cart_items", || {
            diesel::delete(
                cart_items::table.filter(
                    cart_items::cart_id.eq_any(
                        carts::table
                            .filter(carts::user_id.eq(user_id))
                            .select(carts::id),
                    ),
                ),
            )
            .execute(conn)
        })?;
        Ok(removed)
    }

    fn commit(self) -> Result<(), DomainError> {
        let DieselOrderTx { tx, queries } = self;
        queries.time("COMMIT", "orders", || tx.commit())?;
        Ok(())
    }
}
