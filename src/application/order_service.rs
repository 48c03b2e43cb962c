//! Order creation from a cart and the order status lifecycle.
//!
//! Creating an order snapshots the cart, writes the order and its lines and
//! empties the cart inside one scoped transaction. Business metrics are
//! emitted only after the commit succeeded.
//!
//! Completing an order emits the per-category order and revenue metrics a
//! second time, tagged `order_status=completed`. Dashboards rely on both
//! emissions, so they are not deduplicated.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::ToPrimitive;

use crate::domain::aggregate::CategoryAggregate;
use crate::domain::cart::{snapshot_total, CartLine};
use crate::domain::catalog::UNKNOWN_CATEGORY;
use crate::domain::errors::{DomainError, Entity};
use crate::domain::metrics::{KeyValue, MetricsEmitter, ORDERS_CREATED, REVENUE};
use crate::domain::order::{NewOrder, Order, OrderView};
use crate::domain::ports::{OrderRepository, OrderTransaction};
use crate::domain::status::{OrderStatus, TransitionPolicy};

pub const DEFAULT_PAYMENT_METHOD: &str = "credit_card";
pub const DEFAULT_CURRENCY: &str = "USD";

pub struct OrderService<R> {
    repo: R,
    metrics: Arc<dyn MetricsEmitter>,
    policy: TransitionPolicy,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R, metrics: Arc<dyn MetricsEmitter>) -> Self {
        Self {
            repo,
            metrics,
            policy: TransitionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Converts the user's whole cart into a `pending` order.
    ///
    /// Fails with `EmptyCart` before any write when the cart has no items.
    /// Any store error before the commit rolls the transaction back, so no
    /// partial order is ever persisted.
    pub fn create_order(
        &self,
        user_id: i64,
        payment_method: &str,
        currency: &str,
    ) -> Result<OrderView, DomainError> {
        let payment_method = non_blank_or(payment_method, DEFAULT_PAYMENT_METHOD);
        let currency = non_blank_or(currency, DEFAULT_CURRENCY);

        let mut tx = self.repo.begin()?;

        let snapshot = tx.cart_snapshot(user_id)?;
        if snapshot.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        let total_amount = snapshot_total(&snapshot);

        // Read outside the transaction: categories only feed metrics.
        let categories = self.resolve_categories(&snapshot);

        let order_id = tx.insert_order(&NewOrder {
            user_id,
            payment_method: payment_method.to_string(),
            total_amount: total_amount.clone(),
            currency: currency.to_string(),
        })?;
        tx.insert_order_items(order_id, &snapshot)?;
        let cleared = tx.clear_cart(user_id)?;
        tx.commit()?;

        log::info!(
            "order created: order_id={order_id}, user_id={user_id}, total={total_amount} {currency}, items={}, cleared={cleared}",
            snapshot.len()
        );

        let order = self
            .repo
            .find_by_id(order_id)?
            .ok_or(DomainError::NotFound(Entity::Order))?;
        let items = self.repo.find_items(order_id)?;

        let aggregate = CategoryAggregate::from_lines(snapshot.iter().map(|line| {
            let category = categories
                .get(&line.product_id)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_CATEGORY);
            (category, &line.price, line.quantity)
        }));
        self.emit_order_metrics(&aggregate, order.status, &order.payment_method, &order.currency);

        Ok(OrderView { order, items })
    }

    /// Moves an order to `new_status`.
    ///
    /// Under the permissive policy any of the six labels may follow any other.
    /// Reaching `completed` triggers a best-effort metrics emission whose
    /// failure is logged and does not affect the result.
    pub fn update_status(&self, order_id: i64, new_status: &str) -> Result<(), DomainError> {
        let status: OrderStatus = new_status.parse()?;

        match self.policy {
            TransitionPolicy::Permissive => {
                if !self.repo.update_status(order_id, status, None)? {
                    return Err(DomainError::NotFound(Entity::Order));
                }
            }
            TransitionPolicy::ForwardOnly => self.advance(order_id, status)?,
        }

        log::info!("order status updated: order_id={order_id}, status={status}");

        if status == OrderStatus::Completed {
            self.record_completion(order_id);
        }
        Ok(())
    }

    pub fn get_order(&self, order_id: i64) -> Result<OrderView, DomainError> {
        let order = self
            .repo
            .find_by_id(order_id)?
            .ok_or(DomainError::NotFound(Entity::Order))?;
        let items = self.repo.find_items(order_id)?;
        Ok(OrderView { order, items })
    }

    pub fn list_user_orders(&self, user_id: i64) -> Result<Vec<Order>, DomainError> {
        self.repo.list_for_user(user_id)
    }

    fn advance(&self, order_id: i64, status: OrderStatus) -> Result<(), DomainError> {
        let current = self
            .repo
            .find_by_id(order_id)?
            .ok_or(DomainError::NotFound(Entity::Order))?;
        self.policy.check(current.status, status)?;

        if self
            .repo
            .update_status(order_id, status, Some(current.status))?
        {
            return Ok(());
        }

        // Someone else moved or deleted the order between the read and the write.
        match self.repo.find_by_id(order_id)? {
            Some(latest) => Err(DomainError::InvalidTransition {
                from: latest.status,
                to: status,
            }),
            None => Err(DomainError::NotFound(Entity::Order)),
        }
    }

    fn resolve_categories(&self, snapshot: &[CartLine]) -> HashMap<i64, String> {
        let ids: Vec<i64> = snapshot.iter().map(|line| line.product_id).collect();
        self.repo.categories_for(&ids).unwrap_or_else(|e| {
            log::warn!("could not resolve product categories, using '{UNKNOWN_CATEGORY}': {e}");
            HashMap::new()
        })
    }

    fn record_completion(&self, order_id: i64) {
        let order = match self.repo.find_by_id(order_id) {
            Ok(Some(order)) => order,
            Ok(None) => {
                log::warn!("completed order {order_id} vanished before metrics were recorded");
                return;
            }
            Err(e) => {
                log::warn!("could not fetch order {order_id} for metrics: {e}");
                return;
            }
        };
        let lines = match self.repo.items_with_category(order_id) {
            Ok(lines) => lines,
            Err(e) => {
                log::warn!("could not fetch items of order {order_id} for metrics: {e}");
                return;
            }
        };

        let aggregate = CategoryAggregate::from_lines(
            lines
                .iter()
                .map(|line| (line.category.as_str(), &line.price, line.quantity)),
        );
        self.emit_order_metrics(
            &aggregate,
            OrderStatus::Completed,
            &order.payment_method,
            &order.currency,
        );
    }

    fn emit_order_metrics(
        &self,
        aggregate: &CategoryAggregate,
        status: OrderStatus,
        payment_method: &str,
        currency: &str,
    ) {
        for (category, tally) in aggregate.iter() {
            self.metrics.add(
                ORDERS_CREATED,
                tally.lines as f64,
                &[
                    KeyValue::new("order_status", status),
                    KeyValue::new("payment_method", payment_method),
                    KeyValue::new("product_category", category),
                ],
            );
            self.metrics.add(
                REVENUE,
                tally.revenue.to_f64().unwrap_or_default(),
                &[
                    KeyValue::new("currency", currency),
                    KeyValue::new("payment_method", payment_method),
                    KeyValue::new("product_category", category),
                    KeyValue::new("order_status", status),
                ],
            );
        }
    }
}

fn non_blank_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}
