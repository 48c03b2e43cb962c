use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::domain::cart::{Cart, CartView};
use crate::domain::errors::{DomainError, Entity};
use crate::domain::metrics::{KeyValue, MetricsEmitter, CART_ITEMS_COUNT};
use crate::domain::ports::{CartRepository, ProductRepository};

pub struct CartService<C, P> {
    carts: C,
    products: P,
    metrics: Arc<dyn MetricsEmitter>,
}

impl<C: CartRepository, P: ProductRepository> CartService<C, P> {
    pub fn new(carts: C, products: P, metrics: Arc<dyn MetricsEmitter>) -> Self {
        Self {
            carts,
            products,
            metrics,
        }
    }

    pub fn get_or_create_cart(&self, user_id: i64) -> Result<Cart, DomainError> {
        self.carts.get_or_create(user_id)
    }

    /// Adds `quantity` units of a product; an existing line is incremented
    /// rather than duplicated.
    pub fn add_to_cart(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<(), DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidInput(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }

        let cart = self.carts.get_or_create(user_id)?;
        if !self.products.exists(product_id)? {
            return Err(DomainError::NotFound(Entity::Product));
        }
        self.carts.add_item(cart.id, product_id, quantity)?;

        log::info!(
            "cart updated: user_id={user_id}, product_id={product_id}, added={quantity}"
        );
        self.publish_item_count(&cart);
        Ok(())
    }

    pub fn remove_from_cart(&self, user_id: i64, product_id: i64) -> Result<(), DomainError> {
        let cart = self.carts.get_or_create(user_id)?;
        self.carts.remove_item(cart.id, product_id)?;
        self.publish_item_count(&cart);
        Ok(())
    }

    pub fn get_cart(&self, user_id: i64) -> Result<CartView, DomainError> {
        let cart = self.carts.get_or_create(user_id)?;
        let priced = self.carts.items_with_prices(cart.id)?;

        let total = priced.iter().fold(BigDecimal::from(0), |acc, (item, price)| {
            acc + price * BigDecimal::from(item.quantity)
        });
        let items = priced.into_iter().map(|(item, _)| item).collect();

        self.publish_item_count(&cart);
        Ok(CartView { cart, items, total })
    }

    fn publish_item_count(&self, cart: &Cart) {
        match self.carts.count_items(cart.id) {
            Ok(count) => self.metrics.gauge(
                CART_ITEMS_COUNT,
                count as f64,
                &[KeyValue::new("user_id", cart.user_id)],
            ),
            Err(e) => log::warn!("could not count items in cart {}: {e}", cart.id),
        }
    }
}
