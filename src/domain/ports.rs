use std::collections::HashMap;

use bigdecimal::BigDecimal;

use super::cart::{Cart, CartItem, CartLine};
use super::catalog::{Inventory, Product};
use super::errors::DomainError;
use super::order::{CategorizedLine, NewOrder, Order, OrderItem};
use super::status::OrderStatus;
use super::user::User;

pub trait ProductRepository: Send + Sync + 'static {
    fn find_by_id(&self, id: i64) -> Result<Option<Product>, DomainError>;
    fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, DomainError>;
    fn exists(&self, id: i64) -> Result<bool, DomainError>;
    fn find_inventory(
        &self,
        product_id: i64,
        warehouse_id: &str,
    ) -> Result<Option<Inventory>, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    /// Returns the user's cart, inserting it first if the user has none.
    fn get_or_create(&self, user_id: i64) -> Result<Cart, DomainError>;
    /// Adds `quantity` to the line for `product_id`, creating the line if needed.
    fn add_item(&self, cart_id: i64, product_id: i64, quantity: i32) -> Result<(), DomainError>;
    fn remove_item(&self, cart_id: i64, product_id: i64) -> Result<(), DomainError>;
    /// Cart lines paired with the product's current price.
    fn items_with_prices(&self, cart_id: i64) -> Result<Vec<(CartItem, BigDecimal)>, DomainError>;
    fn count_items(&self, cart_id: i64) -> Result<i64, DomainError>;
    /// Number of distinct carts holding at least one item.
    fn count_active_carts(&self) -> Result<i64, DomainError>;
}

/// Unit of work for turning a cart into an order.
///
/// Implementations roll back on drop unless [`OrderTransaction::commit`]
/// returned `Ok`.
pub trait OrderTransaction {
    fn cart_snapshot(&mut self, user_id: i64) -> Result<Vec<CartLine>, DomainError>;
    fn insert_order(&mut self, order: &NewOrder) -> Result<i64, DomainError>;
    fn insert_order_items(&mut self, order_id: i64, lines: &[CartLine])
        -> Result<(), DomainError>;
    /// Deletes every item in the user's cart; the cart row itself stays.
    fn clear_cart(&mut self, user_id: i64) -> Result<usize, DomainError>;
    fn commit(self) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    type Tx: OrderTransaction;

    fn begin(&self) -> Result<Self::Tx, DomainError>;
    /// Non-transactional category lookup, keyed by product id.
    fn categories_for(&self, product_ids: &[i64]) -> Result<HashMap<i64, String>, DomainError>;
    fn find_by_id(&self, id: i64) -> Result<Option<Order>, DomainError>;
    fn find_items(&self, order_id: i64) -> Result<Vec<OrderItem>, DomainError>;
    fn list_for_user(&self, user_id: i64) -> Result<Vec<Order>, DomainError>;
    /// Sets the status and bumps `updated_at`. When `expected` is given the
    /// write only applies if the stored status still equals it. Returns
    /// whether a row was updated.
    fn update_status(
        &self,
        id: i64,
        status: OrderStatus,
        expected: Option<OrderStatus>,
    ) -> Result<bool, DomainError>;
    fn items_with_category(&self, order_id: i64) -> Result<Vec<CategorizedLine>, DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    fn create(&self, email: &str, name: &str) -> Result<User, DomainError>;
    fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
}
