use std::fmt;

use thiserror::Error;

use super::status::OrderStatus;

/// The kind of record a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Product,
    Inventory,
    Cart,
    Order,
    User,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Product => "Product",
            Entity::Inventory => "Inventory",
            Entity::Cart => "Cart",
            Entity::Order => "Order",
            Entity::User => "User",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Already exists: {0}")]
    DuplicateEntity(String),
    #[error("Store error: {0}")]
    Store(String),
}
