//! In-memory implementations of the repository and metrics ports for service
//! tests. Transactions stage writes on a copy of the state and publish it on
//! commit; dropping an uncommitted transaction discards the copy.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::Utc;

use crate::domain::cart::{Cart, CartItem, CartLine};
use crate::domain::catalog::{Inventory, Product};
use crate::domain::errors::DomainError;
use crate::domain::metrics::{KeyValue, MetricKind, MetricsEmitter};
use crate::domain::order::{CategorizedLine, NewOrder, Order, OrderItem};
use crate::domain::ports::{
    CartRepository, OrderRepository, OrderTransaction, ProductRepository, UserRepository,
};
use crate::domain::status::OrderStatus;
use crate::domain::user::User;

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub insert_order_items: bool,
    pub clear_cart: bool,
    pub commit: bool,
    pub categories: bool,
    pub items_with_category: bool,
    pub product_lookup: bool,
    /// Applied once, just before the next conditional status write.
    pub status_race: Option<StatusRace>,
}

/// A concurrent change to an order landing between a status read and the
/// compare-and-set that follows it.
#[derive(Debug, Clone, Copy)]
pub enum StatusRace {
    MovedTo(OrderStatus),
    Deleted,
}

#[derive(Debug, Clone, Default)]
pub struct State {
    next_id: i64,
    pub products: BTreeMap<i64, Product>,
    pub inventory: Vec<Inventory>,
    pub users: Vec<User>,
    pub carts: Vec<Cart>,
    pub cart_items: Vec<CartItem>,
    pub orders: BTreeMap<i64, Order>,
    pub order_items: Vec<OrderItem>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn cart_ids_for(&self, user_id: i64) -> Vec<i64> {
        self.carts
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect()
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: State,
    failures: Failures,
    product_loads: usize,
    commits: usize,
    rollbacks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Shared>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner.lock().unwrap()
    }

    pub fn state(&self) -> State {
        self.lock().state.clone()
    }

    pub fn fail(&self, configure: impl FnOnce(&mut Failures)) {
        configure(&mut self.lock().failures);
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    pub fn product_loads(&self) -> usize {
        self.lock().product_loads
    }

    pub fn add_product(&self, name: &str, price: &str, category: &str) -> Product {
        let mut shared = self.lock();
        let id = shared.state.next_id();
        let now = Utc::now();
        let product = Product {
            id,
            name: name.to_string(),
            description: String::new(),
            price: dec(price),
            category: category.to_string(),
            sku: format!("SKU-{id}"),
            created_at: now,
            updated_at: now,
        };
        shared.state.products.insert(id, product.clone());
        product
    }

    pub fn set_price(&self, product_id: i64, price: &str) {
        let mut shared = self.lock();
        if let Some(product) = shared.state.products.get_mut(&product_id) {
            product.price = dec(price);
        }
    }

    pub fn add_inventory(&self, product_id: i64, warehouse_id: &str, quantity: i32) {
        let mut shared = self.lock();
        let id = shared.state.next_id();
        let now = Utc::now();
        shared.state.inventory.push(Inventory {
            id,
            product_id,
            warehouse_id: warehouse_id.to_string(),
            quantity,
            created_at: now,
            updated_at: now,
        });
    }

    pub fn cart_quantity(&self, user_id: i64, product_id: i64) -> Option<i32> {
        let shared = self.lock();
        let carts = shared.state.cart_ids_for(user_id);
        shared
            .state
            .cart_items
            .iter()
            .find(|i| carts.contains(&i.cart_id) && i.product_id == product_id)
            .map(|i| i.quantity)
    }

    pub fn cart_item_count(&self, user_id: i64) -> usize {
        let shared = self.lock();
        let carts = shared.state.cart_ids_for(user_id);
        shared
            .state
            .cart_items
            .iter()
            .filter(|i| carts.contains(&i.cart_id))
            .count()
    }
}

impl ProductRepository for InMemoryStore {
    fn find_by_id(&self, id: i64) -> Result<Option<Product>, DomainError> {
        let mut shared = self.lock();
        if shared.failures.product_lookup {
            return Err(DomainError::Store("product lookup failed".into()));
        }
        shared.product_loads += 1;
        Ok(shared.state.products.get(&id).cloned())
    }

    fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .lock()
            .state
            .products
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn exists(&self, id: i64) -> Result<bool, DomainError> {
        Ok(self.lock().state.products.contains_key(&id))
    }

    fn find_inventory(
        &self,
        product_id: i64,
        warehouse_id: &str,
    ) -> Result<Option<Inventory>, DomainError> {
        Ok(self
            .lock()
            .state
            .inventory
            .iter()
            .find(|i| i.product_id == product_id && i.warehouse_id == warehouse_id)
            .cloned())
    }
}

impl CartRepository for InMemoryStore {
    fn get_or_create(&self, user_id: i64) -> Result<Cart, DomainError> {
        let mut shared = self.lock();
        if let Some(cart) = shared.state.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }
        let now = Utc::now();
        let cart = Cart {
            id: shared.state.next_id(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        shared.state.carts.push(cart.clone());
        Ok(cart)
    }

    fn add_item(&self, cart_id: i64, product_id: i64, quantity: i32) -> Result<(), DomainError> {
        let mut shared = self.lock();
        let now = Utc::now();
        if let Some(item) = shared
            .state
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        {
            item.quantity += quantity;
            item.updated_at = now;
            return Ok(());
        }
        let id = shared.state.next_id();
        shared.state.cart_items.push(CartItem {
            id,
            cart_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    fn remove_item(&self, cart_id: i64, product_id: i64) -> Result<(), DomainError> {
        self.lock()
            .state
            .cart_items
            .retain(|i| !(i.cart_id == cart_id && i.product_id == product_id));
        Ok(())
    }

    fn items_with_prices(&self, cart_id: i64) -> Result<Vec<(CartItem, BigDecimal)>, DomainError> {
        let shared = self.lock();
        Ok(shared
            .state
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .filter_map(|i| {
                shared
                    .state
                    .products
                    .get(&i.product_id)
                    .map(|p| (i.clone(), p.price.clone()))
            })
            .collect())
    }

    fn count_items(&self, cart_id: i64) -> Result<i64, DomainError> {
        Ok(self
            .lock()
            .state
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .count() as i64)
    }

    fn count_active_carts(&self) -> Result<i64, DomainError> {
        let shared = self.lock();
        let mut carts: Vec<i64> = shared.state.cart_items.iter().map(|i| i.cart_id).collect();
        carts.sort_unstable();
        carts.dedup();
        Ok(carts.len() as i64)
    }
}

pub struct InMemoryTx {
    store: InMemoryStore,
    staged: State,
    failures: Failures,
    committed: bool,
}

impl OrderTransaction for InMemoryTx {
    fn cart_snapshot(&mut self, user_id: i64) -> Result<Vec<CartLine>, DomainError> {
        let carts = self.staged.cart_ids_for(user_id);
        Ok(self
            .staged
            .cart_items
            .iter()
            .filter(|i| carts.contains(&i.cart_id))
            .filter_map(|i| {
                self.staged.products.get(&i.product_id).map(|p| CartLine {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    price: p.price.clone(),
                })
            })
            .collect())
    }

    fn insert_order(&mut self, order: &NewOrder) -> Result<i64, DomainError> {
        let id = self.staged.next_id();
        let now = Utc::now();
        self.staged.orders.insert(
            id,
            Order {
                id,
                user_id: order.user_id,
                status: OrderStatus::Pending,
                payment_method: order.payment_method.clone(),
                total_amount: order.total_amount.clone(),
                currency: order.currency.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn insert_order_items(
        &mut self,
        order_id: i64,
        lines: &[CartLine],
    ) -> Result<(), DomainError> {
        for (n, line) in lines.iter().enumerate() {
            // Fail part-way through so some rows are already staged.
            if self.failures.insert_order_items && n + 1 == lines.len() {
                return Err(DomainError::Store("order_items insert failed".into()));
            }
            let id = self.staged.next_id();
            self.staged.order_items.push(OrderItem {
                id,
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price.clone(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    fn clear_cart(&mut self, user_id: i64) -> Result<usize, DomainError> {
        if self.failures.clear_cart {
            return Err(DomainError::Store("cart_items delete failed".into()));
        }
        let carts = self.staged.cart_ids_for(user_id);
        let before = self.staged.cart_items.len();
        self.staged
            .cart_items
            .retain(|i| !carts.contains(&i.cart_id));
        Ok(before - self.staged.cart_items.len())
    }

    fn commit(mut self) -> Result<(), DomainError> {
        if self.failures.commit {
            return Err(DomainError::Store("commit failed".into()));
        }
        let mut shared = self.store.lock();
        shared.state = std::mem::take(&mut self.staged);
        shared.commits += 1;
        self.committed = true;
        Ok(())
    }
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        if !self.committed {
            self.store.lock().rollbacks += 1;
        }
    }
}

impl OrderRepository for InMemoryStore {
    type Tx = InMemoryTx;

    fn begin(&self) -> Result<Self::Tx, DomainError> {
        let shared = self.lock();
        Ok(InMemoryTx {
            store: self.clone(),
            staged: shared.state.clone(),
            failures: shared.failures.clone(),
            committed: false,
        })
    }

    fn categories_for(&self, product_ids: &[i64]) -> Result<HashMap<i64, String>, DomainError> {
        let shared = self.lock();
        if shared.failures.categories {
            return Err(DomainError::Store("category lookup failed".into()));
        }
        Ok(product_ids
            .iter()
            .filter_map(|id| {
                shared
                    .state
                    .products
                    .get(id)
                    .map(|p| (*id, p.category.clone()))
            })
            .collect())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Order>, DomainError> {
        Ok(self.lock().state.orders.get(&id).cloned())
    }

    fn find_items(&self, order_id: i64) -> Result<Vec<OrderItem>, DomainError> {
        Ok(self
            .lock()
            .state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    fn list_for_user(&self, user_id: i64) -> Result<Vec<Order>, DomainError> {
        let mut orders: Vec<Order> = self
            .lock()
            .state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    fn update_status(
        &self,
        id: i64,
        status: OrderStatus,
        expected: Option<OrderStatus>,
    ) -> Result<bool, DomainError> {
        let mut shared = self.lock();
        if expected.is_some() {
            match shared.failures.status_race.take() {
                Some(StatusRace::MovedTo(moved)) => {
                    if let Some(order) = shared.state.orders.get_mut(&id) {
                        order.status = moved;
                    }
                }
                Some(StatusRace::Deleted) => {
                    shared.state.orders.remove(&id);
                    shared.state.order_items.retain(|i| i.order_id != id);
                }
                None => {}
            }
        }
        match shared.state.orders.get_mut(&id) {
            Some(order) if expected.map_or(true, |e| e == order.status) => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn items_with_category(&self, order_id: i64) -> Result<Vec<CategorizedLine>, DomainError> {
        let shared = self.lock();
        if shared.failures.items_with_category {
            return Err(DomainError::Store("order items lookup failed".into()));
        }
        Ok(shared
            .state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|i| CategorizedLine {
                product_id: i.product_id,
                quantity: i.quantity,
                price: i.price.clone(),
                category: shared
                    .state
                    .products
                    .get(&i.product_id)
                    .map(|p| p.category.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

impl UserRepository for InMemoryStore {
    fn create(&self, email: &str, name: &str) -> Result<User, DomainError> {
        let mut shared = self.lock();
        if shared.state.users.iter().any(|u| u.email == email) {
            return Err(DomainError::DuplicateEntity(format!("user {email}")));
        }
        let user = User {
            id: shared.state.next_id(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        shared.state.users.push(user.clone());
        Ok(user)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
        Ok(self.lock().state.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .lock()
            .state
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub kind: MetricKind,
    pub name: &'static str,
    pub value: f64,
    pub attributes: Vec<KeyValue>,
}

impl Recorded {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }
}

#[derive(Debug, Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn named(&self, name: &str) -> Vec<Recorded> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl MetricsEmitter for RecordingMetrics {
    fn emit(&self, kind: MetricKind, name: &'static str, value: f64, attributes: &[KeyValue]) {
        self.events.lock().unwrap().push(Recorded {
            kind,
            name,
            value,
            attributes: attributes.to_vec(),
        });
    }
}
