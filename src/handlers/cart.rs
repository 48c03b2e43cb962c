use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::cart::{CartItem, CartView};
use crate::errors::AppError;
use crate::AppState;

use super::{StatusResponse, UserQuery};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: i64,
    /// Units to add; must be at least 1
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemoveFromCartRequest {
    pub product_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CartItem> for CartItemResponse {
    fn from(i: CartItem) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            created_at: i.created_at.to_rfc3339(),
            updated_at: i.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<CartItemResponse>,
    /// Sum of current price × quantity, as a decimal string
    pub total: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            id: view.cart.id,
            user_id: view.cart.user_id,
            items: view.items.into_iter().map(CartItemResponse::from).collect(),
            total: view.total.to_string(),
            created_at: view.cart.created_at.to_rfc3339(),
            updated_at: view.cart.updated_at.to_rfc3339(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/v1/cart
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    params(UserQuery),
    responses(
        (status = 200, description = "The user's cart, created on first access", body = CartResponse),
        (status = 404, description = "Unknown user"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.user_id();

    let view = web::block(move || state.carts.get_cart(user_id)).await??;

    Ok(HttpResponse::Ok().json(CartResponse::from(view)))
}

/// POST /api/v1/cart/add
///
/// Adding a product already in the cart increases its quantity.
#[utoipa::path(
    post,
    path = "/api/v1/cart/add",
    params(UserQuery),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added", body = StatusResponse),
        (status = 400, description = "Quantity below 1"),
        (status = 404, description = "Unknown product or user"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.user_id();
    let AddToCartRequest {
        product_id,
        quantity,
    } = body.into_inner();

    web::block(move || state.carts.add_to_cart(user_id, product_id, quantity)).await??;

    Ok(HttpResponse::Ok().json(StatusResponse::new("added")))
}

/// POST /api/v1/cart/remove
#[utoipa::path(
    post,
    path = "/api/v1/cart/remove",
    params(UserQuery),
    request_body = RemoveFromCartRequest,
    responses(
        (status = 200, description = "Item removed, or was not in the cart", body = StatusResponse),
    ),
    tag = "cart"
)]
pub async fn remove_from_cart(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
    body: web::Json<RemoveFromCartRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.user_id();
    let product_id = body.product_id;

    web::block(move || state.carts.remove_from_cart(user_id, product_id)).await??;

    Ok(HttpResponse::Ok().json(StatusResponse::new("removed")))
}
