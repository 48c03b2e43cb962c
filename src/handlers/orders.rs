use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::order::{Order, OrderItem, OrderView};
use crate::errors::AppError;
use crate::AppState;

use super::{StatusResponse, UserQuery};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Defaults to "credit_card"
    #[serde(default)]
    pub payment_method: String,
    /// ISO currency code, defaults to "USD"
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of pending, processing, shipped, delivered, completed, cancelled
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    /// Unit price captured when the order was placed
    pub price: String,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            price: i.price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    pub payment_method: String,
    pub total_amount: String,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
    /// Present on single-order responses; omitted from listings
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub items: Option<Vec<OrderItemResponse>>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            status: o.status.to_string(),
            payment_method: o.payment_method,
            total_amount: o.total_amount.to_string(),
            currency: o.currency,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            items: None,
        }
    }
}

impl From<OrderView> for OrderResponse {
    fn from(view: OrderView) -> Self {
        Self {
            items: Some(view.items.into_iter().map(OrderItemResponse::from).collect()),
            ..Self::from(view.order)
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/v1/orders
///
/// Turns the user's whole cart into a `pending` order. The order, its items
/// and the emptied cart are written in a single database transaction.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    params(UserQuery),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Cart is empty"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
    body: Option<web::Json<CreateOrderRequest>>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.user_id();
    let body = body.map(web::Json::into_inner).unwrap_or_default();

    let view = web::block(move || {
        state
            .orders
            .create_order(user_id, &body.payment_method, &body.currency)
    })
    .await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(view)))
}

/// GET /api/v1/orders
///
/// Lists the user's orders, newest first, without their items.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(UserQuery),
    responses(
        (status = 200, description = "The user's orders", body = [OrderResponse]),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.user_id();

    let orders = web::block(move || state.orders.list_user_orders(user_id)).await??;

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/v1/orders/{id}
///
/// Returns the order together with its items.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(
        ("id" = i64, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let view = web::block(move || state.orders.get_order(order_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(view)))
}

/// PUT /api/v1/orders/{id}/status
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(
        ("id" = i64, Path, description = "Order id"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = StatusResponse),
        (status = 400, description = "Unknown status label"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = body.into_inner().status;

    web::block(move || state.orders.update_status(order_id, &status)).await??;

    Ok(HttpResponse::Ok().json(StatusResponse::new("updated")))
}
