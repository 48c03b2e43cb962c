use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::product_service::DEFAULT_WAREHOUSE;
use crate::domain::catalog::{Inventory, Product};
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub category: String,
    pub sku: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price.to_string(),
            category: p.category,
            sku: p.sku,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryResponse {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: String,
    pub quantity: i32,
    pub updated_at: String,
}

impl From<Inventory> for InventoryResponse {
    fn from(i: Inventory) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            warehouse_id: i.warehouse_id,
            quantity: i.quantity,
            updated_at: i.updated_at.to_rfc3339(),
        }
    }
}

// ── Query parameters ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProductsParams {
    /// Number of items to return. Defaults to 20, maximum 100.
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
    /// Number of items to skip. Defaults to 0.
    #[param(value_type = Option<i64>)]
    pub offset: Option<String>,
}

const DEFAULT_LIMIT: i64 = 20;

impl ListProductsParams {
    // Unparseable values are ignored rather than rejected.
    fn limit(&self) -> i64 {
        lenient(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT)
    }

    fn offset(&self) -> i64 {
        lenient(self.offset.as_deref()).unwrap_or(0)
    }
}

fn lenient(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InventoryParams {
    /// Warehouse to look in. Defaults to WH-001.
    pub warehouse_id: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/v1/products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Page of products", body = [ProductResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = (query.limit(), query.offset());

    let products = web::block(move || state.products.list_products(limit, offset)).await??;

    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/v1/products/{id}
///
/// Served from the product cache when a fresh entry exists.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(
        ("id" = i64, Path, description = "Product id"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 400, description = "Invalid product id"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let product = web::block(move || state.products.get_product(id)).await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// GET /api/v1/products/{id}/inventory
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/inventory",
    params(
        ("id" = i64, Path, description = "Product id"),
        InventoryParams,
    ),
    responses(
        (status = 200, description = "Stock level in the warehouse", body = InventoryResponse),
        (status = 404, description = "No inventory record"),
    ),
    tag = "products"
)]
pub async fn get_inventory(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<InventoryParams>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let warehouse_id = query
        .into_inner()
        .warehouse_id
        .filter(|w| !w.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string());

    let inventory =
        web::block(move || state.products.get_inventory(product_id, &warehouse_id)).await??;

    Ok(HttpResponse::Ok().json(InventoryResponse::from(inventory)))
}
