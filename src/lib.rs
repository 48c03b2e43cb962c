pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod middleware;
pub mod schema;

#[cfg(test)]
mod testing;

use std::error::Error;
use std::sync::Arc;

use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use prometheus::Registry;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::order_service::OrderService;
use application::product_cache::ProductCache;
use application::product_service::ProductService;
use application::user_service::UserService;
use domain::metrics::MetricsEmitter;
use domain::status::TransitionPolicy;
use errors::AppError;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductRepository;
use infrastructure::query_metrics::QueryMetrics;
use infrastructure::user_repo::DieselUserRepository;

pub use db::{create_pool, DbPool, PoolSettings};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Services shared by every worker, wired to the diesel adapters.
pub struct AppState {
    pub pool: DbPool,
    pub products: ProductService<DieselProductRepository>,
    pub carts: CartService<DieselCartRepository, DieselProductRepository>,
    pub orders: OrderService<DieselOrderRepository>,
    pub users: UserService<DieselUserRepository>,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        metrics: Arc<dyn MetricsEmitter>,
        cache: ProductCache,
        policy: TransitionPolicy,
    ) -> Self {
        let queries = QueryMetrics::new(Arc::clone(&metrics));
        let products = || DieselProductRepository::new(pool.clone(), queries.clone());

        Self {
            products: ProductService::new(products(), cache, Arc::clone(&metrics)),
            carts: CartService::new(
                DieselCartRepository::new(pool.clone(), queries.clone()),
                products(),
                Arc::clone(&metrics),
            ),
            orders: OrderService::new(
                DieselOrderRepository::new(pool.clone(), queries.clone()),
                Arc::clone(&metrics),
            )
            .with_policy(policy),
            users: UserService::new(
                DieselUserRepository::new(pool.clone(), queries.clone()),
                metrics,
            ),
            pool,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::metrics::metrics,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::get_inventory,
        handlers::cart::get_cart,
        handlers::cart::add_to_cart,
        handlers::cart::remove_from_cart,
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
        handlers::users::create_user,
        handlers::users::get_user,
    ),
    tags(
        (name = "products", description = "Catalog browsing and stock levels"),
        (name = "cart", description = "Per-user shopping cart"),
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "users", description = "User registration"),
        (name = "health", description = "Liveness and metrics exposition"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// `metrics` receives every measurement; `registry` is what `GET /metrics`
/// exposes. The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: web::Data<AppState>,
    metrics: Arc<dyn MetricsEmitter>,
    registry: Registry,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let metrics = web::Data::new(metrics);
    let registry = web::Data::new(registry);
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(metrics.clone())
            .app_data(registry.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                AppError::BadRequest(format!("Invalid request body: {err}")).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _| {
                AppError::BadRequest(format!("Invalid path parameter: {err}")).into()
            }))
            .wrap(from_fn(middleware::http_metrics))
            .wrap(from_fn(middleware::request_id))
            .wrap(Logger::new(r#"%a "%r" %s %b %Dms request_id=%{x-request-id}o"#))
            .route("/health", web::get().to(handlers::health::health))
            .route("/metrics", web::get().to(handlers::metrics::metrics))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/products")
                            .route("", web::get().to(handlers::products::list_products))
                            .route("/{id}", web::get().to(handlers::products::get_product))
                            .route(
                                "/{id}/inventory",
                                web::get().to(handlers::products::get_inventory),
                            ),
                    )
                    .service(
                        web::scope("/cart")
                            .route("", web::get().to(handlers::cart::get_cart))
                            .route("/add", web::post().to(handlers::cart::add_to_cart))
                            .route("/remove", web::post().to(handlers::cart::remove_from_cart)),
                    )
                    .service(
                        web::scope("/orders")
                            .route("", web::post().to(handlers::orders::create_order))
                            .route("", web::get().to(handlers::orders::list_orders))
                            .route("/{id}", web::get().to(handlers::orders::get_order))
                            .route(
                                "/{id}/status",
                                web::put().to(handlers::orders::update_order_status),
                            ),
                    )
                    .service(
                        web::scope("/users")
                            .route("", web::post().to(handlers::users::create_user))
                            .route("/{id}", web::get().to(handlers::users::get_user)),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
