use std::error::Error;
use std::sync::Arc;

use actix_web::web;
use commerce_service::application::active_carts::ActiveCartsMonitor;
use commerce_service::application::product_cache::ProductCache;
use commerce_service::config::AppConfig;
use commerce_service::domain::metrics::MetricsEmitter;
use commerce_service::infrastructure::cart_repo::DieselCartRepository;
use commerce_service::infrastructure::prometheus_metrics::PrometheusMetrics;
use commerce_service::infrastructure::query_metrics::QueryMetrics;
use commerce_service::{build_server, create_pool, run_migrations, AppState};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    let recorder = PrometheusMetrics::new(&config.service_name)?;
    let registry = recorder.registry().clone();
    let metrics: Arc<dyn MetricsEmitter> = Arc::new(recorder);

    let pool = create_pool(&config.database_url, &config.pool)?;
    run_migrations(&pool)?;

    let cache = match config.product_cache_max_entries {
        Some(max) => ProductCache::with_capacity_limit(config.product_cache_ttl, max),
        None => ProductCache::new(config.product_cache_ttl),
    };
    let state = web::Data::new(AppState::new(
        pool.clone(),
        Arc::clone(&metrics),
        cache,
        config.transition_policy,
    ));

    let monitor = ActiveCartsMonitor::start(
        Arc::new(DieselCartRepository::new(
            pool,
            QueryMetrics::new(Arc::clone(&metrics)),
        )),
        Arc::clone(&metrics),
        config.active_carts_interval,
    );

    log::info!(
        "Starting {} at http://{}:{}",
        config.service_name,
        config.host,
        config.port
    );

    let served = build_server(state, metrics, registry, &config.host, config.port)?.await;

    log::info!("Server stopped, shutting down background tasks");
    monitor.stop().await;

    Ok(served?)
}
