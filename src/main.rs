use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_planner::{
    AppState,
    ai::GeminiClient,
    cache::{CacheBackend, MemoryCache, RedisCache, ResponseCache},
    config::Config,
    places::PlacesClient,
    rate_limit::{MemoryRateLimitStore, RateLimitStore, RateLimiter, RedisRateLimitStore},
    router::create_router,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'trip_planner';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    // Without Redis, generations are not cached and limits and revocations are per process.
    let (response_backend, limit_store, sessions): (
        Option<Arc<dyn CacheBackend>>,
        Arc<dyn RateLimitStore>,
        Arc<dyn CacheBackend>,
    ) = match &config.redis_url {
        Some(url) => {
            let redis = Arc::new(redis::Client::open(url.as_str()).expect("Invalid REDIS_URL"));
            tracing::info!("Using Redis for response cache, rate limits and sessions");
            let cache: Arc<dyn CacheBackend> = Arc::new(RedisCache::new(Arc::clone(&redis)));
            (
                Some(Arc::clone(&cache)),
                Arc::new(RedisRateLimitStore::new(redis)),
                cache,
            )
        }
        None => {
            tracing::warn!("REDIS_URL not set: AI response caching disabled, rate limits kept in memory");
            (
                None,
                Arc::new(MemoryRateLimitStore::new()),
                Arc::new(MemoryCache::new()),
            )
        }
    };

    if config.google_api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY not set: AI endpoints will fail");
    }
    let ai = GeminiClient::from_config(&config).expect("Failed to build AI client");
    let places = PlacesClient::from_config(&config).expect("Failed to build places client");
    if !places.is_configured() {
        tracing::warn!("GOOGLE_PLACES_API_KEY not set: place search will fail");
    }

    let state = AppState {
        pool,
        ai: Arc::new(ai),
        responses: ResponseCache::new(response_backend, config.ai_cache_ttl()),
        rate_limiter: Arc::new(RateLimiter::from_config(limit_store, &config)),
        sessions,
        places,
        config: config.clone(),
    };

    let router = create_router(state);

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
