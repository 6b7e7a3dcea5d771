use std::sync::Arc;

use rentis_core::pricing::SeasonalRateTable;
use rentis_core::repository::{CarRepository, OrderRepository};
use rentis_guard::AbuseGuard;
use rentis_store::app_config::Config;
use rentis_store::{DbClient, RedisClient, StoreGuardBackend};
use tokio::sync::OnceCell;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub order_repo: Arc<dyn OrderRepository>,
    pub car_repo: Arc<dyn CarRepository>,
    pub guard: Arc<AbuseGuard>,
    pub rates: Arc<SeasonalRateTable>,
    pub auth: AuthConfig,
    pub business_rules: rentis_store::app_config::BusinessRules,
}

// One guard backend per process: the redis handle inside is the only
// long-lived resource this service holds.
static GUARD_BACKEND: OnceCell<Arc<StoreGuardBackend>> = OnceCell::const_new();

/// Lazily build (exactly once) the shared guard backend.
pub async fn shared_guard_backend(
    config: &Config,
    db: &DbClient,
) -> Result<Arc<StoreGuardBackend>, anyhow::Error> {
    let backend = GUARD_BACKEND
        .get_or_try_init(|| async {
            let redis = RedisClient::new(&config.redis.url).await?;
            Ok::<_, anyhow::Error>(Arc::new(StoreGuardBackend::new(redis, db.pool.clone())))
        })
        .await?;
    Ok(backend.clone())
}
