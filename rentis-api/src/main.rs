use std::net::SocketAddr;
use std::sync::Arc;

use rentis_api::{app, state::{AppState, AuthConfig}};
use rentis_core::pricing::SeasonalRateTable;
use rentis_guard::AbuseGuard;
use rentis_store::StoreOrderRepository;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentis_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rentis_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Rentis API on port {}", config.server.port);

    let db = rentis_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let guard_backend = rentis_api::state::shared_guard_backend(&config, &db)
        .await
        .expect("Failed to initialize guard backend");
    let guard = Arc::new(AbuseGuard::new(guard_backend, config.guard.clone()));

    let repo = Arc::new(StoreOrderRepository::new(db.pool.clone()));

    let rates = Arc::new(SeasonalRateTable {
        base_day_rate_cents: config.business_rules.base_day_rate_cents,
        season_multipliers: config
            .business_rules
            .season_multipliers
            .iter()
            .filter_map(|(month, multiplier)| {
                month.parse::<u32>().ok().map(|m| (m, *multiplier))
            })
            .collect(),
    });

    let app_state = AppState {
        order_repo: repo.clone(),
        car_repo: repo,
        guard,
        rates,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
