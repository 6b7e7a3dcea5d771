pub mod app_config;
pub mod database;
pub mod guard_store;
pub mod order_repo;
pub mod redis_repo;

pub use database::DbClient;
pub use guard_store::StoreGuardBackend;
pub use order_repo::StoreOrderRepository;
pub use redis_repo::RedisClient;
