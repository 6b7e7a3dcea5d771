use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Car, Order};

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    /// Conflict checks read through this after any write they validate
    /// against; results are last-writer-relative, not globally serialized.
    async fn list_orders_for_car(
        &self,
        car_id: Uuid,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_orders(&self) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn set_confirmed(
        &self,
        id: Uuid,
        confirmed: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for fleet data access
#[async_trait]
pub trait CarRepository: Send + Sync {
    async fn get_car(
        &self,
        id: Uuid,
    ) -> Result<Option<Car>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_cars(&self) -> Result<Vec<Car>, Box<dyn std::error::Error + Send + Sync>>;
}
