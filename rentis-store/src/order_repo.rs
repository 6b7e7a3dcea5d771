use async_trait::async_trait;
use rentis_core::models::{Car, Order};
use rentis_core::repository::{CarRepository, OrderRepository};
use rentis_shared::biztime::DateInput;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    car_id: Uuid,
    rental_start_date: String,
    rental_end_date: String,
    confirmed: bool,
    my_order: bool,
    total_price: i64,
    override_price: Option<i64>,
    customer_name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    flight_number: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            car_id: row.car_id,
            rental_start_date: DateInput::Text(row.rental_start_date),
            rental_end_date: DateInput::Text(row.rental_end_date),
            confirmed: row.confirmed,
            my_order: row.my_order,
            total_price: row.total_price,
            override_price: row.override_price,
            customer_name: row.customer_name,
            phone: row.phone,
            email: row.email,
            flight_number: row.flight_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Dates persist as the text they arrived in; normalization happens in the
/// engine, not the store.
fn date_text(input: &DateInput) -> String {
    match input {
        DateInput::Text(raw) => raw.clone(),
        DateInput::Timestamp(instant) => instant.to_rfc3339(),
    }
}

const ORDER_COLUMNS: &str = "id, car_id, rental_start_date, rental_end_date, confirmed, my_order, \
                             total_price, override_price, customer_name, phone, email, \
                             flight_number, created_at, updated_at";

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO orders (id, car_id, rental_start_date, rental_end_date, confirmed, \
             my_order, total_price, override_price, customer_name, phone, email, flight_number, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(order.id)
        .bind(order.car_id)
        .bind(date_text(&order.rental_start_date))
        .bind(date_text(&order.rental_end_date))
        .bind(order.confirmed)
        .bind(order.my_order)
        .bind(order.total_price)
        .bind(order.override_price)
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(&order.email)
        .bind(&order.flight_number)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order.id)
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    async fn list_orders_for_car(
        &self,
        car_id: Uuid,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE car_id = $1 ORDER BY created_at"
        ))
        .bind(car_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn update_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "UPDATE orders SET rental_start_date = $1, rental_end_date = $2, confirmed = $3, \
             total_price = $4, override_price = $5, customer_name = $6, phone = $7, email = $8, \
             flight_number = $9, updated_at = NOW() WHERE id = $10",
        )
        .bind(date_text(&order.rental_start_date))
        .bind(date_text(&order.rental_end_date))
        .bind(order.confirmed)
        .bind(order.total_price)
        .bind(order.override_price)
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(&order.email)
        .bind(&order.flight_number)
        .bind(order.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_confirmed(
        &self,
        id: Uuid,
        confirmed: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("UPDATE orders SET confirmed = $1, updated_at = NOW() WHERE id = $2")
            .bind(confirmed)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CarRow {
    id: Uuid,
    model: String,
}

#[async_trait]
impl CarRepository for StoreOrderRepository {
    async fn get_car(
        &self,
        id: Uuid,
    ) -> Result<Option<Car>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<CarRow> = sqlx::query_as("SELECT id, model FROM cars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let orders = self.list_orders_for_car(row.id).await?;
        Ok(Some(Car {
            id: row.id,
            model: row.model,
            orders,
        }))
    }

    async fn list_cars(&self) -> Result<Vec<Car>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<CarRow> = sqlx::query_as("SELECT id, model FROM cars ORDER BY model")
            .fetch_all(&self.pool)
            .await?;

        let mut cars = Vec::with_capacity(rows.len());
        for row in rows {
            let orders = self.list_orders_for_car(row.id).await?;
            cars.push(Car {
                id: row.id,
                model: row.model,
                orders,
            });
        }
        Ok(cars)
    }
}
