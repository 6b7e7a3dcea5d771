use async_trait::async_trait;
use rentis_guard::ban::{Ban, BanType};
use rentis_guard::store::{GuardStore, StoreError, WindowCount};
use sqlx::PgPool;
use uuid::Uuid;

use crate::redis_repo::RedisClient;

/// Production guard state: hot counters in redis, ban records in Postgres.
///
/// Counters are disposable (a redis restart just resets windows); bans are
/// durable and auditable, so they live next to the orders.
pub struct StoreGuardBackend {
    redis: RedisClient,
    pool: PgPool,
}

impl StoreGuardBackend {
    pub fn new(redis: RedisClient, pool: PgPool) -> Self {
        Self { redis, pool }
    }
}

#[derive(sqlx::FromRow)]
struct BanRow {
    id: Uuid,
    ip: Option<String>,
    fingerprint: Option<String>,
    reason: String,
    ban_type: String,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<BanRow> for Ban {
    fn from(row: BanRow) -> Self {
        Ban {
            id: row.id,
            ip: row.ip,
            fingerprint: row.fingerprint,
            reason: row.reason,
            ban_type: if row.ban_type == "auto" {
                BanType::Auto
            } else {
                BanType::Manual
            },
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

fn ban_type_text(ban_type: BanType) -> &'static str {
    match ban_type {
        BanType::Auto => "auto",
        BanType::Manual => "manual",
    }
}

#[async_trait]
impl GuardStore for StoreGuardBackend {
    async fn incr_request(&self, key: &str, window_sec: u64) -> Result<WindowCount, StoreError> {
        let (count, ttl_ms) = self
            .redis
            .incr_window(&format!("guard:req:{key}"), window_sec)
            .await?;
        Ok(WindowCount {
            count: count.max(0) as u32,
            ms_remaining: ttl_ms,
        })
    }

    async fn incr_payload(
        &self,
        key: &str,
        payload_hash: &str,
        window_sec: u64,
    ) -> Result<u32, StoreError> {
        let (count, _) = self
            .redis
            .incr_window(&format!("guard:payload:{key}:{payload_hash}"), window_sec)
            .await?;
        Ok(count.max(0) as u32)
    }

    async fn incr_failure(&self, key: &str, window_sec: u64) -> Result<u32, StoreError> {
        let (count, _) = self
            .redis
            .incr_window(&format!("guard:fail:{key}"), window_sec)
            .await?;
        Ok(count.max(0) as u32)
    }

    async fn save_ban(&self, ban: &Ban) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bans (id, ip, fingerprint, reason, ban_type, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(ban.id)
        .bind(&ban.ip)
        .bind(&ban.fingerprint)
        .bind(&ban.reason)
        .bind(ban_type_text(ban.ban_type))
        .bind(ban.expires_at)
        .bind(ban.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bans_for_identity(
        &self,
        ip: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<Vec<Ban>, StoreError> {
        let rows: Vec<BanRow> = sqlx::query_as(
            "SELECT id, ip, fingerprint, reason, ban_type, expires_at, created_at FROM bans \
             WHERE (ip IS NOT NULL AND ip = $1) \
                OR (fingerprint IS NOT NULL AND fingerprint = $2)",
        )
        .bind(ip)
        .bind(fingerprint)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ban::from).collect())
    }

    async fn remove_ban(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
