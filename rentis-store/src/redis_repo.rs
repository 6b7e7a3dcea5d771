use redis::RedisResult;
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        info!("Redis client ready");
        Ok(Self { client })
    }

    /// Bump a fixed-window counter and report how long the window has left.
    ///
    /// The expiry is only armed on the first hit of a window, otherwise each
    /// request would push the reset further out and a steady trickle could
    /// throttle forever.
    pub async fn incr_window(&self, key: &str, window_sec: u64) -> RedisResult<(i64, i64)> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let script = redis::Script::new(
            r#"
            local count = redis.call("INCR", KEYS[1])
            if count == 1 then
                redis.call("PEXPIRE", KEYS[1], ARGV[1])
            end
            local ttl = redis.call("PTTL", KEYS[1])
            return {count, ttl}
        "#,
        );

        let (count, ttl_ms): (i64, i64) = script
            .key(key)
            .arg(window_sec * 1000)
            .invoke_async(&mut conn)
            .await?;

        Ok((count, ttl_ms.max(0)))
    }
}
