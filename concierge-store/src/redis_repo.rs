use async_trait::async_trait;
use concierge_core::providers::KeyValueCache;
use concierge_core::{CoreError, CoreResult};
use redis::{AsyncCommands, RedisResult};
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        // Fail at startup rather than on the first request
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Connected to Redis");
        Ok(Self { client })
    }

    pub async fn get_value(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }

    pub async fn set_value_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await
    }

    pub async fn set_value_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }

    pub async fn incr_window(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // The expiry is only armed by the first hit so the window does not slide
        let script = redis::Script::new(r#"
            local count = redis.call("INCR", KEYS[1])
            if count == 1 then
                redis.call("EXPIRE", KEYS[1], ARGV[1])
            end
            return count
        "#);
        let count: i64 = script.key(key).arg(window_seconds).invoke_async(&mut conn).await?;

        Ok(count <= limit)
    }
}

fn cache_error(err: redis::RedisError) -> CoreError {
    CoreError::StorageError(format!("redis: {}", err))
}

#[async_trait]
impl KeyValueCache for RedisClient {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        self.get_value(key).await.map_err(cache_error)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CoreResult<()> {
        self.set_value_ex(key, value, ttl_seconds).await.map_err(cache_error)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> CoreResult<bool> {
        self.set_value_nx_ex(key, value, ttl_seconds).await.map_err(cache_error)
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> CoreResult<bool> {
        self.incr_window(key, limit, window_seconds).await.map_err(cache_error)
    }
}
