use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::CacheBackend;
use crate::error::{GatewayError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed store. The connection manager is cheap to clone and
/// reconnects on its own, so one instance serves all requests.
///
/// Every command is bounded by a timeout, so a server that accepts
/// connections but stops answering reads as a cache error.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    command_timeout: Duration,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| GatewayError::Cache(format!("Invalid cache URL: {e}")))?;

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                GatewayError::Cache(format!(
                    "Timed out connecting to cache after {} seconds",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| GatewayError::Cache(format!("Failed to connect to cache: {e}")))?;

        Ok(Self {
            conn,
            command_timeout: COMMAND_TIMEOUT,
        })
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    async fn bounded<T>(
        &self,
        command: &str,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| {
                GatewayError::Cache(format!(
                    "{command} timed out after {} ms",
                    self.command_timeout.as_millis()
                ))
            })?
            .map_err(|e| GatewayError::Cache(format!("{command} failed: {e}")))
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded("GET", conn.get::<_, Option<String>>(key)).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SET EX rejects 0, and a sub-second TTL should still expire.
        let seconds = ttl.as_secs().max(1);
        self.bounded("SET EX", conn.set_ex::<_, _, ()>(key, value, seconds))
            .await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
