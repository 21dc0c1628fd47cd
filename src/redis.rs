use crate::error::Result;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Short-lived keys the handlers depend on: rate-limit counters and admin
/// sessions.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Counts one hit against `key`. Returns false once `limit` hits have
    /// landed inside the window.
    async fn check_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_seconds: usize,
    ) -> Result<bool>;

    async fn store_session(
        &self,
        session_id: &str,
        subject: &str,
        ttl_seconds: usize,
    ) -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<String>>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct RedisClient {
    manager: Arc<Mutex<ConnectionManager>>,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager: Arc::new(Mutex::new(manager)),
        })
    }

    // Analytics fan-out
    pub async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let _: () = conn.publish(channel, message).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCache for RedisClient {
    // Rate limiting
    async fn check_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_seconds: usize,
    ) -> Result<bool> {
        let mut conn = self.manager.lock().await;

        let current: Option<u32> = conn.get(key).await?;

        if current.unwrap_or(0) >= limit {
            return Ok(false);
        }

        let count: u32 = conn.incr(key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(key, window_seconds as i64).await?;
        }

        Ok(true)
    }

    // Session management
    async fn store_session(
        &self,
        session_id: &str,
        subject: &str,
        ttl_seconds: usize,
    ) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let key = format!("session:{}", session_id);

        let _: () = conn.set_ex(key, subject, ttl_seconds as u64).await?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<String>> {
        let mut conn = self.manager.lock().await;
        let key = format!("session:{}", session_id);

        let subject: Option<String> = conn.get(key).await?;
        Ok(subject)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let key = format!("session:{}", session_id);

        let _: () = conn.del(key).await?;
        Ok(())
    }
}
