//! Redis-backed entity lock for multi-server deployments.
//!
//! Acquisition is `SET key token NX PX ttl`. Release runs a Lua script that
//! deletes the key only when its value still equals the caller's token, so
//! release-after-expiry can never drop another holder's lock.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::MultiplexedConnection;
use redis::Script;
use std::time::Duration;

use crate::ports::{EntityLock, LockError, LockToken};

static RELEASE_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#,
    )
});

/// Redis-backed entity lock.
#[derive(Clone)]
pub struct RedisEntityLock {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisEntityLock {
    /// Creates a lock over an existing Redis connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "lock:".to_string(),
        }
    }

    /// Overrides the key prefix (default `lock:`).
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl EntityLock for RedisEntityLock {
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, LockError> {
        let token = LockToken::generate();
        let mut conn = self.conn.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(self.redis_key(key))
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::Unavailable(e.to_string()))?;
        Ok(set.map(|_| token))
    }

    async fn release(&self, key: &str, token: &LockToken) -> Result<bool, LockError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = RELEASE_SCRIPT
            .key(self.redis_key(key))
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Unavailable(e.to_string()))?;
        Ok(deleted == 1)
    }
}
