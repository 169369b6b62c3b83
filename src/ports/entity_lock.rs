//! EntityLock port - distributed mutual exclusion with TTL.
//!
//! Serializes conflicting operations on one entity (one generation round per
//! quiz at a time). Acquisition is `SET NX` with expiry; release is a
//! compare-and-delete keyed by a random ownership token, so a holder whose
//! lock expired and was re-acquired elsewhere can never delete the new
//! holder's lock. No renewal: held work must bound itself under the TTL.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Random token proving lock ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    /// Mints a fresh ownership token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reconstructs a token from its string form.
    pub fn from_string(raw: String) -> Self {
        Self(raw)
    }

    /// The token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lock backend errors.
#[derive(Debug, Clone, Error)]
pub enum LockError {
    #[error("lock backend unavailable: {0}")]
    Unavailable(String),
}

/// Port for distributed per-entity locks.
#[async_trait]
pub trait EntityLock: Send + Sync {
    /// Attempts a single non-blocking acquisition.
    ///
    /// Returns the ownership token on success, `None` when the key is
    /// already held.
    async fn try_acquire(&self, key: &str, ttl: Duration)
        -> Result<Option<LockToken>, LockError>;

    /// Releases the lock iff `token` still owns it.
    ///
    /// Returns true when the lock was deleted; false means the token no
    /// longer owned the key (expired and possibly re-acquired) and nothing
    /// was deleted.
    async fn release(&self, key: &str, token: &LockToken) -> Result<bool, LockError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        assert_ne!(LockToken::generate(), LockToken::generate());
    }

    #[test]
    fn token_roundtrips_through_string() {
        let token = LockToken::generate();
        let copy = LockToken::from_string(token.as_str().to_string());
        assert_eq!(token, copy);
    }
}
