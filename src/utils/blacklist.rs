// src/utils/blacklist.rs

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

/// Revoked token ids (`jti`), each kept until the token's own expiry.
///
/// Process-local: a restart forgets revocations, which is acceptable because
/// tokens are short-lived.
#[derive(Clone, Default)]
pub struct TokenBlacklist {
    revoked: Arc<RwLock<HashMap<String, usize>>>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes `jti` until `exp` (Unix seconds). Entries already past their
    /// expiry are dropped on the way.
    pub async fn revoke(&self, jti: &str, exp: usize, now: usize) {
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, until| *until > now);
        revoked.insert(jti.to_owned(), exp);
        tracing::info!(jti = %jti, ttl = exp.saturating_sub(now), "token revoked");
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.contains_key(jti)
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }
}
