//! Bearer-token identity lookup.
//!
//! The core trusts whatever identity the registry resolves; `Admin`
//! bypasses ownership checks downstream. Tokens are seeded from the
//! `AUTH_TOKENS` environment entry as comma-separated `token=user:role`
//! pairs, e.g. `s3cret=alice:admin,t0ken=bob:user`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Resolved caller identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub role: Role,
    pub is_active: bool,
}

impl UserIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// In-memory token registry, backed by `RwLock` for runtime mutation.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    tokens: Arc<RwLock<HashMap<String, UserIdentity>>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `AUTH_TOKENS` entry. Missing entry yields an empty
    /// registry (every request then fails authentication).
    pub fn from_env() -> Result<Self> {
        let registry = Self::new();
        let raw = match std::env::var("AUTH_TOKENS") {
            Ok(raw) => raw,
            Err(_) => return Ok(registry),
        };

        for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let (token, identity) = match pair.trim().split_once('=') {
                Some(parts) => parts,
                None => bail!("AUTH_TOKENS entry missing '=': {}", pair),
            };
            let (user, role) = match identity.split_once(':') {
                Some((user, "admin")) => (user, Role::Admin),
                Some((user, "user")) => (user, Role::User),
                Some((_, other)) => bail!("Unknown role in AUTH_TOKENS: {}", other),
                None => (identity, Role::User),
            };
            registry.insert(
                token,
                UserIdentity {
                    id: user.to_string(),
                    role,
                    is_active: true,
                },
            );
        }

        info!(
            "Identity registry loaded ({} tokens)",
            registry.tokens.read().unwrap().len()
        );
        Ok(registry)
    }

    pub fn insert(&self, token: &str, identity: UserIdentity) {
        self.tokens
            .write()
            .unwrap()
            .insert(token.to_string(), identity);
    }

    /// Resolve a bearer token. Inactive identities resolve to `None`.
    pub fn resolve(&self, token: &str) -> Option<UserIdentity> {
        self.tokens
            .read()
            .unwrap()
            .get(token)
            .filter(|u| u.is_active)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str, role: Role, is_active: bool) -> UserIdentity {
        UserIdentity {
            id: id.to_string(),
            role,
            is_active,
        }
    }

    #[test]
    fn resolves_active_tokens_only() {
        let registry = IdentityRegistry::new();
        registry.insert("good", identity("alice", Role::User, true));
        registry.insert("stale", identity("bob", Role::User, false));

        assert_eq!(registry.resolve("good").unwrap().id, "alice");
        assert!(registry.resolve("stale").is_none());
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn admin_flag() {
        assert!(identity("root", Role::Admin, true).is_admin());
        assert!(!identity("alice", Role::User, true).is_admin());
    }
}
