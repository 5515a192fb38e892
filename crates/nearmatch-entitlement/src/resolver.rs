//! Identity resolution: mapping a login credential to its true identity.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use nearmatch_types::{AccountId, IdentityKey, Result};

/// Resolves an account id to the stable identity key the entitlement
/// ledger is keyed on.
///
/// Production deployments back this with real phone verification; the
/// ledger never cares which implementation is behind the trait.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the true identity for an account.
    ///
    /// # Errors
    /// Implementations surface verification failures as
    /// [`nearmatch_types::NearmatchError::ExternalUnavailable`].
    async fn resolve(&self, account: AccountId) -> Result<IdentityKey>;
}

/// Deterministic stand-in resolver: hashes the account id into a stable
/// key. One account id always maps to the same identity, which is enough
/// for development and tests but provides no real-world anchoring —
/// swap in a verifying resolver before production.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicResolver;

impl DeterministicResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Derivation shared with [`IdentityResolver::resolve`], usable
    /// synchronously in tests.
    #[must_use]
    pub fn derive(account: AccountId) -> IdentityKey {
        let mut hasher = Sha256::new();
        hasher.update(b"nearmatch:identity:v1:");
        hasher.update(account.0.as_bytes());
        let hash = hasher.finalize();
        IdentityKey::new(format!("dev:{}", hex::encode(&hash[..8])))
    }
}

#[async_trait]
impl IdentityResolver for DeterministicResolver {
    async fn resolve(&self, account: AccountId) -> Result<IdentityKey> {
        Ok(Self::derive(account))
    }
}
