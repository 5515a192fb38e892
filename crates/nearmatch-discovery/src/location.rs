//! External collaborator seams: location fixes and venue presence.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use nearmatch_types::{AccountId, LocationFix, NearmatchError, Result};

/// Supplies a user's current location on demand.
///
/// The engine treats the fix as fresh truth for the duration of one
/// query. Accuracy is untrusted metadata and never feeds distance math.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// # Errors
    /// Returns [`NearmatchError::LocationUnavailable`] when no fix can be
    /// produced; the discovery query then fails rather than reusing
    /// cached distances.
    async fn current_fix(&self, account: AccountId) -> Result<LocationFix>;
}

/// The venue/check-in gate. Whether the user is physically present at a
/// participating venue is decided outside this engine; no venue means an
/// empty candidate set by product rule.
#[async_trait]
pub trait PresenceOracle: Send + Sync {
    /// # Errors
    /// Returns [`NearmatchError::ExternalUnavailable`] when the oracle
    /// itself cannot answer.
    async fn is_present(&self, account: AccountId) -> Result<bool>;
}

/// In-memory location provider for development and tests: serves
/// whatever fix was last stored per account.
#[derive(Default)]
pub struct StaticLocationProvider {
    fixes: RwLock<HashMap<AccountId, LocationFix>>,
}

impl StaticLocationProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, account: AccountId, fix: LocationFix) {
        self.fixes.write().await.insert(account, fix);
    }

    pub async fn clear(&self, account: AccountId) {
        self.fixes.write().await.remove(&account);
    }
}

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn current_fix(&self, account: AccountId) -> Result<LocationFix> {
        self.fixes.read().await.get(&account).copied().ok_or_else(|| {
            NearmatchError::LocationUnavailable {
                reason: format!("no fix for {account}"),
            }
        })
    }
}

/// Presence oracle that treats every account as checked in. Development
/// stand-in; production wires the venue collaborator here.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysPresent;

#[async_trait]
impl PresenceOracle for AlwaysPresent {
    async fn is_present(&self, _account: AccountId) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearmatch_types::GeoPoint;

    #[tokio::test]
    async fn static_provider_round_trips_fixes() {
        let provider = StaticLocationProvider::new();
        let account = AccountId::new();
        let fix = LocationFix {
            point: GeoPoint::new(32.08, 34.78).unwrap(),
            accuracy_m: 8.0,
        };
        provider.set(account, fix).await;

        let got = provider.current_fix(account).await.unwrap();
        assert_eq!(got, fix);
    }

    #[tokio::test]
    async fn missing_fix_is_typed_error() {
        let provider = StaticLocationProvider::new();
        let err = provider.current_fix(AccountId::new()).await.unwrap_err();
        assert!(matches!(err, NearmatchError::LocationUnavailable { .. }));
    }

    #[tokio::test]
    async fn cleared_fix_is_gone() {
        let provider = StaticLocationProvider::new();
        let account = AccountId::new();
        let fix = LocationFix {
            point: GeoPoint::new(0.0, 0.0).unwrap(),
            accuracy_m: 5.0,
        };
        provider.set(account, fix).await;
        provider.clear(account).await;
        assert!(provider.current_fix(account).await.is_err());
    }

    #[tokio::test]
    async fn always_present_says_yes() {
        assert!(AlwaysPresent.is_present(AccountId::new()).await.unwrap());
    }
}
