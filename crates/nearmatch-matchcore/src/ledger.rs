//! The match ledger: permanent, exactly-once records per pair.
//!
//! Records are never evicted — the newest record's timestamp is the
//! durable source of the re-surfacing cooldown, and it must outlive the
//! ephemeral session built from it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use std::collections::HashMap;

use nearmatch_discovery::RecentMatchIndex;
use nearmatch_types::{
    AccountId, MatchRecord, MatchStatus, NearmatchError, PairId, Result,
};

/// Permanent match records, one per pair (the newest outcome wins the
/// slot; the pair key itself never goes away).
pub struct MatchLedger {
    records: RwLock<HashMap<PairId, MatchRecord>>,
}

impl MatchLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Record a fresh mutual match. Exactly-once guard: a pair that is
    /// already pending cannot be re-inserted, so racing double-likes can
    /// never mint two records. A pair whose previous record is terminal
    /// (declined/successful, past its cooldown) starts a new pending
    /// record with a fresh timestamp.
    ///
    /// # Errors
    /// [`NearmatchError::MatchAlreadyExists`] when a pending record is
    /// already in place.
    pub async fn insert_pending(&self, pair: PairId) -> Result<MatchRecord> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&pair) {
            if existing.status == MatchStatus::Pending {
                return Err(NearmatchError::MatchAlreadyExists(pair));
            }
        }
        let record = MatchRecord::new_pending(pair);
        records.insert(pair, record.clone());
        info!(%pair, "match recorded");
        Ok(record)
    }

    pub async fn get(&self, pair: PairId) -> Option<MatchRecord> {
        self.records.read().await.get(&pair).cloned()
    }

    /// Mark the pair's record declined, appending one if none exists.
    /// The merge keeps the original timestamp, so the cooldown window
    /// runs from match creation either way — a decline must not let the
    /// pair resurface early.
    pub async fn mark_declined(&self, pair: PairId, by: AccountId) -> MatchRecord {
        let mut records = self.records.write().await;
        let record = records.entry(pair).or_insert_with(|| MatchRecord::new_pending(pair));
        record.status = MatchStatus::Declined;
        record.declined_by = Some(by);
        record.clone()
    }

    /// Mark the pair's record successful (meeting confirmed).
    ///
    /// # Errors
    /// [`NearmatchError::MatchNotFound`] if no record exists.
    pub async fn mark_successful(&self, pair: PairId) -> Result<MatchRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&pair)
            .ok_or(NearmatchError::MatchNotFound(pair))?;
        record.status = MatchStatus::Successful;
        Ok(record.clone())
    }

    /// Load a persisted record into its slot, replacing whatever is
    /// there. Storage adapters use this at startup; the engine itself
    /// only writes through [`Self::insert_pending`] and the mark
    /// operations.
    pub async fn restore(&self, record: MatchRecord) {
        self.records.write().await.insert(record.pair, record);
    }

    /// Number of pairs with a record.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MatchLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecentMatchIndex for MatchLedger {
    async fn latest_match_at(&self, pair: &PairId) -> Option<DateTime<Utc>> {
        self.records.read().await.get(pair).map(|r| r.created_at)
    }
}
