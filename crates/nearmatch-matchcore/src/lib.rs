//! # nearmatch-matchcore
//!
//! **Match plane**: the swipe ledger, the per-pair lock registry, the
//! permanent match ledger, and the orchestrating swipe engine.
//!
//! ## Architecture
//!
//! The swipe engine sits at the meeting point of the other planes:
//! 1. **PairLockRegistry**: one mutex per canonical pair — the
//!    linearization point for mutual-match detection
//! 2. **MatchLedger**: permanent exactly-once records, the durable
//!    source of the re-surfacing cooldown
//! 3. **SwipeEngine**: coordinates profile store, entitlement ledger,
//!    and session manager inside the pair's critical section
//!
//! ## Swipe Flow
//!
//! ```text
//! record_swipe → pair lock → read target likes
//!     ├─ one-sided → append like, done
//!     └─ mutual    → consume pass → append like → MatchLedger.insert
//!                    → session open → publish to both participants
//! ```
//!
//! Two concurrent likes for the same pair serialize on the pair lock and
//! yield exactly one match record — never zero, never two.

pub mod ledger;
pub mod pair_lock;
pub mod swipe;

pub use ledger::MatchLedger;
pub use pair_lock::PairLockRegistry;
pub use swipe::{SwipeEngine, SwipeOutcome};
