//! # nearmatch-entitlement
//!
//! **Entitlement plane**: the consumable-pass ledger keyed by true
//! identity, and the pluggable identity resolution seam.
//!
//! ## Why true identity
//!
//! Passes and cooldown locks hang off an [`IdentityKey`] — a stable
//! real-world anchor such as a verified phone number — never off the
//! login credential. Deleting an account and registering a fresh one on
//! the same identity re-attaches to the same ledger record, so the
//! obvious farming vector (credential cycling for free passes) buys
//! nothing.
//!
//! ## Lazy expiry
//!
//! There is no background sweeper. An elapsed cooldown lock is cleared
//! and passes restored on the next read ([`EntitlementLedger::is_locked`]
//! or any consume path). Every read path here can therefore write.
//!
//! [`IdentityKey`]: nearmatch_types::IdentityKey

pub mod ledger;
pub mod resolver;

pub use ledger::EntitlementLedger;
pub use resolver::{DeterministicResolver, IdentityResolver};
