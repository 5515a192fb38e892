//! # nearmatch-session
//!
//! **Session plane**: lifecycle of the active match session — creation,
//! decision transitions, wall-clock expiry, partner-gone teardown — and
//! the event bus that pushes every transition to both participants.
//!
//! ## State Machine
//!
//! `Active` → one of {`MeetingConfirmed`, `Declined`, `Expired`,
//! `PartnerGone`}, all terminal. Closed sessions stay in the store with
//! `is_active = false` until a participant acknowledges, which is what
//! makes racing expiry calls trivially idempotent.
//!
//! ## Live propagation
//!
//! Clients never poll: [`SessionBus::subscribe_for`] yields a feed
//! filtered to "sessions where I am a participant", and the manager
//! publishes on every transition. A feed that lags skips events; it
//! never errors.

pub mod events;
pub mod manager;

pub use events::{ParticipantFeed, ParticipantStream, SessionBus};
pub use manager::{SessionManager, SessionStatus};
