//! # credo-core
//!
//! Foundation crate for the credo trust engine.
//! Defines all domain types, bounded-value newtypes, configuration, errors,
//! and the persistence trait. Every other crate in the workspace depends
//! on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::TrustConfig;
pub use errors::{CredoError, CredoResult};
pub use models::intel::{Opinion, ThreatVerdict};
pub use models::peer::{OrgId, PeerId, PeerIdentity};
pub use models::record::TrustRecord;
pub use models::trust::{HistoryRecord, ScoreValue, TrustValue};
pub use traits::store::{RosterDiff, TrustStore};
