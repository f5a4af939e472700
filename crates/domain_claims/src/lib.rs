//! Claims Domain
//!
//! This crate implements the claim lifecycle from draft through multi-step
//! review to approval and payment, together with the payout engine, the
//! field-level audit trail and the ledger postings for approved claims.
//!
//! # Claim Lifecycle
//!
//! ```text
//! Draft -> Review1 -> Review2 -> Review3 -> Approved -> Paid
//!              \-> Receipt -/               \-> Denied
//! ```
//!
//! Domain operations are synchronous and do no I/O. `ClaimLifecycleService`
//! wires them to the persistence and event ports.

pub mod actor;
pub mod claim;
pub mod claim_item;
pub mod error;
pub mod events;
pub mod file;
pub mod history;
pub mod ledger;
pub mod ports;
pub mod service;

pub use actor::{Actor, AppRole};
pub use claim::{Claim, ClaimStatus, ClaimTransition, IncidentType, REFERENCE_NUMBER_LENGTH};
pub use claim_item::{ClaimItem, CoveredItem, PayoutOption, UpdateClaimItemParams};
pub use error::ClaimError;
pub use events::ClaimEvent;
pub use file::{ClaimFile, ClaimFilePurpose};
pub use history::{recent_status_changes, submitted_at, ClaimHistory, FieldUpdate, HistoryAction};
pub use ledger::{LedgerEntry, LedgerEntryType};
pub use ports::{ClaimChangeSet, ClaimEventPublisher, ClaimFilter, ClaimsPort};
pub use service::{ClaimLifecycleService, NewClaim};
