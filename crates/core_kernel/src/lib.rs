//! Core Kernel - Foundational types shared by the claims workspace
//!
//! This crate provides the building blocks used by every other crate:
//! - `Money`, an exact fixed-point amount in cents
//! - Strongly-typed identifiers
//! - `AppError`, the category/key/message error surfaced at the boundary
//! - Port error and marker traits for the hexagonal architecture

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, MoneyError, MINOR_UNITS_PER_MAJOR};
pub use identifiers::{
    ClaimHistoryId, ClaimId, ClaimItemId, FileId, ItemId, LedgerEntryId, PolicyId, UserId,
};
pub use error::{AppError, ErrorCategory, ErrorKey};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
