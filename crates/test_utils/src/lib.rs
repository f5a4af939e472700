//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! claims test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built actors, amounts and dates
//! - `builders`: Builder patterns for claims, claim items and covered items
//! - `assertions`: Assertion helpers for claim errors and history rows
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
