//! Repository implementations for domain entities
//!
//! Repositories encapsulate SQL queries and work on plain row types; the
//! adapters map rows to and from domain types.
//!
//! Each repository follows these principles:
//! - Runtime-checked queries mapped with `sqlx::FromRow`
//! - Transaction support for multi-table writes
//! - Optimistic concurrency control through a version column

pub mod claims;

pub use claims::ClaimsRepository;
