//! Custom Test Assertions
//!
//! Provides assertion helpers for claim errors and history rows that give
//! more meaningful failure messages than standard assertions.

use std::fmt::Debug;

use core_kernel::{AppError, ErrorCategory, ErrorKey, Money};
use domain_claims::{ClaimError, ClaimHistory};

/// Asserts that a domain result failed with `key`
///
/// # Panics
///
/// Panics if the result is `Ok` or carries a different key
pub fn assert_claim_error_key<T: Debug>(result: &Result<T, ClaimError>, key: ErrorKey) {
    match result {
        Ok(value) => panic!("Expected error {}, got Ok({:?})", key, value),
        Err(err) => assert_eq!(
            err.key(),
            key,
            "Unexpected error key for '{}': got {}, expected {}",
            err,
            err.key(),
            key
        ),
    }
}

/// Asserts that a service result failed with `category` and `key`
pub fn assert_app_error<T: Debug>(result: &Result<T, AppError>, category: ErrorCategory, key: ErrorKey) {
    match result {
        Ok(value) => panic!("Expected {:?}/{}, got Ok({:?})", category, key, value),
        Err(err) => {
            assert_eq!(err.category, category, "Unexpected category for '{}'", err);
            assert_eq!(err.key, key, "Unexpected key for '{}'", err);
        }
    }
}

/// Asserts that a claim-level history row records `field` changing from `old` to `new`
pub fn assert_history_contains(histories: &[ClaimHistory], field: &str, old: &str, new: &str) {
    let found = histories
        .iter()
        .any(|h| h.claim_item_id.is_none() && h.field_name == field && h.old_value == old && h.new_value == new);
    assert!(
        found,
        "No history row for {} '{}' -> '{}'; rows: {:?}",
        field,
        old,
        new,
        histories
            .iter()
            .map(|h| format!("{}: '{}' -> '{}'", h.field_name, h.old_value, h.new_value))
            .collect::<Vec<_>>()
    );
}

/// Asserts that a Money value equals `minor_units` cents
pub fn assert_money_minor(money: &Money, minor_units: i64) {
    assert_eq!(
        money.minor_units(),
        minor_units,
        "Expected {} minor units, got {}",
        minor_units,
        money
    );
}
