//! Tests for core_kernel error types

use core_kernel::{AppError, ErrorCategory, ErrorKey, MoneyError};

#[test]
fn test_app_error_user() {
    let error = AppError::user(ErrorKey::ClaimStatus, "invalid claim status for submit");

    assert_eq!(error.category, ErrorCategory::User);
    assert_eq!(error.key, ErrorKey::ClaimStatus);
    assert_eq!(error.message, "invalid claim status for submit");
}

#[test]
fn test_app_error_display_includes_key() {
    let error = AppError::validation("description is required");
    let display = format!("{}", error);

    assert!(display.starts_with("validation:"));
    assert!(display.contains("description is required"));
}

#[test]
fn test_app_error_forbidden() {
    let error = AppError::forbidden("not a member of the policy");

    assert_eq!(error.category, ErrorCategory::Forbidden);
    assert_eq!(error.key.as_str(), "forbidden");
    assert!(error.category.is_client_error());
}

#[test]
fn test_app_error_from_money_error() {
    let money_error = MoneyError::InvalidFractionDigits("1.5".to_string());
    let app_error: AppError = money_error.into();

    assert_eq!(app_error.category, ErrorCategory::User);
    assert_eq!(app_error.key, ErrorKey::InvalidInput);
}

#[test]
fn test_error_keys_are_snake_case() {
    let keys = [
        (ErrorKey::ClaimMissingClaimItem, "claim_missing_claim_item"),
        (ErrorKey::ClaimItemMissingFmv, "claim_item_missing_fmv"),
        (ErrorKey::ClaimInvalidApprover, "claim_invalid_approver"),
        (ErrorKey::QueryFailure, "query_failure"),
    ];

    for (key, expected) in keys {
        assert_eq!(key.as_str(), expected);
        assert_eq!(serde_json::to_string(&key).unwrap(), format!("\"{}\"", expected));
    }
}

#[test]
fn test_client_error_categories() {
    assert!(ErrorCategory::User.is_client_error());
    assert!(ErrorCategory::Conflict.is_client_error());
    assert!(!ErrorCategory::Database.is_client_error());
    assert!(!ErrorCategory::Internal.is_client_error());
}
