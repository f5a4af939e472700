//! Structured application error shared by every layer
//!
//! An `AppError` pairs a coarse category, which the HTTP layer maps to a
//! status code, with a stable machine-readable key. The message is for
//! debugging and is not guaranteed to stay stable.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::money::MoneyError;

/// Coarse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The caller asked for something the rules do not allow
    User,
    NotFound,
    Unauthorized,
    Forbidden,
    /// A concurrent change won the race
    Conflict,
    Database,
    Internal,
}

impl ErrorCategory {
    /// Returns true for categories caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorCategory::User
                | ErrorCategory::NotFound
                | ErrorCategory::Unauthorized
                | ErrorCategory::Forbidden
                | ErrorCategory::Conflict
        )
    }
}

/// Stable machine-readable error keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKey {
    // Claim lifecycle
    ClaimStatus,
    ClaimMissingClaimItem,
    ClaimInvalidApprover,
    ClaimMissingStatusReason,
    ClaimMissingReceipt,
    ClaimNotApproved,
    ClaimNotFound,

    // Claim item readiness
    ClaimItemMissingPayoutOption,
    ClaimItemNotRepairable,
    ClaimItemMissingReplaceEstimate,
    ClaimItemMissingFmv,
    ClaimItemInvalidPayoutOption,
    ClaimItemMissingRepairEstimate,
    ClaimItemNotFound,

    // Generic
    Validation,
    InvalidInput,
    NotFound,
    NotAuthorized,
    Forbidden,
    Conflict,
    QueryFailure,
    CreateFailure,
    UpdateFailure,
    Unknown,
}

impl ErrorKey {
    /// Returns the wire form of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKey::ClaimStatus => "claim_status",
            ErrorKey::ClaimMissingClaimItem => "claim_missing_claim_item",
            ErrorKey::ClaimInvalidApprover => "claim_invalid_approver",
            ErrorKey::ClaimMissingStatusReason => "claim_missing_status_reason",
            ErrorKey::ClaimMissingReceipt => "claim_missing_receipt",
            ErrorKey::ClaimNotApproved => "claim_not_approved",
            ErrorKey::ClaimNotFound => "claim_not_found",
            ErrorKey::ClaimItemMissingPayoutOption => "claim_item_missing_payout_option",
            ErrorKey::ClaimItemNotRepairable => "claim_item_not_repairable",
            ErrorKey::ClaimItemMissingReplaceEstimate => "claim_item_missing_replace_estimate",
            ErrorKey::ClaimItemMissingFmv => "claim_item_missing_fmv",
            ErrorKey::ClaimItemInvalidPayoutOption => "claim_item_invalid_payout_option",
            ErrorKey::ClaimItemMissingRepairEstimate => "claim_item_missing_repair_estimate",
            ErrorKey::ClaimItemNotFound => "claim_item_not_found",
            ErrorKey::Validation => "validation",
            ErrorKey::InvalidInput => "invalid_input",
            ErrorKey::NotFound => "not_found",
            ErrorKey::NotAuthorized => "not_authorized",
            ErrorKey::Forbidden => "forbidden",
            ErrorKey::Conflict => "conflict",
            ErrorKey::QueryFailure => "query_failure",
            ErrorKey::CreateFailure => "create_failure",
            ErrorKey::UpdateFailure => "update_failure",
            ErrorKey::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single structured error surfaced to the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key}: {message}")]
pub struct AppError {
    pub category: ErrorCategory,
    pub key: ErrorKey,
    pub message: String,
}

impl AppError {
    pub fn new(category: ErrorCategory, key: ErrorKey, message: impl Into<String>) -> Self {
        Self {
            category,
            key,
            message: message.into(),
        }
    }

    /// A caller-caused error
    pub fn user(key: ErrorKey, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::User, key, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::user(ErrorKey::Validation, message)
    }

    pub fn not_found(key: ErrorKey, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, key, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Forbidden, ErrorKey::Forbidden, message)
    }

    pub fn database(key: ErrorKey, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Database, key, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, ErrorKey::Unknown, message)
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        AppError::user(ErrorKey::InvalidInput, err.to_string())
    }
}
