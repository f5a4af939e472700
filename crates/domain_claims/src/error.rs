//! Claims domain errors

use thiserror::Error;

use core_kernel::{AppError, ClaimItemId, ErrorCategory, ErrorKey, MoneyError};

use crate::claim::{ClaimStatus, IncidentType};
use crate::claim_item::PayoutOption;

/// Errors that can occur in the claims domain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("invalid claim status for {operation}: {status}")]
    InvalidStatus {
        operation: &'static str,
        status: ClaimStatus,
    },

    #[error("claim must have a claimItem if no longer in draft")]
    MissingClaimItem,

    #[error("claim item {item_id} is not valid for claim submission: {key}")]
    ItemNotReady { item_id: ClaimItemId, key: ErrorKey },

    #[error("payout option {payout_option} is not valid for incident type {incident_type}")]
    InvalidPayoutOption {
        payout_option: PayoutOption,
        incident_type: IncidentType,
    },

    #[error("cannot approve payout option {payout_option} from status {status}")]
    InvalidPayoutOptionForStatus {
        payout_option: String,
        status: ClaimStatus,
    },

    #[error("different approver required for final approval")]
    InvalidApprover,

    #[error("a status reason is required to {operation}")]
    MissingStatusReason { operation: &'static str },

    #[error("a receipt file must be attached before the receipt can be submitted")]
    MissingReceipt,

    #[error("claim item {0} has no payout option")]
    MissingPayoutOption(ClaimItemId),

    #[error("claim is not approved, status is {0}")]
    NotApproved(ClaimStatus),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("claim item not found: {0}")]
    ItemNotFound(ClaimItemId),

    #[error("unrecognized {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl ClaimError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ClaimError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable key reported to API clients
    pub fn key(&self) -> ErrorKey {
        match self {
            ClaimError::InvalidStatus { .. } => ErrorKey::ClaimStatus,
            ClaimError::MissingClaimItem => ErrorKey::ClaimMissingClaimItem,
            ClaimError::ItemNotReady { key, .. } => *key,
            ClaimError::InvalidPayoutOption { .. }
            | ClaimError::InvalidPayoutOptionForStatus { .. } => ErrorKey::ClaimItemInvalidPayoutOption,
            ClaimError::InvalidApprover => ErrorKey::ClaimInvalidApprover,
            ClaimError::MissingStatusReason { .. } => ErrorKey::ClaimMissingStatusReason,
            ClaimError::MissingReceipt => ErrorKey::ClaimMissingReceipt,
            ClaimError::MissingPayoutOption(_) => ErrorKey::ClaimItemMissingPayoutOption,
            ClaimError::NotApproved(_) => ErrorKey::ClaimNotApproved,
            ClaimError::Validation { .. } => ErrorKey::Validation,
            ClaimError::ItemNotFound(_) => ErrorKey::ClaimItemNotFound,
            ClaimError::UnknownValue { .. } | ClaimError::Money(_) => ErrorKey::InvalidInput,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            // Ledger creation on an unapproved claim is a caller bug, not user input
            ClaimError::NotApproved(_) => ErrorCategory::Database,
            ClaimError::ItemNotFound(_) => ErrorCategory::NotFound,
            _ => ErrorCategory::User,
        }
    }
}

impl From<ClaimError> for AppError {
    fn from(err: ClaimError) -> Self {
        AppError::new(err.category(), err.key(), err.to_string())
    }
}
