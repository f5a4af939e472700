//! Claim history (audit trail)
//!
//! Every mutating operation on a claim or one of its items appends one
//! `ClaimHistory` row per changed field. Values are stored as canonical
//! strings so a row can be read back without knowing the field's type.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimHistoryId, ClaimId, ClaimItemId, UserId};

use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;

/// Status changes newer than this many days count as recent
pub const RECENT_CHANGE_DAYS: i64 = 7;

/// Field names recorded in history rows
pub mod fields {
    pub const POLICY_ID: &str = "policy_id";
    pub const REFERENCE_NUMBER: &str = "reference_number";
    pub const INCIDENT_DATE: &str = "incident_date";
    pub const INCIDENT_TYPE: &str = "incident_type";
    pub const INCIDENT_DESCRIPTION: &str = "incident_description";
    pub const STATUS: &str = "status";
    pub const REVIEW_DATE: &str = "review_date";
    pub const REVIEWER_ID: &str = "reviewer_id";
    pub const PAYMENT_DATE: &str = "payment_date";
    pub const TOTAL_PAYOUT: &str = "total_payout";
    pub const STATUS_REASON: &str = "status_reason";

    pub const ITEM_ID: &str = "item_id";
    pub const IS_REPAIRABLE: &str = "is_repairable";
    pub const REPAIR_ESTIMATE: &str = "repair_estimate";
    pub const REPAIR_ACTUAL: &str = "repair_actual";
    pub const REPLACE_ESTIMATE: &str = "replace_estimate";
    pub const REPLACE_ACTUAL: &str = "replace_actual";
    pub const PAYOUT_OPTION: &str = "payout_option";
    pub const PAYOUT_AMOUNT: &str = "payout_amount";
    pub const FMV: &str = "fmv";
    pub const LOCATION: &str = "location";
}

/// Kind of change recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryAction {
    Create,
    Update,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Create => "Create",
            HistoryAction::Update => "Update",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(HistoryAction::Create),
            "Update" => Ok(HistoryAction::Update),
            other => Err(ClaimError::UnknownValue {
                kind: "history action",
                value: other.to_string(),
            }),
        }
    }
}

/// One changed field, as canonical strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
}

impl FieldUpdate {
    pub fn new(field_name: &str, old_value: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.to_string(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimHistory {
    pub id: ClaimHistoryId,
    pub claim_id: ClaimId,
    pub claim_item_id: Option<ClaimItemId>,
    pub user_id: UserId,
    pub action: HistoryAction,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub created_at: DateTime<Utc>,
}

impl ClaimHistory {
    /// Returns true for an update of the claim-level status field
    pub fn is_status_update(&self) -> bool {
        self.claim_item_id.is_none()
            && self.action == HistoryAction::Update
            && self.field_name == fields::STATUS
    }
}

/// Pushes an update when the canonical values differ
pub(crate) fn push_if_changed(updates: &mut Vec<FieldUpdate>, field_name: &str, old: String, new: String) {
    if old != new {
        updates.push(FieldUpdate::new(field_name, old, new));
    }
}

pub fn canonical_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn canonical_optional_timestamp(value: &Option<DateTime<Utc>>) -> String {
    value.as_ref().map(canonical_timestamp).unwrap_or_default()
}

pub fn canonical_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_optional_timestamp(
    field: &'static str,
    value: &str,
) -> Result<Option<DateTime<Utc>>, ClaimError> {
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| ClaimError::validation(field, e.to_string()))
}

/// When the claim was first submitted for review
///
/// The earliest status update to `Review1` wins. A claim without such a row
/// falls back to its own `updated_at`.
pub fn submitted_at(claim: &Claim, histories: &[ClaimHistory]) -> DateTime<Utc> {
    histories
        .iter()
        .filter(|h| h.claim_id == claim.id && h.is_status_update())
        .filter(|h| h.new_value == ClaimStatus::Review1.as_str())
        .map(|h| h.created_at)
        .min()
        .unwrap_or(claim.updated_at)
}

/// Status updates recorded within the last week, oldest first
pub fn recent_status_changes(histories: &[ClaimHistory], now: DateTime<Utc>) -> Vec<ClaimHistory> {
    let cutoff = now - Duration::days(RECENT_CHANGE_DAYS);
    let mut recent: Vec<ClaimHistory> = histories
        .iter()
        .filter(|h| h.is_status_update() && h.created_at > cutoff)
        .cloned()
        .collect();
    recent.sort_by_key(|h| h.created_at);
    recent
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn status_row(claim_id: ClaimId, new_value: &str, created_at: DateTime<Utc>) -> ClaimHistory {
        ClaimHistory {
            id: ClaimHistoryId::new(),
            claim_id,
            claim_item_id: None,
            user_id: UserId::new(),
            action: HistoryAction::Update,
            field_name: fields::STATUS.to_string(),
            old_value: String::new(),
            new_value: new_value.to_string(),
            created_at,
        }
    }

    #[test]
    fn test_canonical_timestamp_keeps_nanoseconds() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
            + Duration::nanoseconds(123_456_789);
        let text = canonical_timestamp(&ts);
        assert_eq!(text, "2024-03-01T12:30:00.123456789Z");
        assert_eq!(parse_optional_timestamp("review_date", &text).unwrap(), Some(ts));
    }

    #[test]
    fn test_empty_optional_timestamp() {
        assert_eq!(canonical_optional_timestamp(&None), "");
        assert_eq!(parse_optional_timestamp("review_date", "").unwrap(), None);
    }

    #[test]
    fn test_recent_status_changes_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let claim_id = ClaimId::new();
        let old = status_row(claim_id, "Review1", now - Duration::days(8));
        let fresh = status_row(claim_id, "Review2", now - Duration::days(2));
        let mut other_field = status_row(claim_id, "x", now - Duration::days(1));
        other_field.field_name = fields::STATUS_REASON.to_string();
        let mut created = status_row(claim_id, "Draft", now - Duration::days(1));
        created.action = HistoryAction::Create;

        let recent = recent_status_changes(&[old, fresh.clone(), other_field, created], now);
        assert_eq!(recent, vec![fresh]);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("Update".parse::<HistoryAction>().unwrap(), HistoryAction::Update);
        assert!("Delete".parse::<HistoryAction>().is_err());
    }
}
