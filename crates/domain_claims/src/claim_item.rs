//! Claim items and the payout engine
//!
//! A claim item is one covered item's line within a claim. It carries the
//! estimates the claimant supplies and the payout computed from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimHistoryId, ClaimId, ClaimItemId, ErrorKey, ItemId, Money, PolicyId, UserId};

use crate::actor::Actor;
use crate::claim::IncidentType;
use crate::error::ClaimError;
use crate::history::{fields, push_if_changed, ClaimHistory, FieldUpdate, HistoryAction};

/// Share of an estimate paid out, in percent
pub const PAYOUT_PERCENT: u32 = 95;

/// Share of the coverage amount paid for a fixed-fraction payout, in percent
pub const FIXED_FRACTION_PERCENT: u32 = 60;

/// How a loss is valued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutOption {
    Repair,
    Replacement,
    #[serde(rename = "FMV")]
    Fmv,
    FixedFraction,
}

impl PayoutOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutOption::Repair => "Repair",
            PayoutOption::Replacement => "Replacement",
            PayoutOption::Fmv => "FMV",
            PayoutOption::FixedFraction => "FixedFraction",
        }
    }
}

impl fmt::Display for PayoutOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutOption {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Repair" => Ok(PayoutOption::Repair),
            "Replacement" => Ok(PayoutOption::Replacement),
            "FMV" => Ok(PayoutOption::Fmv),
            "FixedFraction" => Ok(PayoutOption::FixedFraction),
            other => Err(ClaimError::UnknownValue {
                kind: "payout option",
                value: other.to_string(),
            }),
        }
    }
}

/// Snapshot of the insured item a claim item refers to
///
/// Loaded together with the claim so payout and ledger logic do no I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveredItem {
    pub id: ItemId,
    pub policy_id: PolicyId,
    pub name: String,
    pub coverage_amount: Money,
    pub accountable_first_name: String,
    pub accountable_last_name: String,
}

/// A claim line for one covered item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub id: ClaimItemId,
    pub claim_id: ClaimId,
    pub covered_item: CoveredItem,
    pub is_repairable: bool,
    pub repair_estimate: Money,
    pub repair_actual: Money,
    pub replace_estimate: Money,
    pub replace_actual: Money,
    pub payout_option: Option<PayoutOption>,
    /// Computed by `update_payout_amount`
    pub payout_amount: Money,
    pub fmv: Money,
    pub location: String,
    pub review_date: Option<DateTime<Utc>>,
    pub reviewer_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a claim item; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateClaimItemParams {
    pub is_repairable: Option<bool>,
    pub repair_estimate: Option<Money>,
    pub repair_actual: Option<Money>,
    pub replace_estimate: Option<Money>,
    pub replace_actual: Option<Money>,
    pub payout_option: Option<PayoutOption>,
    pub fmv: Option<Money>,
    pub location: Option<String>,
}

impl ClaimItem {
    /// Creates an empty claim item for a covered item
    pub fn new(claim_id: ClaimId, covered_item: CoveredItem) -> Self {
        let now = Utc::now();
        Self {
            id: ClaimItemId::new_v7(),
            claim_id,
            covered_item,
            is_repairable: false,
            repair_estimate: Money::zero(),
            repair_actual: Money::zero(),
            replace_estimate: Money::zero(),
            replace_actual: Money::zero(),
            payout_option: None,
            payout_amount: Money::zero(),
            fmv: Money::zero(),
            location: String::new(),
            review_date: None,
            reviewer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.covered_item.id
    }

    /// Applies the supplied fields
    pub fn apply(&mut self, params: &UpdateClaimItemParams) {
        if let Some(is_repairable) = params.is_repairable {
            self.is_repairable = is_repairable;
        }
        if let Some(amount) = params.repair_estimate {
            self.repair_estimate = amount;
        }
        if let Some(amount) = params.repair_actual {
            self.repair_actual = amount;
        }
        if let Some(amount) = params.replace_estimate {
            self.replace_estimate = amount;
        }
        if let Some(amount) = params.replace_actual {
            self.replace_actual = amount;
        }
        if let Some(option) = params.payout_option {
            self.payout_option = Some(option);
        }
        if let Some(amount) = params.fmv {
            self.fmv = amount;
        }
        if let Some(location) = &params.location {
            self.location = location.clone();
        }
        self.updated_at = Utc::now();
    }

    /// Field-level validation run on every create and update
    pub fn validate(&self, incident_type: IncidentType) -> Result<(), ClaimError> {
        let amounts = [
            (fields::REPAIR_ESTIMATE, self.repair_estimate),
            (fields::REPAIR_ACTUAL, self.repair_actual),
            (fields::REPLACE_ESTIMATE, self.replace_estimate),
            (fields::REPLACE_ACTUAL, self.replace_actual),
            (fields::FMV, self.fmv),
        ];
        for (field, amount) in amounts {
            if amount.is_negative() {
                return Err(ClaimError::validation(field, "amount must not be negative"));
            }
        }

        // Repairability may be set in a later edit; submission checks it
        if let Some(option) = self.payout_option {
            if !incident_type.allows_payout_option(option, true) {
                return Err(ClaimError::InvalidPayoutOption {
                    payout_option: option,
                    incident_type,
                });
            }
        }

        Ok(())
    }

    /// Checks the item is ready for submission
    ///
    /// Returns the key of the first failed rule, or `None` when ready.
    pub fn validate_for_submit(&self, incident_type: IncidentType) -> Option<ErrorKey> {
        let option = match self.payout_option {
            Some(option) => option,
            None => return Some(ErrorKey::ClaimItemMissingPayoutOption),
        };

        if incident_type == IncidentType::Theft && self.is_repairable {
            return Some(ErrorKey::ClaimItemNotRepairable);
        }

        if option == PayoutOption::Replacement && !self.replace_estimate.is_positive() {
            return Some(ErrorKey::ClaimItemMissingReplaceEstimate);
        }

        if option == PayoutOption::Fmv && !self.fmv.is_positive() {
            return Some(ErrorKey::ClaimItemMissingFmv);
        }

        if !incident_type.allows_payout_option(option, self.is_repairable) {
            return Some(ErrorKey::ClaimItemInvalidPayoutOption);
        }

        if self.is_repairable && !self.repair_estimate.is_positive() {
            return Some(ErrorKey::ClaimItemMissingRepairEstimate);
        }

        if incident_type == IncidentType::PhysicalDamage && !self.is_repairable && !self.fmv.is_positive() {
            return Some(ErrorKey::ClaimItemMissingFmv);
        }

        None
    }

    /// Recomputes `payout_amount` from the chosen payout option
    ///
    /// The percentage is applied first, then the result is capped at the
    /// covered item's coverage amount.
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::MissingPayoutOption` if no option has been chosen
    pub fn update_payout_amount(&mut self) -> Result<(), ClaimError> {
        let option = self.payout_option.ok_or(ClaimError::MissingPayoutOption(self.id))?;
        let coverage = self.covered_item.coverage_amount;

        let amount = match option {
            PayoutOption::Repair => {
                let basis = if self.repair_actual.is_positive() {
                    self.repair_actual
                } else {
                    self.repair_estimate
                };
                basis.percent(PAYOUT_PERCENT)
            }
            PayoutOption::Replacement => self.replace_estimate.percent(PAYOUT_PERCENT),
            PayoutOption::Fmv => self.fmv.percent(PAYOUT_PERCENT),
            PayoutOption::FixedFraction => coverage.percent(FIXED_FRACTION_PERCENT),
        };

        self.payout_amount = amount.capped_at(coverage).max(Money::zero());
        Ok(())
    }

    /// Lists the fields that differ from `old`, as canonical strings
    pub fn compare(&self, old: &ClaimItem) -> Vec<FieldUpdate> {
        let mut updates = Vec::new();

        push_if_changed(&mut updates, fields::ITEM_ID, old.item_id().to_string(), self.item_id().to_string());
        push_if_changed(
            &mut updates,
            fields::IS_REPAIRABLE,
            old.is_repairable.to_string(),
            self.is_repairable.to_string(),
        );
        push_if_changed(
            &mut updates,
            fields::REPAIR_ESTIMATE,
            old.repair_estimate.to_string(),
            self.repair_estimate.to_string(),
        );
        push_if_changed(
            &mut updates,
            fields::REPAIR_ACTUAL,
            old.repair_actual.to_string(),
            self.repair_actual.to_string(),
        );
        push_if_changed(
            &mut updates,
            fields::REPLACE_ESTIMATE,
            old.replace_estimate.to_string(),
            self.replace_estimate.to_string(),
        );
        push_if_changed(
            &mut updates,
            fields::REPLACE_ACTUAL,
            old.replace_actual.to_string(),
            self.replace_actual.to_string(),
        );
        push_if_changed(
            &mut updates,
            fields::PAYOUT_OPTION,
            payout_option_tag(old.payout_option),
            payout_option_tag(self.payout_option),
        );
        push_if_changed(
            &mut updates,
            fields::PAYOUT_AMOUNT,
            old.payout_amount.to_string(),
            self.payout_amount.to_string(),
        );
        push_if_changed(&mut updates, fields::FMV, old.fmv.to_string(), self.fmv.to_string());
        push_if_changed(&mut updates, fields::LOCATION, old.location.clone(), self.location.clone());

        updates
    }

    /// Wraps one field change into a history record for this item
    pub fn new_history(&self, actor: &Actor, action: HistoryAction, update: FieldUpdate) -> ClaimHistory {
        ClaimHistory {
            id: ClaimHistoryId::new_v7(),
            claim_id: self.claim_id,
            claim_item_id: Some(self.id),
            user_id: actor.id,
            action,
            field_name: update.field_name,
            old_value: update.old_value,
            new_value: update.new_value,
            created_at: Utc::now(),
        }
    }
}

fn payout_option_tag(option: Option<PayoutOption>) -> String {
    option.map(|o| o.as_str().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn covered(coverage: i64) -> CoveredItem {
        CoveredItem {
            id: ItemId::new(),
            policy_id: PolicyId::new(),
            name: "Laptop".to_string(),
            coverage_amount: Money::from_minor(coverage),
            accountable_first_name: "Jo".to_string(),
            accountable_last_name: "Doe".to_string(),
        }
    }

    fn item_with(option: PayoutOption, coverage: i64) -> ClaimItem {
        let mut item = ClaimItem::new(ClaimId::new(), covered(coverage));
        item.payout_option = Some(option);
        item
    }

    #[test]
    fn test_update_payout_amount() {
        let cases = [
            (PayoutOption::Repair, 100, 0, 0, 0, 95),
            (PayoutOption::Repair, 1000, 0, 0, 0, 900),
            (PayoutOption::Repair, 1000, 500, 0, 0, 475),
            (PayoutOption::Replacement, 0, 0, 200, 0, 190),
            (PayoutOption::Fmv, 0, 0, 0, 300, 285),
            (PayoutOption::FixedFraction, 0, 0, 0, 0, 540),
        ];

        for (option, repair_est, repair_act, replace_est, fmv, want) in cases {
            let mut item = item_with(option, 900);
            item.repair_estimate = Money::from_minor(repair_est);
            item.repair_actual = Money::from_minor(repair_act);
            item.replace_estimate = Money::from_minor(replace_est);
            item.fmv = Money::from_minor(fmv);

            item.update_payout_amount().unwrap();
            assert_eq!(item.payout_amount, Money::from_minor(want), "option {option}");
        }
    }

    #[test]
    fn test_update_payout_amount_without_option() {
        let mut item = ClaimItem::new(ClaimId::new(), covered(900));
        assert_eq!(
            item.update_payout_amount(),
            Err(ClaimError::MissingPayoutOption(item.id))
        );
    }

    #[test]
    fn test_update_payout_amount_is_idempotent() {
        let mut item = item_with(PayoutOption::Fmv, 100_000);
        item.fmv = Money::from_minor(33_333);
        item.update_payout_amount().unwrap();
        let first = item.payout_amount;
        item.update_payout_amount().unwrap();
        assert_eq!(item.payout_amount, first);
    }

    #[test]
    fn test_validate_leaves_repairability_to_submission() {
        let item = item_with(PayoutOption::Repair, 900);
        assert!(!item.is_repairable);

        assert!(item.validate(IncidentType::PhysicalDamage).is_ok());
        assert_eq!(
            item.validate_for_submit(IncidentType::PhysicalDamage),
            Some(ErrorKey::ClaimItemInvalidPayoutOption)
        );
        assert!(matches!(
            item.validate(IncidentType::Theft),
            Err(ClaimError::InvalidPayoutOption { .. })
        ));
    }

    #[test]
    fn test_compare_identical_is_empty() {
        let item = item_with(PayoutOption::Repair, 900);
        assert!(item.compare(&item.clone()).is_empty());
    }

    #[test]
    fn test_compare_lists_changed_fields_in_order() {
        let old = item_with(PayoutOption::Repair, 900);
        let mut new = old.clone();
        new.location = "Kenya".to_string();
        new.repair_estimate = Money::from_minor(1234);
        new.payout_option = Some(PayoutOption::Fmv);

        let updates = new.compare(&old);
        let names: Vec<_> = updates.iter().map(|u| u.field_name.as_str()).collect();
        assert_eq!(names, vec![fields::REPAIR_ESTIMATE, fields::PAYOUT_OPTION, fields::LOCATION]);
        assert_eq!(updates[0].old_value, "0.00");
        assert_eq!(updates[0].new_value, "12.34");
        assert_eq!(updates[1].new_value, "FMV");
    }

    #[test]
    fn test_validate_rejects_negative_amounts() {
        let mut item = item_with(PayoutOption::Fmv, 900);
        item.fmv = Money::from_minor(-1);
        assert!(matches!(
            item.validate(IncidentType::Theft),
            Err(ClaimError::Validation { field: "fmv", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_incompatible_option() {
        let item = item_with(PayoutOption::Repair, 900);
        assert!(matches!(
            item.validate(IncidentType::Evacuation),
            Err(ClaimError::InvalidPayoutOption { .. })
        ));
    }

    proptest! {
        #[test]
        fn payout_never_exceeds_coverage(
            coverage in 0i64..10_000_000,
            estimate in 0i64..100_000_000,
            option_index in 0usize..4,
        ) {
            let option = [
                PayoutOption::Repair,
                PayoutOption::Replacement,
                PayoutOption::Fmv,
                PayoutOption::FixedFraction,
            ][option_index];
            let mut item = item_with(option, coverage);
            item.repair_estimate = Money::from_minor(estimate);
            item.replace_estimate = Money::from_minor(estimate);
            item.fmv = Money::from_minor(estimate);

            item.update_payout_amount().unwrap();
            prop_assert!(item.payout_amount <= item.covered_item.coverage_amount);
            prop_assert!(!item.payout_amount.is_negative());
        }
    }
}
