//! Claim aggregate and lifecycle state machine
//!
//! ```text
//! Draft -> Review1 -> Review2 -> Review3 -> Approved -> Paid
//!            |  ^        ^  |       |
//!            |  |        |  +-------+--> Revision -> Review1
//!            v  |        |          +--> Denied
//!          Receipt ------+
//! ```
//!
//! Every transition is validated against the current status before anything
//! is touched. Transitions that recompute payouts run on a staged copy that
//! replaces the claim only on success, so a failed transition leaves the
//! claim exactly as it was.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use core_kernel::{ClaimHistoryId, ClaimId, ClaimItemId, FileId, Money, PolicyId, UserId};

use crate::actor::Actor;
use crate::claim_item::{ClaimItem, CoveredItem, PayoutOption, UpdateClaimItemParams};
use crate::error::ClaimError;
use crate::file::{ClaimFile, ClaimFilePurpose};
use crate::history::{
    canonical_date, canonical_optional_timestamp, fields, parse_optional_timestamp, push_if_changed,
    ClaimHistory, FieldUpdate, HistoryAction,
};
use crate::ledger::LedgerEntry;

/// Length of a claim reference number
pub const REFERENCE_NUMBER_LENGTH: usize = 7;

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    Draft,
    /// Awaiting first review
    Review1,
    /// Receipt received, awaiting review
    Review2,
    /// Awaiting final approval by a second approver
    Review3,
    /// Returned to the claimant for changes
    Revision,
    /// Waiting for the claimant to upload a receipt
    Receipt,
    Approved,
    Paid,
    Denied,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 9] = [
        ClaimStatus::Draft,
        ClaimStatus::Review1,
        ClaimStatus::Review2,
        ClaimStatus::Review3,
        ClaimStatus::Revision,
        ClaimStatus::Receipt,
        ClaimStatus::Approved,
        ClaimStatus::Paid,
        ClaimStatus::Denied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "Draft",
            ClaimStatus::Review1 => "Review1",
            ClaimStatus::Review2 => "Review2",
            ClaimStatus::Review3 => "Review3",
            ClaimStatus::Revision => "Revision",
            ClaimStatus::Receipt => "Receipt",
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Paid => "Paid",
            ClaimStatus::Denied => "Denied",
        }
    }

    /// Review1, Review2 or Review3
    pub fn is_review(&self) -> bool {
        matches!(self, ClaimStatus::Review1 | ClaimStatus::Review2 | ClaimStatus::Review3)
    }

    /// No further lifecycle edits are possible
    pub fn is_closed(&self) -> bool {
        matches!(self, ClaimStatus::Approved | ClaimStatus::Paid | ClaimStatus::Denied)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ClaimError::UnknownValue {
                kind: "claim status",
                value: s.to_string(),
            })
    }
}

/// Type of incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentType {
    PhysicalDamage,
    Theft,
    WaterDamage,
    ElectricalSurge,
    Evacuation,
    Other,
}

impl IncidentType {
    pub const ALL: [IncidentType; 6] = [
        IncidentType::PhysicalDamage,
        IncidentType::Theft,
        IncidentType::WaterDamage,
        IncidentType::ElectricalSurge,
        IncidentType::Evacuation,
        IncidentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::PhysicalDamage => "PhysicalDamage",
            IncidentType::Theft => "Theft",
            IncidentType::WaterDamage => "WaterDamage",
            IncidentType::ElectricalSurge => "ElectricalSurge",
            IncidentType::Evacuation => "Evacuation",
            IncidentType::Other => "Other",
        }
    }

    /// Whether `option` may be used to value a loss of this type
    ///
    /// Evacuation pays only a fixed fraction and theft only fair market value.
    /// All other incidents allow repair (for repairable items), replacement
    /// and fair market value.
    pub fn allows_payout_option(&self, option: PayoutOption, is_repairable: bool) -> bool {
        match self {
            IncidentType::Evacuation => option == PayoutOption::FixedFraction,
            IncidentType::Theft => option == PayoutOption::Fmv,
            IncidentType::PhysicalDamage
            | IncidentType::WaterDamage
            | IncidentType::ElectricalSurge
            | IncidentType::Other => match option {
                PayoutOption::Repair => is_repairable,
                PayoutOption::Replacement | PayoutOption::Fmv => true,
                PayoutOption::FixedFraction => false,
            },
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentType {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncidentType::ALL
            .into_iter()
            .find(|incident| incident.as_str() == s)
            .ok_or_else(|| ClaimError::UnknownValue {
                kind: "incident type",
                value: s.to_string(),
            })
    }
}

/// A lifecycle operation requested by an actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimTransition {
    SubmitForApproval,
    RequestRevision { message: String },
    RequestReceipt { message: String },
    SubmitReceipt,
    Approve,
    Deny { message: String },
    MarkPaid,
}

impl ClaimTransition {
    pub fn name(&self) -> &'static str {
        match self {
            ClaimTransition::SubmitForApproval => "submit",
            ClaimTransition::RequestRevision { .. } => "request revision",
            ClaimTransition::RequestReceipt { .. } => "request receipt",
            ClaimTransition::SubmitReceipt => "submit receipt",
            ClaimTransition::Approve => "approve",
            ClaimTransition::Deny { .. } => "deny",
            ClaimTransition::MarkPaid => "mark paid",
        }
    }
}

/// A claim against a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub policy_id: PolicyId,
    pub reference_number: String,
    pub incident_type: IncidentType,
    pub incident_date: NaiveDate,
    pub incident_description: String,
    pub status: ClaimStatus,
    /// Required while the claim is in Revision or Denied
    pub status_reason: String,
    pub reviewer_id: Option<UserId>,
    pub review_date: Option<DateTime<Utc>>,
    pub payment_date: Option<DateTime<Utc>>,
    pub total_payout: Money,
    pub items: Vec<ClaimItem>,
    pub files: Vec<ClaimFile>,
    /// Optimistic concurrency token, bumped on every commit
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a new Draft claim
    pub fn new(
        policy_id: PolicyId,
        incident_type: IncidentType,
        incident_date: NaiveDate,
        incident_description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: ClaimId::new_v7(),
            policy_id,
            reference_number: generate_reference_number(),
            incident_type,
            incident_date,
            incident_description: incident_description.into(),
            status: ClaimStatus::Draft,
            status_reason: String::new(),
            reviewer_id: None,
            review_date: None,
            payment_date: None,
            total_payout: Money::zero(),
            items: Vec::new(),
            files: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Field-level invariants
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.reference_number.chars().count() != REFERENCE_NUMBER_LENGTH {
            return Err(ClaimError::validation(
                fields::REFERENCE_NUMBER,
                format!("must be {} characters", REFERENCE_NUMBER_LENGTH),
            ));
        }
        if self.incident_description.trim().is_empty() {
            return Err(ClaimError::validation(fields::INCIDENT_DESCRIPTION, "must not be empty"));
        }
        if matches!(self.status, ClaimStatus::Revision | ClaimStatus::Denied)
            && self.status_reason.trim().is_empty()
        {
            return Err(ClaimError::validation(
                fields::STATUS_REASON,
                format!("required when status is {}", self.status),
            ));
        }
        if self.total_payout.is_negative() {
            return Err(ClaimError::validation(fields::TOTAL_PAYOUT, "must not be negative"));
        }
        Ok(())
    }

    pub fn item(&self, claim_item_id: ClaimItemId) -> Option<&ClaimItem> {
        self.items.iter().find(|item| item.id == claim_item_id)
    }

    pub fn has_receipt_file(&self) -> bool {
        self.files.iter().any(|file| file.purpose == ClaimFilePurpose::Receipt)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Applies a lifecycle operation
    pub fn apply_transition(&mut self, actor: &Actor, transition: &ClaimTransition) -> Result<(), ClaimError> {
        match transition {
            ClaimTransition::SubmitForApproval => self.submit_for_approval(actor),
            ClaimTransition::RequestRevision { message } => self.request_revision(actor, message),
            ClaimTransition::RequestReceipt { message } => self.request_receipt(actor, message),
            ClaimTransition::SubmitReceipt => self.submit_receipt(actor),
            ClaimTransition::Approve => self.approve(actor),
            ClaimTransition::Deny { message } => self.deny(actor, message),
            ClaimTransition::MarkPaid => self.mark_paid(actor),
        }
    }

    /// Draft or Revision to Review1
    ///
    /// # Errors
    ///
    /// - `InvalidStatus` outside Draft and Revision
    /// - `MissingClaimItem` without items
    /// - `ItemNotReady` naming the first item that fails submission checks
    pub fn submit_for_approval(&mut self, actor: &Actor) -> Result<(), ClaimError> {
        const OPERATION: &str = "submit";
        self.ensure_status(OPERATION, &[ClaimStatus::Draft, ClaimStatus::Revision])?;
        self.ensure_has_items()?;

        for item in &self.items {
            if let Some(key) = item.validate_for_submit(self.incident_type) {
                return Err(ClaimError::ItemNotReady { item_id: item.id, key });
            }
        }

        self.stage(actor, OPERATION, |claim| {
            claim.recompute_payouts()?;
            claim.status = ClaimStatus::Review1;
            claim.status_reason.clear();
            Ok(())
        })
    }

    /// Sends the claim back to the claimant with `message`
    pub fn request_revision(&mut self, actor: &Actor, message: &str) -> Result<(), ClaimError> {
        const OPERATION: &str = "request revision";
        self.ensure_status(OPERATION, &[ClaimStatus::Review1, ClaimStatus::Review2, ClaimStatus::Review3])?;
        self.ensure_has_items()?;
        require_reason(OPERATION, message)?;

        self.stage(actor, OPERATION, |claim| {
            claim.status = ClaimStatus::Revision;
            claim.status_reason = message.to_string();
            Ok(())
        })
    }

    /// Asks the claimant for a receipt before the claim can progress
    pub fn request_receipt(&mut self, actor: &Actor, message: &str) -> Result<(), ClaimError> {
        const OPERATION: &str = "request receipt";
        self.ensure_status(OPERATION, &[ClaimStatus::Review1])?;
        self.ensure_has_items()?;

        self.stage(actor, OPERATION, |claim| {
            claim.status = ClaimStatus::Receipt;
            claim.status_reason = message.to_string();
            Ok(())
        })
    }

    /// Receipt to Review2, once a receipt file is attached
    pub fn submit_receipt(&mut self, actor: &Actor) -> Result<(), ClaimError> {
        const OPERATION: &str = "submit receipt";
        self.ensure_status(OPERATION, &[ClaimStatus::Receipt])?;
        self.ensure_has_items()?;
        if !self.has_receipt_file() {
            return Err(ClaimError::MissingReceipt);
        }

        self.stage(actor, OPERATION, |claim| {
            claim.recompute_payouts()?;
            claim.status = ClaimStatus::Review2;
            claim.status_reason.clear();
            Ok(())
        })
    }

    /// Advances the claim one approval step
    ///
    /// Review1 goes straight to Review3 only when every item is paid at fair
    /// market value. Review2 goes to Review3. Review3 goes to Approved when
    /// `actor` is not the reviewer who moved the claim into Review3; this
    /// step recomputes payouts, clears the status reason and makes `actor`
    /// the recorded reviewer.
    ///
    /// # Errors
    ///
    /// - `InvalidStatus` outside the review states
    /// - `MissingClaimItem` without items
    /// - `InvalidPayoutOptionForStatus` for a non-FMV item in Review1
    /// - `InvalidApprover` when the Review3 reviewer approves again
    pub fn approve(&mut self, actor: &Actor) -> Result<(), ClaimError> {
        const OPERATION: &str = "approve";
        self.ensure_status(OPERATION, &[ClaimStatus::Review1, ClaimStatus::Review2, ClaimStatus::Review3])?;
        self.ensure_has_items()?;

        match self.status {
            ClaimStatus::Review1 => {
                if let Some(item) = self.items.iter().find(|i| i.payout_option != Some(PayoutOption::Fmv)) {
                    return Err(ClaimError::InvalidPayoutOptionForStatus {
                        payout_option: item.payout_option.map(|o| o.to_string()).unwrap_or_default(),
                        status: self.status,
                    });
                }
                self.stage(actor, OPERATION, |claim| {
                    claim.status = ClaimStatus::Review3;
                    claim.record_reviewer(actor);
                    Ok(())
                })
            }
            ClaimStatus::Review2 => self.stage(actor, OPERATION, |claim| {
                claim.status = ClaimStatus::Review3;
                claim.record_reviewer(actor);
                Ok(())
            }),
            ClaimStatus::Review3 => {
                if self.reviewer_id == Some(actor.id) {
                    return Err(ClaimError::InvalidApprover);
                }
                self.stage(actor, OPERATION, |claim| {
                    claim.recompute_payouts()?;
                    claim.status = ClaimStatus::Approved;
                    claim.status_reason.clear();
                    claim.record_reviewer(actor);
                    Ok(())
                })
            }
            other => Err(ClaimError::InvalidStatus {
                operation: OPERATION,
                status: other,
            }),
        }
    }

    /// Denies the claim with `message`
    pub fn deny(&mut self, actor: &Actor, message: &str) -> Result<(), ClaimError> {
        const OPERATION: &str = "deny";
        self.ensure_status(OPERATION, &[ClaimStatus::Review1, ClaimStatus::Review2, ClaimStatus::Review3])?;
        self.ensure_has_items()?;
        require_reason(OPERATION, message)?;

        self.stage(actor, OPERATION, |claim| {
            claim.status = ClaimStatus::Denied;
            claim.status_reason = message.to_string();
            claim.record_reviewer(actor);
            Ok(())
        })
    }

    /// Records that the approved payout has been paid
    pub fn mark_paid(&mut self, actor: &Actor) -> Result<(), ClaimError> {
        const OPERATION: &str = "mark paid";
        self.ensure_status(OPERATION, &[ClaimStatus::Approved])?;

        self.stage(actor, OPERATION, |claim| {
            claim.status = ClaimStatus::Paid;
            claim.payment_date = Some(Utc::now());
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Items and files
    // ------------------------------------------------------------------

    /// Adds a claim item for `covered_item`
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` when `actor` may not edit items in the current
    /// status and `Validation` when the item belongs to another policy, is
    /// already on the claim, or fails field validation.
    pub fn add_item(
        &mut self,
        actor: &Actor,
        covered_item: CoveredItem,
        params: &UpdateClaimItemParams,
    ) -> Result<ClaimItemId, ClaimError> {
        self.ensure_items_editable(actor)?;

        if covered_item.policy_id != self.policy_id {
            return Err(ClaimError::validation(fields::ITEM_ID, "item is not covered by the claim's policy"));
        }
        if self.items.iter().any(|i| i.item_id() == covered_item.id) {
            return Err(ClaimError::validation(fields::ITEM_ID, "item is already part of this claim"));
        }

        let mut item = ClaimItem::new(self.id, covered_item);
        item.apply(params);
        self.mark_item_reviewed(actor, &mut item);
        item.validate(self.incident_type)?;

        let id = item.id;
        self.items.push(item);
        self.updated_at = Utc::now();
        Ok(id)
    }

    /// Applies `params` to an existing claim item
    pub fn update_item(
        &mut self,
        actor: &Actor,
        claim_item_id: ClaimItemId,
        params: &UpdateClaimItemParams,
    ) -> Result<(), ClaimError> {
        self.ensure_items_editable(actor)?;

        let index = self
            .items
            .iter()
            .position(|i| i.id == claim_item_id)
            .ok_or(ClaimError::ItemNotFound(claim_item_id))?;

        let mut item = self.items[index].clone();
        item.apply(params);
        self.mark_item_reviewed(actor, &mut item);
        item.validate(self.incident_type)?;

        self.items[index] = item;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Links a file to the claim
    pub fn attach_file(&mut self, file_id: FileId, purpose: ClaimFilePurpose) -> Result<(), ClaimError> {
        if self.status.is_closed() {
            return Err(ClaimError::InvalidStatus {
                operation: "attach file",
                status: self.status,
            });
        }
        if self.files.iter().any(|f| f.file_id == file_id) {
            return Err(ClaimError::validation("file_id", "file is already attached to this claim"));
        }
        self.files.push(ClaimFile::new(self.id, file_id, purpose));
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Lists the fields that differ from `old`, as canonical strings
    pub fn compare(&self, old: &Claim) -> Vec<FieldUpdate> {
        let mut updates = Vec::new();

        push_if_changed(&mut updates, fields::POLICY_ID, old.policy_id.to_string(), self.policy_id.to_string());
        push_if_changed(
            &mut updates,
            fields::REFERENCE_NUMBER,
            old.reference_number.clone(),
            self.reference_number.clone(),
        );
        push_if_changed(
            &mut updates,
            fields::INCIDENT_DATE,
            canonical_date(&old.incident_date),
            canonical_date(&self.incident_date),
        );
        push_if_changed(
            &mut updates,
            fields::INCIDENT_TYPE,
            old.incident_type.to_string(),
            self.incident_type.to_string(),
        );
        push_if_changed(
            &mut updates,
            fields::INCIDENT_DESCRIPTION,
            old.incident_description.clone(),
            self.incident_description.clone(),
        );
        push_if_changed(&mut updates, fields::STATUS, old.status.to_string(), self.status.to_string());
        push_if_changed(
            &mut updates,
            fields::REVIEW_DATE,
            canonical_optional_timestamp(&old.review_date),
            canonical_optional_timestamp(&self.review_date),
        );
        push_if_changed(
            &mut updates,
            fields::REVIEWER_ID,
            optional_id(&old.reviewer_id),
            optional_id(&self.reviewer_id),
        );
        push_if_changed(
            &mut updates,
            fields::PAYMENT_DATE,
            canonical_optional_timestamp(&old.payment_date),
            canonical_optional_timestamp(&self.payment_date),
        );
        push_if_changed(
            &mut updates,
            fields::TOTAL_PAYOUT,
            old.total_payout.to_string(),
            self.total_payout.to_string(),
        );
        push_if_changed(
            &mut updates,
            fields::STATUS_REASON,
            old.status_reason.clone(),
            self.status_reason.clone(),
        );

        updates
    }

    /// Sets the field named by `update` to its new value
    pub fn apply_field_update(&mut self, update: &FieldUpdate) -> Result<(), ClaimError> {
        let value = update.new_value.as_str();
        match update.field_name.as_str() {
            fields::POLICY_ID => {
                self.policy_id = value
                    .parse()
                    .map_err(|e: uuid::Error| ClaimError::validation(fields::POLICY_ID, e.to_string()))?;
            }
            fields::REFERENCE_NUMBER => self.reference_number = value.to_string(),
            fields::INCIDENT_DATE => {
                self.incident_date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|e| ClaimError::validation(fields::INCIDENT_DATE, e.to_string()))?;
            }
            fields::INCIDENT_TYPE => self.incident_type = value.parse()?,
            fields::INCIDENT_DESCRIPTION => self.incident_description = value.to_string(),
            fields::STATUS => self.status = value.parse()?,
            fields::REVIEW_DATE => self.review_date = parse_optional_timestamp(fields::REVIEW_DATE, value)?,
            fields::REVIEWER_ID => {
                self.reviewer_id = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(|e: uuid::Error| {
                        ClaimError::validation(fields::REVIEWER_ID, e.to_string())
                    })?)
                };
            }
            fields::PAYMENT_DATE => self.payment_date = parse_optional_timestamp(fields::PAYMENT_DATE, value)?,
            fields::TOTAL_PAYOUT => self.total_payout = value.parse()?,
            fields::STATUS_REASON => self.status_reason = value.to_string(),
            other => {
                return Err(ClaimError::validation(
                    "field_name",
                    format!("'{}' is not a claim field", other),
                ))
            }
        }
        Ok(())
    }

    /// Wraps one field change into a claim-level history record
    pub fn new_history(&self, actor: &Actor, action: HistoryAction, update: FieldUpdate) -> ClaimHistory {
        ClaimHistory {
            id: ClaimHistoryId::new_v7(),
            claim_id: self.id,
            claim_item_id: None,
            user_id: actor.id,
            action,
            field_name: update.field_name,
            old_value: update.old_value,
            new_value: update.new_value,
            created_at: Utc::now(),
        }
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Builds one payout debit per claim item
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::NotApproved` unless the claim is Approved
    pub fn create_ledger_entries(&self) -> Result<Vec<LedgerEntry>, ClaimError> {
        if self.status != ClaimStatus::Approved {
            return Err(ClaimError::NotApproved(self.status));
        }

        Ok(self
            .items
            .iter()
            .map(|item| {
                let covered = &item.covered_item;
                LedgerEntry::claim_payout(
                    covered.policy_id,
                    covered.id,
                    self.id,
                    item.payout_amount,
                    covered.accountable_first_name.clone(),
                    covered.accountable_last_name.clone(),
                )
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_status(&self, operation: &'static str, allowed: &[ClaimStatus]) -> Result<(), ClaimError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ClaimError::InvalidStatus {
                operation,
                status: self.status,
            })
        }
    }

    fn ensure_has_items(&self) -> Result<(), ClaimError> {
        if self.items.is_empty() {
            Err(ClaimError::MissingClaimItem)
        } else {
            Ok(())
        }
    }

    fn ensure_items_editable(&self, actor: &Actor) -> Result<(), ClaimError> {
        let editable = match self.status {
            ClaimStatus::Draft | ClaimStatus::Revision => true,
            ClaimStatus::Review1 | ClaimStatus::Review2 | ClaimStatus::Review3 | ClaimStatus::Receipt => {
                actor.is_approver()
            }
            ClaimStatus::Approved | ClaimStatus::Paid | ClaimStatus::Denied => false,
        };
        if editable {
            Ok(())
        } else {
            Err(ClaimError::InvalidStatus {
                operation: "edit items",
                status: self.status,
            })
        }
    }

    fn mark_item_reviewed(&self, actor: &Actor, item: &mut ClaimItem) {
        if self.status.is_review() && actor.is_approver() {
            item.reviewer_id = Some(actor.id);
            item.review_date = Some(Utc::now());
        }
    }

    fn record_reviewer(&mut self, actor: &Actor) {
        self.reviewer_id = Some(actor.id);
        self.review_date = Some(Utc::now());
    }

    /// Recomputes every item's payout and the claim total
    fn recompute_payouts(&mut self) -> Result<(), ClaimError> {
        let mut total = Money::zero();
        for item in &mut self.items {
            item.update_payout_amount()?;
            total = total.checked_add(&item.payout_amount)?;
        }
        self.total_payout = total;
        Ok(())
    }

    /// Runs `mutate` on a copy and keeps it only if it succeeds
    fn stage<F>(&mut self, actor: &Actor, operation: &'static str, mutate: F) -> Result<(), ClaimError>
    where
        F: FnOnce(&mut Claim) -> Result<(), ClaimError>,
    {
        let mut staged = self.clone();
        mutate(&mut staged)?;
        staged.updated_at = Utc::now();

        debug!(
            claim_id = %self.id,
            actor_id = %actor.id,
            operation,
            from = %self.status,
            to = %staged.status,
            "claim transition"
        );

        *self = staged;
        Ok(())
    }
}

fn require_reason(operation: &'static str, message: &str) -> Result<(), ClaimError> {
    if message.trim().is_empty() {
        Err(ClaimError::MissingStatusReason { operation })
    } else {
        Ok(())
    }
}

fn optional_id(id: &Option<UserId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

fn generate_reference_number() -> String {
    let mut rng = rand::rng();
    (0..REFERENCE_NUMBER_LENGTH)
        .map(|_| REFERENCE_ALPHABET[rng.random_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::AppRole;
    use core_kernel::ItemId;

    fn draft() -> Claim {
        Claim::new(
            PolicyId::new(),
            IncidentType::Theft,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "Laptop stolen from car",
        )
    }

    #[test]
    fn test_new_claim() {
        let claim = draft();
        assert_eq!(claim.status, ClaimStatus::Draft);
        assert_eq!(claim.reference_number.len(), REFERENCE_NUMBER_LENGTH);
        assert!(claim
            .reference_number
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        assert!(claim.total_payout.is_zero());
        assert!(claim.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_reason_in_revision() {
        let mut claim = draft();
        claim.status = ClaimStatus::Revision;
        assert!(matches!(
            claim.validate(),
            Err(ClaimError::Validation { field: fields::STATUS_REASON, .. })
        ));
        claim.status_reason = "please add a photo".to_string();
        assert!(claim.validate().is_ok());
    }

    #[test]
    fn test_status_parsing_rejects_unknown() {
        for status in ClaimStatus::ALL {
            assert_eq!(status.as_str().parse::<ClaimStatus>().unwrap(), status);
        }
        assert!(matches!(
            "Pending".parse::<ClaimStatus>(),
            Err(ClaimError::UnknownValue { kind: "claim status", .. })
        ));
    }

    #[test]
    fn test_payout_option_compatibility() {
        use PayoutOption::*;
        assert!(IncidentType::Evacuation.allows_payout_option(FixedFraction, false));
        assert!(!IncidentType::Evacuation.allows_payout_option(Fmv, false));
        assert!(IncidentType::Theft.allows_payout_option(Fmv, false));
        assert!(!IncidentType::Theft.allows_payout_option(Replacement, false));
        assert!(IncidentType::PhysicalDamage.allows_payout_option(Repair, true));
        assert!(!IncidentType::PhysicalDamage.allows_payout_option(Repair, false));
        assert!(!IncidentType::WaterDamage.allows_payout_option(FixedFraction, true));
    }

    #[test]
    fn test_add_item_rejects_other_policy() {
        let mut claim = draft();
        let actor = Actor::new(UserId::new(), AppRole::User);
        let covered = CoveredItem {
            id: ItemId::new(),
            policy_id: PolicyId::new(),
            name: "Camera".to_string(),
            coverage_amount: Money::from_minor(10_000),
            accountable_first_name: String::new(),
            accountable_last_name: String::new(),
        };
        let result = claim.add_item(&actor, covered, &UpdateClaimItemParams::default());
        assert!(matches!(result, Err(ClaimError::Validation { field: fields::ITEM_ID, .. })));
        assert!(claim.items.is_empty());
    }

    #[test]
    fn test_apply_field_update_rejects_unknown_field() {
        let mut claim = draft();
        let update = FieldUpdate::new("color", "", "blue");
        assert!(claim.apply_field_update(&update).is_err());
    }
}
