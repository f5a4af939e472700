//! Test Data Builders
//!
//! Provides builder patterns for constructing claims with sensible defaults.
//! Tests specify only the fields relevant to the rule under test; the claim
//! builder can place a claim directly in any status without walking the
//! lifecycle.

use core_kernel::{FileId, ItemId, Money, PolicyId, UserId};
use domain_claims::{
    Claim, ClaimFile, ClaimFilePurpose, ClaimItem, ClaimStatus, CoveredItem, IncidentType, PayoutOption,
};

use crate::fixtures::{MoneyFixtures, TemporalFixtures};

/// Builder for the covered item a claim item refers to
pub struct CoveredItemBuilder {
    id: ItemId,
    policy_id: PolicyId,
    name: String,
    coverage_amount: Money,
    first_name: String,
    last_name: String,
}

impl Default for CoveredItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoveredItemBuilder {
    pub fn new() -> Self {
        Self {
            id: ItemId::new(),
            policy_id: PolicyId::new(),
            name: "Laptop".to_string(),
            coverage_amount: MoneyFixtures::coverage(),
            first_name: "Mary".to_string(),
            last_name: "Member".to_string(),
        }
    }

    pub fn with_policy_id(mut self, policy_id: PolicyId) -> Self {
        self.policy_id = policy_id;
        self
    }

    pub fn with_coverage(mut self, coverage: Money) -> Self {
        self.coverage_amount = coverage;
        self
    }

    /// Sets the accountable person's name
    pub fn with_accountable(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn build(self) -> CoveredItem {
        CoveredItem {
            id: self.id,
            policy_id: self.policy_id,
            name: self.name,
            coverage_amount: self.coverage_amount,
            accountable_first_name: self.first_name,
            accountable_last_name: self.last_name,
        }
    }
}

/// Builder for claim items
///
/// Defaults to a non-repairable item paid at fair market value, which is
/// submit-ready for theft claims.
pub struct ClaimItemBuilder {
    covered: CoveredItemBuilder,
    is_repairable: bool,
    repair_estimate: Money,
    repair_actual: Money,
    replace_estimate: Money,
    payout_option: Option<PayoutOption>,
    fmv: Money,
}

impl Default for ClaimItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimItemBuilder {
    pub fn new() -> Self {
        Self {
            covered: CoveredItemBuilder::new(),
            is_repairable: false,
            repair_estimate: Money::zero(),
            repair_actual: Money::zero(),
            replace_estimate: Money::zero(),
            payout_option: Some(PayoutOption::Fmv),
            fmv: MoneyFixtures::estimate(),
        }
    }

    pub fn with_coverage(mut self, coverage: Money) -> Self {
        self.covered = self.covered.with_coverage(coverage);
        self
    }

    pub fn with_covered(mut self, covered: CoveredItemBuilder) -> Self {
        self.covered = covered;
        self
    }

    pub fn repairable(mut self, is_repairable: bool) -> Self {
        self.is_repairable = is_repairable;
        self
    }

    pub fn with_payout_option(mut self, option: Option<PayoutOption>) -> Self {
        self.payout_option = option;
        self
    }

    pub fn with_repair_estimate(mut self, amount: Money) -> Self {
        self.repair_estimate = amount;
        self
    }

    pub fn with_repair_actual(mut self, amount: Money) -> Self {
        self.repair_actual = amount;
        self
    }

    pub fn with_replace_estimate(mut self, amount: Money) -> Self {
        self.replace_estimate = amount;
        self
    }

    pub fn with_fmv(mut self, amount: Money) -> Self {
        self.fmv = amount;
        self
    }

    /// Builds the item for `claim`, rebinding the covered item to its policy
    pub fn build_for(self, claim: &Claim) -> ClaimItem {
        let covered = self.covered.with_policy_id(claim.policy_id).build();
        let mut item = ClaimItem::new(claim.id, covered);
        item.is_repairable = self.is_repairable;
        item.repair_estimate = self.repair_estimate;
        item.repair_actual = self.repair_actual;
        item.replace_estimate = self.replace_estimate;
        item.payout_option = self.payout_option;
        item.fmv = self.fmv;
        item
    }
}

/// Builder for claims in any status
pub struct ClaimBuilder {
    policy_id: PolicyId,
    incident_type: IncidentType,
    description: String,
    status: ClaimStatus,
    status_reason: String,
    reviewer_id: Option<UserId>,
    items: Vec<ClaimItemBuilder>,
    receipt: bool,
}

impl Default for ClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBuilder {
    /// A Draft theft claim without items
    pub fn new() -> Self {
        Self {
            policy_id: PolicyId::new(),
            incident_type: IncidentType::Theft,
            description: "Laptop stolen from a parked car".to_string(),
            status: ClaimStatus::Draft,
            status_reason: String::new(),
            reviewer_id: None,
            items: Vec::new(),
            receipt: false,
        }
    }

    pub fn with_policy_id(mut self, policy_id: PolicyId) -> Self {
        self.policy_id = policy_id;
        self
    }

    pub fn with_incident_type(mut self, incident_type: IncidentType) -> Self {
        self.incident_type = incident_type;
        self
    }

    /// Places the claim directly in `status`
    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_status_reason(mut self, reason: impl Into<String>) -> Self {
        self.status_reason = reason.into();
        self
    }

    pub fn with_reviewer(mut self, reviewer_id: UserId) -> Self {
        self.reviewer_id = Some(reviewer_id);
        self
    }

    pub fn with_item(mut self, item: ClaimItemBuilder) -> Self {
        self.items.push(item);
        self
    }

    /// Adds one default submit-ready item
    pub fn with_default_item(self) -> Self {
        self.with_item(ClaimItemBuilder::new())
    }

    /// Attaches a receipt file
    pub fn with_receipt(mut self) -> Self {
        self.receipt = true;
        self
    }

    pub fn build(self) -> Claim {
        let mut claim = Claim::new(
            self.policy_id,
            self.incident_type,
            TemporalFixtures::incident_date(),
            self.description,
        );
        claim.status = self.status;
        claim.status_reason = self.status_reason;
        claim.reviewer_id = self.reviewer_id;

        let items: Vec<ClaimItem> = self.items.into_iter().map(|b| b.build_for(&claim)).collect();
        claim.items = items;

        if self.receipt {
            claim.files.push(ClaimFile::new(claim.id, FileId::new(), ClaimFilePurpose::Receipt));
        }
        claim
    }
}
