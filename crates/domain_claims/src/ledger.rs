//! Ledger entries posted for approved claims
//!
//! A ledger entry records the monetary effect of a claim on its policy. Claim
//! payouts are debits, so their amounts are negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, ItemId, LedgerEntryId, Money, PolicyId};

use crate::error::ClaimError;

/// Kind of ledger posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerEntryType {
    Claim,
    NewCoverage,
    CoverageChange,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Claim => "Claim",
            LedgerEntryType::NewCoverage => "NewCoverage",
            LedgerEntryType::CoverageChange => "CoverageChange",
        }
    }
}

impl fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerEntryType {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Claim" => Ok(LedgerEntryType::Claim),
            "NewCoverage" => Ok(LedgerEntryType::NewCoverage),
            "CoverageChange" => Ok(LedgerEntryType::CoverageChange),
            other => Err(ClaimError::UnknownValue {
                kind: "ledger entry type",
                value: other.to_string(),
            }),
        }
    }
}

/// A single financial posting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub entry_type: LedgerEntryType,
    pub policy_id: PolicyId,
    pub item_id: Option<ItemId>,
    pub claim_id: Option<ClaimId>,
    /// Signed amount; negative for a payout
    pub amount: Money,
    /// Accountable person of the item
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a claim payout debit for one covered item
    pub fn claim_payout(
        policy_id: PolicyId,
        item_id: ItemId,
        claim_id: ClaimId,
        payout: Money,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new_v7(),
            entry_type: LedgerEntryType::Claim,
            policy_id,
            item_id: Some(item_id),
            claim_id: Some(claim_id),
            amount: -payout,
            first_name: first_name.into(),
            last_name: last_name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_payout_is_debit() {
        let entry = LedgerEntry::claim_payout(
            PolicyId::new(),
            ItemId::new(),
            ClaimId::new(),
            Money::from_minor(12345),
            "Ada",
            "Lovelace",
        );
        assert_eq!(entry.entry_type, LedgerEntryType::Claim);
        assert_eq!(entry.amount, Money::from_minor(-12345));
        assert_eq!(entry.first_name, "Ada");
    }

    #[test]
    fn test_entry_type_parsing() {
        assert_eq!("Claim".parse::<LedgerEntryType>().unwrap(), LedgerEntryType::Claim);
        assert!("Refund".parse::<LedgerEntryType>().is_err());
    }
}
