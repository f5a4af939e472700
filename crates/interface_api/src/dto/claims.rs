//! Claims DTOs
//!
//! Amounts cross the API as decimals in major units and are converted to
//! minor-unit `Money` at the boundary.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{FileId, Money, MoneyError, PolicyId};
use domain_claims::{
    Claim, ClaimFile, ClaimFilePurpose, ClaimFilter, ClaimHistory, ClaimItem, ClaimStatus, IncidentType, NewClaim,
    PayoutOption, UpdateClaimItemParams,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClaimRequest {
    pub policy_id: Uuid,
    pub incident_type: IncidentType,
    pub incident_date: NaiveDate,
    #[validate(length(min = 1, max = 4000))]
    pub incident_description: String,
}

impl From<CreateClaimRequest> for NewClaim {
    fn from(request: CreateClaimRequest) -> Self {
        NewClaim {
            policy_id: PolicyId::from_uuid(request.policy_id),
            incident_type: request.incident_type,
            incident_date: request.incident_date,
            incident_description: request.incident_description,
        }
    }
}

/// Claim item fields; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ClaimItemRequest {
    pub is_repairable: Option<bool>,
    pub repair_estimate: Option<Decimal>,
    pub repair_actual: Option<Decimal>,
    pub replace_estimate: Option<Decimal>,
    pub replace_actual: Option<Decimal>,
    pub payout_option: Option<PayoutOption>,
    pub fmv: Option<Decimal>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
}

impl ClaimItemRequest {
    pub fn into_params(self) -> Result<UpdateClaimItemParams, MoneyError> {
        Ok(UpdateClaimItemParams {
            is_repairable: self.is_repairable,
            repair_estimate: to_money(self.repair_estimate)?,
            repair_actual: to_money(self.repair_actual)?,
            replace_estimate: to_money(self.replace_estimate)?,
            replace_actual: to_money(self.replace_actual)?,
            payout_option: self.payout_option,
            fmv: to_money(self.fmv)?,
            location: self.location,
        })
    }
}

fn to_money(amount: Option<Decimal>) -> Result<Option<Money>, MoneyError> {
    amount.map(Money::try_from_decimal).transpose()
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    /// Covered item the claim line is for
    pub item_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub details: ClaimItemRequest,
}

#[derive(Debug, Deserialize)]
pub struct AttachFileRequest {
    pub file_id: Uuid,
    pub purpose: ClaimFilePurpose,
}

impl AttachFileRequest {
    pub fn file_id(&self) -> FileId {
        FileId::from_uuid(self.file_id)
    }
}

/// Body of revision, receipt and deny requests
///
/// An empty message is passed through so the lifecycle rules report the
/// missing status reason.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct MessageRequest {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub message: String,
}

/// Query string of `GET /claims`
#[derive(Debug, Default, Deserialize)]
pub struct ListClaimsQuery {
    pub policy_id: Option<Uuid>,
    pub status: Option<ClaimStatus>,
}

impl From<ListClaimsQuery> for ClaimFilter {
    fn from(query: ListClaimsQuery) -> Self {
        ClaimFilter {
            member_id: None,
            policy_id: query.policy_id.map(PolicyId::from_uuid),
            status: query.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub id: Uuid,
    pub policy_id: Uuid,
    pub reference_number: String,
    pub incident_type: IncidentType,
    pub incident_date: NaiveDate,
    pub incident_description: String,
    pub status: ClaimStatus,
    pub status_reason: String,
    pub reviewer_id: Option<Uuid>,
    pub review_date: Option<DateTime<Utc>>,
    pub payment_date: Option<DateTime<Utc>>,
    pub total_payout: Decimal,
    pub items: Vec<ClaimItemResponse>,
    pub files: Vec<ClaimFileResponse>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Claim> for ClaimResponse {
    fn from(claim: Claim) -> Self {
        Self {
            id: claim.id.into(),
            policy_id: claim.policy_id.into(),
            reference_number: claim.reference_number,
            incident_type: claim.incident_type,
            incident_date: claim.incident_date,
            incident_description: claim.incident_description,
            status: claim.status,
            status_reason: claim.status_reason,
            reviewer_id: claim.reviewer_id.map(Uuid::from),
            review_date: claim.review_date,
            payment_date: claim.payment_date,
            total_payout: claim.total_payout.to_decimal(),
            items: claim.items.into_iter().map(ClaimItemResponse::from).collect(),
            files: claim.files.into_iter().map(ClaimFileResponse::from).collect(),
            version: claim.version,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimItemResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub coverage_amount: Decimal,
    pub is_repairable: bool,
    pub repair_estimate: Decimal,
    pub repair_actual: Decimal,
    pub replace_estimate: Decimal,
    pub replace_actual: Decimal,
    pub payout_option: Option<PayoutOption>,
    pub payout_amount: Decimal,
    pub fmv: Decimal,
    pub location: String,
    pub reviewer_id: Option<Uuid>,
    pub review_date: Option<DateTime<Utc>>,
}

impl From<ClaimItem> for ClaimItemResponse {
    fn from(item: ClaimItem) -> Self {
        Self {
            id: item.id.into(),
            item_id: item.covered_item.id.into(),
            name: item.covered_item.name,
            coverage_amount: item.covered_item.coverage_amount.to_decimal(),
            is_repairable: item.is_repairable,
            repair_estimate: item.repair_estimate.to_decimal(),
            repair_actual: item.repair_actual.to_decimal(),
            replace_estimate: item.replace_estimate.to_decimal(),
            replace_actual: item.replace_actual.to_decimal(),
            payout_option: item.payout_option,
            payout_amount: item.payout_amount.to_decimal(),
            fmv: item.fmv.to_decimal(),
            location: item.location,
            reviewer_id: item.reviewer_id.map(Uuid::from),
            review_date: item.review_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimFileResponse {
    pub file_id: Uuid,
    pub purpose: ClaimFilePurpose,
    pub created_at: DateTime<Utc>,
}

impl From<ClaimFile> for ClaimFileResponse {
    fn from(file: ClaimFile) -> Self {
        Self {
            file_id: file.file_id.into(),
            purpose: file.purpose,
            created_at: file.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub claim_item_id: Option<Uuid>,
    pub user_id: Uuid,
    pub action: &'static str,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub created_at: DateTime<Utc>,
}

impl From<ClaimHistory> for HistoryEntryResponse {
    fn from(row: ClaimHistory) -> Self {
        Self {
            id: row.id.into(),
            claim_item_id: row.claim_item_id.map(Uuid::from),
            user_id: row.user_id.into(),
            action: row.action.as_str(),
            field_name: row.field_name,
            old_value: row.old_value,
            new_value: row.new_value,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimHistoryResponse {
    /// When the claim first entered review
    pub submitted_at: DateTime<Utc>,
    pub entries: Vec<HistoryEntryResponse>,
}

/// One line of the recent status changes digest
#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub claim_id: Uuid,
    pub changed_by: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub changed_at: DateTime<Utc>,
}

impl From<ClaimHistory> for StatusChangeResponse {
    fn from(row: ClaimHistory) -> Self {
        Self {
            claim_id: row.claim_id.into(),
            changed_by: row.user_id.into(),
            old_status: row.old_value,
            new_status: row.new_value,
            changed_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_item_request_converts_to_minor_units() {
        let request = ClaimItemRequest {
            repair_estimate: Some(dec!(125.50)),
            fmv: Some(dec!(80)),
            ..Default::default()
        };

        let params = request.into_params().unwrap();
        assert_eq!(params.repair_estimate, Some(Money::from_minor(12_550)));
        assert_eq!(params.fmv, Some(Money::from_minor(8_000)));
        assert_eq!(params.replace_estimate, None);
    }

    #[test]
    fn test_item_request_rejects_sub_cent_amounts() {
        let request = ClaimItemRequest {
            replace_estimate: Some(dec!(10.005)),
            ..Default::default()
        };
        assert!(request.into_params().is_err());
    }

    #[test]
    fn test_add_item_request_flattens_details() {
        let body = serde_json::json!({
            "item_id": Uuid::nil(),
            "payout_option": "FMV",
            "fmv": "250.00",
        });
        let request: AddItemRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.details.payout_option, Some(PayoutOption::Fmv));
        assert_eq!(request.details.fmv, Some(dec!(250.00)));
    }

    #[test]
    fn test_list_query_builds_filter() {
        let policy_id = Uuid::new_v4();
        let query = ListClaimsQuery {
            policy_id: Some(policy_id),
            status: Some(ClaimStatus::Review2),
        };

        let filter = ClaimFilter::from(query);
        assert_eq!(filter.policy_id, Some(PolicyId::from_uuid(policy_id)));
        assert_eq!(filter.status, Some(ClaimStatus::Review2));
        assert!(filter.member_id.is_none());
    }

    #[test]
    fn test_message_defaults_to_empty() {
        let request: MessageRequest = serde_json::from_str("{}").unwrap();
        assert!(request.message.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_blank_description_fails_validation() {
        let request = CreateClaimRequest {
            policy_id: Uuid::nil(),
            incident_type: IncidentType::Theft,
            incident_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            incident_description: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
