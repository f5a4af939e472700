//! PostgreSQL Claims Adapter
//!
//! This module provides the internal (database) adapter for the claims
//! domain, implementing the `ClaimsPort` trait using PostgreSQL via the
//! `ClaimsRepository`.
//!
//! # Overview
//!
//! The `PostgresClaimsAdapter` serves as the bridge between the domain
//! layer's port interface and the database layer. It:
//!
//! - Hydrates a claim from its claim, item, covered-item and file rows
//! - Converts domain change sets into repository rows
//! - Translates database errors into port errors
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimsAdapter;
//! use domain_claims::ClaimsPort;
//!
//! let adapter = PostgresClaimsAdapter::new(pool);
//! let claim = adapter.load_claim(claim_id).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    ClaimHistoryId, ClaimId, ClaimItemId, DomainPort, FileId, HealthCheckResult, HealthCheckable, ItemId,
    LedgerEntryId, Money, PolicyId, PortError, UserId,
};
use domain_claims::{
    Claim, ClaimChangeSet, ClaimFile, ClaimFilter, ClaimHistory, ClaimItem, ClaimsPort, CoveredItem, LedgerEntry,
};

use crate::repositories::claims::{
    ClaimChangeRows, ClaimFileRow, ClaimHistoryRow, ClaimItemRow, ClaimRow, ClaimsRepository, CoveredItemRow,
    LedgerEntryRow,
};

/// PostgreSQL-backed implementation of the ClaimsPort trait
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - `DatabaseError::VersionConflict` -> `PortError::Conflict`
/// - Stored values the domain cannot parse -> `PortError::Transformation`
#[derive(Debug, Clone)]
pub struct PostgresClaimsAdapter {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimsAdapter {
    /// Creates a new PostgreSQL claims adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    ///
    /// Used for operations outside the port, such as seeding covered items.
    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimsAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClaimsAdapter {
    /// Performs a `SELECT 1` to verify the pool is operational
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-claims-adapter", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-claims-adapter",
                latency_ms,
                format!("Database error: {}", e),
            ),
        }
    }
}

#[async_trait]
impl ClaimsPort for PostgresClaimsAdapter {
    #[instrument(skip(self), fields(claim_id = %id))]
    async fn load_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        debug!("Loading claim");

        let claim_id = *id.as_uuid();
        let row = self.repository.get_by_id(claim_id).await?;
        let items = self.repository.get_items(claim_id).await?;
        let files = self.repository.get_files(claim_id).await?;

        row_to_claim(row, items, files)
    }

    #[instrument(skip(self), fields(item_id = %id))]
    async fn load_covered_item(&self, id: ItemId) -> Result<CoveredItem, PortError> {
        let row = self.repository.get_covered_item(*id.as_uuid()).await?;
        Ok(row_to_covered_item(row))
    }

    #[instrument(skip(self, claim, histories), fields(claim_id = %claim.id))]
    async fn insert_claim(&self, claim: &Claim, histories: &[ClaimHistory]) -> Result<(), PortError> {
        debug!("Inserting claim");

        let rows: Vec<ClaimHistoryRow> = histories.iter().map(history_to_row).collect();
        self.repository.insert(&claim_to_row(claim), &rows).await?;
        Ok(())
    }

    #[instrument(skip(self, changes), fields(claim_id = %changes.claim.id, expected_version = changes.expected_version))]
    async fn commit(&self, changes: &ClaimChangeSet) -> Result<(), PortError> {
        let claim = &changes.claim;
        let rows = ClaimChangeRows {
            claim: claim_to_row(claim),
            expected_version: changes.expected_version,
            items: claim.items.iter().map(item_to_row).collect(),
            files: claim.files.iter().map(file_to_row).collect(),
            histories: changes.histories.iter().map(history_to_row).collect(),
            ledger_entries: changes.ledger_entries.iter().map(ledger_entry_to_row).collect(),
        };

        self.repository.commit(&rows).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn histories(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError> {
        self.repository
            .get_histories(*claim_id.as_uuid())
            .await?
            .into_iter()
            .map(row_to_history)
            .collect()
    }

    #[instrument(skip(self), fields(policy_id = %policy_id, user_id = %user_id))]
    async fn is_policy_member(&self, policy_id: PolicyId, user_id: UserId) -> Result<bool, PortError> {
        Ok(self
            .repository
            .is_policy_member(*policy_id.as_uuid(), *user_id.as_uuid())
            .await?)
    }

    #[instrument(skip(self))]
    async fn list_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, PortError> {
        let rows = self
            .repository
            .find(
                filter.member_id.map(|id| *id.as_uuid()),
                filter.policy_id.map(|id| *id.as_uuid()),
                filter.status.map(|status| status.as_str()),
            )
            .await?;

        let mut claims = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.repository.get_items(row.claim_id).await?;
            let files = self.repository.get_files(row.claim_id).await?;
            claims.push(row_to_claim(row, items, files)?);
        }
        Ok(claims)
    }

    #[instrument(skip(self))]
    async fn status_changes_since(&self, since: DateTime<Utc>) -> Result<Vec<ClaimHistory>, PortError> {
        self.repository
            .get_status_changes_since(since)
            .await?
            .into_iter()
            .map(row_to_history)
            .collect()
    }
}

// ============================================================================
// Row -> domain conversions
// ============================================================================

fn parse_column<T>(column: &str, value: &str) -> Result<T, PortError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| PortError::transformation(format!("invalid {} '{}': {}", column, value, e)))
}

/// Converts a claim row and its child rows to a domain Claim
fn row_to_claim(row: ClaimRow, items: Vec<ClaimItemRow>, files: Vec<ClaimFileRow>) -> Result<Claim, PortError> {
    let incident_type = parse_column("incident_type", &row.incident_type)?;

    Ok(Claim {
        id: ClaimId::from_uuid(row.claim_id),
        policy_id: PolicyId::from_uuid(row.policy_id),
        reference_number: row.reference_number,
        incident_type,
        incident_date: row.incident_date,
        incident_description: row.incident_description,
        status: parse_column("status", &row.status)?,
        status_reason: row.status_reason,
        reviewer_id: row.reviewer_id.map(UserId::from_uuid),
        review_date: row.review_date,
        payment_date: row.payment_date,
        total_payout: Money::from_minor(row.total_payout),
        items: items.into_iter().map(row_to_item).collect::<Result<_, _>>()?,
        files: files.into_iter().map(row_to_file).collect::<Result<_, _>>()?,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_item(row: ClaimItemRow) -> Result<ClaimItem, PortError> {
    let payout_option = row
        .payout_option
        .as_deref()
        .map(|value| parse_column("payout_option", value))
        .transpose()?;

    Ok(ClaimItem {
        id: ClaimItemId::from_uuid(row.claim_item_id),
        claim_id: ClaimId::from_uuid(row.claim_id),
        covered_item: CoveredItem {
            id: ItemId::from_uuid(row.item_id),
            policy_id: PolicyId::from_uuid(row.policy_id),
            name: row.item_name,
            coverage_amount: Money::from_minor(row.coverage_amount),
            accountable_first_name: row.accountable_first_name,
            accountable_last_name: row.accountable_last_name,
        },
        is_repairable: row.is_repairable,
        repair_estimate: Money::from_minor(row.repair_estimate),
        repair_actual: Money::from_minor(row.repair_actual),
        replace_estimate: Money::from_minor(row.replace_estimate),
        replace_actual: Money::from_minor(row.replace_actual),
        payout_option,
        payout_amount: Money::from_minor(row.payout_amount),
        fmv: Money::from_minor(row.fmv),
        location: row.location,
        review_date: row.review_date,
        reviewer_id: row.reviewer_id.map(UserId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_file(row: ClaimFileRow) -> Result<ClaimFile, PortError> {
    Ok(ClaimFile {
        claim_id: ClaimId::from_uuid(row.claim_id),
        file_id: FileId::from_uuid(row.file_id),
        purpose: parse_column("purpose", &row.purpose)?,
        created_at: row.created_at,
    })
}

fn row_to_covered_item(row: CoveredItemRow) -> CoveredItem {
    CoveredItem {
        id: ItemId::from_uuid(row.item_id),
        policy_id: PolicyId::from_uuid(row.policy_id),
        name: row.name,
        coverage_amount: Money::from_minor(row.coverage_amount),
        accountable_first_name: row.accountable_first_name,
        accountable_last_name: row.accountable_last_name,
    }
}

fn row_to_history(row: ClaimHistoryRow) -> Result<ClaimHistory, PortError> {
    Ok(ClaimHistory {
        id: ClaimHistoryId::from_uuid(row.history_id),
        claim_id: ClaimId::from_uuid(row.claim_id),
        claim_item_id: row.claim_item_id.map(ClaimItemId::from_uuid),
        user_id: UserId::from_uuid(row.user_id),
        action: parse_column("action", &row.action)?,
        field_name: row.field_name,
        old_value: row.old_value,
        new_value: row.new_value,
        created_at: row.created_at,
    })
}

// ============================================================================
// Domain -> row conversions
// ============================================================================

fn claim_to_row(claim: &Claim) -> ClaimRow {
    ClaimRow {
        claim_id: *claim.id.as_uuid(),
        policy_id: *claim.policy_id.as_uuid(),
        reference_number: claim.reference_number.clone(),
        incident_type: claim.incident_type.as_str().to_string(),
        incident_date: claim.incident_date,
        incident_description: claim.incident_description.clone(),
        status: claim.status.as_str().to_string(),
        status_reason: claim.status_reason.clone(),
        reviewer_id: claim.reviewer_id.map(Into::into),
        review_date: claim.review_date,
        payment_date: claim.payment_date,
        total_payout: claim.total_payout.minor_units(),
        version: claim.version,
        created_at: claim.created_at,
        updated_at: claim.updated_at,
    }
}

fn item_to_row(item: &ClaimItem) -> ClaimItemRow {
    let covered = &item.covered_item;
    ClaimItemRow {
        claim_item_id: *item.id.as_uuid(),
        claim_id: *item.claim_id.as_uuid(),
        item_id: *covered.id.as_uuid(),
        policy_id: *covered.policy_id.as_uuid(),
        item_name: covered.name.clone(),
        coverage_amount: covered.coverage_amount.minor_units(),
        accountable_first_name: covered.accountable_first_name.clone(),
        accountable_last_name: covered.accountable_last_name.clone(),
        is_repairable: item.is_repairable,
        repair_estimate: item.repair_estimate.minor_units(),
        repair_actual: item.repair_actual.minor_units(),
        replace_estimate: item.replace_estimate.minor_units(),
        replace_actual: item.replace_actual.minor_units(),
        payout_option: item.payout_option.map(|o| o.as_str().to_string()),
        payout_amount: item.payout_amount.minor_units(),
        fmv: item.fmv.minor_units(),
        location: item.location.clone(),
        review_date: item.review_date,
        reviewer_id: item.reviewer_id.map(Into::into),
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

fn file_to_row(file: &ClaimFile) -> ClaimFileRow {
    ClaimFileRow {
        claim_id: *file.claim_id.as_uuid(),
        file_id: *file.file_id.as_uuid(),
        purpose: file.purpose.as_str().to_string(),
        created_at: file.created_at,
    }
}

fn history_to_row(history: &ClaimHistory) -> ClaimHistoryRow {
    ClaimHistoryRow {
        history_id: *history.id.as_uuid(),
        claim_id: *history.claim_id.as_uuid(),
        claim_item_id: history.claim_item_id.map(Into::into),
        user_id: *history.user_id.as_uuid(),
        action: history.action.as_str().to_string(),
        field_name: history.field_name.clone(),
        old_value: history.old_value.clone(),
        new_value: history.new_value.clone(),
        created_at: history.created_at,
    }
}

fn ledger_entry_to_row(entry: &LedgerEntry) -> LedgerEntryRow {
    LedgerEntryRow {
        entry_id: *entry.id.as_uuid(),
        entry_type: entry.entry_type.as_str().to_string(),
        policy_id: *entry.policy_id.as_uuid(),
        item_id: entry.item_id.map(Into::into),
        claim_id: entry.claim_id.map(Into::into),
        amount: entry.amount.minor_units(),
        first_name: entry.first_name.clone(),
        last_name: entry.last_name.clone(),
        created_at: entry.created_at,
    }
}

/// Converts a ledger entry row back to the domain type
pub fn row_to_ledger_entry(row: LedgerEntryRow) -> Result<LedgerEntry, PortError> {
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(row.entry_id),
        entry_type: parse_column("entry_type", &row.entry_type)?,
        policy_id: PolicyId::from_uuid(row.policy_id),
        item_id: row.item_id.map(ItemId::from_uuid),
        claim_id: row.claim_id.map(ClaimId::from_uuid),
        amount: Money::from_minor(row.amount),
        first_name: row.first_name,
        last_name: row.last_name,
        created_at: row.created_at,
    })
}
