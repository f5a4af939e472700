//! Claims repository implementation
//!
//! This module provides database access for claims, their items and files,
//! the claim history audit trail and claim ledger entries. Amounts are
//! BIGINT minor units; enumerations are stored as their canonical text.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = r#"
    claim_id,
    policy_id,
    reference_number,
    incident_type,
    incident_date,
    incident_description,
    status,
    status_reason,
    reviewer_id,
    review_date,
    payment_date,
    total_payout,
    version,
    created_at,
    updated_at
"#;

/// Repository for managing claims data
///
/// Reads return plain rows; `commit` writes a whole change set inside one
/// transaction guarded by the claim's version column.
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    /// Creates a new ClaimsRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a claim by its identifier
    ///
    /// # Returns
    ///
    /// The claim record or NotFound error
    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<ClaimRow, DatabaseError> {
        let sql = format!("SELECT {} FROM claims WHERE claim_id = $1", CLAIM_COLUMNS);
        sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }

    /// Retrieves claims matching the optional filters, newest first
    ///
    /// `member_id` keeps only claims on policies the user is a member of.
    pub async fn find(
        &self,
        member_id: Option<Uuid>,
        policy_id: Option<Uuid>,
        status: Option<&str>,
    ) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {} FROM claims
            WHERE ($1::uuid IS NULL OR policy_id IN (
                      SELECT policy_id FROM policy_members WHERE user_id = $1))
              AND ($2::uuid IS NULL OR policy_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC, claim_id
            "#,
            CLAIM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(member_id)
            .bind(policy_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "claims listed");
        Ok(rows)
    }

    pub async fn is_policy_member(&self, policy_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let member = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM policy_members WHERE policy_id = $1 AND user_id = $2)",
        )
        .bind(policy_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    /// Registers a user as member of a policy; repeated calls are no-ops
    pub async fn add_policy_member(&self, policy_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO policy_members (policy_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (policy_id, user_id) DO NOTHING
            "#,
        )
        .bind(policy_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieves the items of a claim joined with their covered items
    pub async fn get_items(&self, claim_id: Uuid) -> Result<Vec<ClaimItemRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClaimItemRow>(
            r#"
            SELECT
                ci.claim_item_id,
                ci.claim_id,
                ci.item_id,
                cov.policy_id,
                cov.name AS item_name,
                cov.coverage_amount,
                cov.accountable_first_name,
                cov.accountable_last_name,
                ci.is_repairable,
                ci.repair_estimate,
                ci.repair_actual,
                ci.replace_estimate,
                ci.replace_actual,
                ci.payout_option,
                ci.payout_amount,
                ci.fmv,
                ci.location,
                ci.review_date,
                ci.reviewer_id,
                ci.created_at,
                ci.updated_at
            FROM claim_items ci
            JOIN covered_items cov ON cov.item_id = ci.item_id
            WHERE ci.claim_id = $1
            ORDER BY ci.created_at, ci.claim_item_id
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Retrieves the files linked to a claim
    pub async fn get_files(&self, claim_id: Uuid) -> Result<Vec<ClaimFileRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClaimFileRow>(
            r#"
            SELECT claim_id, file_id, purpose, created_at
            FROM claim_files
            WHERE claim_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Retrieves a covered item
    pub async fn get_covered_item(&self, item_id: Uuid) -> Result<CoveredItemRow, DatabaseError> {
        sqlx::query_as::<_, CoveredItemRow>(
            r#"
            SELECT item_id, policy_id, name, coverage_amount, accountable_first_name, accountable_last_name
            FROM covered_items
            WHERE item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Item", item_id))
    }

    /// Inserts or refreshes a covered item
    pub async fn upsert_covered_item(&self, item: &CoveredItemRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO covered_items (
                item_id, policy_id, name, coverage_amount, accountable_first_name, accountable_last_name
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (item_id) DO UPDATE SET
                policy_id = EXCLUDED.policy_id,
                name = EXCLUDED.name,
                coverage_amount = EXCLUDED.coverage_amount,
                accountable_first_name = EXCLUDED.accountable_first_name,
                accountable_last_name = EXCLUDED.accountable_last_name
            "#,
        )
        .bind(item.item_id)
        .bind(item.policy_id)
        .bind(&item.name)
        .bind(item.coverage_amount)
        .bind(&item.accountable_first_name)
        .bind(&item.accountable_last_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// History rows of a claim, oldest first
    pub async fn get_histories(&self, claim_id: Uuid) -> Result<Vec<ClaimHistoryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClaimHistoryRow>(
            r#"
            SELECT
                history_id, claim_id, claim_item_id, user_id, action,
                field_name, old_value, new_value, created_at
            FROM claim_histories
            WHERE claim_id = $1
            ORDER BY created_at, history_id
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Claim-level status updates of all claims newer than `since`, oldest first
    pub async fn get_status_changes_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ClaimHistoryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClaimHistoryRow>(
            r#"
            SELECT
                history_id, claim_id, claim_item_id, user_id, action,
                field_name, old_value, new_value, created_at
            FROM claim_histories
            WHERE field_name = 'status'
              AND action = 'Update'
              AND claim_item_id IS NULL
              AND created_at > $1
            ORDER BY created_at, history_id
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Ledger entries posted for a claim
    pub async fn get_ledger_entries(&self, claim_id: Uuid) -> Result<Vec<LedgerEntryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            SELECT
                entry_id, entry_type, policy_id, item_id, claim_id,
                amount, first_name, last_name, created_at
            FROM ledger_entries
            WHERE claim_id = $1
            ORDER BY created_at, entry_id
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a new claim together with its creation history
    pub async fn insert(&self, claim: &ClaimRow, histories: &[ClaimHistoryRow]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO claims (
                claim_id, policy_id, reference_number, incident_type, incident_date,
                incident_description, status, status_reason, reviewer_id, review_date,
                payment_date, total_payout, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(claim.claim_id)
        .bind(claim.policy_id)
        .bind(&claim.reference_number)
        .bind(&claim.incident_type)
        .bind(claim.incident_date)
        .bind(&claim.incident_description)
        .bind(&claim.status)
        .bind(&claim.status_reason)
        .bind(claim.reviewer_id)
        .bind(claim.review_date)
        .bind(claim.payment_date)
        .bind(claim.total_payout)
        .bind(claim.version)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&mut *tx)
        .await?;

        for history in histories {
            insert_history(&mut tx, history).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Writes a change set in a single transaction
    ///
    /// The claim row is updated only while its version still equals
    /// `expected_version`; the version is then incremented.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::VersionConflict` when the stored version moved on
    pub async fn commit(&self, changes: &ClaimChangeRows) -> Result<(), DatabaseError> {
        let claim = &changes.claim;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE claims SET
                policy_id = $3,
                reference_number = $4,
                incident_type = $5,
                incident_date = $6,
                incident_description = $7,
                status = $8,
                status_reason = $9,
                reviewer_id = $10,
                review_date = $11,
                payment_date = $12,
                total_payout = $13,
                updated_at = $14,
                version = version + 1
            WHERE claim_id = $1 AND version = $2
            "#,
        )
        .bind(claim.claim_id)
        .bind(changes.expected_version)
        .bind(claim.policy_id)
        .bind(&claim.reference_number)
        .bind(&claim.incident_type)
        .bind(claim.incident_date)
        .bind(&claim.incident_description)
        .bind(&claim.status)
        .bind(&claim.status_reason)
        .bind(claim.reviewer_id)
        .bind(claim.review_date)
        .bind(claim.payment_date)
        .bind(claim.total_payout)
        .bind(claim.updated_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM claims WHERE claim_id = $1)")
                .bind(claim.claim_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                DatabaseError::VersionConflict(format!(
                    "claim {} is no longer at version {}",
                    claim.claim_id, changes.expected_version
                ))
            } else {
                DatabaseError::not_found("Claim", claim.claim_id)
            });
        }

        for item in &changes.items {
            upsert_item(&mut tx, item).await?;
        }

        for file in &changes.files {
            sqlx::query(
                r#"
                INSERT INTO claim_files (claim_id, file_id, purpose, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (claim_id, file_id) DO NOTHING
                "#,
            )
            .bind(file.claim_id)
            .bind(file.file_id)
            .bind(&file.purpose)
            .bind(file.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for history in &changes.histories {
            insert_history(&mut tx, history).await?;
        }

        for entry in &changes.ledger_entries {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries (
                    entry_id, entry_type, policy_id, item_id, claim_id,
                    amount, first_name, last_name, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(entry.entry_id)
            .bind(&entry.entry_type)
            .bind(entry.policy_id)
            .bind(entry.item_id)
            .bind(entry.claim_id)
            .bind(entry.amount)
            .bind(&entry.first_name)
            .bind(&entry.last_name)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            claim_id = %claim.claim_id,
            version = changes.expected_version + 1,
            histories = changes.histories.len(),
            ledger_entries = changes.ledger_entries.len(),
            "claim change set committed"
        );
        Ok(())
    }
}

async fn upsert_item(tx: &mut Transaction<'_, Postgres>, item: &ClaimItemRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO claim_items (
            claim_item_id, claim_id, item_id, is_repairable, repair_estimate,
            repair_actual, replace_estimate, replace_actual, payout_option, payout_amount,
            fmv, location, review_date, reviewer_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT (claim_item_id) DO UPDATE SET
            is_repairable = EXCLUDED.is_repairable,
            repair_estimate = EXCLUDED.repair_estimate,
            repair_actual = EXCLUDED.repair_actual,
            replace_estimate = EXCLUDED.replace_estimate,
            replace_actual = EXCLUDED.replace_actual,
            payout_option = EXCLUDED.payout_option,
            payout_amount = EXCLUDED.payout_amount,
            fmv = EXCLUDED.fmv,
            location = EXCLUDED.location,
            review_date = EXCLUDED.review_date,
            reviewer_id = EXCLUDED.reviewer_id,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(item.claim_item_id)
    .bind(item.claim_id)
    .bind(item.item_id)
    .bind(item.is_repairable)
    .bind(item.repair_estimate)
    .bind(item.repair_actual)
    .bind(item.replace_estimate)
    .bind(item.replace_actual)
    .bind(&item.payout_option)
    .bind(item.payout_amount)
    .bind(item.fmv)
    .bind(&item.location)
    .bind(item.review_date)
    .bind(item.reviewer_id)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_history(tx: &mut Transaction<'_, Postgres>, history: &ClaimHistoryRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO claim_histories (
            history_id, claim_id, claim_item_id, user_id, action,
            field_name, old_value, new_value, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(history.history_id)
    .bind(history.claim_id)
    .bind(history.claim_item_id)
    .bind(history.user_id)
    .bind(&history.action)
    .bind(&history.field_name)
    .bind(&history.old_value)
    .bind(&history.new_value)
    .bind(history.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Database row for claim
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub policy_id: Uuid,
    pub reference_number: String,
    pub incident_type: String,
    pub incident_date: NaiveDate,
    pub incident_description: String,
    pub status: String,
    pub status_reason: String,
    pub reviewer_id: Option<Uuid>,
    pub review_date: Option<DateTime<Utc>>,
    pub payment_date: Option<DateTime<Utc>>,
    pub total_payout: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a claim item, joined with its covered item
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ClaimItemRow {
    pub claim_item_id: Uuid,
    pub claim_id: Uuid,
    pub item_id: Uuid,
    pub policy_id: Uuid,
    pub item_name: String,
    pub coverage_amount: i64,
    pub accountable_first_name: String,
    pub accountable_last_name: String,
    pub is_repairable: bool,
    pub repair_estimate: i64,
    pub repair_actual: i64,
    pub replace_estimate: i64,
    pub replace_actual: i64,
    pub payout_option: Option<String>,
    pub payout_amount: i64,
    pub fmv: i64,
    pub location: String,
    pub review_date: Option<DateTime<Utc>>,
    pub reviewer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a covered item
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CoveredItemRow {
    pub item_id: Uuid,
    pub policy_id: Uuid,
    pub name: String,
    pub coverage_amount: i64,
    pub accountable_first_name: String,
    pub accountable_last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ClaimFileRow {
    pub claim_id: Uuid,
    pub file_id: Uuid,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
}

/// Database row for an audit record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ClaimHistoryRow {
    pub history_id: Uuid,
    pub claim_id: Uuid,
    pub claim_item_id: Option<Uuid>,
    pub user_id: Uuid,
    pub action: String,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LedgerEntryRow {
    pub entry_id: Uuid,
    pub entry_type: String,
    pub policy_id: Uuid,
    pub item_id: Option<Uuid>,
    pub claim_id: Option<Uuid>,
    pub amount: i64,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Rows written by one `commit`
#[derive(Debug, Clone)]
pub struct ClaimChangeRows {
    pub claim: ClaimRow,
    pub expected_version: i64,
    pub items: Vec<ClaimItemRow>,
    pub files: Vec<ClaimFileRow>,
    pub histories: Vec<ClaimHistoryRow>,
    pub ledger_entries: Vec<LedgerEntryRow>,
}
