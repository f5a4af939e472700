//! Claim lifecycle service
//!
//! Orchestrates one operation end to end: load the hydrated claim, snapshot
//! it, apply the domain operation, diff the snapshot into history rows, build
//! ledger entries on final approval, commit everything in one change set and
//! publish the status change once the commit has succeeded.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{AppError, ClaimId, ClaimItemId, ErrorKey, FileId, ItemId, PolicyId, PortError};

use crate::actor::Actor;
use crate::claim::{Claim, ClaimStatus, ClaimTransition, IncidentType};
use crate::claim_item::UpdateClaimItemParams;
use crate::events::ClaimEvent;
use crate::file::ClaimFilePurpose;
use crate::history::{self, fields, ClaimHistory, FieldUpdate, HistoryAction, RECENT_CHANGE_DAYS};
use crate::ledger::LedgerEntry;
use crate::ports::{ClaimChangeSet, ClaimEventPublisher, ClaimFilter, ClaimsPort};

/// Input for opening a new claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    pub policy_id: PolicyId,
    pub incident_type: IncidentType,
    pub incident_date: NaiveDate,
    pub incident_description: String,
}

/// Application service for the claim lifecycle
///
/// Users act only on claims of policies they are members of. Stewards,
/// signators and admins act on every claim.
pub struct ClaimLifecycleService<P: ?Sized, E: ?Sized> {
    port: Arc<P>,
    publisher: Arc<E>,
}

impl<P: ?Sized, E: ?Sized> Clone for ClaimLifecycleService<P, E> {
    fn clone(&self) -> Self {
        Self {
            port: Arc::clone(&self.port),
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<P: ClaimsPort + ?Sized, E: ClaimEventPublisher + ?Sized> ClaimLifecycleService<P, E> {
    pub fn new(port: Arc<P>, publisher: Arc<E>) -> Self {
        Self { port, publisher }
    }

    pub fn port(&self) -> &Arc<P> {
        &self.port
    }

    /// Opens a Draft claim
    #[instrument(skip(self, actor, new_claim), fields(actor_id = %actor.id, policy_id = %new_claim.policy_id))]
    pub async fn create_claim(&self, actor: &Actor, new_claim: NewClaim) -> Result<Claim, AppError> {
        self.ensure_member(actor, new_claim.policy_id).await?;

        let claim = Claim::new(
            new_claim.policy_id,
            new_claim.incident_type,
            new_claim.incident_date,
            new_claim.incident_description,
        );
        claim.validate()?;

        let created = claim.new_history(
            actor,
            HistoryAction::Create,
            FieldUpdate::new(fields::STATUS, "", claim.status.as_str()),
        );
        self.port.insert_claim(&claim, &[created]).await?;

        info!(claim_id = %claim.id, reference = %claim.reference_number, "claim created");
        Ok(claim)
    }

    pub async fn get_claim(&self, actor: &Actor, claim_id: ClaimId) -> Result<Claim, AppError> {
        self.load_for(actor, claim_id).await
    }

    /// Claims visible to the actor, newest first
    ///
    /// A user only ever sees claims on their own policies, whatever the filter says.
    pub async fn list_claims(&self, actor: &Actor, mut filter: ClaimFilter) -> Result<Vec<Claim>, AppError> {
        if !actor.is_approver() {
            filter.member_id = Some(actor.id);
        }
        Ok(self.port.list_claims(&filter).await?)
    }

    /// The claim together with its audit trail, oldest row first
    pub async fn history(&self, actor: &Actor, claim_id: ClaimId) -> Result<(Claim, Vec<ClaimHistory>), AppError> {
        let claim = self.load_for(actor, claim_id).await?;
        let rows = self.port.histories(claim_id).await?;
        Ok((claim, rows))
    }

    /// When the claim first entered review
    pub async fn submitted_at(&self, actor: &Actor, claim_id: ClaimId) -> Result<DateTime<Utc>, AppError> {
        let (claim, rows) = self.history(actor, claim_id).await?;
        Ok(history::submitted_at(&claim, &rows))
    }

    /// Status changes across all claims during the week before `now`
    pub async fn recent_status_changes(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClaimHistory>, AppError> {
        if !actor.is_approver() {
            return Err(AppError::forbidden("only reviewers may read the status digest"));
        }
        let rows = self
            .port
            .status_changes_since(now - Duration::days(RECENT_CHANGE_DAYS))
            .await?;
        Ok(history::recent_status_changes(&rows, now))
    }

    /// Adds a claim item for a covered item of the claim's policy
    #[instrument(skip(self, actor, params), fields(actor_id = %actor.id, claim_id = %claim_id, item_id = %item_id))]
    pub async fn add_item(
        &self,
        actor: &Actor,
        claim_id: ClaimId,
        item_id: ItemId,
        params: UpdateClaimItemParams,
    ) -> Result<Claim, AppError> {
        let mut claim = self.load_for(actor, claim_id).await?;
        let covered = self.port.load_covered_item(item_id).await?;
        let snapshot = claim.clone();

        claim.add_item(actor, covered, &params)?;

        self.commit(actor, &snapshot, claim, Vec::new()).await
    }

    #[instrument(skip(self, actor, params), fields(actor_id = %actor.id, claim_id = %claim_id, claim_item_id = %claim_item_id))]
    pub async fn update_item(
        &self,
        actor: &Actor,
        claim_id: ClaimId,
        claim_item_id: ClaimItemId,
        params: UpdateClaimItemParams,
    ) -> Result<Claim, AppError> {
        let mut claim = self.load_for(actor, claim_id).await?;
        let snapshot = claim.clone();

        claim.update_item(actor, claim_item_id, &params)?;

        self.commit(actor, &snapshot, claim, Vec::new()).await
    }

    /// Links an uploaded file to the claim
    #[instrument(skip(self, actor), fields(actor_id = %actor.id, claim_id = %claim_id))]
    pub async fn attach_file(
        &self,
        actor: &Actor,
        claim_id: ClaimId,
        file_id: FileId,
        purpose: ClaimFilePurpose,
    ) -> Result<Claim, AppError> {
        let mut claim = self.load_for(actor, claim_id).await?;
        let snapshot = claim.clone();

        claim.attach_file(file_id, purpose)?;

        self.commit(actor, &snapshot, claim, Vec::new()).await
    }

    /// Runs a lifecycle transition and persists its effects
    ///
    /// # Errors
    ///
    /// Domain rule violations come back as user errors; a concurrent commit
    /// comes back as a conflict. Event publishing failures are logged only.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id, claim_id = %claim_id, operation = transition.name()))]
    pub async fn transition(
        &self,
        actor: &Actor,
        claim_id: ClaimId,
        transition: ClaimTransition,
    ) -> Result<Claim, AppError> {
        let mut claim = self.load_for(actor, claim_id).await?;
        let snapshot = claim.clone();

        claim.apply_transition(actor, &transition)?;

        let ledger_entries = if claim.status == ClaimStatus::Approved && snapshot.status != ClaimStatus::Approved {
            claim.create_ledger_entries()?
        } else {
            Vec::new()
        };

        let claim = self.commit(actor, &snapshot, claim, ledger_entries).await?;

        info!(from = %snapshot.status, to = %claim.status, "claim transitioned");

        if claim.status != snapshot.status {
            let event = ClaimEvent::status_changed(claim.id, snapshot.status, claim.status, actor.id);
            if let Err(e) = self.publisher.publish(&event).await {
                warn!(error = %e, "failed to publish claim status change");
            }
        }

        Ok(claim)
    }

    /// Loads a claim the actor may act on
    async fn load_for(&self, actor: &Actor, claim_id: ClaimId) -> Result<Claim, AppError> {
        let claim = self.port.load_claim(claim_id).await.map_err(|e| match e {
            PortError::NotFound { .. } => AppError::not_found(ErrorKey::ClaimNotFound, e.to_string()),
            other => other.into(),
        })?;
        self.ensure_member(actor, claim.policy_id).await?;
        Ok(claim)
    }

    async fn ensure_member(&self, actor: &Actor, policy_id: PolicyId) -> Result<(), AppError> {
        if actor.is_approver() || self.port.is_policy_member(policy_id, actor.id).await? {
            return Ok(());
        }
        warn!(actor_id = %actor.id, policy_id = %policy_id, "actor is not a member of the policy");
        Err(AppError::forbidden(format!("user {} is not a member of policy {}", actor.id, policy_id)))
    }

    /// Diffs `claim` against `snapshot` and commits the result
    async fn commit(
        &self,
        actor: &Actor,
        snapshot: &Claim,
        mut claim: Claim,
        ledger_entries: Vec<LedgerEntry>,
    ) -> Result<Claim, AppError> {
        let histories = history_rows(actor, snapshot, &claim);

        let changes = ClaimChangeSet {
            claim: claim.clone(),
            expected_version: snapshot.version,
            histories,
            ledger_entries,
        };
        self.port.commit(&changes).await?;

        claim.version = snapshot.version + 1;
        Ok(claim)
    }
}

/// One history row per changed claim or item field
fn history_rows(actor: &Actor, snapshot: &Claim, claim: &Claim) -> Vec<ClaimHistory> {
    let mut rows: Vec<ClaimHistory> = claim
        .compare(snapshot)
        .into_iter()
        .map(|update| claim.new_history(actor, HistoryAction::Update, update))
        .collect();

    for item in &claim.items {
        match snapshot.item(item.id) {
            Some(old) => rows.extend(
                item.compare(old)
                    .into_iter()
                    .map(|update| item.new_history(actor, HistoryAction::Update, update)),
            ),
            None => rows.push(item.new_history(
                actor,
                HistoryAction::Create,
                FieldUpdate::new(fields::ITEM_ID, "", item.item_id().to_string()),
            )),
        }
    }

    rows
}
