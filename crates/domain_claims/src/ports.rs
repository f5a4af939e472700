//! Claims Domain Ports
//!
//! The lifecycle service depends on two ports:
//!
//! - **`ClaimsPort`** loads fully hydrated claims (items, covered-item
//!   snapshots, files) and commits a change set in one transaction
//! - **`ClaimEventPublisher`** hands domain events to listeners after commit
//!
//! The PostgreSQL adapter lives in `infra_db`. An in-memory implementation
//! of both ports is available under the `mock` feature.
//!
//! ```rust,ignore
//! let port = Arc::new(PostgresClaimsAdapter::new(pool));
//! let service = ClaimLifecycleService::new(port, publisher);
//! let claim = service.transition(&actor, claim_id, ClaimTransition::Approve).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{ClaimId, DomainPort, HealthCheckable, ItemId, PolicyId, PortError, UserId};

use crate::claim::{Claim, ClaimStatus};
use crate::claim_item::CoveredItem;
use crate::events::ClaimEvent;
use crate::history::ClaimHistory;
use crate::ledger::LedgerEntry;

/// Everything one lifecycle operation writes
///
/// Adapters must apply the whole set atomically and reject it when the
/// stored claim version no longer equals `expected_version`.
#[derive(Debug, Clone)]
pub struct ClaimChangeSet {
    /// Claim state after the operation, including items and files
    pub claim: Claim,
    pub expected_version: i64,
    pub histories: Vec<ClaimHistory>,
    pub ledger_entries: Vec<LedgerEntry>,
}

/// Selects the claims returned by a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimFilter {
    /// Only claims on policies this user is a member of
    pub member_id: Option<UserId>,
    pub policy_id: Option<PolicyId>,
    pub status: Option<ClaimStatus>,
}

impl ClaimFilter {
    pub fn matches(&self, claim: &Claim) -> bool {
        self.policy_id.map_or(true, |id| claim.policy_id == id)
            && self.status.map_or(true, |status| claim.status == status)
    }
}

/// Persistence port for the claims aggregate
#[async_trait]
pub trait ClaimsPort: DomainPort + HealthCheckable {
    /// Loads a claim with its items, covered-item snapshots and files
    async fn load_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Loads the covered item a new claim item will refer to
    async fn load_covered_item(&self, id: ItemId) -> Result<CoveredItem, PortError>;

    /// Stores a new claim and its creation history
    async fn insert_claim(&self, claim: &Claim, histories: &[ClaimHistory]) -> Result<(), PortError>;

    /// Applies a change set in a single transaction
    ///
    /// # Errors
    ///
    /// Returns `PortError::Conflict` when another change committed first
    async fn commit(&self, changes: &ClaimChangeSet) -> Result<(), PortError>;

    /// History rows of a claim, oldest first
    async fn histories(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError>;

    /// Whether the user is listed as a member of the policy
    async fn is_policy_member(&self, policy_id: PolicyId, user_id: UserId) -> Result<bool, PortError>;

    /// Hydrated claims matching the filter, newest first
    async fn list_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, PortError>;

    /// Claim-level status updates of every claim recorded after `since`, oldest first
    async fn status_changes_since(&self, since: DateTime<Utc>) -> Result<Vec<ClaimHistory>, PortError>;
}

/// Publishes domain events to out-of-core listeners
#[async_trait]
pub trait ClaimEventPublisher: Send + Sync + 'static {
    async fn publish(&self, event: &ClaimEvent) -> Result<(), PortError>;
}

/// In-memory implementations of the claims ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, RwLock};

    use core_kernel::HealthCheckResult;

    #[derive(Debug, Default)]
    struct MockState {
        claims: HashMap<ClaimId, Claim>,
        covered_items: HashMap<ItemId, CoveredItem>,
        histories: Vec<ClaimHistory>,
        ledger_entries: Vec<LedgerEntry>,
        policy_members: HashSet<(PolicyId, UserId)>,
    }

    /// In-memory mock implementation of ClaimsPort
    ///
    /// All state sits behind one lock so a change set lands atomically.
    #[derive(Debug, Default)]
    pub struct MockClaimsPort {
        state: Arc<RwLock<MockState>>,
        fail_commits: AtomicBool,
    }

    impl MockClaimsPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates covered items for testing
        pub async fn with_covered_items(items: Vec<CoveredItem>) -> Self {
            let port = Self::new();
            for item in items {
                port.add_covered_item(item).await;
            }
            port
        }

        pub async fn add_covered_item(&self, item: CoveredItem) {
            self.state.write().await.covered_items.insert(item.id, item);
        }

        pub async fn add_policy_member(&self, policy_id: PolicyId, user_id: UserId) {
            self.state.write().await.policy_members.insert((policy_id, user_id));
        }

        /// Stores a claim as-is, bypassing the lifecycle
        pub async fn put_claim(&self, claim: Claim) {
            self.state.write().await.claims.insert(claim.id, claim);
        }

        /// Makes every following commit fail, as a dropped transaction would
        pub fn set_fail_commits(&self, fail: bool) {
            self.fail_commits.store(fail, Ordering::SeqCst);
        }

        pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
            self.state.read().await.ledger_entries.clone()
        }

        pub async fn all_histories(&self) -> Vec<ClaimHistory> {
            self.state.read().await.histories.clone()
        }
    }

    impl DomainPort for MockClaimsPort {}

    #[async_trait]
    impl HealthCheckable for MockClaimsPort {
        async fn health_check(&self) -> HealthCheckResult {
            let mut result = HealthCheckResult::healthy("mock-claims-port", 0);
            result.message = Some("Mock adapter always healthy".to_string());
            result
        }
    }

    #[async_trait]
    impl ClaimsPort for MockClaimsPort {
        async fn load_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.state
                .read()
                .await
                .claims
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn load_covered_item(&self, id: ItemId) -> Result<CoveredItem, PortError> {
            self.state
                .read()
                .await
                .covered_items
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Item", id))
        }

        async fn insert_claim(&self, claim: &Claim, histories: &[ClaimHistory]) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.claims.contains_key(&claim.id) {
                return Err(PortError::conflict(format!("claim {} already exists", claim.id)));
            }
            state.claims.insert(claim.id, claim.clone());
            state.histories.extend_from_slice(histories);
            Ok(())
        }

        async fn commit(&self, changes: &ClaimChangeSet) -> Result<(), PortError> {
            if self.fail_commits.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock commit failure"));
            }

            let mut state = self.state.write().await;
            let stored_version = state
                .claims
                .get(&changes.claim.id)
                .map(|c| c.version)
                .ok_or_else(|| PortError::not_found("Claim", changes.claim.id))?;
            if stored_version != changes.expected_version {
                return Err(PortError::conflict(format!(
                    "claim {} was modified concurrently",
                    changes.claim.id
                )));
            }

            let mut claim = changes.claim.clone();
            claim.version = changes.expected_version + 1;
            state.claims.insert(claim.id, claim);
            state.histories.extend(changes.histories.iter().cloned());
            state.ledger_entries.extend(changes.ledger_entries.iter().cloned());
            Ok(())
        }

        async fn histories(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError> {
            let mut rows: Vec<_> = self
                .state
                .read()
                .await
                .histories
                .iter()
                .filter(|h| h.claim_id == claim_id)
                .cloned()
                .collect();
            rows.sort_by_key(|h| h.created_at);
            Ok(rows)
        }

        async fn is_policy_member(&self, policy_id: PolicyId, user_id: UserId) -> Result<bool, PortError> {
            Ok(self.state.read().await.policy_members.contains(&(policy_id, user_id)))
        }

        async fn list_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, PortError> {
            let state = self.state.read().await;
            let mut claims: Vec<Claim> = state
                .claims
                .values()
                .filter(|c| filter.matches(c))
                .filter(|c| {
                    filter
                        .member_id
                        .map_or(true, |user_id| state.policy_members.contains(&(c.policy_id, user_id)))
                })
                .cloned()
                .collect();
            claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(claims)
        }

        async fn status_changes_since(&self, since: DateTime<Utc>) -> Result<Vec<ClaimHistory>, PortError> {
            let mut rows: Vec<_> = self
                .state
                .read()
                .await
                .histories
                .iter()
                .filter(|h| h.is_status_update() && h.created_at > since)
                .cloned()
                .collect();
            rows.sort_by_key(|h| h.created_at);
            Ok(rows)
        }
    }

    /// Publisher that records events, optionally failing every publish
    #[derive(Debug, Default)]
    pub struct RecordingPublisher {
        events: Mutex<Vec<ClaimEvent>>,
        fail: AtomicBool,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let publisher = Self::default();
            publisher.fail.store(true, Ordering::SeqCst);
            publisher
        }

        pub async fn events(&self) -> Vec<ClaimEvent> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait]
    impl ClaimEventPublisher for RecordingPublisher {
        async fn publish(&self, event: &ClaimEvent) -> Result<(), PortError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock publisher unavailable"));
            }
            self.events.lock().await.push(event.clone());
            Ok(())
        }
    }
}
