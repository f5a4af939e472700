//! Domain events published after a claim change commits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, UserId};

use crate::claim::ClaimStatus;

/// Something listeners may react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaimEvent {
    StatusChanged {
        claim_id: ClaimId,
        old_status: ClaimStatus,
        new_status: ClaimStatus,
        actor_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl ClaimEvent {
    pub fn status_changed(claim_id: ClaimId, old_status: ClaimStatus, new_status: ClaimStatus, actor_id: UserId) -> Self {
        ClaimEvent::StatusChanged {
            claim_id,
            old_status,
            new_status,
            actor_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn claim_id(&self) -> ClaimId {
        match self {
            ClaimEvent::StatusChanged { claim_id, .. } => *claim_id,
        }
    }
}
