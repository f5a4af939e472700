//! Files attached to a claim
//!
//! Only the link and its purpose live here; file content is stored elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, FileId};

use crate::error::ClaimError;

/// Why a file was attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimFilePurpose {
    Receipt,
    RepairEstimate,
    ReplaceEstimate,
    EvidenceOfFmv,
    WitnessStatement,
    Other,
}

impl ClaimFilePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimFilePurpose::Receipt => "Receipt",
            ClaimFilePurpose::RepairEstimate => "RepairEstimate",
            ClaimFilePurpose::ReplaceEstimate => "ReplaceEstimate",
            ClaimFilePurpose::EvidenceOfFmv => "EvidenceOfFmv",
            ClaimFilePurpose::WitnessStatement => "WitnessStatement",
            ClaimFilePurpose::Other => "Other",
        }
    }
}

impl fmt::Display for ClaimFilePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimFilePurpose {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Receipt" => Ok(ClaimFilePurpose::Receipt),
            "RepairEstimate" => Ok(ClaimFilePurpose::RepairEstimate),
            "ReplaceEstimate" => Ok(ClaimFilePurpose::ReplaceEstimate),
            "EvidenceOfFmv" => Ok(ClaimFilePurpose::EvidenceOfFmv),
            "WitnessStatement" => Ok(ClaimFilePurpose::WitnessStatement),
            "Other" => Ok(ClaimFilePurpose::Other),
            other => Err(ClaimError::UnknownValue {
                kind: "file purpose",
                value: other.to_string(),
            }),
        }
    }
}

/// A file linked to a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFile {
    pub claim_id: ClaimId,
    pub file_id: FileId,
    pub purpose: ClaimFilePurpose,
    pub created_at: DateTime<Utc>,
}

impl ClaimFile {
    pub fn new(claim_id: ClaimId, file_id: FileId, purpose: ClaimFilePurpose) -> Self {
        Self {
            claim_id,
            file_id,
            purpose,
            created_at: Utc::now(),
        }
    }
}
