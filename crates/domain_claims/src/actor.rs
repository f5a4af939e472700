//! Authenticated actors acting on claims

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::UserId;

use crate::error::ClaimError;

/// Application role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppRole {
    /// Policy member
    User,
    /// First-level reviewer
    Steward,
    /// Final approver
    Signator,
    Admin,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::User => "User",
            AppRole::Steward => "Steward",
            AppRole::Signator => "Signator",
            AppRole::Admin => "Admin",
        }
    }

    /// Roles allowed to review, approve and deny claims
    pub fn is_approver(&self) -> bool {
        matches!(self, AppRole::Steward | AppRole::Signator | AppRole::Admin)
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppRole {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(AppRole::User),
            "Steward" => Ok(AppRole::Steward),
            "Signator" => Ok(AppRole::Signator),
            "Admin" => Ok(AppRole::Admin),
            other => Err(ClaimError::UnknownValue {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// The user performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: AppRole,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn new(id: UserId, role: AppRole) -> Self {
        Self {
            id,
            role,
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn is_approver(&self) -> bool {
        self.role.is_approver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [AppRole::User, AppRole::Steward, AppRole::Signator, AppRole::Admin] {
            assert_eq!(role.as_str().parse::<AppRole>().unwrap(), role);
        }
        assert!("Janitor".parse::<AppRole>().is_err());
    }

    #[test]
    fn test_approver_roles() {
        assert!(!AppRole::User.is_approver());
        assert!(AppRole::Steward.is_approver());
        assert!(AppRole::Signator.is_approver());
        assert!(AppRole::Admin.is_approver());
    }
}
