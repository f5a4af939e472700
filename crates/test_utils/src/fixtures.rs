//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the claims domain. These fixtures are
//! consistent and predictable so scenario tests read like the rules they
//! check.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{Money, UserId};
use domain_claims::{Actor, AppRole};
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard coverage amount of a covered item (1000.00)
    pub fn coverage() -> Money {
        Money::from_minor(100_000)
    }

    /// A small coverage amount that caps most payouts (9.00)
    pub fn small_coverage() -> Money {
        Money::from_minor(900)
    }

    /// A typical estimate below the standard coverage (500.00)
    pub fn estimate() -> Money {
        Money::from_minor(50_000)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Date of the incident behind a claim
    pub fn incident_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    /// A fixed "now" for history window calculations
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }
}

/// Fixture for actors with each role
pub struct ActorFixtures;

impl ActorFixtures {
    /// A policy member
    pub fn member() -> Actor {
        Actor::new(UserId::new(), AppRole::User).with_name("Mary", "Member")
    }

    /// A first-level reviewer
    pub fn steward() -> Actor {
        Actor::new(UserId::new(), AppRole::Steward).with_name("Sam", "Steward")
    }

    /// A final approver
    pub fn signator() -> Actor {
        Actor::new(UserId::new(), AppRole::Signator).with_name("Sue", "Signator")
    }

    pub fn admin() -> Actor {
        Actor::new(UserId::new(), AppRole::Admin).with_name("Ada", "Admin")
    }
}

/// Fixture for deterministic identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// A user id that is stable across runs
    pub fn fixed_user_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001))
    }
}
