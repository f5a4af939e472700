//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating claim data that keeps the
//! domain invariants (non-negative amounts, closed enums).

use core_kernel::Money;
use domain_claims::{ClaimStatus, IncidentType, PayoutOption};
use proptest::prelude::*;

/// Strategy for generating non-negative amounts in minor units
pub fn amount_minor_strategy() -> impl Strategy<Value = i64> {
    0i64..1_000_000_000i64
}

/// Strategy for generating non-negative Money values
pub fn money_strategy() -> impl Strategy<Value = Money> {
    amount_minor_strategy().prop_map(Money::from_minor)
}

/// Strategy for generating strictly positive Money values
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (1i64..1_000_000_000i64).prop_map(Money::from_minor)
}

pub fn incident_type_strategy() -> impl Strategy<Value = IncidentType> {
    proptest::sample::select(IncidentType::ALL.to_vec())
}

pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    proptest::sample::select(ClaimStatus::ALL.to_vec())
}

pub fn payout_option_strategy() -> impl Strategy<Value = PayoutOption> {
    prop_oneof![
        Just(PayoutOption::Repair),
        Just(PayoutOption::Replacement),
        Just(PayoutOption::Fmv),
        Just(PayoutOption::FixedFraction),
    ]
}
