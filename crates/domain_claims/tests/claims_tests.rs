//! Lifecycle, payout and audit tests for domain_claims

use chrono::{Duration, Utc};

use core_kernel::{ClaimHistoryId, ErrorKey, FileId, Money, UserId};

use domain_claims::claim::{Claim, ClaimStatus, ClaimTransition, IncidentType};
use domain_claims::claim_item::{PayoutOption, UpdateClaimItemParams};
use domain_claims::error::ClaimError;
use domain_claims::file::ClaimFilePurpose;
use domain_claims::history::{fields, submitted_at, ClaimHistory, HistoryAction};
use domain_claims::ledger::LedgerEntryType;

use test_utils::{
    assert_claim_error_key, assert_money_minor, ActorFixtures, ClaimBuilder, ClaimItemBuilder, CoveredItemBuilder,
    MoneyFixtures,
};

fn all_transitions() -> Vec<ClaimTransition> {
    vec![
        ClaimTransition::SubmitForApproval,
        ClaimTransition::RequestRevision {
            message: "Please attach a photo".to_string(),
        },
        ClaimTransition::RequestReceipt {
            message: "Receipt needed".to_string(),
        },
        ClaimTransition::SubmitReceipt,
        ClaimTransition::Approve,
        ClaimTransition::Deny {
            message: "Not covered".to_string(),
        },
        ClaimTransition::MarkPaid,
    ]
}

fn allowed_from(transition: &ClaimTransition) -> &'static [ClaimStatus] {
    use ClaimStatus::*;
    match transition {
        ClaimTransition::SubmitForApproval => &[Draft, Revision],
        ClaimTransition::RequestRevision { .. } => &[Review1, Review2, Review3],
        ClaimTransition::RequestReceipt { .. } => &[Review1],
        ClaimTransition::SubmitReceipt => &[Receipt],
        ClaimTransition::Approve => &[Review1, Review2, Review3],
        ClaimTransition::Deny { .. } => &[Review1, Review2, Review3],
        ClaimTransition::MarkPaid => &[Approved],
    }
}

/// Where an allowed transition lands for a claim whose items are all FMV
fn expected_target(transition: &ClaimTransition, from: ClaimStatus) -> ClaimStatus {
    use ClaimStatus::*;
    match (transition, from) {
        (ClaimTransition::SubmitForApproval, _) => Review1,
        (ClaimTransition::RequestRevision { .. }, _) => Revision,
        (ClaimTransition::RequestReceipt { .. }, _) => Receipt,
        (ClaimTransition::SubmitReceipt, _) => Review2,
        (ClaimTransition::Approve, Review3) => Approved,
        (ClaimTransition::Approve, _) => Review3,
        (ClaimTransition::Deny { .. }, _) => Denied,
        (ClaimTransition::MarkPaid, _) => Paid,
    }
}

// ============================================================================
// State Machine Tests
// ============================================================================

mod state_machine_tests {
    use super::*;

    #[test]
    fn test_transition_status_grid() {
        let actor = ActorFixtures::signator();

        for status in ClaimStatus::ALL {
            for transition in all_transitions() {
                let mut claim = ClaimBuilder::new()
                    .with_status(status)
                    .with_default_item()
                    .with_receipt()
                    .build();
                let before = claim.clone();
                let allowed = allowed_from(&transition).contains(&status);

                let result = claim.apply_transition(&actor, &transition);

                if allowed {
                    assert!(
                        result.is_ok(),
                        "{} from {} should succeed: {:?}",
                        transition.name(),
                        status,
                        result
                    );
                    assert_eq!(
                        claim.status,
                        expected_target(&transition, status),
                        "{} from {}",
                        transition.name(),
                        status
                    );
                } else {
                    assert_claim_error_key(&result, ErrorKey::ClaimStatus);
                    assert_eq!(claim, before, "{} from {} changed the claim", transition.name(), status);
                }
            }
        }
    }

    #[test]
    fn test_invalid_status_message() {
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Paid).with_default_item().build();
        let err = claim.submit_for_approval(&ActorFixtures::member()).unwrap_err();
        assert_eq!(err.to_string(), "invalid claim status for submit: Paid");
    }

    #[test]
    fn test_transitions_require_items() {
        let actor = ActorFixtures::signator();

        for transition in all_transitions() {
            if matches!(transition, ClaimTransition::MarkPaid) {
                continue;
            }
            for &status in allowed_from(&transition) {
                let mut claim = ClaimBuilder::new().with_status(status).with_receipt().build();
                let result = claim.apply_transition(&actor, &transition);
                assert_claim_error_key(&result, ErrorKey::ClaimMissingClaimItem);
                assert_eq!(claim.status, status);
            }
        }
    }

    #[test]
    fn test_missing_claim_item_message() {
        let mut claim = ClaimBuilder::new().build();
        let err = claim.submit_for_approval(&ActorFixtures::member()).unwrap_err();
        assert_eq!(err.to_string(), "claim must have a claimItem if no longer in draft");
    }

    #[test]
    fn test_submit_moves_to_review1_and_computes_payout() {
        let mut claim = ClaimBuilder::new()
            .with_item(
                ClaimItemBuilder::new()
                    .with_coverage(Money::from_minor(100_000))
                    .with_fmv(Money::from_minor(100_000)),
            )
            .build();

        claim.submit_for_approval(&ActorFixtures::member()).unwrap();

        assert_eq!(claim.status, ClaimStatus::Review1);
        assert_money_minor(&claim.items[0].payout_amount, 95_000);
        assert_money_minor(&claim.total_payout, 95_000);
    }

    #[test]
    fn test_submit_from_revision_clears_reason() {
        let mut claim = ClaimBuilder::new()
            .with_status(ClaimStatus::Revision)
            .with_status_reason("Add a photo")
            .with_default_item()
            .build();

        claim.submit_for_approval(&ActorFixtures::member()).unwrap();

        assert_eq!(claim.status, ClaimStatus::Review1);
        assert!(claim.status_reason.is_empty());
    }

    #[test]
    fn test_submit_reports_first_unready_item() {
        let mut claim = ClaimBuilder::new()
            .with_incident_type(IncidentType::PhysicalDamage)
            .with_item(
                ClaimItemBuilder::new()
                    .repairable(true)
                    .with_payout_option(Some(PayoutOption::Repair))
                    .with_repair_estimate(Money::zero()),
            )
            .build();
        let before = claim.clone();

        let result = claim.submit_for_approval(&ActorFixtures::member());

        assert_claim_error_key(&result, ErrorKey::ClaimItemMissingRepairEstimate);
        assert!(matches!(result, Err(ClaimError::ItemNotReady { item_id, .. }) if item_id == before.items[0].id));
        assert_eq!(claim, before);
    }

    #[test]
    fn test_request_revision_requires_message() {
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Review2).with_default_item().build();

        let result = claim.request_revision(&ActorFixtures::steward(), "   ");
        assert_claim_error_key(&result, ErrorKey::ClaimMissingStatusReason);

        claim.request_revision(&ActorFixtures::steward(), "Photo is blurry").unwrap();
        assert_eq!(claim.status, ClaimStatus::Revision);
        assert_eq!(claim.status_reason, "Photo is blurry");
        assert!(claim.validate().is_ok());
    }

    #[test]
    fn test_deny_requires_message_and_records_reviewer() {
        let steward = ActorFixtures::steward();
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Review1).with_default_item().build();

        assert_claim_error_key(&claim.deny(&steward, ""), ErrorKey::ClaimMissingStatusReason);

        claim.deny(&steward, "Item not covered").unwrap();
        assert_eq!(claim.status, ClaimStatus::Denied);
        assert_eq!(claim.status_reason, "Item not covered");
        assert_eq!(claim.reviewer_id, Some(steward.id));
        assert!(claim.review_date.is_some());
    }

    #[test]
    fn test_receipt_round_trip() {
        let steward = ActorFixtures::steward();
        let member = ActorFixtures::member();
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Review1).with_default_item().build();

        claim.request_receipt(&steward, "Please upload the purchase receipt").unwrap();
        assert_eq!(claim.status, ClaimStatus::Receipt);

        assert_claim_error_key(&claim.submit_receipt(&member), ErrorKey::ClaimMissingReceipt);
        assert_eq!(claim.status, ClaimStatus::Receipt);

        claim.attach_file(FileId::new(), ClaimFilePurpose::Receipt).unwrap();
        claim.submit_receipt(&member).unwrap();
        assert_eq!(claim.status, ClaimStatus::Review2);
        assert!(claim.status_reason.is_empty());
        assert_money_minor(&claim.total_payout, 47_500);
    }

    #[test]
    fn test_review1_approval_requires_fmv_items() {
        let mut claim = ClaimBuilder::new()
            .with_incident_type(IncidentType::PhysicalDamage)
            .with_status(ClaimStatus::Review1)
            .with_item(
                ClaimItemBuilder::new()
                    .with_payout_option(Some(PayoutOption::Replacement))
                    .with_replace_estimate(MoneyFixtures::estimate()),
            )
            .build();

        let err = claim.approve(&ActorFixtures::steward()).unwrap_err();
        assert_eq!(err.key(), ErrorKey::ClaimItemInvalidPayoutOption);
        assert_eq!(err.to_string(), "cannot approve payout option Replacement from status Review1");
        assert_eq!(claim.status, ClaimStatus::Review1);
    }

    #[test]
    fn test_review1_fmv_only_skips_to_review3() {
        let steward = ActorFixtures::steward();
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Review1).with_default_item().build();

        claim.approve(&steward).unwrap();

        assert_eq!(claim.status, ClaimStatus::Review3);
        assert_eq!(claim.reviewer_id, Some(steward.id));
    }

    #[test]
    fn test_second_approver_required() {
        let steward = ActorFixtures::steward();
        let signator = ActorFixtures::signator();
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Review2).with_default_item().build();

        claim.approve(&steward).unwrap();
        assert_eq!(claim.status, ClaimStatus::Review3);

        let before = claim.clone();
        let err = claim.approve(&steward).unwrap_err();
        assert_eq!(err, ClaimError::InvalidApprover);
        assert_eq!(err.to_string(), "different approver required for final approval");
        assert_eq!(claim, before);

        claim.approve(&signator).unwrap();
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.reviewer_id, Some(signator.id));
        assert_money_minor(&claim.total_payout, 47_500);
    }

    #[test]
    fn test_failed_recompute_leaves_claim_unchanged() {
        let mut claim = ClaimBuilder::new()
            .with_status(ClaimStatus::Review3)
            .with_reviewer(UserId::new())
            .with_item(ClaimItemBuilder::new().with_payout_option(None))
            .build();
        let before = claim.clone();

        let result = claim.approve(&ActorFixtures::signator());

        assert_claim_error_key(&result, ErrorKey::ClaimItemMissingPayoutOption);
        assert_eq!(claim, before);
    }

    #[test]
    fn test_mark_paid_sets_payment_date() {
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Approved).with_default_item().build();

        claim.mark_paid(&ActorFixtures::admin()).unwrap();

        assert_eq!(claim.status, ClaimStatus::Paid);
        assert!(claim.payment_date.is_some());
    }
}

// ============================================================================
// Submission Readiness Tests
// ============================================================================

mod submission_tests {
    use super::*;

    fn readiness(incident_type: IncidentType, item: ClaimItemBuilder) -> Option<ErrorKey> {
        let claim = ClaimBuilder::new()
            .with_incident_type(incident_type)
            .with_item(item)
            .build();
        claim.items[0].validate_for_submit(incident_type)
    }

    #[test]
    fn test_validate_for_submit_rules() {
        let positive = MoneyFixtures::estimate();
        let cases: Vec<(&str, IncidentType, ClaimItemBuilder, Option<ErrorKey>)> = vec![
            (
                "no payout option",
                IncidentType::Theft,
                ClaimItemBuilder::new().with_payout_option(None),
                Some(ErrorKey::ClaimItemMissingPayoutOption),
            ),
            (
                "repairable theft",
                IncidentType::Theft,
                ClaimItemBuilder::new().repairable(true).with_repair_estimate(positive),
                Some(ErrorKey::ClaimItemNotRepairable),
            ),
            (
                "replacement without estimate",
                IncidentType::PhysicalDamage,
                ClaimItemBuilder::new().with_payout_option(Some(PayoutOption::Replacement)),
                Some(ErrorKey::ClaimItemMissingReplaceEstimate),
            ),
            (
                "fmv without value",
                IncidentType::Theft,
                ClaimItemBuilder::new().with_fmv(Money::zero()),
                Some(ErrorKey::ClaimItemMissingFmv),
            ),
            (
                "replacement for theft",
                IncidentType::Theft,
                ClaimItemBuilder::new()
                    .with_payout_option(Some(PayoutOption::Replacement))
                    .with_replace_estimate(positive),
                Some(ErrorKey::ClaimItemInvalidPayoutOption),
            ),
            (
                "repair for evacuation",
                IncidentType::Evacuation,
                ClaimItemBuilder::new()
                    .repairable(true)
                    .with_payout_option(Some(PayoutOption::Repair))
                    .with_repair_estimate(positive),
                Some(ErrorKey::ClaimItemInvalidPayoutOption),
            ),
            (
                "repairable without repair estimate",
                IncidentType::PhysicalDamage,
                ClaimItemBuilder::new()
                    .repairable(true)
                    .with_payout_option(Some(PayoutOption::Repair)),
                Some(ErrorKey::ClaimItemMissingRepairEstimate),
            ),
            (
                "unrepairable physical damage without fmv",
                IncidentType::PhysicalDamage,
                ClaimItemBuilder::new()
                    .with_payout_option(Some(PayoutOption::Replacement))
                    .with_replace_estimate(positive)
                    .with_fmv(Money::zero()),
                Some(ErrorKey::ClaimItemMissingFmv),
            ),
            ("theft at fmv", IncidentType::Theft, ClaimItemBuilder::new(), None),
            (
                "repair with estimate",
                IncidentType::PhysicalDamage,
                ClaimItemBuilder::new()
                    .repairable(true)
                    .with_payout_option(Some(PayoutOption::Repair))
                    .with_repair_estimate(positive),
                None,
            ),
            (
                "evacuation fixed fraction",
                IncidentType::Evacuation,
                ClaimItemBuilder::new()
                    .with_payout_option(Some(PayoutOption::FixedFraction))
                    .with_fmv(Money::zero()),
                None,
            ),
        ];

        for (name, incident_type, item, want) in cases {
            assert_eq!(readiness(incident_type, item), want, "case: {}", name);
        }
    }
}

// ============================================================================
// Item Editing Tests
// ============================================================================

mod item_tests {
    use super::*;

    fn fmv_params(minor: i64) -> UpdateClaimItemParams {
        UpdateClaimItemParams {
            payout_option: Some(PayoutOption::Fmv),
            fmv: Some(Money::from_minor(minor)),
            ..Default::default()
        }
    }

    #[test]
    fn test_member_adds_item_in_draft() {
        let mut claim = ClaimBuilder::new().build();
        let covered = CoveredItemBuilder::new().with_policy_id(claim.policy_id).build();
        let item_id = covered.id;

        let claim_item_id = claim.add_item(&ActorFixtures::member(), covered, &fmv_params(20_000)).unwrap();

        let item = claim.item(claim_item_id).unwrap();
        assert_eq!(item.item_id(), item_id);
        assert_eq!(item.payout_option, Some(PayoutOption::Fmv));
        assert!(item.reviewer_id.is_none());
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let mut claim = ClaimBuilder::new().build();
        let covered = CoveredItemBuilder::new().with_policy_id(claim.policy_id).build();
        let member = ActorFixtures::member();

        claim.add_item(&member, covered.clone(), &fmv_params(100)).unwrap();
        let result = claim.add_item(&member, covered, &fmv_params(100));

        assert_claim_error_key(&result, ErrorKey::Validation);
        assert_eq!(claim.items.len(), 1);
    }

    #[test]
    fn test_incompatible_option_rejected_on_add() {
        let mut claim = ClaimBuilder::new().with_incident_type(IncidentType::Evacuation).build();
        let covered = CoveredItemBuilder::new().with_policy_id(claim.policy_id).build();

        let result = claim.add_item(&ActorFixtures::member(), covered, &fmv_params(100));

        assert_claim_error_key(&result, ErrorKey::ClaimItemInvalidPayoutOption);
        assert!(claim.items.is_empty());
    }

    #[test]
    fn test_repair_accepted_before_repairable_is_set() {
        let mut claim = ClaimBuilder::new().with_incident_type(IncidentType::PhysicalDamage).build();
        let covered = CoveredItemBuilder::new().with_policy_id(claim.policy_id).build();
        let member = ActorFixtures::member();
        let repair = UpdateClaimItemParams {
            payout_option: Some(PayoutOption::Repair),
            ..Default::default()
        };

        let claim_item_id = claim.add_item(&member, covered, &repair).unwrap();
        assert!(!claim.item(claim_item_id).unwrap().is_repairable);

        let result = claim.submit_for_approval(&member);
        assert_claim_error_key(&result, ErrorKey::ClaimItemInvalidPayoutOption);
        assert_eq!(claim.status, ClaimStatus::Draft);

        let repairable = UpdateClaimItemParams {
            is_repairable: Some(true),
            repair_estimate: Some(Money::from_minor(30_000)),
            ..Default::default()
        };
        claim.update_item(&member, claim_item_id, &repairable).unwrap();
        claim.submit_for_approval(&member).unwrap();
        assert_eq!(claim.status, ClaimStatus::Review1);
    }

    #[test]
    fn test_member_cannot_edit_during_review() {
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Review1).with_default_item().build();
        let claim_item_id = claim.items[0].id;

        let result = claim.update_item(&ActorFixtures::member(), claim_item_id, &fmv_params(1));

        assert_claim_error_key(&result, ErrorKey::ClaimStatus);
    }

    #[test]
    fn test_reviewer_edit_stamps_item() {
        let steward = ActorFixtures::steward();
        let mut claim = ClaimBuilder::new().with_status(ClaimStatus::Review2).with_default_item().build();
        let claim_item_id = claim.items[0].id;

        claim.update_item(&steward, claim_item_id, &fmv_params(80_000)).unwrap();

        let item = claim.item(claim_item_id).unwrap();
        assert_money_minor(&item.fmv, 80_000);
        assert_eq!(item.reviewer_id, Some(steward.id));
        assert!(item.review_date.is_some());
    }

    #[test]
    fn test_closed_claim_items_are_frozen() {
        for status in [ClaimStatus::Approved, ClaimStatus::Paid, ClaimStatus::Denied] {
            let mut claim = ClaimBuilder::new().with_status(status).with_default_item().build();
            let claim_item_id = claim.items[0].id;

            let result = claim.update_item(&ActorFixtures::admin(), claim_item_id, &fmv_params(1));
            assert_claim_error_key(&result, ErrorKey::ClaimStatus);

            let result = claim.attach_file(FileId::new(), ClaimFilePurpose::Other);
            assert_claim_error_key(&result, ErrorKey::ClaimStatus);
        }
    }

    #[test]
    fn test_update_unknown_item() {
        let mut claim = ClaimBuilder::new().with_default_item().build();
        let result = claim.update_item(
            &ActorFixtures::member(),
            core_kernel::ClaimItemId::new(),
            &fmv_params(1),
        );
        assert_claim_error_key(&result, ErrorKey::ClaimItemNotFound);
    }
}

// ============================================================================
// History Tests
// ============================================================================

mod history_tests {
    use super::*;

    fn status_row(claim: &Claim, new_value: &str, minutes_ago: i64) -> ClaimHistory {
        ClaimHistory {
            id: ClaimHistoryId::new(),
            claim_id: claim.id,
            claim_item_id: None,
            user_id: UserId::new(),
            action: HistoryAction::Update,
            field_name: fields::STATUS.to_string(),
            old_value: String::new(),
            new_value: new_value.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_compare_then_apply_reproduces_claim() {
        let old = ClaimBuilder::new().with_default_item().build();
        let mut new = old.clone();
        new.status = ClaimStatus::Revision;
        new.status_reason = "Need more detail".to_string();
        new.reviewer_id = Some(UserId::new());
        new.review_date = Some(Utc::now());
        new.total_payout = Money::from_minor(12_345);
        new.incident_description = "Stolen from a locker".to_string();

        let updates = new.compare(&old);
        assert_eq!(updates.len(), 6);

        let mut rebuilt = old.clone();
        for update in &updates {
            rebuilt.apply_field_update(update).unwrap();
        }
        assert_eq!(rebuilt, new);
    }

    #[test]
    fn test_compare_uses_canonical_strings() {
        let old = ClaimBuilder::new().build();
        let mut new = old.clone();
        new.total_payout = Money::from_minor(47_500);

        let updates = new.compare(&old);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].field_name, fields::TOTAL_PAYOUT);
        assert_eq!(updates[0].old_value, "0.00");
        assert_eq!(updates[0].new_value, "475.00");
    }

    #[test]
    fn test_submitted_at_uses_earliest_review1_row() {
        let claim = ClaimBuilder::new().build();
        let first = status_row(&claim, "Review1", 60);
        let second = status_row(&claim, "Review1", 10);
        let other = status_row(&claim, "Review2", 90);

        let at = submitted_at(&claim, &[second, other, first.clone()]);
        assert_eq!(at, first.created_at);
    }

    #[test]
    fn test_submitted_at_falls_back_to_updated_at() {
        let claim = ClaimBuilder::new().build();
        assert_eq!(submitted_at(&claim, &[]), claim.updated_at);
    }
}

// ============================================================================
// Ledger Tests
// ============================================================================

mod ledger_tests {
    use super::*;

    #[test]
    fn test_ledger_entries_require_approval() {
        let claim = ClaimBuilder::new().with_status(ClaimStatus::Review3).with_default_item().build();
        let result = claim.create_ledger_entries();
        assert_claim_error_key(&result, ErrorKey::ClaimNotApproved);
    }

    #[test]
    fn test_ledger_entries_debit_each_item() {
        let mut claim = ClaimBuilder::new()
            .with_status(ClaimStatus::Review3)
            .with_reviewer(UserId::new())
            .with_default_item()
            .with_item(
                ClaimItemBuilder::new()
                    .with_covered(CoveredItemBuilder::new().with_accountable("Jo", "Doe"))
                    .with_fmv(Money::from_minor(10_000)),
            )
            .build();
        claim.approve(&ActorFixtures::signator()).unwrap();

        let entries = claim.create_ledger_entries().unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.entry_type == LedgerEntryType::Claim));
        assert!(entries.iter().all(|e| e.claim_id == Some(claim.id)));
        assert_money_minor(&entries[0].amount, -47_500);
        assert_money_minor(&entries[1].amount, -9_500);
        assert_eq!(entries[1].first_name, "Jo");
        let sum: Money = entries.iter().map(|e| e.amount).sum();
        assert_eq!(sum, -claim.total_payout);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use test_utils::positive_money_strategy;

    proptest! {
        #[test]
        fn total_payout_is_sum_of_capped_items(
            fmvs in prop::collection::vec(positive_money_strategy(), 1..5),
        ) {
            let mut builder = ClaimBuilder::new();
            for fmv in &fmvs {
                builder = builder.with_item(ClaimItemBuilder::new().with_fmv(*fmv));
            }
            let mut claim = builder.build();

            claim.submit_for_approval(&ActorFixtures::member()).unwrap();

            let sum: Money = claim.items.iter().map(|i| i.payout_amount).sum();
            prop_assert_eq!(claim.total_payout, sum);
            for item in &claim.items {
                prop_assert!(item.payout_amount <= item.covered_item.coverage_amount);
                prop_assert!(!item.payout_amount.is_negative());
            }
        }
    }
}
