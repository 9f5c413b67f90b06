//! End-to-end lifecycle scenarios across the registry and all workflows.

use custodian_core::testing::{fixtures, TestLifecycle};
use custodian_core::{
    AssetStatus, Checkout, CompleteRepair, CompletionOutcome, ErrorKind, LifecycleEvent,
    Recipient, RepairOutcome, ReturnAsset, ReturnCondition, TicketStatus,
};

fn employee() -> Recipient {
    Recipient::Employee(fixtures::EMPLOYEE_ID.to_string())
}

fn fixed() -> CompleteRepair {
    CompleteRepair {
        outcome: CompletionOutcome::Fixed,
        actions_taken: "Replaced hinge assembly".to_string(),
        parts_used: Some("HINGE-T14-L".to_string()),
    }
}

#[test]
fn checkout_then_second_checkout_is_unavailable() {
    let t = TestLifecycle::new();
    let asset = t.register_asset("LT-0001");
    let clerk = fixtures::clerk();

    t.lifecycle
        .issuances()
        .checkout(&clerk, Checkout::new(&asset.id, employee()))
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::Issued);

    let err = t
        .lifecycle
        .issuances()
        .checkout(&clerk, Checkout::new(&asset.id, Recipient::Employee("e-2".to_string())))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AssetUnavailable);
    assert_eq!(t.asset_status(&asset.id), AssetStatus::Issued);
}

#[test]
fn resolving_the_only_ticket_restocks_the_asset() {
    let t = TestLifecycle::new();
    let asset = t.register_asset("LT-0001");
    let ticket = t.open_ticket(&asset.id);
    let tech = fixtures::technician();

    t.lifecycle
        .tickets()
        .update_status(&tech, &ticket.id, TicketStatus::Open, Some(tech.id.clone()))
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);

    t.lifecycle
        .tickets()
        .update_status(&tech, &ticket.id, TicketStatus::Resolved, None)
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::InStock);
}

#[test]
fn second_open_ticket_keeps_asset_under_repair() {
    let t = TestLifecycle::new();
    let asset = t.register_asset("LT-0001");
    let first = t.open_ticket(&asset.id);
    let _second = t.open_ticket(&asset.id);
    let tech = fixtures::technician();

    t.lifecycle
        .tickets()
        .update_status(&tech, &first.id, TicketStatus::InProgress, None)
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);

    t.lifecycle
        .tickets()
        .update_status(&tech, &first.id, TicketStatus::Resolved, None)
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);
}

#[test]
fn repair_beyond_repair_settles_asset_and_ticket() {
    let t = TestLifecycle::new();
    let asset = t.register_asset("LT-0001");
    let ticket = t.open_ticket(&asset.id);
    let repair = t.open_repair(&ticket.id, &asset.id);

    t.lifecycle
        .repairs()
        .complete(
            &fixtures::technician(),
            &repair.id,
            CompleteRepair {
                outcome: CompletionOutcome::BeyondRepair,
                actions_taken: "Mainboard shorted".to_string(),
                parts_used: None,
            },
        )
        .unwrap();

    assert_eq!(t.asset_status(&asset.id), AssetStatus::BeyondRepair);
    assert_eq!(
        t.lifecycle.tickets().get(&ticket.id).unwrap().status,
        TicketStatus::Resolved
    );

    // Only explicit disposal moves it further.
    let disposed = t
        .lifecycle
        .registry()
        .dispose(&fixtures::admin(), &asset.id, "scrapped")
        .unwrap();
    assert_eq!(disposed.status, AssetStatus::Disposed);
}

#[test]
fn returning_a_pending_repair_fails_without_mutation() {
    let t = TestLifecycle::new();
    let asset = t.register_asset("LT-0001");
    let ticket = t.open_ticket(&asset.id);
    let repair = t.open_repair(&ticket.id, &asset.id);
    let events_before = t.notifier.events().len();

    let err = t
        .lifecycle
        .repairs()
        .mark_returned_to_user(&fixtures::technician(), &repair.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let after = t.lifecycle.repairs().get(&repair.id).unwrap();
    assert_eq!(after, repair);
    assert_eq!(after.outcome, RepairOutcome::Pending);
    assert_eq!(
        t.lifecycle.tickets().get(&ticket.id).unwrap().status,
        TicketStatus::InProgress
    );
    assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);
    assert_eq!(t.notifier.events().len(), events_before);
}

#[test]
fn issued_asset_reported_repaired_and_reissued() {
    let t = TestLifecycle::new();
    let asset = t.register_asset("LT-0001");
    let clerk = fixtures::clerk();
    let tech = fixtures::technician();

    let issuance = t
        .lifecycle
        .issuances()
        .checkout(&clerk, Checkout::new(&asset.id, employee()))
        .unwrap();
    t.lifecycle
        .issuances()
        .return_asset(
            &clerk,
            &issuance.id,
            ReturnAsset::new(ReturnCondition::Damaged).with_remarks("Hinge snapped"),
        )
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);

    // The intake ticket drives the repair.
    let intake = t
        .lifecycle
        .tickets()
        .list(&custodian_core::TicketFilter::new().with_asset(asset.id.clone()))
        .unwrap()
        .pop()
        .unwrap();
    let repair = t.open_repair(&intake.id, &asset.id);
    t.lifecycle.repairs().complete(&tech, &repair.id, fixed()).unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::UnderRepair);

    t.lifecycle
        .repairs()
        .mark_returned_to_user(&tech, &repair.id)
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::InStock);

    t.lifecycle
        .issuances()
        .checkout(&clerk, Checkout::new(&asset.id, Recipient::Employee("e-2".to_string())))
        .unwrap();
    assert_eq!(t.asset_status(&asset.id), AssetStatus::Issued);

    let types = t.notifier.event_types();
    for expected in [
        "asset_registered",
        "asset_checked_out",
        "asset_returned",
        "ticket_created",
        "repair_opened",
        "repair_completed",
        "repair_returned",
    ] {
        assert!(types.contains(&expected), "missing {expected}");
    }
    let returns = t
        .notifier
        .events()
        .into_iter()
        .filter(|e| matches!(e, LifecycleEvent::AssetReturned { .. }))
        .count();
    assert_eq!(returns, 1);
}
