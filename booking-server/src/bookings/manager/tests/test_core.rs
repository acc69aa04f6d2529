use super::*;
use shared::booking::{BookingCommand, BookingCommandPayload};
use shared::util::now_millis;

#[tokio::test]
async fn test_party_size_increase_to_sold_out() {
    // Instance capacity 10, 2 spots free, booking of 3 grows to 5
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 2, 72)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );

    let response = h.manager.modify_party_size(guest("guest-1"), "bkg-1", 5).await;

    assert!(response.success);
    assert_eq!(response.price_difference, Some(50.0));

    let booking = h.booking("bkg-1");
    assert_eq!(booking.guest_count, 5);
    assert_eq!(booking.total_amount, 125.0);

    let inst = h.instance("inst-1");
    assert_eq!(inst.available_spots, 0);
    assert_eq!(
        h.manager.instance_status("inst-1").unwrap(),
        Some(shared::InstanceStatus::SoldOut)
    );

    // Exactly one audit row, and the charge went out
    let rows = h.manager.modifications_for_booking("bkg-1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].modification_type, shared::ModificationType::PartySizeIncrease);
    assert_eq!(h.gateway.charges(), vec![("guest-1".to_string(), 50.0)]);

    h.assert_invariant("inst-1");
}

#[tokio::test]
async fn test_party_size_increase_beyond_capacity_changes_nothing() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 2, 72)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );

    let response = h.manager.modify_party_size(guest("guest-1"), "bkg-1", 6).await;

    assert!(!response.success);
    let error = response.error.unwrap();
    assert_eq!(error.code, CommandErrorCode::InsufficientCapacity);
    assert_eq!(error.available_spots, Some(2));

    // No state change, no audit row, no charge
    assert_eq!(h.booking("bkg-1").guest_count, 3);
    assert_eq!(h.instance("inst-1").available_spots, 2);
    assert!(h.manager.modifications_for_booking("bkg-1").unwrap().is_empty());
    assert!(h.gateway.charges().is_empty());

    h.assert_invariant("inst-1");
}

#[tokio::test]
async fn test_party_size_decrease_refunds_difference() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 2, 72)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 4)],
        &[],
    );

    let response = h.manager.modify_party_size(guest("guest-1"), "bkg-1", 2).await;

    assert!(response.success);
    assert_eq!(response.price_difference, Some(-50.0));
    assert_eq!(h.instance("inst-1").available_spots, 4);
    assert_eq!(h.gateway.refunds(), vec![("pay-bkg-1".to_string(), 50.0)]);

    // Partial refund settled on the audit row
    let rows = h.manager.modifications_for_booking("bkg-1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].modification_type, shared::ModificationType::PartySizeDecrease);
    assert_eq!(rows[0].refund_amount, Some(50.0));
    assert_eq!(rows[0].refund_status, Some(shared::RefundStatus::Completed));

    h.assert_invariant("inst-1");
}

#[tokio::test]
async fn test_idempotent_replay_appends_one_audit_row() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 5, 72)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );

    let cmd = BookingCommand {
        command_id: "cmd-repeat".to_string(),
        actor: guest("guest-1"),
        timestamp: now_millis(),
        payload: BookingCommandPayload::ModifyPartySize {
            booking_id: "bkg-1".to_string(),
            new_guest_count: 4,
        },
    };

    let first = h.manager.execute_command(cmd.clone()).await;
    assert!(first.success);
    assert!(!first.duplicate);

    let second = h.manager.execute_command(cmd).await;
    assert!(second.duplicate);
    assert_eq!(
        second.error.as_ref().map(|e| e.code),
        Some(CommandErrorCode::DuplicateCommand)
    );

    // The replay neither re-applied nor re-audited
    assert_eq!(h.booking("bkg-1").guest_count, 4);
    assert_eq!(h.manager.modifications_for_booking("bkg-1").unwrap().len(), 1);
    assert_eq!(h.gateway.charges().len(), 1);
}

#[tokio::test]
async fn test_window_closed_for_party_size_and_date_change() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 5, 47), instance("inst-2", 10, 5, 120)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );

    let modify = h.manager.modify_party_size(guest("guest-1"), "bkg-1", 4).await;
    assert_eq!(
        modify.error.unwrap().code,
        CommandErrorCode::ModificationWindowClosed
    );

    let change = h
        .manager
        .change_booking_date(guest("guest-1"), "bkg-1", "inst-2")
        .await;
    assert_eq!(
        change.error.unwrap().code,
        CommandErrorCode::ModificationWindowClosed
    );

    // Nothing moved
    assert_eq!(h.booking("bkg-1").instance_id, "inst-1");
    assert_eq!(h.instance("inst-2").available_spots, 5);
}

#[tokio::test]
async fn test_charge_failure_surfaces_but_change_stands() {
    // Capacity and price commit before the charge, and a failed charge
    // does not roll them back
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 5, 72)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );
    h.gateway.fail_charges(true);

    let response = h.manager.modify_party_size(guest("guest-1"), "bkg-1", 5).await;

    assert!(!response.success);
    assert!(response.payment_pending);
    assert_eq!(response.error.unwrap().code, CommandErrorCode::PaymentFailed);
    assert_eq!(response.price_difference, Some(50.0));

    // Committed change is durable
    assert_eq!(h.booking("bkg-1").guest_count, 5);
    assert_eq!(h.instance("inst-1").available_spots, 3);
    assert_eq!(h.manager.modifications_for_booking("bkg-1").unwrap().len(), 1);

    h.assert_invariant("inst-1");
}

#[tokio::test]
async fn test_date_change_moves_spots_and_reprices() {
    let h = create_test_manager();
    let mut pricier = instance("inst-2", 8, 6, 120);
    pricier.price_override = Some(30.0);
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 2, 72), pricier],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );
    let old_token = h.booking("bkg-1").check_in_token.clone();

    let response = h
        .manager
        .change_booking_date(guest("guest-1"), "bkg-1", "inst-2")
        .await;

    assert!(response.success);
    assert_eq!(response.price_difference, Some(15.0));

    let booking = h.booking("bkg-1");
    assert_eq!(booking.instance_id, "inst-2");
    assert_eq!(booking.base_amount, 90.0);
    assert_eq!(booking.total_amount, 90.0);
    assert_ne!(booking.check_in_token, old_token);

    assert_eq!(h.instance("inst-1").available_spots, 5);
    assert_eq!(h.instance("inst-2").available_spots, 3);
    assert_eq!(h.gateway.charges(), vec![("guest-1".to_string(), 15.0)]);

    let rows = h.manager.modifications_for_booking("bkg-1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].modification_type, shared::ModificationType::DateChange);

    h.assert_invariant("inst-1");
    h.assert_invariant("inst-2");
}

#[tokio::test]
async fn test_check_in_then_complete_lifecycle_keeps_spots() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 5, 72)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );

    let response = h
        .manager
        .check_in_booking(host(), "bkg-1", "tok-bkg-1")
        .await;
    assert!(response.success);
    assert_eq!(h.booking("bkg-1").status, BookingStatus::CheckedIn);

    // CHECKED_IN still holds its spots
    assert_eq!(h.instance("inst-1").available_spots, 5);
    h.assert_invariant("inst-1");

    // A checked-in booking is no longer modifiable
    let modify = h.manager.modify_party_size(guest("guest-1"), "bkg-1", 4).await;
    assert_eq!(modify.error.unwrap().code, CommandErrorCode::InvalidState);
}

#[tokio::test]
async fn test_no_show_releases_spots() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 5, -1)],
        &[confirmed_booking("bkg-1", "inst-1", "guest-1", 3)],
        &[],
    );

    let response = h.manager.mark_no_show(host(), "bkg-1").await;
    assert!(response.success);

    assert_eq!(h.booking("bkg-1").status, BookingStatus::NoShow);
    assert_eq!(h.instance("inst-1").available_spots, 8);
    h.assert_invariant("inst-1");
}

#[tokio::test]
async fn test_unknown_booking_not_found() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 5, 72)],
        &[],
        &[],
    );

    let response = h.manager.modify_party_size(guest("guest-1"), "ghost", 4).await;
    assert_eq!(response.error.unwrap().code, CommandErrorCode::BookingNotFound);
}

#[tokio::test]
async fn test_limited_status_threshold() {
    let h = create_test_manager();
    h.seed(
        &offering(CancellationPolicy::Flexible),
        &[instance("inst-1", 10, 3, 72)],
        &[],
        &[],
    );

    // 3/10 = 30%: at the threshold, not below it
    assert_eq!(
        h.manager.instance_status("inst-1").unwrap(),
        Some(shared::InstanceStatus::Available)
    );

    let txn = h.storage.begin_write().unwrap();
    let mut inst = h.storage.get_instance_txn(&txn, "inst-1").unwrap().unwrap();
    inst.available_spots = 2;
    h.storage.store_instance(&txn, &inst).unwrap();
    txn.commit().unwrap();

    assert_eq!(
        h.manager.instance_status("inst-1").unwrap(),
        Some(shared::InstanceStatus::Limited)
    );
}
