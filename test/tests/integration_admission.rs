use chanrep_shared::{AdmissionState, ReplicationConfig};
use chanrep_test::{Loopback, Membership};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn vetted_members_wait_for_a_verdict() {
    init_logger();

    let mut loopback = Loopback::new(&["telemetry"], ReplicationConfig::default(), true).unwrap();
    let authority = loopback.coordinator.vetting_authority().expect("vetting requested");
    loopback.add_member(1, 0);
    loopback.add_member(2, 0);

    loopback.steps(3).unwrap();
    assert_eq!(loopback.member(1).membership, Membership::Pending);
    assert_eq!(loopback.member(1).member.channel_count(), 0);
    assert_eq!(
        loopback.coordinator.peer_admission(1),
        Some(AdmissionState::Vetting)
    );

    let requested: Vec<u16> = authority
        .pending_requests()
        .iter()
        .map(|request| request.peer)
        .collect();
    assert_eq!(requested, vec![1, 2]);

    authority.acknowledge(1, true);
    authority.acknowledge(2, false);
    loopback.step().unwrap();

    assert_eq!(loopback.member(1).membership, Membership::Accepted);
    assert_eq!(loopback.member(1).member.channel_count(), 1);
    assert_eq!(
        loopback.coordinator.peer_admission(1),
        Some(AdmissionState::Accepted)
    );

    assert_eq!(loopback.member(2).membership, Membership::Rejected);
    assert_eq!(loopback.member(2).member.channel_count(), 0);
    assert_eq!(loopback.coordinator.peer_admission(2), None);
}

#[test]
fn without_vetting_members_are_accepted_at_once() {
    init_logger();

    let mut loopback = Loopback::new(&["telemetry"], ReplicationConfig::default(), false).unwrap();
    assert!(loopback.coordinator.vetting_authority().is_none());
    loopback.add_member(1, 0);
    loopback.step().unwrap();

    assert_eq!(loopback.member(1).membership, Membership::Accepted);
    assert_eq!(loopback.member(1).member.channel_count(), 1);
}
