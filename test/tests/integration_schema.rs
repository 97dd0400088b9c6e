use chanrep_member::MemberConfig;
use chanrep_shared::{ClockConfig, ReplicationConfig, ReplicationError, SchemaError};
use chanrep_test::{mismatched_data_classes, position, Loopback, MemoryChannels};

fn replication() -> ReplicationConfig {
    ReplicationConfig {
        clock: ClockConfig {
            gain: 0.5,
            wrap_period: 100,
            follow_remote: false,
        },
        ..Default::default()
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn add_mismatched_member(loopback: &mut Loopback) -> MemoryChannels {
    let config = MemberConfig {
        replication: replication(),
        follow_coordinator_clock: false,
    };
    loopback.add_member_on(1, 0, config, MemoryChannels::new(), mismatched_data_classes(), None)
}

#[test]
fn member_refuses_entry_with_foreign_layout() {
    init_logger();

    let coordinator_channels = MemoryChannels::new();
    coordinator_channels.create_entry("telemetry", position("alpha"));
    let mut loopback = Loopback::with_coordinator_channels(
        &["telemetry"],
        replication(),
        false,
        coordinator_channels,
    )
    .unwrap();
    let member_channels = add_mismatched_member(&mut loopback);

    let error = loopback.step().unwrap_err();

    assert!(error.is_fatal());
    assert!(matches!(
        error,
        ReplicationError::Schema {
            peer: 0,
            source: SchemaError::FingerprintMismatch { .. }
        }
    ));
    assert!(member_channels.entries("telemetry").is_empty());
    assert!(loopback.member(1).member.channel(0).unwrap().inbound_entries().next().is_none());
}

#[test]
fn coordinator_refuses_proposal_with_foreign_layout() {
    init_logger();

    let mut loopback = Loopback::new(&["telemetry"], replication(), false).unwrap();
    let member_channels = add_mismatched_member(&mut loopback);
    loopback.step().unwrap();

    member_channels.create_entry("telemetry", position("rover"));
    let error = loopback.step().unwrap_err();

    assert!(matches!(error, ReplicationError::Schema { peer: 1, .. }));
    assert!(error.is_fatal());
    assert_eq!(loopback.coordinator.candidate_count(), 0);
    assert!(loopback.coordinator_channels.entries("telemetry").is_empty());
}
