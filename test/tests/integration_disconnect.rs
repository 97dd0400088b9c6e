use chanrep_shared::{ConfigMessage, ReplicationConfig, ReplicatorRole};
use chanrep_test::{decode_all, position, Loopback};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn with_member_entries(labels: &[&str]) -> Loopback {
    let mut loopback = Loopback::new(&["telemetry"], ReplicationConfig::default(), false).unwrap();
    let proposer = loopback.add_member(1, 0);
    loopback.add_member(2, 0);
    loopback.step().unwrap();
    for label in labels {
        proposer.create_entry("telemetry", position(label));
    }
    loopback.steps(2).unwrap();
    loopback
}

#[test]
fn departed_member_entries_are_removed_once_each() {
    init_logger();

    let mut loopback = with_member_entries(&["left", "right"]);
    assert_eq!(loopback.coordinator_channels.entries("telemetry").len(), 2);

    loopback.disconnect(1);

    let obsolete = loopback.coordinator.obsolete_entries();
    assert_eq!(obsolete.len(), 2);
    assert!(obsolete.iter().all(|entry| entry.is_inbound() && entry.origin == 1));

    let tick = loopback.tick();
    let messages = decode_all(&loopback.coordinator.send_config(tick).unwrap());
    assert_eq!(messages.len(), 2);
    assert!(messages
        .iter()
        .all(|message| matches!(message, ConfigMessage::RemoveEntry(removal) if removal.origin == 1)));
    assert!(loopback.coordinator_channels.entries("telemetry").is_empty());
}

#[test]
fn departure_without_entries_sends_nothing() {
    init_logger();

    let mut loopback = with_member_entries(&[]);
    loopback.disconnect(1);

    assert!(loopback.coordinator.obsolete_entries().is_empty());
    let tick = loopback.tick();
    assert!(loopback.coordinator.send_config(tick).unwrap().is_empty());
}

#[test]
fn remaining_members_drop_departed_entries() {
    init_logger();

    let mut loopback = with_member_entries(&["left", "right"]);
    let observer = loopback.member(2).channels.clone();
    assert_eq!(observer.entries("telemetry").len(), 2);

    loopback.disconnect(1);
    loopback.step().unwrap();

    assert!(observer.entries("telemetry").is_empty());
    assert!(loopback.coordinator.obsolete_entries().is_empty());
}
