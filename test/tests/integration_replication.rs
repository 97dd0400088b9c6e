use chanrep_shared::{ChannelItem, ClockConfig, ReplicationConfig, ReplicatorRole, TimeSpan};
use chanrep_test::{command, position, Loopback, MemoryChannels, Membership};

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

#[test]
fn coordinator_entry_reaches_every_member() {
    init_logger();

    let coordinator_channels = MemoryChannels::new();
    let alpha = coordinator_channels.create_entry("telemetry", position("alpha"));
    let mut loopback = Loopback::with_coordinator_channels(
        &["telemetry"],
        replication(),
        false,
        coordinator_channels.clone(),
    )
    .unwrap();
    let ahead = loopback.add_member(1, 1000);
    let behind = loopback.add_member(2, -500);

    // accepted, channel announced, entry exported and imported
    loopback.step().unwrap();
    assert_eq!(loopback.member(1).membership, Membership::Accepted);
    assert_eq!(loopback.member(2).member.channel_count(), 1);
    let ahead_alpha = ahead.find("telemetry", "alpha").expect("imported");
    let behind_alpha = behind.find("telemetry", "alpha").expect("imported");

    let start = loopback.tick();
    coordinator_channels.write("telemetry", alpha, b"north", TimeSpan::new(start, start + 2));
    loopback.step().unwrap();

    assert_eq!(
        ahead.items("telemetry", ahead_alpha),
        vec![ChannelItem::new(TimeSpan::new(start + 1000, start + 1002), b"north")]
    );
    assert_eq!(
        behind.items("telemetry", behind_alpha),
        vec![ChannelItem::new(TimeSpan::new(start - 500, start - 498), b"north")]
    );
    assert_eq!(loopback.pool_outstanding(), 0);
}

#[test]
fn member_entry_is_relayed_to_coordinator_and_members() {
    init_logger();

    let mut loopback = Loopback::new(&["telemetry"], replication(), false).unwrap();
    let proposer = loopback.add_member(1, 1000);
    let observer = loopback.add_member(2, -500);
    loopback.step().unwrap();

    let bravo = proposer.create_entry("telemetry", command("bravo"));
    // proposed
    loopback.step().unwrap();
    assert_eq!(loopback.member(1).member.candidate_count(), 1);
    assert_eq!(loopback.coordinator.candidate_count(), 1);
    // confirmed to everyone
    loopback.step().unwrap();
    assert_eq!(loopback.member(1).member.candidate_count(), 0);
    assert_eq!(loopback.coordinator.candidate_count(), 0);

    proposer.write("telemetry", bravo, b"go", TimeSpan::tick(12_000));
    loopback.step().unwrap();

    let coordinator_bravo = loopback
        .coordinator_channels
        .find("telemetry", "bravo")
        .expect("imported by the coordinator");
    assert_eq!(
        loopback.coordinator_channels.items("telemetry", coordinator_bravo),
        vec![ChannelItem::new(TimeSpan::tick(11_000), b"go")]
    );
    let observer_bravo = observer.find("telemetry", "bravo").expect("imported");
    assert_eq!(
        observer.items("telemetry", observer_bravo),
        vec![ChannelItem::new(TimeSpan::tick(10_500), b"go")]
    );

    // the proposer still holds only its own entry
    assert_eq!(proposer.entries("telemetry").len(), 1);
    assert_eq!(loopback.member(1).member.stats().records_written, 1);
}

#[test]
fn late_member_gets_the_whole_configuration() {
    init_logger();

    let mut loopback = Loopback::new(&["telemetry", "commands"], replication(), false).unwrap();
    let proposer = loopback.add_member(1, 0);
    loopback.step().unwrap();
    proposer.create_entry("commands", command("bravo"));
    loopback.steps(2).unwrap();

    let late = loopback.add_member(3, 0);
    loopback.step().unwrap();

    assert_eq!(loopback.member(3).member.channel_count(), 2);
    assert!(late.find("commands", "bravo").is_some());
    assert!(late.entries("telemetry").is_empty());
}

#[test]
fn removal_reaches_every_mirror() {
    init_logger();

    let mut loopback = Loopback::new(&["telemetry"], replication(), false).unwrap();
    let proposer = loopback.add_member(1, 0);
    let observer = loopback.add_member(2, 0);
    loopback.step().unwrap();
    let bravo = proposer.create_entry("telemetry", position("bravo"));
    loopback.steps(2).unwrap();
    assert!(observer.find("telemetry", "bravo").is_some());
    assert!(loopback.coordinator_channels.find("telemetry", "bravo").is_some());

    proposer.remove_entry("telemetry", bravo);
    // removal reported to the coordinator
    loopback.step().unwrap();
    assert_eq!(loopback.coordinator.obsolete_entries().len(), 1);
    // and announced to everyone
    loopback.step().unwrap();

    assert!(loopback.coordinator.obsolete_entries().is_empty());
    assert!(loopback.coordinator_channels.entries("telemetry").is_empty());
    assert!(observer.entries("telemetry").is_empty());
}

#[test]
fn imported_entries_are_not_exported_again() {
    init_logger();

    let mut loopback = Loopback::new(&["telemetry"], replication(), false).unwrap();
    let proposer = loopback.add_member(1, 0);
    loopback.add_member(2, 0);
    loopback.step().unwrap();
    proposer.create_entry("telemetry", position("bravo"));
    loopback.steps(4).unwrap();

    let channel = loopback.coordinator.channel(0).unwrap();
    assert!(channel.outbound().is_empty());
    assert_eq!(channel.inbound_entries().count(), 1);

    let observer = loopback.member(2).member.channel(0).unwrap();
    assert!(observer.outbound().is_empty());
    assert_eq!(loopback.member(2).member.candidate_count(), 0);
}
