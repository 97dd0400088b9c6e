use std::sync::{Arc, Mutex};

use chanrep_member::MemberConfig;
use chanrep_shared::{ChannelItem, ClockConfig, ClockSteering, ReplicationConfig, TimeSpan, TimeTick};
use chanrep_test::{data_classes, position, Loopback, MemoryChannels};

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

#[derive(Clone, Default)]
struct RecordingClock {
    steered: Arc<Mutex<Vec<(TimeTick, f64)>>>,
}

impl ClockSteering for RecordingClock {
    fn steer(&mut self, target: TimeTick, correction: f64) {
        self.steered.lock().unwrap().push((target, correction));
    }
}

fn exporting_coordinator() -> (Loopback, MemoryChannels, u32) {
    let channels = MemoryChannels::new();
    let alpha = channels.create_entry("telemetry", position("alpha"));
    let loopback =
        Loopback::with_coordinator_channels(&["telemetry"], replication(), false, channels.clone())
            .unwrap();
    (loopback, channels, alpha)
}

#[test]
fn following_member_steers_its_clock() {
    init_logger();

    let (mut loopback, coordinator_channels, alpha) = exporting_coordinator();
    let clock = RecordingClock::default();
    let config = MemberConfig {
        replication: replication(),
        follow_coordinator_clock: true,
    };
    let member_channels = loopback.add_member_on(
        1,
        230,
        config,
        MemoryChannels::new(),
        data_classes(),
        Some(Box::new(clock.clone())),
    );
    loopback.step().unwrap();
    assert!(clock.steered.lock().unwrap().is_empty());

    let sent_at = loopback.tick();
    coordinator_channels.write("telemetry", alpha, b"fix", TimeSpan::new(sent_at, sent_at + 5));
    loopback.step().unwrap();

    // 230 ticks ahead folds to a transition of 200, 30 ticks left over
    assert_eq!(*clock.steered.lock().unwrap(), vec![(sent_at + 200, 30.0)]);

    let mirrored = member_channels.find("telemetry", "alpha").unwrap();
    assert_eq!(
        member_channels.items("telemetry", mirrored),
        vec![ChannelItem::new(TimeSpan::new(sent_at + 200, sent_at + 205), b"fix")]
    );
}

#[test]
fn tracking_member_never_steers() {
    init_logger();

    let (mut loopback, coordinator_channels, alpha) = exporting_coordinator();
    let clock = RecordingClock::default();
    let config = MemberConfig {
        replication: replication(),
        follow_coordinator_clock: false,
    };
    loopback.add_member_on(
        1,
        230,
        config,
        MemoryChannels::new(),
        data_classes(),
        Some(Box::new(clock.clone())),
    );
    loopback.step().unwrap();
    for _ in 0..5 {
        let tick = loopback.tick();
        coordinator_channels.write("telemetry", alpha, b"fix", TimeSpan::tick(tick));
        loopback.step().unwrap();
    }

    assert!(clock.steered.lock().unwrap().is_empty());
}
