//! Drives a member directly, standing in for the coordinator, to control
//! exactly when its proposals are confirmed.

use chanrep_member::{Member, MemberConfig};
use chanrep_shared::{
    AddChannel, AddEntry, ByteReader, ConfigMessage, RemoveEntry, ReplicationContext,
    ReplicatorRole, COORDINATOR_PEER_ID,
};
use chanrep_test::{data_classes, decode_all, position, MemoryChannels};

const LOCAL_PEER: u16 = 4;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn member_on(channels: &MemoryChannels) -> Member {
    let context = ReplicationContext::new(Box::new(channels.clone()), data_classes());
    Member::new(MemberConfig::default(), context, LOCAL_PEER)
}

fn receive(member: &mut Member, message: ConfigMessage) {
    let bytes = message.to_bytes();
    let mut reader = ByteReader::new(&bytes);
    assert_eq!(member.decode_config(&mut reader, COORDINATOR_PEER_ID).unwrap(), 1);
}

fn open_channel(member: &mut Member) {
    receive(
        member,
        ConfigMessage::AddChannel(AddChannel {
            origin: COORDINATOR_PEER_ID,
            channel: 0,
            name: "telemetry".to_string(),
        }),
    );
}

fn confirmation(label: &str, provisional: u16, entry: u16) -> ConfigMessage {
    ConfigMessage::AddEntry(
        AddEntry::announce(
            &data_classes(),
            LOCAL_PEER,
            0,
            Some(provisional),
            Some(entry),
            &position(label),
        )
        .unwrap(),
    )
}

fn removal(entry: u16) -> ConfigMessage {
    ConfigMessage::RemoveEntry(RemoveEntry {
        origin: LOCAL_PEER,
        channel: 0,
        entry,
    })
}

#[test]
fn removal_of_unconfirmed_entry_waits_for_confirmation() {
    init_logger();

    let channels = MemoryChannels::new();
    let mut member = member_on(&channels);
    open_channel(&mut member);

    let entry = channels.create_entry("telemetry", position("rover"));
    let proposals = decode_all(&member.send_config(1).unwrap());
    let [ConfigMessage::AddEntry(proposal)] = proposals.as_slice() else {
        panic!("expected one proposal, got {:?}", proposals);
    };
    assert_eq!(proposal.provisional, Some(0));
    assert_eq!(proposal.entry, None);

    channels.remove_entry("telemetry", entry);
    assert!(member.send_config(2).unwrap().is_empty());
    assert_eq!(member.postponed_removal_count(), 1);

    receive(&mut member, confirmation("rover", 0, 7));
    assert_eq!(member.postponed_removal_count(), 0);
    assert_eq!(member.candidate_count(), 0);

    assert_eq!(decode_all(&member.send_config(3).unwrap()), vec![removal(7)]);
    assert!(member.channel(0).unwrap().outbound().is_empty());
}

#[test]
fn postponed_removal_holds_up_later_removals() {
    init_logger();

    let channels = MemoryChannels::new();
    let mut member = member_on(&channels);
    open_channel(&mut member);

    let confirmed = channels.create_entry("telemetry", position("confirmed"));
    member.send_config(1).unwrap();
    receive(&mut member, confirmation("confirmed", 0, 0));

    let unconfirmed = channels.create_entry("telemetry", position("unconfirmed"));
    let proposals = decode_all(&member.send_config(2).unwrap());
    assert_eq!(proposals.len(), 1);

    channels.remove_entry("telemetry", unconfirmed);
    channels.remove_entry("telemetry", confirmed);
    assert!(member.send_config(3).unwrap().is_empty());

    // the confirmed entry's removal is queued behind the unconfirmed one
    assert_eq!(member.postponed_removal_count(), 2);

    receive(&mut member, confirmation("unconfirmed", 1, 1));
    assert_eq!(member.postponed_removal_count(), 0);
    assert_eq!(
        decode_all(&member.send_config(4).unwrap()),
        vec![removal(1), removal(0)]
    );
}

#[test]
fn removal_of_confirmed_entry_is_sent_at_once() {
    init_logger();

    let channels = MemoryChannels::new();
    let mut member = member_on(&channels);
    open_channel(&mut member);

    let entry = channels.create_entry("telemetry", position("rover"));
    member.send_config(1).unwrap();
    receive(&mut member, confirmation("rover", 0, 3));

    channels.remove_entry("telemetry", entry);
    assert_eq!(decode_all(&member.send_config(2).unwrap()), vec![removal(3)]);
    assert_eq!(member.postponed_removal_count(), 0);
}

#[test]
fn coordinator_loss_resets_the_member() {
    init_logger();

    let channels = MemoryChannels::new();
    let mut member = member_on(&channels);
    open_channel(&mut member);
    channels.create_entry("telemetry", position("rover"));
    member.send_config(1).unwrap();
    assert_eq!(member.candidate_count(), 1);

    member.peer_left(COORDINATOR_PEER_ID);

    assert_eq!(member.channel_count(), 0);
    assert_eq!(member.candidate_count(), 0);
    assert!(member.send_config(2).unwrap().is_empty());
}
