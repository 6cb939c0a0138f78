//! # Session Integration Tests
//!
//! Drives a [`SyncServer`] the way a transport would: raw inbound bytes in,
//! queued outbound messages out, liveness advanced on a simulated clock.

use std::time::Duration;

use crossbeam_channel::Receiver;
use lodestone_core::Transform;
use lodestone_networking::protocol::{
    opcodes, BlockAction, ChannelList, EntityAction, KeepAlive, PacketReader, PacketWriter,
    PluginMessage,
};
use lodestone_networking::{
    DisconnectReason, EntityKind, EntityMirror, LivenessConfig, LivenessMonitor, Message,
    NetworkConfig, ProtocolError, SessionError, SyncServer, SyncedEntity,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn server() -> SyncServer {
    SyncServer::with_standard_protocol(NetworkConfig::default()).unwrap()
}

fn frames(server: &SyncServer, messages: &[Message]) -> Vec<u8> {
    let registry = server.registry();
    let mut out = PacketWriter::new();
    for message in messages {
        registry.encode(message, &mut out).unwrap();
    }
    out.into_bytes()
}

fn drain(outbound: &Receiver<Message>) -> Vec<Message> {
    outbound.try_iter().collect()
}

fn challenges(messages: &[Message]) -> Vec<i32> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::KeepAlive(ping) => Some(ping.hash),
            _ => None,
        })
        .collect()
}

#[test]
fn test_ninth_challenge_overwrites_slot_zero() {
    let config = LivenessConfig::default();
    assert_eq!(config.repeat_rate, 8);
    let mut monitor = LivenessMonitor::with_rng(&config, StdRng::seed_from_u64(9));

    let hashes: Vec<i32> = (0..9).map(|_| monitor.issue_challenge()).collect();
    assert!(hashes.iter().all(|h| *h >= 0));
    assert_eq!(monitor.challenges().count(), 8);

    // The first hash is gone; echoing it is ignored
    assert_eq!(monitor.respond(hashes[0]), None);
    assert!(monitor.respond(hashes[8]).is_some());
    assert!(monitor.respond(hashes[1]).is_some());
}

#[test]
fn test_silent_peer_times_out() {
    let server = server();
    let (id, outbound) = server.open_session().unwrap();

    assert!(server.tick_sessions(Duration::from_secs(30)).is_empty());
    let closed = server.tick_sessions(Duration::from_millis(50));

    assert_eq!(closed, vec![(id, DisconnectReason::TimedOut)]);
    assert!(!server.is_open(id));
    assert_eq!(
        drain(&outbound).last(),
        Some(&Message::Kick(lodestone_networking::protocol::Kick {
            reason: "Connection timed out".into()
        }))
    );
}

#[test]
fn test_chatty_peer_without_pings_times_out() {
    let server = server();
    let (id, outbound) = server.open_session().unwrap();
    let noise = frames(&server, &[Message::KeepAlive(KeepAlive { hash: -1 })]);

    let mut elapsed = Duration::ZERO;
    let closed = loop {
        elapsed += Duration::from_secs(10);
        let closed = server.tick_sessions(Duration::from_secs(10));
        if !closed.is_empty() {
            break closed;
        }
        server.receive(id, &noise).unwrap();
        assert!(elapsed <= Duration::from_secs(120), "still open at {elapsed:?}");
    };

    assert_eq!(closed, vec![(id, DisconnectReason::NoPingResponse)]);
    assert_eq!(elapsed, Duration::from_secs(130));

    let sent = drain(&outbound);
    assert!(!challenges(&sent).is_empty());
    assert!(matches!(sent.last(), Some(Message::Kick(k)) if k.reason == "No ping response"));
}

#[test]
fn test_answered_pings_keep_session_alive() {
    let server = server();
    let (id, outbound) = server.open_session().unwrap();
    let latency = server.session_latency(id).unwrap();

    for _ in 0..400 {
        assert!(server.tick_sessions(Duration::from_millis(500)).is_empty());
        let echoes: Vec<Message> = challenges(&drain(&outbound))
            .into_iter()
            .map(|hash| Message::KeepAlive(KeepAlive { hash }))
            .collect();
        if !echoes.is_empty() {
            server.receive(id, &frames(&server, &echoes)).unwrap();
        }
    }

    assert!(server.is_open(id));
    assert!(latency.load() >= 0.0);
}

#[test]
fn test_unknown_opcode_closes_connection() {
    let server = server();
    let (id, outbound) = server.open_session().unwrap();
    let mut bytes = frames(&server, &[Message::KeepAlive(KeepAlive { hash: 4 })]);
    bytes.extend_from_slice(&[0x02, 0xAA, 0xBB]);

    let result = server.receive(id, &bytes);

    assert_eq!(
        result,
        Err(SessionError::Protocol(ProtocolError::UnknownOpcode(0x02)))
    );
    assert_eq!(server.session_count(), 0);
    assert!(matches!(drain(&outbound).last(), Some(Message::Kick(_))));
}

#[test]
fn test_truncated_payload_closes_connection() {
    let server = server();
    let (id, _outbound) = server.open_session().unwrap();

    // Block action needs 12 payload bytes
    let result = server.receive(id, &[opcodes::BLOCK_ACTION, 0, 0, 0, 1, 0]);

    assert!(matches!(
        result,
        Err(SessionError::Protocol(ProtocolError::Truncated { .. }))
    ));
    assert!(!server.is_open(id));
}

#[test]
fn test_channel_negotiation() {
    let server = server();
    let (id, outbound) = server.open_session().unwrap();

    assert_eq!(
        drain(&outbound),
        vec![Message::RegisterChannels(ChannelList::new([
            "MC|AdvCdm",
            "MC|Beacon"
        ]))]
    );

    let bytes = frames(
        &server,
        &[
            Message::RegisterChannels(ChannelList::new(["MC|Beacon", "UNREGISTER", "Custom"])),
            Message::UnregisterChannels(ChannelList::new(["custom"])),
        ],
    );
    assert_eq!(server.receive(id, &bytes), Ok(2));

    assert!(server.is_open(id));
    assert_eq!(server.session_channels(id), Some(vec!["MC|Beacon".to_owned()]));
}

#[test]
fn test_peer_input_is_forwarded() {
    let server = server();
    let events = server.events();
    let (id, _outbound) = server.open_session().unwrap();

    let sprint = Message::EntityAction(EntityAction::new(42, EntityAction::ACTION_START_SPRINTING));
    let lever = Message::BlockAction(BlockAction {
        x: 10,
        y: 64,
        z: -3,
        first: 1,
        second: 0,
    });
    let brand = Message::PluginMessage(PluginMessage {
        channel: "MC|Brand".into(),
        data: b"vanilla".to_vec(),
    });

    let bytes = frames(&server, &[sprint.clone(), lever.clone(), brand.clone()]);
    assert_eq!(server.receive(id, &bytes), Ok(3));

    let received: Vec<Message> = events.try_iter().map(|e| e.message).collect();
    assert_eq!(received, vec![sprint, lever, brand]);
}

struct Npc {
    id: i32,
    transform: Transform,
}

impl SyncedEntity for Npc {
    fn entity_id(&self) -> i32 {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Creature { type_id: 120 }
    }

    fn transform(&self) -> Transform {
        self.transform
    }
}

#[test]
fn test_sync_round_trip_excludes_own_entity() {
    let server = server();
    let peer = lodestone_networking::standard_registry().unwrap();
    let (id, outbound) = server.open_session().unwrap();
    server.set_controlled_entity(id, Some(1)).unwrap();

    let mut own = Npc {
        id: 1,
        transform: Transform::new(0.0, 64.0, 0.0, 0.0, 0.0),
    };
    let mut other = Npc {
        id: 2,
        transform: Transform::new(8.0, 64.0, 8.0, 90.0, 0.0),
    };
    let mut mirror = EntityMirror::new();
    let mut wire = PacketWriter::new();

    for tick in 0..40 {
        own.transform.position.x += 0.5;
        other.transform.position.z += if tick % 10 == 0 { 20.0 } else { 0.75 };
        other.transform.yaw += 7.5;

        server.sync_entities(id, &[&own, &other]).unwrap();

        wire.reset();
        server.encode_outbound(&outbound, &mut wire).unwrap();
        let mut input = PacketReader::new(wire.as_slice());
        while !input.is_empty() {
            let frame = peer.decode_frame(&mut input).unwrap();
            mirror.apply(&frame.message).unwrap();
        }
    }

    assert!(mirror.get(1).is_none());
    assert_eq!(mirror.get(2).unwrap().transform, other.transform.quantize());

    // Leaving view destroys on the peer
    server.sync_entities(id, &[&own]).unwrap();
    wire.reset();
    server.encode_outbound(&outbound, &mut wire).unwrap();
    let frame = peer
        .decode_frame(&mut PacketReader::new(wire.as_slice()))
        .unwrap();
    mirror.apply(&frame.message).unwrap();
    assert!(mirror.is_empty());
}
