//! End-to-end scenarios: real clients talking through the real relay.

use parley_client::{ClientAction, UNDECRYPTABLE_PLACEHOLDER};
use parley_core::ServiceConfig;
use parley_crypto::DecryptionError;
use parley_harness::{SimWorld, WorldError};
use parley_proto::EncryptedEnvelope;
use parley_server::RelayConfig;

fn delivered(world: &SimWorld, actor: &str) -> Vec<(String, String)> {
    world
        .inbox(actor)
        .iter()
        .filter_map(|a| match a {
            ClientAction::DeliverMessage { sender_id, plaintext, .. } => {
                Some((sender_id.clone(), plaintext.clone()))
            },
            _ => None,
        })
        .collect()
}

fn undecryptable(world: &SimWorld, actor: &str) -> Vec<DecryptionError> {
    world
        .inbox(actor)
        .iter()
        .filter_map(|a| match a {
            ClientAction::UndecryptableMessage { reason, .. } => Some(reason.clone()),
            _ => None,
        })
        .collect()
}

fn flip_first_nonce_char(envelope: &mut EncryptedEnvelope) {
    if let Some(nonce) = envelope.nonce.as_mut() {
        let replacement = if nonce.starts_with('A') { "B" } else { "A" };
        nonce.replace_range(0..1, replacement);
    }
}

fn alice_and_bob(seed: u64) -> SimWorld {
    let mut world = SimWorld::new(seed);
    world.add_actor("alice");
    world.add_actor("bob");
    world
}

#[test]
fn alice_and_bob_exchange_hello() {
    let mut world = alice_and_bob(1);

    world.join("alice", "r1").unwrap();
    assert!(world.relay().room_sessions("r1").unwrap().is_empty());

    world.join("bob", "r1").unwrap();
    let sessions = world.relay().room_sessions("r1").unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].user_id_1, "alice");
    assert_eq!(sessions[0].user_id_2, "bob");

    world.send("alice", "r1", "bob", "hello").unwrap();

    assert_eq!(delivered(&world, "bob"), vec![("alice".to_string(), "hello".to_string())]);
    assert!(delivered(&world, "alice").is_empty());
}

#[test]
fn flipped_nonce_is_reported_not_delivered() {
    let mut world = alice_and_bob(2);
    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();

    world.set_tamper(flip_first_nonce_char);
    world.send("alice", "r1", "bob", "hello").unwrap();

    assert!(delivered(&world, "bob").is_empty());
    assert_eq!(undecryptable(&world, "bob"), vec![DecryptionError::AuthenticationFailed]);
    assert_eq!(UNDECRYPTABLE_PLACEHOLDER, "[undecryptable message]");

    // The session is unharmed by a rejected envelope
    world.clear_tamper();
    world.send("alice", "r1", "bob", "again").unwrap();
    assert_eq!(delivered(&world, "bob"), vec![("alice".to_string(), "again".to_string())]);
}

#[test]
fn both_sides_learn_about_each_other() {
    let mut world = alice_and_bob(3);
    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();

    let alice = world.client("alice").unwrap();
    let bob = world.client("bob").unwrap();
    assert_eq!(alice.online_peers("r1"), vec!["bob".to_string()]);
    assert_eq!(bob.online_peers("r1"), vec!["alice".to_string()]);
    assert!(alice.crypto().has_session("alice", "bob"));
    assert!(bob.crypto().has_session("bob", "alice"));
}

#[test]
fn published_bundles_travel_with_presence() {
    let mut world = alice_and_bob(4);
    world.initialize("alice").unwrap();
    world.initialize("bob").unwrap();
    assert!(world.client("alice").unwrap().is_published());

    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();

    let alice_bundle = world.client("alice").unwrap().crypto().public_bundle("alice");
    let seen_by_bob = world.client("bob").unwrap().crypto().public_bundle("alice");
    assert!(alice_bundle.is_some());
    assert_eq!(seen_by_bob, alice_bundle);
}

#[test]
fn late_joiner_reaches_everyone() {
    let mut world = alice_and_bob(5);
    world.add_actor("carol");
    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();
    world.join("carol", "r1").unwrap();

    assert_eq!(world.relay().room_sessions("r1").unwrap().len(), 3);

    world.apply("carol", parley_client::ClientEvent::BroadcastMessage {
        room_id: "r1".to_string(),
        plaintext: "hi all".to_string(),
    })
    .unwrap();

    assert_eq!(delivered(&world, "alice"), vec![("carol".to_string(), "hi all".to_string())]);
    assert_eq!(delivered(&world, "bob"), vec![("carol".to_string(), "hi all".to_string())]);
}

#[test]
fn envelopes_are_only_read_by_their_recipient() {
    let mut world = alice_and_bob(6);
    world.add_actor("carol");
    for actor in ["alice", "bob", "carol"] {
        world.join(actor, "r1").unwrap();
    }

    world.send("alice", "r1", "bob", "secret").unwrap();

    assert_eq!(delivered(&world, "bob").len(), 1);
    assert!(delivered(&world, "carol").is_empty());
    assert!(undecryptable(&world, "carol").is_empty());
}

#[test]
fn leaving_stops_delivery() {
    let mut world = alice_and_bob(7);
    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();

    world.leave("bob", "r1").unwrap();
    assert!(world.client("alice").unwrap().online_peers("r1").is_empty());

    world.send("alice", "r1", "bob", "anyone?").unwrap();
    assert!(delivered(&world, "bob").is_empty());
}

#[test]
fn disconnect_is_seen_as_leave() {
    let mut world = alice_and_bob(8);
    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();

    world.disconnect("bob").unwrap();

    assert!(world.inbox("alice").iter().any(|a| matches!(
        a,
        ClientAction::PeerOffline { actor_id, .. } if actor_id == "bob"
    )));
    assert!(!world.relay().registry().is_member("bob", "r1"));
}

#[test]
fn relay_counts_relayed_envelopes() {
    let mut world = alice_and_bob(9);
    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();

    world.send("alice", "r1", "bob", "one").unwrap();
    world.send("bob", "r1", "alice", "two").unwrap();
    world.send("alice", "r1", "bob", "three").unwrap();

    let sessions = world.relay().room_sessions("r1").unwrap();
    assert_eq!(sessions[0].message_counter, 3);
}

#[test]
fn monotonic_world_delivers_in_order_traffic() {
    let mut world = SimWorld::with_config(10, RelayConfig::default(), ServiceConfig::monotonic());
    world.add_actor("alice");
    world.add_actor("bob");
    world.join("alice", "r1").unwrap();
    world.join("bob", "r1").unwrap();

    for text in ["a", "b", "c"] {
        world.send("alice", "r1", "bob", text).unwrap();
    }

    assert_eq!(delivered(&world, "bob").len(), 3);
    assert!(undecryptable(&world, "bob").is_empty());
}

#[test]
fn unknown_actor_is_an_error() {
    let mut world = SimWorld::new(11);

    assert!(matches!(world.join("mallory", "r1"), Err(WorldError::UnknownActor(_))));
}

#[test]
fn same_seed_same_wire_traffic() {
    let run = |seed| {
        let mut world = alice_and_bob(seed);
        world.join("alice", "r1").unwrap();
        world.join("bob", "r1").unwrap();
        world.send("alice", "r1", "bob", "hello").unwrap();
        world.take_inbox("bob")
    };

    assert_eq!(run(42), run(42));
}
