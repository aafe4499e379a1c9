//! Fuzz target for the relay driver
//!
//! Drives a relay with arbitrary request sequences, raw bytes and
//! disconnects from a small pool of actors.
//!
//! # Strategy
//!
//! - Random CBOR bytes through `BytesReceived`
//! - Well-formed requests with arbitrary ids (including empty and spoofed)
//! - Arbitrary envelopes relayed in joined and unjoined rooms
//! - Disconnects interleaved with joins
//!
//! # Invariants
//!
//! - The driver NEVER panics
//! - Rooms never exceed the configured size
//! - Membership only changes through the acting connection's own requests
//! - Every stored session pairs two distinct, non-empty actors

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_core::{EntropyError, Environment};
use parley_proto::{EncryptedEnvelope, KeyBundle, RelayRequest};
use parley_server::{MemoryStorage, RelayConfig, RelayDriver, RelayEvent};

const ACTORS: [&str; 4] = ["alice", "bob", "carol", ""];
const ROOMS: [&str; 3] = ["r1", "r2", ""];
const MAX_ROOM_SIZE: usize = 3;

#[derive(Clone)]
struct FuzzEnv;

impl Environment for FuzzEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        buffer.fill(0);
        Ok(())
    }

    fn wall_clock_secs(&self) -> u64 {
        0
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Raw { from: u8, bytes: Vec<u8> },
    Join { from: u8, claimed: u8, room: u8 },
    Leave { from: u8, claimed: u8, room: u8 },
    Publish { from: u8, claimed: u8, registration_id: u16 },
    Fetch { from: u8, target: u8 },
    Relay { from: u8, room: u8, recipient: u8, content: String, number: String },
    Disconnect { actor: u8 },
}

fn actor(i: u8) -> String {
    ACTORS[i as usize % ACTORS.len()].to_string()
}

fn room(i: u8) -> String {
    ROOMS[i as usize % ROOMS.len()].to_string()
}

fuzz_target!(|ops: Vec<Op>| {
    let config = RelayConfig { max_room_size: MAX_ROOM_SIZE, ..RelayConfig::default() };
    let mut driver = RelayDriver::new(FuzzEnv, MemoryStorage::new(), config);

    for op in ops {
        let event = match op {
            Op::Raw { from, bytes } => RelayEvent::BytesReceived { from: actor(from), bytes },
            Op::Join { from, claimed, room: r } => RelayEvent::RequestReceived {
                from: actor(from),
                request: RelayRequest::JoinRoom { room_id: room(r), actor_id: actor(claimed) },
            },
            Op::Leave { from, claimed, room: r } => RelayEvent::RequestReceived {
                from: actor(from),
                request: RelayRequest::LeaveRoom { room_id: room(r), actor_id: actor(claimed) },
            },
            Op::Publish { from, claimed, registration_id } => RelayEvent::RequestReceived {
                from: actor(from),
                request: RelayRequest::InitializeCrypto {
                    actor_id: actor(claimed),
                    bundle: KeyBundle {
                        identity_key: String::new(),
                        signed_pre_key: String::new(),
                        one_time_pre_keys: Vec::new(),
                        registration_id: registration_id.to_string(),
                    },
                },
            },
            Op::Fetch { from, target } => RelayEvent::RequestReceived {
                from: actor(from),
                request: RelayRequest::GetUserKeys { actor_id: actor(target) },
            },
            Op::Relay { from, room: r, recipient, content, number } => {
                RelayEvent::RequestReceived {
                    from: actor(from),
                    request: RelayRequest::SendEncrypted {
                        room_id: room(r),
                        envelope: EncryptedEnvelope {
                            encrypted_content: content,
                            sender_key_id: actor(from),
                            recipient_key_id: actor(recipient),
                            message_number: number.clone(),
                            previous_message_number: number,
                            nonce: None,
                        },
                    },
                }
            },
            Op::Disconnect { actor: a } => RelayEvent::Disconnected { actor_id: actor(a) },
        };

        let before: Vec<Vec<String>> = ROOMS.iter().map(|r| driver.registry().members(r)).collect();
        let spoofed = match &event {
            RelayEvent::RequestReceived {
                from,
                request:
                    RelayRequest::JoinRoom { actor_id, .. } | RelayRequest::LeaveRoom { actor_id, .. },
            } => from != actor_id,
            _ => false,
        };

        let _ = driver.process_event(event);

        for r in ROOMS {
            assert!(driver.registry().room_size(r) <= MAX_ROOM_SIZE, "room {r:?} over capacity");
        }
        if spoofed {
            let after: Vec<Vec<String>> =
                ROOMS.iter().map(|r| driver.registry().members(r)).collect();
            assert_eq!(before, after, "spoofed request changed membership");
        }
    }

    for r in ROOMS {
        if let Ok(sessions) = driver.room_sessions(r) {
            for session in sessions {
                assert!(!session.user_id_1.is_empty() && !session.user_id_2.is_empty());
                assert_ne!(session.user_id_1, session.user_id_2);
            }
        }
    }
});
