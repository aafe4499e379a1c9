//! Property-based tests for two clients exchanging envelopes directly.
//!
//! 1. **Round-trip**: whatever one client sends, the addressee reads verbatim
//! 2. **Numbering**: delivered message numbers count up from 1 per direction
//! 3. **Privacy**: a third client never reads envelopes addressed elsewhere

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parley_client::{Client, ClientAction, ClientEvent};
use parley_core::{EntropyError, Environment};
use parley_proto::{RelayMessage, RelayRequest};
use proptest::prelude::*;

#[derive(Clone, Default)]
struct CounterEnv {
    next: Arc<AtomicU64>,
}

impl Environment for CounterEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        for chunk in buffer.chunks_mut(8) {
            let value = self.next.fetch_add(1, Ordering::Relaxed).to_be_bytes();
            chunk.copy_from_slice(&value[..chunk.len()]);
        }
        Ok(())
    }

    fn wall_clock_secs(&self) -> u64 {
        0
    }
}

fn client_in_room(actor: &str) -> Client<CounterEnv> {
    let mut client = Client::new(CounterEnv::default(), actor);
    client.handle(ClientEvent::JoinRoom { room_id: "r1".to_string() }).unwrap();
    client
}

/// Send from `sender` to `recipient` and hand the envelope to `reader`.
fn relay_one(
    sender: &mut Client<CounterEnv>,
    reader: &mut Client<CounterEnv>,
    recipient: &str,
    text: &str,
) -> Vec<ClientAction> {
    let actions = sender
        .handle(ClientEvent::SendMessage {
            room_id: "r1".to_string(),
            recipient_id: recipient.to_string(),
            plaintext: text.to_string(),
        })
        .unwrap();
    let Some(ClientAction::Send(RelayRequest::SendEncrypted { room_id, envelope })) =
        actions.into_iter().next()
    else {
        unreachable!("send produces one envelope");
    };

    reader
        .handle(ClientEvent::RelayMessageReceived(RelayMessage::EncryptedMessageReceived {
            room_id,
            envelope,
        }))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip_with_numbering(texts in prop::collection::vec(".{0,64}", 1..10)) {
        let mut alice = client_in_room("alice");
        let mut bob = client_in_room("bob");

        for (i, text) in texts.iter().enumerate() {
            let actions = relay_one(&mut alice, &mut bob, "bob", text);
            let expected_number = (i + 1).to_string();
            prop_assert_eq!(actions, vec![ClientAction::DeliverMessage {
                room_id: "r1".to_string(),
                sender_id: "alice".to_string(),
                plaintext: text.clone(),
                message_number: expected_number,
            }]);
        }
    }

    #[test]
    fn prop_bystander_reads_nothing(text in ".{0,64}") {
        let mut alice = client_in_room("alice");
        let mut carol = client_in_room("carol");

        let actions = relay_one(&mut alice, &mut carol, "bob", &text);

        prop_assert!(actions.is_empty());
    }
}
