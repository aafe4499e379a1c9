//! Model-based property tests.
//!
//! Random operation sequences are applied to the reference model and to a
//! simulated world of real clients and a real relay. Results and observable
//! state must agree after every step.
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld      SimWorld        Compare
//!      (reference)     (real)          Results
//! ```

use std::collections::{BTreeMap, BTreeSet};

use parley_client::{ClientAction, ClientError};
use parley_crypto::SessionId;
use parley_harness::{
    ACTORS, ModelDelivery, ModelWorld, ObservableState, Operation, OperationError,
    OperationResult, ROOMS, SimWorld, WorldError,
};
use parley_server::Storage;
use proptest::prelude::*;

fn operation() -> impl Strategy<Value = Operation> {
    let actor = 0..ACTORS.len();
    let room = 0..ROOMS.len();
    prop_oneof![
        3 => (actor.clone(), room.clone()).prop_map(|(actor, room)| Operation::Join { actor, room }),
        1 => (actor.clone(), room.clone()).prop_map(|(actor, room)| Operation::Leave { actor, room }),
        4 => (actor.clone(), actor, room, "[a-z ]{0,16}")
            .prop_map(|(from, to, room, text)| Operation::Send { from, to, room, text }),
    ]
}

fn apply_real(world: &mut SimWorld, op: &Operation) -> OperationResult {
    let result = match op {
        Operation::Join { actor, room } => world.join(ACTORS[*actor], ROOMS[*room]),
        Operation::Leave { actor, room } => world.leave(ACTORS[*actor], ROOMS[*room]),
        Operation::Send { from, to, room, text } => {
            world.send(ACTORS[*from], ROOMS[*room], ACTORS[*to], text)
        },
    };

    match result {
        Ok(()) => Ok(()),
        Err(WorldError::Client(ClientError::NotInRoom { .. })) => Err(OperationError::NotInRoom),
        Err(WorldError::Client(ClientError::SelfAddressed)) => Err(OperationError::SelfAddressed),
        Err(other) => panic!("unexpected world error: {other}"),
    }
}

fn observe(world: &SimWorld) -> ObservableState {
    let mut memberships = BTreeMap::new();
    let mut deliveries = BTreeMap::new();

    for actor in ACTORS {
        let rooms: BTreeSet<String> = ROOMS
            .iter()
            .filter(|room| world.relay().registry().is_member(actor, room))
            .map(|room| (*room).to_string())
            .collect();
        memberships.insert(actor.to_string(), rooms);

        let read: Vec<ModelDelivery> = world
            .inbox(actor)
            .iter()
            .filter_map(|action| match action {
                ClientAction::DeliverMessage { room_id, sender_id, plaintext, message_number } => {
                    Some(ModelDelivery {
                        room_id: room_id.clone(),
                        sender_id: sender_id.clone(),
                        plaintext: plaintext.clone(),
                        message_number: message_number.parse().unwrap(),
                    })
                },
                _ => None,
            })
            .collect();
        deliveries.insert(actor.to_string(), read);
    }

    ObservableState { memberships, deliveries }
}

fn new_world(seed: u64) -> SimWorld {
    let mut world = SimWorld::new(seed);
    for actor in ACTORS {
        world.add_actor(actor);
    }
    world
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_real_world_matches_model(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation(), 1..40),
    ) {
        let mut model = ModelWorld::new();
        let mut world = new_world(seed);

        for op in &ops {
            let expected = model.apply(op);
            let actual = apply_real(&mut world, op);
            prop_assert_eq!(actual, expected, "operation {:?}", op);
        }

        prop_assert_eq!(observe(&world), model.observable_state());
    }

    #[test]
    fn prop_no_envelope_is_undecryptable(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation(), 1..40),
    ) {
        let mut world = new_world(seed);
        for op in &ops {
            let _ = apply_real(&mut world, op);
        }

        for actor in ACTORS {
            prop_assert!(
                !world.inbox(actor).iter().any(|a| matches!(a, ClientAction::UndecryptableMessage { .. })),
                "{} saw an undecryptable envelope",
                actor
            );
        }
    }

    #[test]
    fn prop_co_present_pairs_have_durable_sessions(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation(), 1..40),
    ) {
        let mut model = ModelWorld::new();
        let mut world = new_world(seed);
        for op in &ops {
            let _ = model.apply(op);
            let _ = apply_real(&mut world, op);
        }

        for room in ROOMS {
            let members = model.members(room);
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    let id = SessionId::canonicalize(a, b);
                    let record = world.relay().storage().load_session_record(&id, room).unwrap();
                    prop_assert!(record.is_some(), "no session for {} in {}", id, room);
                }
            }
        }
    }
}
