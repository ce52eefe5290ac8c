use crate::stepper::PresenceStepper;
use alloc::vec;
use alloc::vec::Vec;
use bevy_platform::collections::{HashMap, HashSet};
use copresence::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_log::test;

const A: ParticipantId = ParticipantId(1);
const B: ParticipantId = ParticipantId(2);
const C: ParticipantId = ParticipantId(3);

const SCENES: [&str; 3] = ["Lobby", "Tavern", "Cave"];

/// A and B join the lobby, then A leaves it.
/// Each side only updates its view of the other once it processed the other's event.
#[test]
fn test_lobby_join_and_leave() {
    let mut stepper = PresenceStepper::with_clients(2);
    stepper.spawn_all_avatars();

    stepper.join(A, "Lobby");
    stepper.join(B, "Lobby");
    stepper.step();
    assert!(stepper.client(A).shows(B));
    assert!(stepper.client(B).shows(A));

    stepper.leave(A, "Lobby");
    stepper.relay.flush();
    stepper.client_mut(A).receive();
    assert!(!stepper.client(A).shows(B));
    // B has not received A's leave yet
    assert!(stepper.client(B).shows(A));

    stepper.client_mut(B).receive();
    assert!(!stepper.client(B).shows(A));
    assert_eq!(stepper.client(A).calls_for(B), vec![false, true, false]);
    assert_eq!(stepper.client(B).calls_for(A), vec![false, true, false]);
    // B's own membership did not change
    assert!(
        stepper
            .client(A)
            .coordinator
            .store()
            .scenes_of(B)
            .contains("Lobby")
    );
}

/// The scene events are received before the avatar is spawned
#[test]
fn test_avatar_spawned_after_scene_events() {
    let mut stepper = PresenceStepper::with_clients(2);
    stepper.join(B, "X");
    stepper.join(A, "X");
    stepper.step();
    assert!(stepper.client(A).calls_for(B).is_empty());

    stepper.spawn_avatar(B);
    assert_eq!(stepper.client(A).calls_for(B), vec![true]);
}

#[test]
fn test_disconnected_participant_is_forgotten() {
    let mut stepper = PresenceStepper::with_clients(3);
    stepper.spawn_all_avatars();
    for id in [A, B, C] {
        stepper.join(id, "Lobby");
    }
    stepper.step();
    let calls_before = stepper.client(A).calls_for(C);
    assert_eq!(calls_before.last(), Some(&true));

    stepper.disconnect(C);
    stepper.step();
    for id in [A, B] {
        let client = stepper.client(id);
        assert!(!client.coordinator.store().contains(C));
        assert!(client.coordinator.store().scenes_of(C).is_empty());
        assert_eq!(client.coordinator.applied_visibility(C), None);
    }
    // no visibility call is made for a disconnected participant
    assert_eq!(stepper.client(A).calls_for(C), calls_before);

    // the local scene changes still work for the remaining clients
    stepper.leave(A, "Lobby");
    stepper.step();
    assert!(!stepper.client(A).shows(B));
    assert!(!stepper.client(B).shows(A));
}

/// Each scene change of the local client triggers a load or unload of that scene
#[test]
fn test_scene_requests_follow_local_changes() {
    let mut stepper = PresenceStepper::with_clients(2);
    stepper.join(A, "Lobby");
    stepper.join(A, "Lobby");
    stepper.join(B, "Tavern");
    stepper.leave(A, "Lobby");
    stepper.step();
    let requests: Vec<_> = stepper
        .client_mut(A)
        .coordinator
        .loader_mut()
        .drain_requests()
        .collect();
    assert_eq!(
        requests,
        vec![
            SceneRequest::Load(SceneName::from("Lobby")),
            SceneRequest::Unload(SceneName::from("Lobby"))
        ]
    );
    assert_eq!(
        stepper
            .client_mut(B)
            .coordinator
            .loader_mut()
            .drain_requests()
            .collect::<Vec<_>>(),
        vec![SceneRequest::Load(SceneName::from("Tavern"))]
    );
}

/// Ground truth of the scenes loaded by each participant
#[derive(Default)]
struct Model {
    scenes: HashMap<ParticipantId, HashSet<&'static str>>,
}

impl Model {
    fn overlaps(&self, a: ParticipantId, b: ParticipantId) -> bool {
        match (self.scenes.get(&a), self.scenes.get(&b)) {
            (Some(x), Some(y)) => x.intersection(y).next().is_some(),
            _ => false,
        }
    }
}

/// Publish random scene changes from every client, and deliver them with random interleavings
fn run_random_session(stepper: &mut PresenceStepper, rng: &mut StdRng, rounds: usize) -> Model {
    let ids: Vec<_> = stepper.clients.iter().map(|c| c.id).collect();
    let mut model = Model::default();
    for _ in 0..rounds {
        for _ in 0..rng.random_range(1..6) {
            let id = ids[rng.random_range(0..ids.len())];
            let scene = SCENES[rng.random_range(0..SCENES.len())];
            let scenes = model.scenes.entry(id).or_default();
            if rng.random_bool(0.6) {
                scenes.insert(scene);
                stepper.join(id, scene);
            } else {
                scenes.remove(scene);
                stepper.leave(id, scene);
            }
        }
        stepper.step_interleaved(rng);
    }
    model
}

#[test]
fn test_visibility_is_symmetric_and_derived() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut stepper = PresenceStepper::with_clients(4);
    stepper.spawn_all_avatars();
    let model = run_random_session(&mut stepper, &mut rng, 50);

    for a in &stepper.clients {
        for b in &stepper.clients {
            if a.id == b.id {
                continue;
            }
            assert_eq!(a.shows(b.id), b.shows(a.id), "{} and {}", a.id, b.id);
            assert_eq!(a.shows(b.id), model.overlaps(a.id, b.id));
            assert_eq!(a.shows(b.id), a.coordinator.is_visible(b.id));
        }
    }
}

#[test]
fn test_no_self_visibility_calls() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut stepper = PresenceStepper::with_clients(3);
    stepper.spawn_all_avatars();
    run_random_session(&mut stepper, &mut rng, 30);
    for client in &stepper.clients {
        assert!(client.calls_for(client.id).is_empty());
        assert!(!client.coordinator.is_visible(client.id));
    }
}

/// The same scene changes delivered with different interleavings lead to the same visibility
#[test]
fn test_interleaving_does_not_change_outcome() {
    let mut outcomes = Vec::new();
    for seed in [1, 2, 3] {
        let mut stepper = PresenceStepper::with_clients(3);
        stepper.spawn_all_avatars();
        for id in [A, B, C] {
            stepper.join(id, "Lobby");
        }
        stepper.join(A, "Tavern");
        stepper.join(B, "Tavern");
        stepper.leave(A, "Lobby");
        stepper.leave(C, "Lobby");
        stepper.join(C, "Cave");
        stepper.leave(B, "Lobby");
        stepper.step_interleaved(&mut StdRng::seed_from_u64(seed));

        let mut outcome = Vec::new();
        for a in [A, B, C] {
            for b in [A, B, C] {
                if a != b {
                    outcome.push(stepper.client(a).shows(b));
                }
            }
        }
        outcomes.push(outcome);
    }
    // A and B share the tavern, C is alone in the cave
    assert_eq!(outcomes[0], vec![true, false, true, false, false, false]);
    assert!(outcomes.iter().all(|o| *o == outcomes[0]));
}
