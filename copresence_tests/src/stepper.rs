use crate::relay::{LocalRelay, RelayMessage, RelayPayload};
use alloc::vec::Vec;
use copresence::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use rand::Rng;
use tracing::error;

/// Avatar handle used by the test clients: the id of the participant that the avatar represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvatarHandle(pub ParticipantId);

pub type TestCoordinator =
    VisibilityCoordinator<AvatarHandle, Vec<VisibilityChange<AvatarHandle>>, SceneLoadTracker>;

/// One client of the session, with its own replica of the membership
pub struct TestClient {
    pub id: ParticipantId,
    pub coordinator: TestCoordinator,
    sender: Sender<RelayMessage>,
    receiver: Receiver<RelayMessage>,
}

impl TestClient {
    fn publish(&self, payload: RelayPayload) {
        if self
            .sender
            .send(RelayMessage {
                from: self.id,
                payload,
            })
            .is_err()
        {
            error!(id = ?self.id, "could not publish to the relay");
        }
    }

    /// Apply every message delivered by the relay
    pub fn receive(&mut self) {
        for message in self.receiver.try_iter() {
            if let Err(e) = self.coordinator.handle(message.into_event()) {
                error!(id = ?self.id, "could not apply relayed event: {e}");
            }
        }
    }

    /// Whether this client currently shows the avatar of `other`
    pub fn shows(&self, other: ParticipantId) -> bool {
        self.coordinator.applied_visibility(other).unwrap_or(false)
    }

    /// Visibility calls made for the avatar of `other`
    pub fn calls_for(&self, other: ParticipantId) -> Vec<bool> {
        self.coordinator
            .sink()
            .iter()
            .filter(|c| c.participant == other)
            .map(|c| c.visible)
            .collect()
    }
}

/// Stepper with n clients connected through a [`LocalRelay`].
///
/// Scene changes are only applied when the relay delivers them back, including to the client
/// that produced them.
pub struct PresenceStepper {
    pub relay: LocalRelay,
    pub clients: Vec<TestClient>,
}

impl PresenceStepper {
    /// Create `n` clients with ids `1..=n`, without any avatar spawned
    pub fn with_clients(n: u64) -> Self {
        let mut relay = LocalRelay::default();
        let clients = (1..=n)
            .map(|i| {
                let id = ParticipantId(i);
                let (sender, receiver) = relay.connect(id);
                TestClient {
                    id,
                    coordinator: VisibilityCoordinator::new(
                        id,
                        Vec::new(),
                        SceneLoadTracker::default(),
                    ),
                    sender,
                    receiver,
                }
            })
            .collect();
        Self { relay, clients }
    }

    pub fn client(&self, id: ParticipantId) -> &TestClient {
        self.clients
            .iter()
            .find(|c| c.id == id)
            .expect("unknown client")
    }

    pub fn client_mut(&mut self, id: ParticipantId) -> &mut TestClient {
        self.clients
            .iter_mut()
            .find(|c| c.id == id)
            .expect("unknown client")
    }

    /// Spawn the avatar of `owner` on every other client
    pub fn spawn_avatar(&mut self, owner: ParticipantId) {
        for client in self.clients.iter_mut().filter(|c| c.id != owner) {
            client
                .coordinator
                .on_avatar_registered(owner, AvatarHandle(owner))
                .expect("avatar registered twice");
        }
    }

    /// Spawn the avatar of every client on every other client
    pub fn spawn_all_avatars(&mut self) {
        let ids: Vec<_> = self.clients.iter().map(|c| c.id).collect();
        for id in ids {
            self.spawn_avatar(id);
        }
    }

    pub fn join(&self, id: ParticipantId, scene: &str) {
        self.client(id).publish(RelayPayload::Join(SceneName::from(scene)));
    }

    pub fn leave(&self, id: ParticipantId, scene: &str) {
        self.client(id).publish(RelayPayload::Leave(SceneName::from(scene)));
    }

    /// Disconnect the client from the relay and drop it
    pub fn disconnect(&mut self, id: ParticipantId) {
        self.relay.disconnect(id);
        self.clients.retain(|c| c.id != id);
    }

    /// Deliver all pending messages in the order they were sent
    pub fn step(&mut self) {
        self.relay.flush();
        self.clients.iter_mut().for_each(TestClient::receive);
    }

    /// Deliver all pending messages, interleaving the different senders randomly
    pub fn step_interleaved(&mut self, rng: &mut impl Rng) {
        self.relay.flush_interleaved(rng);
        self.clients.iter_mut().for_each(TestClient::receive);
    }
}
