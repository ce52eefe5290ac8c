//! Inbound membership events
use copresence_core::id::{ParticipantId, SceneName};
use serde::{Deserialize, Serialize};

/// Event delivered to the [`VisibilityCoordinator`](crate::coordinator::VisibilityCoordinator),
/// either produced locally or relayed from a remote participant.
///
/// Events concerning a single participant must be delivered in the order that participant generated them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresenceEvent<H> {
    /// The actor loaded a scene
    Join { actor: ParticipantId, scene: SceneName },
    /// The actor unloaded a scene
    Leave { actor: ParticipantId, scene: SceneName },
    /// The avatar of the actor was spawned locally
    AvatarRegistered { actor: ParticipantId, handle: H },
    /// The actor left the session
    Disconnected { actor: ParticipantId },
}

impl<H> PresenceEvent<H> {
    pub fn actor(&self) -> ParticipantId {
        match self {
            PresenceEvent::Join { actor, .. }
            | PresenceEvent::Leave { actor, .. }
            | PresenceEvent::AvatarRegistered { actor, .. }
            | PresenceEvent::Disconnected { actor } => *actor,
        }
    }
}
