/*! Scene membership store

# Membership

Every client keeps a replica of which scenes each participant of the session currently has loaded,
along with a handle to the avatar that represents that participant locally.

Two participants *overlap* if they share at least one loaded scene. The store only records membership:
deciding what to do with an overlap (showing or hiding an avatar) is done by the visibility coordinator.

```rust
# use copresence_core::prelude::*;
let mut store = MembershipStore::<u32>::default();
store.join(ParticipantId(1), SceneName::from("Lobby"));
store.join(ParticipantId(2), SceneName::from("Lobby"));
assert!(store.overlaps(ParticipantId(1), ParticipantId(2)));

store.leave(ParticipantId(1), "Lobby");
assert!(!store.overlaps(ParticipantId(1), ParticipantId(2)));
```
*/
use alloc::vec::Vec;
use bevy_platform::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::error::{MembershipError, Result};
use crate::id::{ParticipantId, SceneName};

/// One connected client of the session, as seen by the local replica
#[derive(Debug, Clone)]
pub struct Participant<H> {
    scenes: HashSet<SceneName>,
    /// Set once when the avatar is first associated with the participant, immutable afterwards
    avatar: Option<H>,
}

impl<H> Default for Participant<H> {
    fn default() -> Self {
        Self {
            scenes: HashSet::default(),
            avatar: None,
        }
    }
}

impl<H> Participant<H> {
    pub fn scenes(&self) -> &HashSet<SceneName> {
        &self.scenes
    }

    pub fn avatar(&self) -> Option<&H> {
        self.avatar.as_ref()
    }
}

/// Outcome of a successful [`MembershipStore::register_avatar`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The handle was stored for the first time
    New,
    /// The same handle was already registered
    Unchanged,
}

/// Read-only view of the scenes loaded by a participant.
///
/// Unknown participants are viewed as having no scenes loaded.
#[derive(Debug, Clone, Copy)]
pub struct SceneSet<'a>(Option<&'a HashSet<SceneName>>);

impl<'a> SceneSet<'a> {
    pub fn contains(&self, scene: &str) -> bool {
        self.0.is_some_and(|s| s.contains(scene))
    }

    pub fn len(&self) -> usize {
        self.0.map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a SceneName> + 'a {
        self.0.into_iter().flat_map(|s| s.iter())
    }
}

/// Per-client replica of the scene membership of every participant in the session.
///
/// `H` is the opaque handle used to reach the avatar of a participant.
#[derive(Debug, Clone)]
pub struct MembershipStore<H> {
    participants: HashMap<ParticipantId, Participant<H>>,
}

impl<H> Default for MembershipStore<H> {
    fn default() -> Self {
        Self {
            participants: HashMap::default(),
        }
    }
}

impl<H: PartialEq> MembershipStore<H> {
    /// Associate an avatar handle with a participant, creating the participant if needed.
    ///
    /// Registering the same handle twice is a no-op; registering a different handle returns
    /// a [`MembershipError::Conflict`] and keeps the first one.
    pub fn register_avatar(&mut self, participant: ParticipantId, handle: H) -> Result<Registration> {
        let entry = self.participants.entry(participant).or_default();
        if let Some(existing) = &entry.avatar {
            return if *existing == handle {
                Ok(Registration::Unchanged)
            } else {
                Err(MembershipError::Conflict { participant })
            };
        }
        trace!(?participant, "registered avatar");
        entry.avatar = Some(handle);
        Ok(Registration::New)
    }
}

impl<H> MembershipStore<H> {
    /// Add a scene to the participant's loaded scenes.
    ///
    /// Returns `true` if the scene was not already loaded by that participant.
    pub fn join(&mut self, participant: ParticipantId, scene: SceneName) -> bool {
        let inserted = self
            .participants
            .entry(participant)
            .or_default()
            .scenes
            .insert(scene);
        trace!(?participant, inserted, "join scene");
        inserted
    }

    /// Remove a scene from the participant's loaded scenes.
    ///
    /// Returns `true` if the scene was loaded. The participant is kept even if it has no scenes left.
    pub fn leave(&mut self, participant: ParticipantId, scene: &str) -> bool {
        let removed = self
            .participants
            .get_mut(&participant)
            .is_some_and(|p| p.scenes.remove(scene));
        trace!(?participant, removed, "leave scene");
        removed
    }

    /// Remove every record of the participant (on disconnect)
    pub fn remove_participant(&mut self, participant: ParticipantId) -> Option<Participant<H>> {
        let removed = self.participants.remove(&participant);
        if removed.is_some() {
            debug!(?participant, "removed participant from membership store");
        }
        removed
    }

    pub fn scenes_of(&self, participant: ParticipantId) -> SceneSet<'_> {
        SceneSet(self.participants.get(&participant).map(|p| &p.scenes))
    }

    pub fn avatar_of(&self, participant: ParticipantId) -> Option<&H> {
        self.participants.get(&participant).and_then(|p| p.avatar.as_ref())
    }

    pub fn get(&self, participant: ParticipantId) -> Option<&Participant<H>> {
        self.participants.get(&participant)
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.participants.contains_key(&participant)
    }

    /// Snapshot of the ids of every known participant
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    /// Scenes loaded by both participants
    pub fn shared_scenes(
        &self,
        a: ParticipantId,
        b: ParticipantId,
    ) -> impl Iterator<Item = &SceneName> + '_ {
        let (small, large) = self.ordered_by_size(a, b);
        small
            .into_iter()
            .flat_map(|s| s.iter())
            .filter(move |scene| large.is_some_and(|l| l.contains(*scene)))
    }

    /// Returns true if the two participants share at least one loaded scene
    pub fn overlaps(&self, a: ParticipantId, b: ParticipantId) -> bool {
        self.shared_scenes(a, b).next().is_some()
    }

    fn ordered_by_size(
        &self,
        a: ParticipantId,
        b: ParticipantId,
    ) -> (Option<&HashSet<SceneName>>, Option<&HashSet<SceneName>>) {
        let a = self.participants.get(&a).map(|p| &p.scenes);
        let b = self.participants.get(&b).map(|p| &p.scenes);
        match (a, b) {
            (Some(x), Some(y)) if x.len() > y.len() => (b, a),
            _ => (a, b),
        }
    }
}
