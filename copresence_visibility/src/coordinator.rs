/*! Scene-based avatar visibility

# Visibility

A remote participant's avatar is visible to the local participant if and only if the two of them
share at least one loaded scene. Visibility is never stored as such: it is recomputed from the
current scene membership every time an event could have changed it, so the outcome only depends on
the final membership and not on the order in which participants' events were interleaved.

The [`VisibilityCoordinator`] is created once per session, from the perspective of the local participant:
- when the local participant joins or leaves a scene, every other participant can be affected
- when a remote participant joins or leaves a scene, only that participant can be affected

The avatar of a participant can be spawned after their first scene events were received: visibility
for that participant is then deferred until the avatar is registered.

```rust
# use copresence_core::prelude::*;
# use copresence_visibility::prelude::*;
let local = ParticipantId(1);
let remote = ParticipantId(2);
let mut coordinator: VisibilityCoordinator<u32, _, ()> =
    VisibilityCoordinator::new(local, Vec::<VisibilityChange<u32>>::new(), ());

coordinator.on_avatar_registered(remote, 7).unwrap();
coordinator.on_scene_join(local, SceneName::from("Lobby"));
coordinator.on_scene_join(remote, SceneName::from("Lobby"));
assert!(coordinator.is_visible(remote));
assert_eq!(coordinator.sink().last().map(|c| c.visible), Some(true));
```
*/
use bevy_platform::collections::HashMap;
use copresence_core::id::{ParticipantId, SceneName};
use copresence_core::membership::{MembershipStore, Registration};
use tracing::{debug, info, trace, warn};

use crate::config::{ConflictPolicy, CoordinatorConfig};
use crate::error::Result;
use crate::event::PresenceEvent;
use crate::sink::{AvatarVisibilitySink, SceneLoader};

/// Translates membership events into avatar visibility changes for one local participant.
///
/// `H` is the avatar handle, `S` the [`AvatarVisibilitySink`] and `L` the [`SceneLoader`].
#[derive(Debug)]
pub struct VisibilityCoordinator<H, S, L> {
    local: ParticipantId,
    config: CoordinatorConfig,
    store: MembershipStore<H>,
    /// Last visibility sent to the sink for each participant
    applied: HashMap<ParticipantId, bool>,
    sink: S,
    loader: L,
}

impl<H, S, L> VisibilityCoordinator<H, S, L>
where
    H: PartialEq,
    S: AvatarVisibilitySink<H>,
    L: SceneLoader,
{
    pub fn new(local: ParticipantId, sink: S, loader: L) -> Self {
        Self::with_config(local, sink, loader, CoordinatorConfig::default())
    }

    pub fn with_config(
        local: ParticipantId,
        sink: S,
        loader: L,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            local,
            config,
            store: MembershipStore::default(),
            applied: HashMap::default(),
            sink,
            loader,
        }
    }

    /// Apply any inbound [`PresenceEvent`]
    pub fn handle(&mut self, event: PresenceEvent<H>) -> Result<()> {
        match event {
            PresenceEvent::Join { actor, scene } => self.on_scene_join(actor, scene),
            PresenceEvent::Leave { actor, scene } => self.on_scene_leave(actor, scene),
            PresenceEvent::AvatarRegistered { actor, handle } => {
                return self.on_avatar_registered(actor, handle);
            }
            PresenceEvent::Disconnected { actor } => self.on_disconnected(actor),
        }
        Ok(())
    }

    pub fn on_scene_join(&mut self, actor: ParticipantId, scene: SceneName) {
        let joined = self.store.join(actor, scene.clone());
        if actor == self.local {
            if joined {
                info!(%scene, "begin loading scene");
                self.loader.begin_load(&scene);
            }
            self.refresh_all();
        } else {
            self.refresh(actor);
        }
    }

    pub fn on_scene_leave(&mut self, actor: ParticipantId, scene: SceneName) {
        let left = self.store.leave(actor, scene.as_str());
        if actor == self.local {
            if left {
                info!(%scene, "begin unloading scene");
                self.loader.begin_unload(&scene);
            }
            self.refresh_all();
        } else {
            self.refresh(actor);
        }
    }

    /// Associate the avatar of a participant, and immediately apply its current visibility
    pub fn on_avatar_registered(&mut self, actor: ParticipantId, handle: H) -> Result<()> {
        match self.store.register_avatar(actor, handle) {
            Ok(Registration::New) => self.refresh(actor),
            Ok(Registration::Unchanged) => {}
            Err(e) => match self.config.conflict_policy {
                ConflictPolicy::Reject => return Err(e.into()),
                ConflictPolicy::KeepFirst => {
                    warn!(?actor, "ignoring conflicting avatar registration, keeping the first avatar");
                }
            },
        }
        Ok(())
    }

    /// Forget everything about a participant.
    ///
    /// The sink is not called: the avatar is torn down by whoever handled the disconnection.
    /// If the local participant disconnects, the whole session state is cleared.
    pub fn on_disconnected(&mut self, actor: ParticipantId) {
        if actor == self.local {
            info!(participants = self.store.len(), "local participant disconnected, clearing session state");
            self.store.clear();
            self.applied.clear();
            return;
        }
        self.store.remove_participant(actor);
        self.applied.remove(&actor);
    }

    /// Recompute the visibility of every remote participant, from a snapshot of the known ids
    fn refresh_all(&mut self) {
        for participant in self.store.participant_ids() {
            self.refresh(participant);
        }
    }

    /// Recompute the visibility of one participant and notify the sink if it changed
    fn refresh(&mut self, participant: ParticipantId) {
        if participant == self.local {
            return;
        }
        let Some(avatar) = self.store.avatar_of(participant) else {
            trace!(?participant, "no avatar registered yet, deferring visibility");
            return;
        };
        let visible = self.store.overlaps(self.local, participant);
        if self.applied.get(&participant) == Some(&visible) {
            return;
        }
        debug!(?participant, visible, "avatar visibility changed");
        self.sink.set_visible(participant, avatar, visible);
        self.applied.insert(participant, visible);
    }
}

impl<H, S, L> VisibilityCoordinator<H, S, L> {
    pub fn local_id(&self) -> ParticipantId {
        self.local
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn store(&self) -> &MembershipStore<H> {
        &self.store
    }

    /// Returns true if the avatar of the participant should currently be rendered.
    ///
    /// The local participant is never visible to itself.
    pub fn is_visible(&self, participant: ParticipantId) -> bool {
        participant != self.local && self.store.overlaps(self.local, participant)
    }

    /// Last visibility that was sent to the sink for this participant
    pub fn applied_visibility(&self, participant: ParticipantId) -> Option<bool> {
        self.applied.get(&participant).copied()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PresenceError;
    use crate::loading::{SceneLoadTracker, SceneRequest};
    use crate::sink::VisibilityChange;
    use alloc::vec;
    use alloc::vec::Vec;
    use copresence_core::error::MembershipError;
    use test_log::test;

    const A: ParticipantId = ParticipantId(1);
    const B: ParticipantId = ParticipantId(2);
    const C: ParticipantId = ParticipantId(3);

    type TestCoordinator = VisibilityCoordinator<u32, Vec<VisibilityChange<u32>>, SceneLoadTracker>;

    fn coordinator(local: ParticipantId) -> TestCoordinator {
        VisibilityCoordinator::new(local, Vec::new(), SceneLoadTracker::default())
    }

    fn change(participant: ParticipantId, avatar: u32, visible: bool) -> VisibilityChange<u32> {
        VisibilityChange {
            participant,
            avatar,
            visible,
        }
    }

    fn scene(name: &str) -> SceneName {
        SceneName::from(name)
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(B, 20).unwrap();
        coordinator.on_scene_join(A, scene("Lobby"));
        coordinator.on_scene_join(A, scene("Lobby"));
        assert_eq!(coordinator.store().scenes_of(A).len(), 1);
        // the scene is only loaded once
        assert_eq!(
            coordinator.loader_mut().drain_requests().collect::<Vec<_>>(),
            vec![SceneRequest::Load(scene("Lobby"))]
        );
        // B was hidden once when registered, and never touched again
        assert_eq!(coordinator.sink(), &vec![change(B, 20, false)]);
    }

    /// A and B join the lobby, then A leaves it
    #[test]
    fn test_local_leave_hides_remote() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(B, 20).unwrap();
        coordinator.sink_mut().clear();

        coordinator.on_scene_join(A, scene("Lobby"));
        coordinator.on_scene_join(B, scene("Lobby"));
        assert_eq!(coordinator.sink(), &vec![change(B, 20, true)]);

        coordinator.on_scene_leave(A, scene("Lobby"));
        assert_eq!(
            coordinator.sink(),
            &vec![change(B, 20, true), change(B, 20, false)]
        );
        assert!(!coordinator.is_visible(B));
        assert_eq!(
            coordinator.loader_mut().drain_requests().collect::<Vec<_>>(),
            vec![
                SceneRequest::Load(scene("Lobby")),
                SceneRequest::Unload(scene("Lobby"))
            ]
        );
    }

    /// B is in two scenes shared with A; leaving one of them keeps B visible
    #[test]
    fn test_remote_leave_with_remaining_overlap() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(B, 20).unwrap();
        for name in ["Lobby", "Tavern"] {
            coordinator.on_scene_join(A, scene(name));
            coordinator.on_scene_join(B, scene(name));
        }
        coordinator.sink_mut().clear();

        coordinator.on_scene_leave(B, scene("Lobby"));
        assert!(coordinator.sink().is_empty());
        assert!(coordinator.is_visible(B));

        coordinator.on_scene_leave(B, scene("Tavern"));
        assert_eq!(coordinator.sink(), &vec![change(B, 20, false)]);
    }

    /// Only the participant whose scenes changed is recomputed
    #[test]
    fn test_remote_join_only_affects_actor() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(B, 20).unwrap();
        coordinator.on_avatar_registered(C, 30).unwrap();
        coordinator.on_scene_join(A, scene("Lobby"));
        coordinator.sink_mut().clear();

        coordinator.on_scene_join(C, scene("Lobby"));
        assert_eq!(coordinator.sink(), &vec![change(C, 30, true)]);
        assert_eq!(coordinator.applied_visibility(B), Some(false));
    }

    #[test]
    fn test_deferred_registration_heals() {
        let mut coordinator = coordinator(A);
        coordinator.on_scene_join(B, scene("X"));
        coordinator.on_scene_join(A, scene("X"));
        assert!(coordinator.sink().is_empty());
        assert_eq!(coordinator.applied_visibility(B), None);

        coordinator
            .handle(PresenceEvent::AvatarRegistered { actor: B, handle: 20 })
            .unwrap();
        assert_eq!(coordinator.sink(), &vec![change(B, 20, true)]);
    }

    #[test]
    fn test_never_notifies_local_participant() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(A, 10).unwrap();
        coordinator.on_avatar_registered(B, 20).unwrap();
        coordinator.on_scene_join(A, scene("Lobby"));
        coordinator.on_scene_join(B, scene("Lobby"));
        coordinator.on_scene_leave(A, scene("Lobby"));
        assert!(coordinator.sink().iter().all(|c| c.participant != A));
        assert!(!coordinator.is_visible(A));
        assert_eq!(coordinator.applied_visibility(A), None);
    }

    #[test]
    fn test_conflicting_registration_rejected() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(B, 20).unwrap();
        assert_eq!(coordinator.on_avatar_registered(B, 20), Ok(()));
        assert_eq!(
            coordinator.on_avatar_registered(B, 21),
            Err(PresenceError::Membership(MembershipError::Conflict { participant: B }))
        );
        assert_eq!(coordinator.store().avatar_of(B), Some(&20));
    }

    #[test]
    fn test_conflicting_registration_keep_first() {
        let mut coordinator: VisibilityCoordinator<u32, _, ()> = VisibilityCoordinator::with_config(
            A,
            Vec::<VisibilityChange<u32>>::new(),
            (),
            CoordinatorConfig {
                conflict_policy: ConflictPolicy::KeepFirst,
            },
        );
        coordinator.on_avatar_registered(B, 20).unwrap();
        assert_eq!(coordinator.on_avatar_registered(B, 21), Ok(()));
        assert_eq!(coordinator.store().avatar_of(B), Some(&20));
        assert_eq!(coordinator.sink().len(), 1);
    }

    #[test]
    fn test_disconnect_clears_bookkeeping_without_sink_call() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(B, 20).unwrap();
        coordinator.on_scene_join(A, scene("Lobby"));
        coordinator.on_scene_join(B, scene("Lobby"));
        let calls = coordinator.sink().len();

        coordinator.handle(PresenceEvent::Disconnected { actor: B }).unwrap();
        coordinator.handle(PresenceEvent::Disconnected { actor: B }).unwrap();
        assert_eq!(coordinator.sink().len(), calls);
        assert!(coordinator.store().scenes_of(B).is_empty());
        assert_eq!(coordinator.applied_visibility(B), None);

        // a participant reconnecting with the same id starts from scratch
        coordinator.on_scene_join(B, scene("Lobby"));
        coordinator.on_avatar_registered(B, 21).unwrap();
        assert_eq!(coordinator.sink().last(), Some(&change(B, 21, true)));
    }

    #[test]
    fn test_registered_then_disconnected_before_joining() {
        let mut coordinator = coordinator(B);
        coordinator.on_avatar_registered(A, 10).unwrap();
        coordinator.on_disconnected(A);
        coordinator.on_disconnected(A);
        assert!(coordinator.store().scenes_of(A).is_empty());
        assert!(!coordinator.store().contains(A));
    }

    #[test]
    fn test_local_disconnect_clears_session() {
        let mut coordinator = coordinator(A);
        coordinator.on_avatar_registered(B, 20).unwrap();
        coordinator.on_scene_join(A, scene("Lobby"));
        coordinator.on_scene_join(B, scene("Lobby"));
        coordinator.on_disconnected(A);
        assert!(coordinator.store().is_empty());
        assert_eq!(coordinator.applied_visibility(B), None);
    }

    #[test]
    fn test_leave_unknown_scene_is_noop() {
        let mut coordinator = coordinator(A);
        coordinator.on_scene_leave(A, scene("Lobby"));
        coordinator.on_scene_leave(B, scene("Lobby"));
        assert_eq!(coordinator.loader_mut().drain_requests().count(), 0);
        assert!(coordinator.sink().is_empty());
    }
}
