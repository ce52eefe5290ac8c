/*! Bevy integration of the scene presence

# Presence

The [`PresencePlugin`] keeps one [`VisibilityCoordinator`] per session, stored in the [`Presence`] resource.
The resource only exists while a session is running: it is created when [`SessionStarted`] is triggered
and dropped when [`SessionEnded`] is triggered, so every session starts from an empty membership.

Inputs are triggered as events:
- [`JoinScene`]/[`LeaveScene`] when the local participant wants to load or unload a scene. The change is
  applied locally and written as an [`OutgoingPresence`] message, that the relay should broadcast to the other
  participants
- [`SceneJoined`]/[`SceneLeft`]/[`ParticipantDisconnected`] when the relay delivers a notification from
  another participant. Scene notifications that the relay echoes back for the local participant are ignored
- [`SceneProgress`] when the engine reports the loading progress of a scene

Avatars are registered by adding a [`PresenceAvatar`] component to the entity representing the participant.
The plugin then keeps the [`AvatarVisibility`] component of that entity up to date; rendering the avatar
(or not) according to that component is left to the app.

```rust,no_run
# use bevy_app::App;
# use copresence::prelude::*;
let mut app = App::new();
app.add_plugins(PresencePlugin::default());

app.world_mut().trigger(SessionStarted { local: ParticipantId(1) });
app.world_mut().spawn(PresenceAvatar { participant: ParticipantId(2) });
app.world_mut().trigger(JoinScene { scene: SceneName::from("Lobby") });
app.world_mut().trigger(SceneJoined { participant: ParticipantId(2), scene: SceneName::from("Lobby") });
app.update();
```
*/
use alloc::vec::Vec;
use bevy_app::{App, Plugin, PostUpdate};
use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
use copresence_core::id::{ParticipantId, SceneName};
use copresence_visibility::coordinator::VisibilityCoordinator;
use copresence_visibility::loading::{
    SceneLoadCompletion, SceneLoadTracker, SceneOperation, SceneRequest,
};
use copresence_visibility::sink::VisibilityChange;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

use crate::config::PresenceConfig;

pub type PresenceCoordinator =
    VisibilityCoordinator<Entity, Vec<VisibilityChange<Entity>>, SceneLoadTracker>;

/// Presence state of the current session, from the point of view of the local participant
#[derive(Resource, Debug)]
pub struct Presence {
    coordinator: PresenceCoordinator,
}

impl Presence {
    pub fn new(local: ParticipantId, config: &PresenceConfig) -> Self {
        Self {
            coordinator: VisibilityCoordinator::with_config(
                local,
                Vec::new(),
                SceneLoadTracker::new(config.loading),
                config.coordinator,
            ),
        }
    }

    pub fn local_id(&self) -> ParticipantId {
        self.coordinator.local_id()
    }

    pub fn coordinator(&self) -> &PresenceCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut PresenceCoordinator {
        &mut self.coordinator
    }
}

/// Marks an entity as the avatar of a participant.
///
/// The avatar of a participant cannot be changed once registered.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct PresenceAvatar {
    pub participant: ParticipantId,
}

/// Whether the avatar should be rendered for the local participant.
///
/// Inserted on [`PresenceAvatar`] entities by the plugin.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct AvatarVisibility {
    pub visible: bool,
}

/// Trigger to start a presence session, once the relay assigned an id to the local participant
#[derive(Event, Debug, Clone, Copy)]
pub struct SessionStarted {
    pub local: ParticipantId,
}

/// Trigger to end the presence session and drop all its state
#[derive(Event, Debug, Clone, Copy)]
pub struct SessionEnded;

/// Trigger for the local participant to load a scene
#[derive(Event, Debug, Clone)]
pub struct JoinScene {
    pub scene: SceneName,
}

/// Trigger for the local participant to unload a scene
#[derive(Event, Debug, Clone)]
pub struct LeaveScene {
    pub scene: SceneName,
}

/// A participant loaded a scene (delivered by the relay)
#[derive(Event, Debug, Clone)]
pub struct SceneJoined {
    pub participant: ParticipantId,
    pub scene: SceneName,
}

/// A participant unloaded a scene (delivered by the relay)
#[derive(Event, Debug, Clone)]
pub struct SceneLeft {
    pub participant: ParticipantId,
    pub scene: SceneName,
}

/// A participant left the session
#[derive(Event, Debug, Clone, Copy)]
pub struct ParticipantDisconnected {
    pub participant: ParticipantId,
}

/// Loading or unloading progress of a scene, reported by the engine
#[derive(Event, Debug, Clone)]
pub struct SceneProgress {
    pub scene: SceneName,
    pub operation: SceneOperation,
    pub progress: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub enum SceneChange {
    Joined,
    Left,
}

/// Scene change of the local participant, that must be broadcast to every other participant
#[derive(Message, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingPresence {
    pub participant: ParticipantId,
    pub scene: SceneName,
    pub change: SceneChange,
}

/// Scene that the engine should start loading or unloading
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct SceneLoadRequest(pub SceneRequest);

#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct SceneLoadCompleted(pub SceneLoadCompletion);

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum PresenceSystems {
    // PostUpdate
    /// Apply the visibility changes to the avatars and send the scene requests to the engine
    Apply,
}

/// Plugin that handles the scene presence of the local participant
#[derive(Default, Clone)]
pub struct PresencePlugin {
    pub config: PresenceConfig,
}

impl PresencePlugin {
    fn start_session(
        trigger: On<SessionStarted>,
        config: Res<PresenceConfig>,
        existing: Option<Res<Presence>>,
        avatars: Query<(Entity, &PresenceAvatar)>,
        mut outgoing: MessageWriter<OutgoingPresence>,
        mut commands: Commands,
    ) {
        let local = trigger.local;
        if existing.is_some() {
            warn!(?local, "a presence session was already running, replacing it");
        }
        info!(?local, "presence session started");
        let mut presence = Presence::new(local, &config);
        // avatars spawned before the session started
        for (entity, avatar) in avatars.iter() {
            if let Err(e) = presence
                .coordinator
                .on_avatar_registered(avatar.participant, entity)
            {
                error!(?entity, "could not register avatar: {e}");
            }
        }
        if let Some(scene) = config.initial_scene.clone() {
            presence.coordinator.on_scene_join(local, scene.clone());
            outgoing.write(OutgoingPresence {
                participant: local,
                scene,
                change: SceneChange::Joined,
            });
        }
        commands.insert_resource(presence);
    }

    fn end_session(_: On<SessionEnded>, mut commands: Commands) {
        info!("presence session ended");
        commands.remove_resource::<Presence>();
    }

    fn register_avatar(
        trigger: On<Add, PresenceAvatar>,
        query: Query<&PresenceAvatar>,
        presence: Option<ResMut<Presence>>,
    ) {
        let Some(mut presence) = presence else {
            trace!(entity = ?trigger.entity, "avatar will be registered when the session starts");
            return;
        };
        let Ok(avatar) = query.get(trigger.entity) else {
            return;
        };
        if let Err(e) = presence
            .coordinator
            .on_avatar_registered(avatar.participant, trigger.entity)
        {
            error!(entity = ?trigger.entity, "could not register avatar: {e}");
        }
    }

    fn join_scene(
        trigger: On<JoinScene>,
        presence: Option<ResMut<Presence>>,
        mut outgoing: MessageWriter<OutgoingPresence>,
    ) {
        let Some(mut presence) = presence else {
            warn!(scene = %trigger.scene, "cannot join a scene outside of a session");
            return;
        };
        let local = presence.local_id();
        presence.coordinator.on_scene_join(local, trigger.scene.clone());
        outgoing.write(OutgoingPresence {
            participant: local,
            scene: trigger.scene.clone(),
            change: SceneChange::Joined,
        });
    }

    fn leave_scene(
        trigger: On<LeaveScene>,
        presence: Option<ResMut<Presence>>,
        mut outgoing: MessageWriter<OutgoingPresence>,
    ) {
        let Some(mut presence) = presence else {
            warn!(scene = %trigger.scene, "cannot leave a scene outside of a session");
            return;
        };
        let local = presence.local_id();
        presence.coordinator.on_scene_leave(local, trigger.scene.clone());
        outgoing.write(OutgoingPresence {
            participant: local,
            scene: trigger.scene.clone(),
            change: SceneChange::Left,
        });
    }

    fn scene_joined(trigger: On<SceneJoined>, presence: Option<ResMut<Presence>>) {
        let Some(mut presence) = presence else {
            warn!(participant = ?trigger.participant, "dropping scene notification received outside of a session");
            return;
        };
        // the local membership is only changed by JoinScene/LeaveScene
        if trigger.participant == presence.local_id() {
            trace!(scene = %trigger.scene, "ignoring relayed join of the local participant");
            return;
        }
        presence
            .coordinator
            .on_scene_join(trigger.participant, trigger.scene.clone());
    }

    fn scene_left(trigger: On<SceneLeft>, presence: Option<ResMut<Presence>>) {
        let Some(mut presence) = presence else {
            warn!(participant = ?trigger.participant, "dropping scene notification received outside of a session");
            return;
        };
        if trigger.participant == presence.local_id() {
            trace!(scene = %trigger.scene, "ignoring relayed leave of the local participant");
            return;
        }
        presence
            .coordinator
            .on_scene_leave(trigger.participant, trigger.scene.clone());
    }

    fn participant_disconnected(
        trigger: On<ParticipantDisconnected>,
        presence: Option<ResMut<Presence>>,
    ) {
        if let Some(mut presence) = presence {
            presence.coordinator.on_disconnected(trigger.participant);
        }
    }

    fn scene_progress(
        trigger: On<SceneProgress>,
        presence: Option<ResMut<Presence>>,
        mut completed: MessageWriter<SceneLoadCompleted>,
    ) {
        let Some(mut presence) = presence else {
            return;
        };
        if let Some(completion) = presence
            .coordinator
            .loader_mut()
            .report_progress(trigger.scene.as_str(), trigger.operation, trigger.progress)
        {
            completed.write(SceneLoadCompleted(completion));
        }
    }

    /// Write the buffered visibility changes on the avatar entities, and hand the scene requests to the engine
    fn apply(
        presence: Option<ResMut<Presence>>,
        mut requests: MessageWriter<SceneLoadRequest>,
        mut commands: Commands,
    ) {
        let Some(mut presence) = presence else {
            return;
        };
        if presence.coordinator.sink().is_empty()
            && presence.coordinator.loader().pending_requests().is_empty()
        {
            return;
        }
        let coordinator = &mut presence.coordinator;
        for change in coordinator.sink_mut().drain(..) {
            trace!(participant = ?change.participant, visible = change.visible, "apply avatar visibility");
            commands.entity(change.avatar).try_insert(AvatarVisibility {
                visible: change.visible,
            });
        }
        requests.write_batch(coordinator.loader_mut().drain_requests().map(SceneLoadRequest));
    }
}

impl Plugin for PresencePlugin {
    fn build(&self, app: &mut App) {
        // REFLECT
        app.register_type::<PresenceAvatar>()
            .register_type::<AvatarVisibility>()
            .register_type::<PresenceConfig>();
        // RESOURCES
        app.insert_resource(self.config.clone());
        // MESSAGES
        app.add_message::<OutgoingPresence>()
            .add_message::<SceneLoadRequest>()
            .add_message::<SceneLoadCompleted>();
        // OBSERVERS
        app.add_observer(Self::start_session);
        app.add_observer(Self::end_session);
        app.add_observer(Self::register_avatar);
        app.add_observer(Self::join_scene);
        app.add_observer(Self::leave_scene);
        app.add_observer(Self::scene_joined);
        app.add_observer(Self::scene_left);
        app.add_observer(Self::participant_disconnected);
        app.add_observer(Self::scene_progress);
        // SYSTEMS
        app.configure_sets(PostUpdate, PresenceSystems::Apply);
        app.add_systems(PostUpdate, Self::apply.in_set(PresenceSystems::Apply));
    }
}
