/*! # Copresence

Copresence lets participants of a shared multiplayer session see each other only when they are in the same
virtual scene.

Each client keeps a replica of which scenes every participant has loaded. The avatar of a remote participant
is rendered for the local participant if the two of them share at least one loaded scene.

The networking is not handled here: the relay that connects the clients is expected to deliver the scene
events of every participant, in the order that participant produced them.
*/
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod plugin;

pub use copresence_core;
pub use copresence_visibility;

pub mod prelude {
    pub use copresence_core::prelude::*;
    pub use copresence_visibility::prelude::*;

    pub use crate::config::PresenceConfig;
    pub use crate::plugin::{
        AvatarVisibility, JoinScene, LeaveScene, OutgoingPresence, ParticipantDisconnected, Presence,
        PresenceAvatar, PresencePlugin, PresenceSystems, SceneChange, SceneJoined, SceneLeft,
        SceneLoadCompleted, SceneLoadRequest, SceneProgress, SessionEnded, SessionStarted,
    };
}
