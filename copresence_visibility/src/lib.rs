/*! # Copresence Visibility

Shows or hides the avatars of remote participants depending on whether they share a loaded scene
with the local participant.
*/
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod loading;
pub mod sink;

pub mod prelude {
    pub use crate::config::{ConflictPolicy, CoordinatorConfig, SceneLoadConfig};
    pub use crate::coordinator::VisibilityCoordinator;
    pub use crate::error::PresenceError;
    pub use crate::event::PresenceEvent;
    pub use crate::loading::{
        SceneLoadCompletion, SceneLoadState, SceneLoadTracker, SceneOperation, SceneRequest,
    };
    pub use crate::sink::{AvatarVisibilitySink, SceneLoader, VisibilityChange};
}
