//! Configuration for the visibility coordinator and the scene load tracker
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};

/// What to do when a participant registers a second, different avatar
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum ConflictPolicy {
    /// Return a [`PresenceError`](crate::error::PresenceError) to the caller
    #[default]
    Reject,
    /// Log a warning and keep the first avatar
    KeepFirst,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub conflict_policy: ConflictPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLoadConfig {
    /// Progress (between 0.0 and 1.0) at which a scene load or unload is considered complete.
    ///
    /// Engines usually stop reporting progress at 0.9 until the scene is activated.
    pub activation_threshold: f32,
}

impl Default for SceneLoadConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.9,
        }
    }
}
