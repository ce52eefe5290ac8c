//! Configuration of the [`PresencePlugin`](crate::plugin::PresencePlugin)
use bevy_ecs::prelude::Resource;
use bevy_reflect::Reflect;
use copresence_core::id::SceneName;
use copresence_visibility::config::{CoordinatorConfig, SceneLoadConfig};
use serde::{Deserialize, Serialize};

#[derive(Resource, Clone, Debug, Default, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Scene that the local participant joins as soon as the session starts
    pub initial_scene: Option<SceneName>,
    pub coordinator: CoordinatorConfig,
    pub loading: SceneLoadConfig,
}
