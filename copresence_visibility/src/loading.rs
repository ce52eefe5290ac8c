//! Tracks the scenes that the local participant is loading or unloading
use alloc::vec::Vec;
use bevy_platform::collections::HashMap;
use copresence_core::id::SceneName;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::config::SceneLoadConfig;
use crate::sink::SceneLoader;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneLoadState {
    Loading { progress: f32 },
    Loaded,
    Unloading { progress: f32 },
}

/// Request for the host engine to load or unload a scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneRequest {
    Load(SceneName),
    Unload(SceneName),
}

impl SceneRequest {
    pub fn scene(&self) -> &SceneName {
        match self {
            SceneRequest::Load(scene) | SceneRequest::Unload(scene) => scene,
        }
    }

    pub fn operation(&self) -> SceneOperation {
        match self {
            SceneRequest::Load(_) => SceneOperation::Load,
            SceneRequest::Unload(_) => SceneOperation::Unload,
        }
    }
}

/// Kind of operation that the engine reports progress for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneOperation {
    Load,
    Unload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneLoadCompletion {
    Loaded(SceneName),
    Unloaded(SceneName),
}

/// [`SceneLoader`] that buffers the requests for the host engine and tracks their progress.
///
/// The engine drains the requests with [`drain_requests`](Self::drain_requests) and reports
/// progress back with [`report_progress`](Self::report_progress).
/// Avatar visibility is never gated on the completion of a load.
#[derive(Debug, Default)]
pub struct SceneLoadTracker {
    config: SceneLoadConfig,
    scenes: HashMap<SceneName, SceneLoadState>,
    requests: Vec<SceneRequest>,
}

impl SceneLoadTracker {
    pub fn new(config: SceneLoadConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self, scene: &str) -> Option<SceneLoadState> {
        self.scenes.get(scene).copied()
    }

    pub fn is_loaded(&self, scene: &str) -> bool {
        matches!(self.state(scene), Some(SceneLoadState::Loaded))
    }

    /// Requests that have not been handed to the engine yet
    pub fn pending_requests(&self) -> &[SceneRequest] {
        &self.requests
    }

    pub fn drain_requests(&mut self) -> impl Iterator<Item = SceneRequest> + '_ {
        self.requests.drain(..)
    }

    /// Update the progress of the load or unload of a scene.
    ///
    /// Returns the completion once the progress reaches the activation threshold.
    /// Progress for scenes that are not being tracked is ignored, and so is progress for an operation
    /// that was superseded (e.g. the unload of a scene that was joined again before it completed).
    pub fn report_progress(
        &mut self,
        scene: &str,
        operation: SceneOperation,
        progress: f32,
    ) -> Option<SceneLoadCompletion> {
        let progress = progress.clamp(0.0, 1.0);
        let threshold = self.config.activation_threshold;
        let Some(state) = self.scenes.get_mut(scene) else {
            trace!(scene, "ignoring progress for untracked scene");
            return None;
        };
        let current = match (state, operation) {
            (SceneLoadState::Loading { progress: current }, SceneOperation::Load)
            | (SceneLoadState::Unloading { progress: current }, SceneOperation::Unload) => current,
            (state, _) => {
                trace!(scene, ?operation, ?state, "ignoring progress of a superseded operation");
                return None;
            }
        };
        trace!(scene, ?operation, progress, "scene progress");
        *current = progress;
        if progress < threshold {
            return None;
        }
        let name = SceneName::from(scene);
        match operation {
            SceneOperation::Load => {
                info!(%name, "scene loaded");
                self.scenes.insert(name.clone(), SceneLoadState::Loaded);
                Some(SceneLoadCompletion::Loaded(name))
            }
            SceneOperation::Unload => {
                info!(%name, "scene unloaded");
                self.scenes.remove(scene);
                Some(SceneLoadCompletion::Unloaded(name))
            }
        }
    }
}

impl SceneLoader for SceneLoadTracker {
    fn begin_load(&mut self, scene: &SceneName) {
        if matches!(
            self.scenes.get(scene.as_str()),
            Some(SceneLoadState::Loading { .. } | SceneLoadState::Loaded)
        ) {
            trace!(%scene, "scene is already loading");
            return;
        }
        self.scenes
            .insert(scene.clone(), SceneLoadState::Loading { progress: 0.0 });
        self.requests.push(SceneRequest::Load(scene.clone()));
    }

    fn begin_unload(&mut self, scene: &SceneName) {
        if matches!(
            self.scenes.get(scene.as_str()),
            Some(SceneLoadState::Unloading { .. })
        ) {
            trace!(%scene, "scene is already unloading");
            return;
        }
        self.scenes
            .insert(scene.clone(), SceneLoadState::Unloading { progress: 0.0 });
        self.requests.push(SceneRequest::Unload(scene.clone()));
    }
}
