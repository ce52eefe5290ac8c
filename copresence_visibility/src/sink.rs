//! Output hooks called by the [`VisibilityCoordinator`](crate::coordinator::VisibilityCoordinator)
use alloc::vec::Vec;
use copresence_core::id::{ParticipantId, SceneName};

/// Toggles whether the avatar of a remote participant is rendered for the local participant.
///
/// Implementations must tolerate repeated identical calls, even though the coordinator
/// only calls the sink when the visibility actually changes.
pub trait AvatarVisibilitySink<H> {
    fn set_visible(&mut self, participant: ParticipantId, avatar: &H, visible: bool);
}

/// Performs the actual loading and unloading of scenes for the local participant.
///
/// Both calls are fire-and-forget: the coordinator never waits for the load to complete.
pub trait SceneLoader {
    fn begin_load(&mut self, scene: &SceneName);

    fn begin_unload(&mut self, scene: &SceneName);
}

/// Loader that ignores every request, for hosts that load scenes on their own
impl SceneLoader for () {
    fn begin_load(&mut self, _: &SceneName) {}

    fn begin_unload(&mut self, _: &SceneName) {}
}

/// A visibility change emitted by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityChange<H> {
    pub participant: ParticipantId,
    pub avatar: H,
    pub visible: bool,
}

/// Buffers the changes so that they can be applied later, outside of the coordinator
impl<H: Clone> AvatarVisibilitySink<H> for Vec<VisibilityChange<H>> {
    fn set_visible(&mut self, participant: ParticipantId, avatar: &H, visible: bool) {
        self.push(VisibilityChange {
            participant,
            avatar: avatar.clone(),
            visible,
        });
    }
}
