//! Identifiers for participants and scenes
use alloc::string::String;
use core::borrow::Borrow;
use core::fmt::Formatter;
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};

/// Identifier of a participant in a shared session.
///
/// The id is assigned by the relay layer when the client connects; it is never generated locally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Reflect,
)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    pub fn to_bits(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ParticipantId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Participant({})", self.0)
    }
}

/// Name of a unit of loadable virtual content.
///
/// Scenes are compared by name only: two participants are in the same scene
/// if they have loaded a scene with the same name.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Reflect,
)]
pub struct SceneName(String);

impl SceneName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SceneName {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for SceneName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// `String` and `str` hash identically, so sets of `SceneName` can be queried with a `&str`
impl Borrow<str> for SceneName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SceneName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SceneName {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
