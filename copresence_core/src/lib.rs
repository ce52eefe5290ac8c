/*! # Copresence Core

Identifiers and the scene membership store shared by the copresence crates.
*/
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod id;
pub mod membership;

pub mod prelude {
    pub use crate::error::MembershipError;
    pub use crate::id::{ParticipantId, SceneName};
    pub use crate::membership::{MembershipStore, Participant, Registration, SceneSet};
}
