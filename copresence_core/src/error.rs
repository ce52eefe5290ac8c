//! Membership-related errors

use crate::id::ParticipantId;

pub type Result<T> = core::result::Result<T, MembershipError>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipError {
    /// A second, different avatar handle was registered for a participant that already has one
    #[error("participant {participant} already has a different avatar registered")]
    Conflict { participant: ParticipantId },
}
