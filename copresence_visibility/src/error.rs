//! Visibility-related errors

use copresence_core::error::MembershipError;

pub type Result<T> = core::result::Result<T, PresenceError>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceError {
    #[error(transparent)]
    Membership(#[from] MembershipError),
}
