//! Error types for the locomotion controller.

use crate::states::StateId;

/// Errors raised by the locomotion machine and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocomotionError {
    /// A sound was requested by name but never registered in the [`SoundBank`].
    ///
    /// Recoverable: the request is logged and skipped.
    ///
    /// [`SoundBank`]: crate::audio::SoundBank
    #[error("sound `{0}` is not registered")]
    MissingSound(String),

    /// A transition targeted a state the machine was not built with.
    ///
    /// This is an integration bug and is treated as fatal by the driving systems.
    #[error("state {0:?} is not registered with this locomotion machine")]
    UnregisteredState(StateId),
}
