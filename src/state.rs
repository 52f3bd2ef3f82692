//! State marker components.
//!
//! These components mirror the character's physical situation so gameplay
//! code can filter queries on them. They are added and removed by
//! [`sync_state_markers`](crate::systems::sync_state_markers) from the
//! sensor results in [`CharacterController`](crate::config::CharacterController).

use bevy::prelude::*;

use crate::detection::WallSide;

/// Marker component indicating the character is grounded.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// A wall is beside the character, high enough above the ground to run on.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TouchingWall {
    pub side: WallSide,
    /// Normal of the wall surface, pointing toward the character.
    pub normal: Vec3,
}

impl Default for TouchingWall {
    fn default() -> Self {
        Self {
            side: WallSide::Right,
            normal: Vec3::NEG_X,
        }
    }
}

impl TouchingWall {
    pub fn new(side: WallSide, normal: Vec3) -> Self {
        Self { side, normal }
    }

    pub fn is_left(&self) -> bool {
        self.side == WallSide::Left
    }

    pub fn is_right(&self) -> bool {
        self.side == WallSide::Right
    }
}
