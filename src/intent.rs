//! Movement intent component.
//!
//! The host's input layer writes a snapshot of the player's wishes every frame.
//! The controller derives press and release edges from consecutive snapshots,
//! so callers only ever deal in "is the button held" booleans.

use bevy::prelude::*;

/// Snapshot of player input for one frame.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_direction(Vec3::new(0.0, 0.0, 2.0));
/// assert_eq!(intent.direction, Vec3::Z);
///
/// intent.set_jump_pressed(true);
/// let edges = intent.take_edges();
/// assert!(edges.jump_pressed);
///
/// // Still held next frame: no new edge.
/// assert!(!intent.take_edges().jump_pressed);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Local movement direction: x right, y up, z forward. Components in `[-1, 1]`.
    pub direction: Vec3,
    pub sprint: bool,
    pub jump: bool,
    pub crouch: bool,
    pub grapple: bool,
    /// Previous frame's button states, managed by the controller.
    pub(crate) previous: ButtonSnapshot,
}

/// Button states used for edge detection.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ButtonSnapshot {
    jump: bool,
    crouch: bool,
    grapple: bool,
}

/// Press and release edges for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentEdges {
    pub jump_pressed: bool,
    pub jump_released: bool,
    pub crouch_pressed: bool,
    pub crouch_released: bool,
    pub grapple_pressed: bool,
}

impl MovementIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the local movement direction, clamping each axis to `[-1, 1]`.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.clamp(Vec3::splat(-1.0), Vec3::splat(1.0));
    }

    pub fn set_sprint(&mut self, held: bool) {
        self.sprint = held;
    }

    pub fn set_jump_pressed(&mut self, held: bool) {
        self.jump = held;
    }

    pub fn set_crouch_pressed(&mut self, held: bool) {
        self.crouch = held;
    }

    pub fn set_grapple_pressed(&mut self, held: bool) {
        self.grapple = held;
    }

    /// Release every button and stop moving.
    pub fn clear(&mut self) {
        self.direction = Vec3::ZERO;
        self.sprint = false;
        self.jump = false;
        self.crouch = false;
        self.grapple = false;
    }

    /// Compute this frame's edges and remember the current buttons for the next call.
    pub fn take_edges(&mut self) -> IntentEdges {
        let prev = self.previous;
        self.previous = ButtonSnapshot {
            jump: self.jump,
            crouch: self.crouch,
            grapple: self.grapple,
        };
        IntentEdges {
            jump_pressed: self.jump && !prev.jump,
            jump_released: !self.jump && prev.jump,
            crouch_pressed: self.crouch && !prev.crouch,
            crouch_released: !self.crouch && prev.crouch,
            grapple_pressed: self.grapple && !prev.grapple,
        }
    }
}
