//! Side-effect requests emitted by locomotion states.
//!
//! States never touch audio, tweens or cameras directly. They push
//! [`CueKind`]s into a buffer during a tick; the driving system turns them
//! into [`LocomotionCue`] events that the collaborator systems consume.

use bevy::prelude::*;

/// Sound played while sliding.
pub const SLIDE_SOUND: &str = "PlayerSlide";

/// Footstep clips, one is picked at random per step.
pub const FOOTSTEP_SOUNDS: [&str; 4] = ["Footstep1", "Footstep2", "Footstep3", "Footstep4"];

/// Target stance for a height tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    Standing,
    Crouched,
}

/// One side effect requested by a state.
#[derive(Debug, Clone, PartialEq)]
pub enum CueKind {
    PlaySound(&'static str),
    StopSound(&'static str),
    /// Play a random footstep. When `skip_if_playing`, do nothing if one is already audible.
    Footstep { skip_if_playing: bool },
    /// Tween collider and camera holder toward a stance over `duration` seconds.
    Stance { stance: Stance, duration: f32 },
    /// Push camera field of view and roll.
    CameraPush { fov: f32, tilt: f32 },
    /// Return the camera to the values saved by the last push.
    CameraRestore,
}

/// A cue addressed to one character.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct LocomotionCue {
    pub entity: Entity,
    pub kind: CueKind,
}

/// Cues collected during one tick.
pub type CueBuffer = Vec<CueKind>;
