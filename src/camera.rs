//! Camera field of view and roll effects.
//!
//! Wall running pushes a wider field of view and a roll away from the wall.
//! Effects are smoothed toward their targets every frame.

use bevy::prelude::*;

use crate::config::ControllerLinks;
use crate::cue::{CueKind, LocomotionCue};

/// Smoothed camera effects. Put this on the camera linked in [`ControllerLinks`].
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct CameraEffects {
    /// Field of view restored by [`CueKind::CameraRestore`], in radians.
    pub base_fov: f32,
    pub fov: f32,
    pub target_fov: f32,
    /// Roll around the view axis, in radians.
    pub tilt: f32,
    pub target_tilt: f32,
    /// Exponential smoothing rate, per second.
    pub rate: f32,
}

impl CameraEffects {
    pub fn new(base_fov: f32) -> Self {
        Self {
            base_fov,
            fov: base_fov,
            target_fov: base_fov,
            tilt: 0.0,
            target_tilt: 0.0,
            rate: 10.0,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn push(&mut self, fov: f32, tilt: f32) {
        self.target_fov = fov;
        self.target_tilt = tilt;
    }

    pub fn restore(&mut self) {
        self.target_fov = self.base_fov;
        self.target_tilt = 0.0;
    }

    /// Move `fov` and `tilt` toward their targets over `dt` seconds.
    pub fn smooth(&mut self, dt: f32) {
        let blend = 1.0 - (-self.rate.max(0.0) * dt).exp();
        self.fov += (self.target_fov - self.fov) * blend;
        self.tilt += (self.target_tilt - self.tilt) * blend;
    }
}

impl Default for CameraEffects {
    fn default() -> Self {
        Self::new(PerspectiveProjection::default().fov)
    }
}

/// Route camera cues to the character's linked camera.
pub fn apply_camera_cues(
    mut cues: EventReader<LocomotionCue>,
    links: Query<&ControllerLinks>,
    mut cameras: Query<&mut CameraEffects>,
) {
    for cue in cues.read() {
        let Some(camera) = links.get(cue.entity).ok().and_then(|l| l.camera) else {
            continue;
        };
        let Ok(mut effects) = cameras.get_mut(camera) else {
            continue;
        };
        match cue.kind {
            CueKind::CameraPush { fov, tilt } => effects.push(fov, tilt),
            CueKind::CameraRestore => effects.restore(),
            _ => {}
        }
    }
}

/// Smooth effects and write them to the projection and camera roll.
pub fn animate_camera_effects(
    time: Res<Time>,
    mut q: Query<(&mut CameraEffects, &mut Transform, Option<&mut Projection>)>,
) {
    let dt = time.delta_secs();
    for (mut effects, mut transform, projection) in &mut q {
        effects.smooth(dt);

        if let Some(mut projection) = projection {
            if let Projection::Perspective(perspective) = projection.as_mut() {
                perspective.fov = effects.fov;
            }
        }

        let (yaw, pitch, _) = transform.rotation.to_euler(EulerRot::YXZ);
        transform.rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, effects.tilt);
    }
}
