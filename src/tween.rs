//! Stance height tweening.
//!
//! Crouch and slide lower the character by tweening [`StanceHeight`]: the
//! collider height is picked up by the physics backend and the camera height
//! moves the linked camera holder. Starting a tween while one is running
//! replaces it, starting from the current height.

use bevy::prelude::*;

use crate::config::{ControllerConfig, ControllerLinks};
use crate::cue::{CueKind, LocomotionCue, Stance};

/// Current collider and camera heights of a character.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct StanceHeight {
    /// Full height of the body collider.
    pub collider: f32,
    /// Camera holder height above the body center.
    pub camera: f32,
}

impl StanceHeight {
    pub fn standing(config: &ControllerConfig) -> Self {
        Self {
            collider: config.standing_height,
            camera: config.standing_camera_height,
        }
    }

    pub fn crouched(config: &ControllerConfig) -> Self {
        Self {
            collider: config.crouch_height,
            camera: config.crouch_camera_height,
        }
    }

    pub fn for_stance(stance: Stance, config: &ControllerConfig) -> Self {
        match stance {
            Stance::Standing => Self::standing(config),
            Stance::Crouched => Self::crouched(config),
        }
    }

    pub fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            collider: self.collider + (to.collider - self.collider) * t,
            camera: self.camera + (to.camera - self.camera) * t,
        }
    }
}

impl Default for StanceHeight {
    fn default() -> Self {
        Self::standing(&ControllerConfig::default())
    }
}

/// A running stance tween. Removed when finished.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct StanceTween {
    pub from: StanceHeight,
    pub to: StanceHeight,
    pub elapsed: f32,
    pub duration: f32,
}

impl StanceTween {
    pub fn new(from: StanceHeight, to: StanceHeight, duration: f32) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration,
        }
    }

    /// Advance by `dt` and return the eased height and whether the tween is done.
    pub fn advance(&mut self, dt: f32) -> (StanceHeight, bool) {
        self.elapsed += dt;
        let t = if self.duration > 0.0 {
            (self.elapsed / self.duration).min(1.0)
        } else {
            1.0
        };
        if t >= 1.0 {
            (self.to, true)
        } else {
            (self.from.lerp(self.to, ease_out_quart(t)), false)
        }
    }
}

/// `1 - (1 - t)^4`
pub fn ease_out_quart(t: f32) -> f32 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(4)
}

/// Start tweens for stance cues.
pub fn start_stance_tweens(
    mut commands: Commands,
    mut cues: EventReader<LocomotionCue>,
    q: Query<(&StanceHeight, &ControllerConfig)>,
) {
    for cue in cues.read() {
        let CueKind::Stance { stance, duration } = cue.kind else {
            continue;
        };
        let Ok((current, config)) = q.get(cue.entity) else {
            continue;
        };
        let target = StanceHeight::for_stance(stance, config);
        commands
            .entity(cue.entity)
            .insert(StanceTween::new(*current, target, duration));
    }
}

/// Advance running tweens and write the eased height.
pub fn advance_stance_tweens(
    mut commands: Commands,
    time: Res<Time>,
    mut q: Query<(Entity, &mut StanceHeight, &mut StanceTween)>,
) {
    let dt = time.delta_secs();
    for (entity, mut height, mut tween) in &mut q {
        let (value, done) = tween.advance(dt);
        *height = value;
        if done {
            commands.entity(entity).remove::<StanceTween>();
        }
    }
}

/// Move the linked camera holder to the current camera height.
pub fn apply_camera_holder_height(
    q: Query<(&StanceHeight, &ControllerLinks), Changed<StanceHeight>>,
    mut holders: Query<&mut Transform>,
) {
    for (height, links) in &q {
        let Some(holder) = links.camera_holder else {
            continue;
        };
        if let Ok(mut transform) = holders.get_mut(holder) {
            transform.translation.y = height.camera;
        }
    }
}
