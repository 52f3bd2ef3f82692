//! Wall running and the wall jump.

use std::time::Duration;

use bevy::prelude::*;

use super::{StateId, Tick, Transition};
use crate::backend::{BodyAccessExt, ForceMode};
use crate::config::horizontal;
use crate::cue::CueKind;
use crate::detection::{WallInfo, WallSide};

/// Occupancy data for one run along a wall.
#[derive(Debug, Clone)]
pub struct WallRunData {
    pub side: WallSide,
    /// Wall normal, pointing away from the wall.
    pub normal: Vec3,
    /// Horizontal direction along the wall, matching the facing at entry.
    pub along: Vec3,
    timer: Timer,
    /// Seconds on the wall, gates the wall jump.
    pub elapsed: f32,
    /// The wall jump listens for air-jump presses while this is set.
    subscribed: bool,
}

/// Direction along the wall surface closest to `forward`.
fn along_wall(normal: Vec3, forward: Vec3) -> Vec3 {
    let along = horizontal(normal.cross(Vec3::Y)).normalize_or_zero();
    if along.dot(forward) < 0.0 {
        -along
    } else {
        along
    }
}

impl WallRunData {
    pub(super) fn enter(tick: &mut Tick) -> Self {
        let config = tick.config;
        let WallInfo { side, hit } = tick.ctx.wall().unwrap_or(WallInfo {
            side: WallSide::Right,
            hit: default(),
        });
        let normal = if hit.normal == Vec3::ZERO {
            -tick.ctx.right()
        } else {
            hit.normal
        };

        tick.body.set_use_gravity(false);
        tick.body.stop_vertical();
        tick.ctx.wall_running = true;
        tick.ctx.can_wall_run = false;
        tick.cues.push(CueKind::CameraPush {
            fov: config.wall_run_fov,
            tilt: -side.sign() * config.wall_run_camera_tilt,
        });
        debug!("wall run started on the {side:?} wall");

        Self {
            side,
            normal,
            along: along_wall(normal, tick.ctx.forward()),
            timer: Timer::from_seconds(config.max_wall_run_time.max(0.0), TimerMode::Once),
            elapsed: 0.0,
            subscribed: true,
        }
    }

    pub(super) fn update(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        let Some(wall) = tick.ctx.wall() else {
            return Some(StateId::Falling);
        };
        self.side = wall.side;
        self.normal = wall.hit.normal;
        self.along = along_wall(self.normal, tick.ctx.forward());

        if tick.ctx.movement_dir.z <= 0.0 {
            return Some(StateId::Falling);
        }

        self.timer.tick(Duration::from_secs_f32(tick.dt.max(0.0)));
        self.elapsed += tick.dt;
        if self.timer.finished() {
            return Some(StateId::Falling);
        }

        tick.body.clamp_horizontal_speed(config.speed_cap);
        None
    }

    pub(super) fn fixed_update(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        tick.body
            .add_force(self.along * config.wall_run_speed, ForceMode::Force);
        tick.body
            .add_force(Vec3::NEG_Y * config.wall_run_fall_force, ForceMode::Force);

        let steering_away = tick.ctx.movement_dir.x * self.side.sign() < 0.0;
        if steering_away {
            let escape = horizontal(tick.ctx.world_movement_dir()).normalize_or_zero();
            tick.body
                .add_force(escape * config.wall_escape_force, ForceMode::Force);
            return Some(StateId::Falling);
        }

        tick.body
            .add_force(-self.normal * config.wall_stick_force, ForceMode::Force);
        None
    }

    /// Jump off the wall once the minimum run time has passed.
    pub(super) fn wall_jump(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        if !self.subscribed || self.elapsed <= config.min_time_to_wall_jump {
            return None;
        }
        tick.body.stop_vertical();
        tick.body.add_force(
            Vec3::Y * config.wall_jump_force + self.normal * config.wall_jump_side_force,
            ForceMode::Impulse,
        );
        Some(StateId::Falling)
    }

    pub(super) fn exit(&mut self, tick: &mut Tick) {
        tick.body.set_use_gravity(true);
        tick.ctx.wall_running = false;
        tick.cues.push(CueKind::CameraRestore);
        self.subscribed = false;
    }
}
