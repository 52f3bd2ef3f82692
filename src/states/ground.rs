//! Grounded movement: Idle, Moving, Sprinting and OnSlope.

use std::time::Duration;

use bevy::prelude::*;

use super::{StateId, Tick, Transition};
use crate::backend::{BodyAccessExt, ForceMode};
use crate::config::{horizontal, SlopeMovePolicy, SprintStyle};
use crate::cue::CueKind;

pub(super) fn idle_enter(tick: &mut Tick) {
    tick.body.set_velocity(Vec3::ZERO);
}

pub(super) fn idle_update(tick: &mut Tick) -> Transition {
    let ctx = &tick.ctx;
    if ctx.should_crouch {
        Some(StateId::Crouching)
    } else if ctx.has_movement_intent() {
        Some(StateId::Moving)
    } else if ctx.on_slope {
        Some(StateId::OnSlope)
    } else {
        None
    }
}

pub(super) fn on_slope_enter(tick: &mut Tick) {
    tick.body.set_velocity(Vec3::ZERO);
}

pub(super) fn on_slope_update(tick: &mut Tick) -> Transition {
    let ctx = &tick.ctx;
    if ctx.should_crouch {
        Some(StateId::Crouching)
    } else if ctx.has_movement_intent() {
        Some(StateId::Moving)
    } else if !ctx.on_slope && ctx.is_grounded {
        Some(StateId::Idle)
    } else {
        None
    }
}

/// Hold still on the slope instead of sliding down it.
pub(super) fn on_slope_fixed_update(tick: &mut Tick) -> Transition {
    if !tick.ctx.has_movement_intent() {
        tick.body.set_velocity(Vec3::ZERO);
    }
    None
}

/// Push the body along the movement intent at `target_speed`.
///
/// On flat ground this is an impulse accumulating toward the speed cap. On a
/// slope the velocity is set along the surface, scaled from `slope_speed` by
/// the same ratio `target_speed` has to `move_speed`.
pub(super) fn drive(tick: &mut Tick, target_speed: f32) {
    let config = tick.config;
    let world_dir = tick.ctx.world_movement_dir();

    if !tick.ctx.on_slope {
        tick.body
            .add_force(world_dir * target_speed * tick.dt, ForceMode::Impulse);
        return;
    }

    let normal = tick.ctx.slope_normal;
    let along = (world_dir - normal * world_dir.dot(normal)).normalize_or_zero();
    let scale = if config.move_speed > 0.0 {
        target_speed / config.move_speed
    } else {
        0.0
    };
    let mut speed = config.slope_speed * scale * world_dir.length().min(1.0);
    if config.slope_move_policy == SlopeMovePolicy::NaturalPhysics {
        speed *= tick.ctx.ground_angle.cos();
    }
    tick.body.set_velocity(along * speed);
}

/// Sprint speed without momentum: horizontal velocity is replaced, not accumulated.
pub(super) fn drive_locked_sprint(tick: &mut Tick) {
    let config = tick.config;
    if tick.ctx.on_slope {
        drive(tick, config.target_speed(true));
        return;
    }
    let dir = horizontal(tick.ctx.world_movement_dir()).normalize_or_zero();
    let sprint_speed = config.speed_cap * config.sprint_multiplier;
    let vertical = tick.body.velocity().y;
    tick.body
        .set_velocity(dir * sprint_speed + Vec3::Y * vertical);
}

fn footstep_timer(seconds: f32) -> Timer {
    Timer::from_seconds(seconds.max(0.01), TimerMode::Repeating)
}

/// Advance a footstep timer, switching cadence when sprint toggles.
fn tick_footsteps(timer: &mut Timer, interval: f32, tick: &mut Tick) {
    let interval = Duration::from_secs_f32(interval.max(0.01));
    if timer.duration() != interval {
        timer.set_duration(interval);
    }
    timer.tick(Duration::from_secs_f32(tick.dt.max(0.0)));
    if timer.just_finished() {
        tick.cues.push(CueKind::Footstep {
            skip_if_playing: false,
        });
    }
}

/// Walking, with sprint handled as a higher target speed.
#[derive(Debug, Clone)]
pub struct MoveData {
    /// Speed driven by the fixed step, sprint adjusted.
    pub target_speed: f32,
    footsteps: Timer,
}

impl MoveData {
    pub(super) fn enter(tick: &mut Tick) -> Self {
        tick.cues.push(CueKind::Footstep {
            skip_if_playing: true,
        });
        let sprinting = tick.ctx.sprinting && tick.ctx.current_stamina > 0.0;
        Self {
            target_speed: tick.config.target_speed(sprinting),
            footsteps: footstep_timer(tick.config.footstep_interval),
        }
    }

    pub(super) fn update(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;

        let mut sprinting = tick.ctx.sprinting
            && (!config.sprint_uses_stamina || tick.ctx.current_stamina > 0.0);
        if sprinting && config.sprint_uses_stamina && tick.ctx.drain_stamina(config, tick.dt) {
            sprinting = false;
        }
        self.target_speed = config.target_speed(sprinting);
        if tick.ctx.has_movement_intent() {
            tick.ctx.last_movement_dir = tick.ctx.movement_dir;
        }
        tick.ctx.last_sprinting = tick.ctx.sprinting;

        let interval = if sprinting {
            config.sprint_step_interval
        } else {
            config.footstep_interval
        };
        tick_footsteps(&mut self.footsteps, interval, tick);

        tick.body.clamp_horizontal_speed(config.speed_cap);

        let ctx = &tick.ctx;
        if !ctx.has_movement_intent() {
            Some(StateId::Idle)
        } else if sprinting && ctx.should_crouch && !ctx.on_slope {
            Some(StateId::Sliding)
        } else if ctx.should_crouch && !sprinting {
            Some(StateId::Crouching)
        } else if sprinting
            && config.sprint_style == SprintStyle::Locked
            && tick.registered.contains(StateId::Sprinting)
        {
            Some(StateId::Sprinting)
        } else {
            None
        }
    }
}

/// Dedicated sprint used with [`SprintStyle::Locked`].
#[derive(Debug, Clone)]
pub struct SprintData {
    footsteps: Timer,
}

impl SprintData {
    pub(super) fn enter(tick: &mut Tick) -> Self {
        Self {
            footsteps: footstep_timer(tick.config.sprint_step_interval),
        }
    }

    pub(super) fn update(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        if tick.ctx.has_movement_intent() {
            tick.ctx.last_movement_dir = tick.ctx.movement_dir;
        }
        tick.ctx.last_sprinting = tick.ctx.sprinting;

        if !tick.ctx.has_movement_intent() {
            return Some(StateId::Idle);
        }
        if tick.ctx.should_crouch && !tick.ctx.on_slope {
            return Some(StateId::Sliding);
        }
        if !tick.ctx.sprinting {
            return Some(StateId::Moving);
        }
        if config.sprint_uses_stamina && tick.ctx.drain_stamina(config, tick.dt) {
            return Some(StateId::Moving);
        }

        tick_footsteps(&mut self.footsteps, config.sprint_step_interval, tick);
        tick.body
            .clamp_horizontal_speed(config.speed_cap * config.sprint_multiplier);
        None
    }
}
