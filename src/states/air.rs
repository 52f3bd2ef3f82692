//! Airborne movement: Jumping, AirJumping and Falling.

use bevy::prelude::*;

use super::{StateId, Tick, Transition};
use crate::backend::{BodyAccessExt, ForceMode};
use crate::config::horizontal;

/// Forces below this magnitude are dropped instead of applied.
const NEGLIGIBLE_FORCE: f32 = 1e-3;

/// Jump extension bookkeeping, shared by Jumping and AirJumping.
#[derive(Debug, Clone, Default)]
pub struct JumpData {
    /// Time spent extending this jump.
    pub air_time: f32,
}

impl JumpData {
    pub(super) fn enter_ground_jump(tick: &mut Tick) -> Self {
        let config = tick.config;
        tick.body.stop_vertical();
        let mut impulse = Vec3::Y * config.base_jump_force;
        if config.jump_carries_momentum {
            impulse += tick.body.horizontal_velocity().normalize_or_zero() * config.base_jump_force;
        }
        tick.body.add_force(impulse, ForceMode::Impulse);
        Self::default()
    }

    pub(super) fn enter_air_jump(tick: &mut Tick) -> Self {
        let config = tick.config;
        tick.ctx.current_jump_amount = (tick.ctx.current_jump_amount + 1).min(config.jump_amount);
        tick.body.stop_vertical();
        tick.body
            .add_force(Vec3::Y * config.multi_jump_force, ForceMode::Impulse);
        Self::default()
    }

    pub(super) fn fixed_update_ground_jump(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        self.extend(
            tick,
            config.extend_jumps,
            config.jump_duration,
            config.extended_jump_force,
        )
    }

    pub(super) fn fixed_update_air_jump(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        self.extend(
            tick,
            config.extend_multi_jumps,
            config.multi_jump_duration,
            config.extended_multi_jump_force,
        )
    }

    /// Keep pushing up while jump is held and time remains, then fall.
    fn extend(&mut self, tick: &mut Tick, enabled: bool, duration: f32, force: f32) -> Transition {
        if enabled && tick.ctx.jump_key_down && self.air_time < duration {
            tick.body
                .add_force(Vec3::Y * force * tick.dt, ForceMode::Impulse);
            self.air_time += tick.dt;
            None
        } else {
            Some(StateId::Falling)
        }
    }
}

/// Falling bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct FallData {
    /// Time since entering Falling.
    pub fall_time: f32,
    /// Magnitude of the horizontal steering force, decays without input.
    pub air_force: f32,
    /// Direction of the last steering force.
    pub air_dir: Vec3,
}

impl FallData {
    pub(super) fn fixed_update(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        self.fall_time += tick.dt;

        if self.fall_time > config.coyote_time {
            tick.body
                .add_force(Vec3::NEG_Y * config.fall_force, ForceMode::Force);
        }

        if tick.ctx.has_movement_intent() {
            self.air_dir = horizontal(tick.ctx.world_movement_dir());
            self.air_force = config.in_air_move_speed;
            tick.body
                .add_force(self.air_dir * self.air_force, ForceMode::Force);
        } else if config.instant_air_stop {
            self.air_force = 0.0;
            tick.body.stop_horizontal();
        } else {
            self.air_force *= config.slow_down;
            if self.air_force > NEGLIGIBLE_FORCE {
                tick.body
                    .add_force(self.air_dir * self.air_force, ForceMode::Force);
            }
        }
        None
    }

    pub(super) fn update(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        tick.body.clamp_horizontal_speed(config.max_in_air_speed);

        let ctx = &tick.ctx;
        if ctx.on_slope {
            return Some(StateId::OnSlope);
        }
        if ctx.wall().is_some()
            && ctx.movement_dir.z > 0.0
            && ctx.can_wall_run
            && tick.registered.contains(StateId::WallRunning)
        {
            return Some(StateId::WallRunning);
        }
        // Landed without a fresh grounded edge, e.g. a jump that never left the ground probe.
        if ctx.is_grounded && self.fall_time > config.coyote_time && tick.body.velocity().y <= 0.0 {
            return Some(StateId::Idle);
        }
        None
    }
}

/// Grounded-edge handler registered by Falling for the machine's lifetime.
pub(super) fn on_landed(active: StateId, tick: &mut Tick) -> Transition {
    if !active.is_airborne_mode() {
        return None;
    }
    tick.ctx.reset_jump_count();
    if tick.config.lock_on_landing {
        tick.body.stop_vertical();
    }
    Some(StateId::Idle)
}

/// Air-jump handler registered by Falling for the machine's lifetime.
pub(super) fn on_air_jump(active: StateId, tick: &mut Tick) -> Transition {
    let applies = matches!(
        active,
        StateId::Jumping | StateId::AirJumping | StateId::Falling
    );
    (applies && tick.ctx.can_air_jump(tick.config)).then_some(StateId::AirJumping)
}
