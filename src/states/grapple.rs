//! Grappling: shoot a rope at the aimed point and reel the body in.

use bevy::prelude::*;

use super::{StateId, Tick, Transition};
use crate::backend::ForceMode;
use crate::spring::Spring;

/// Occupancy data for one grapple.
#[derive(Debug, Clone)]
pub struct GrappleData {
    pub anchor: Vec3,
    /// Rope head flying from the rope origin to the anchor.
    pub spring: Spring,
    /// Rope origin to anchor at entry, normalizes the rope wave.
    pub initial_distance: f32,
    /// Set once the rope head has reached the anchor.
    pub should_move: bool,
    /// Airborne at entry: fall while the rope is still flying.
    do_falling: bool,
}

impl GrappleData {
    pub(super) fn enter(tick: &mut Tick) -> Self {
        let config = tick.config;
        let ctx = &mut *tick.ctx;

        tick.body.set_velocity(Vec3::ZERO);
        ctx.grappling = true;
        ctx.can_grapple = false;

        let anchor = ctx.aim_hit.unwrap_or_else(|| {
            ctx.aim_origin + ctx.aim_direction.normalize_or(Vec3::NEG_Z) * config.max_grapple_distance
        });
        let spring = Spring::new(
            ctx.rope_origin,
            anchor,
            tick.rope.damping,
            tick.rope.strength,
        );
        debug!("grapple fired at {anchor} (surface hit: {})", ctx.aim_hit.is_some());

        Self {
            anchor,
            spring,
            initial_distance: ctx.rope_origin.distance(anchor),
            should_move: false,
            do_falling: !ctx.is_grounded,
        }
    }

    pub(super) fn fixed_update(&mut self, tick: &mut Tick) -> Transition {
        let config = tick.config;
        self.spring.target = self.anchor;
        self.spring.step(tick.dt);
        if self.spring.displacement() <= tick.rope.tolerance {
            self.should_move = true;
        }

        if self.should_move {
            let position = tick.body.position();
            let step = (self.anchor - position).clamp_length_max(config.grapple_speed * tick.dt);
            let next = position + step;
            tick.body.set_velocity(Vec3::ZERO);
            tick.body.move_position(next);
            if next.distance(self.anchor) <= config.grapple_arrive_distance {
                return Some(StateId::Falling);
            }
        } else if self.do_falling {
            tick.body
                .add_force(Vec3::NEG_Y * config.grapple_wait_fall_force, ForceMode::Force);
        }
        None
    }

    pub(super) fn exit(&mut self, tick: &mut Tick) {
        tick.ctx.grappling = false;
    }
}
