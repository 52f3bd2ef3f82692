//! Spring sub-simulation for the grapple rope.
//!
//! A [`Spring`] tracks the rope head as it flies toward the grapple anchor.
//! [`sample_rope`] turns the spring into a wavy polyline: the wave amplitude
//! shrinks as the spring closes in on its target, so the rope straightens
//! out by the time the body starts being pulled.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::config::RopeConfig;

/// Damped spring pulling `value` toward `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub value: Vec3,
    pub velocity: Vec3,
    pub target: Vec3,
    pub damping: f32,
    pub strength: f32,
}

impl Spring {
    /// A spring at rest at `start`, aimed at `target`.
    pub fn new(start: Vec3, target: Vec3, damping: f32, strength: f32) -> Self {
        Self {
            value: start,
            velocity: Vec3::ZERO,
            target,
            damping,
            strength,
        }
    }

    /// A critically damped spring for the given stiffness.
    pub fn critically_damped(start: Vec3, target: Vec3, strength: f32) -> Self {
        Self::new(start, target, 2.0 * strength.max(0.0).sqrt(), strength)
    }

    /// Advance the spring by `dt` seconds (semi-implicit Euler).
    pub fn step(&mut self, dt: f32) {
        let acceleration =
            (self.target - self.value) * self.strength - self.velocity * self.damping;
        self.velocity += acceleration * dt;
        self.value += self.velocity * dt;
    }

    /// Distance left to the target.
    pub fn displacement(&self) -> f32 {
        self.value.distance(self.target)
    }
}

/// Sampled rope polyline, written every frame while grappling.
///
/// Empty when no grapple is active.
#[derive(Component, Debug, Clone, Default)]
pub struct GrappleRope {
    pub points: Vec<Vec3>,
}

/// Sample the rope from `origin` to the spring head.
///
/// `initial_distance` normalizes the spring displacement into a `[0, 1]`
/// amplitude scale.
pub fn sample_rope(
    origin: Vec3,
    spring: &Spring,
    initial_distance: f32,
    config: &RopeConfig,
    out: &mut Vec<Vec3>,
) {
    out.clear();
    let count = config.quality.max(2);
    let head = spring.value;
    let direction = (spring.target - origin).normalize_or(Vec3::NEG_Z);
    let perpendicular = (Vec3::Y - direction * direction.dot(Vec3::Y))
        .normalize_or(direction.any_orthonormal_vector());
    let amplitude = if initial_distance > f32::EPSILON {
        (spring.displacement() / initial_distance).min(1.0)
    } else {
        0.0
    };

    for i in 0..count {
        let t = i as f32 / (count - 1) as f32;
        let wave = (t * config.wave_count * PI).sin()
            * config.wave_height
            * config.falloff.sample(t)
            * amplitude;
        out.push(origin.lerp(head, t) + perpendicular * wave);
    }
}
