//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to
//! drive the locomotion controller, and [`BodyAccess`], the per-entity view
//! of the physical body that locomotion states read and write.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::config::horizontal;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the locomotion
/// controller. Environment queries are not part of the trait: a backend
/// plugin registers its own sensor systems that fill
/// [`SensorReadings`](crate::detection::SensorReadings) in
/// [`LocomotionSet::Sensors`](crate::LocomotionSet::Sensors).
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply an impulse to an entity.
    ///
    /// Impulse is an instantaneous change in momentum (velocity).
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3);

    /// Apply a force to an entity.
    ///
    /// Force is applied over the next physics step.
    fn apply_force(world: &mut World, entity: Entity, force: Vec3);

    /// Whether world gravity currently acts on the entity.
    fn gravity_enabled(world: &World, entity: Entity) -> bool;

    /// Enable or disable world gravity for the entity.
    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool);

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Teleport an entity to a new position.
    fn set_position(world: &mut World, entity: Entity, position: Vec3);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// How a vector passed to [`BodyAccess::add_force`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Continuous force integrated over the next physics step.
    Force,
    /// Instantaneous change in momentum.
    Impulse,
}

/// The physical body as seen by locomotion states.
pub trait BodyAccess {
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    fn add_force(&mut self, force: Vec3, mode: ForceMode);
    fn use_gravity(&self) -> bool;
    fn set_use_gravity(&mut self, enabled: bool);
    fn position(&self) -> Vec3;
    /// Move the body to `position` without simulating the path.
    fn move_position(&mut self, position: Vec3);
}

/// Convenience operations on top of [`BodyAccess`].
pub trait BodyAccessExt: BodyAccess {
    /// Velocity with the vertical component removed.
    fn horizontal_velocity(&self) -> Vec3 {
        horizontal(self.velocity())
    }

    /// Zero the horizontal velocity, keeping the vertical component.
    fn stop_horizontal(&mut self) {
        let v = self.velocity();
        self.set_velocity(Vec3::new(0.0, v.y, 0.0));
    }

    /// Zero the vertical velocity, keeping the horizontal components.
    fn stop_vertical(&mut self) {
        let v = self.velocity();
        self.set_velocity(Vec3::new(v.x, 0.0, v.z));
    }

    /// Clamp the horizontal speed to `cap`, keeping the vertical component.
    fn clamp_horizontal_speed(&mut self, cap: f32) {
        let v = self.velocity();
        let flat = horizontal(v);
        if flat.length_squared() > cap * cap {
            let clamped = flat.normalize_or_zero() * cap;
            self.set_velocity(Vec3::new(clamped.x, v.y, clamped.z));
        }
    }
}

impl<T: BodyAccess + ?Sized> BodyAccessExt for T {}

/// [`BodyAccess`] over one entity, backed by a [`CharacterPhysicsBackend`].
pub struct BackendBody<'w, B: CharacterPhysicsBackend> {
    world: &'w mut World,
    entity: Entity,
    _marker: PhantomData<B>,
}

impl<'w, B: CharacterPhysicsBackend> BackendBody<'w, B> {
    pub fn new(world: &'w mut World, entity: Entity) -> Self {
        Self {
            world,
            entity,
            _marker: PhantomData,
        }
    }
}

impl<B: CharacterPhysicsBackend> BodyAccess for BackendBody<'_, B> {
    fn velocity(&self) -> Vec3 {
        B::get_velocity(self.world, self.entity)
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        B::set_velocity(self.world, self.entity, velocity);
    }

    fn add_force(&mut self, force: Vec3, mode: ForceMode) {
        match mode {
            ForceMode::Force => B::apply_force(self.world, self.entity, force),
            ForceMode::Impulse => B::apply_impulse(self.world, self.entity, force),
        }
    }

    fn use_gravity(&self) -> bool {
        B::gravity_enabled(self.world, self.entity)
    }

    fn set_use_gravity(&mut self, enabled: bool) {
        B::set_gravity_enabled(self.world, self.entity, enabled);
    }

    fn position(&self) -> Vec3 {
        B::get_position(self.world, self.entity)
    }

    fn move_position(&mut self, position: Vec3) {
        B::set_position(self.world, self.entity, position);
    }
}

/// Scripted in-memory body for unit tests.
///
/// Impulses change velocity immediately (unit mass). Forces are only recorded.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct TestBody {
    pub velocity: Vec3,
    pub position: Vec3,
    pub gravity: bool,
    pub forces: Vec<Vec3>,
    pub impulses: Vec<Vec3>,
}

#[cfg(test)]
impl Default for TestBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            position: Vec3::ZERO,
            gravity: true,
            forces: Vec::new(),
            impulses: Vec::new(),
        }
    }
}

#[cfg(test)]
impl TestBody {
    pub fn moving(velocity: Vec3) -> Self {
        Self {
            velocity,
            ..default()
        }
    }

    /// Sum of forces recorded since the last clear.
    pub fn total_force(&self) -> Vec3 {
        self.forces.iter().copied().sum()
    }
}

#[cfg(test)]
impl BodyAccess for TestBody {
    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn add_force(&mut self, force: Vec3, mode: ForceMode) {
        match mode {
            ForceMode::Force => self.forces.push(force),
            ForceMode::Impulse => {
                self.impulses.push(force);
                self.velocity += force;
            }
        }
    }

    fn use_gravity(&self) -> bool {
        self.gravity
    }

    fn set_use_gravity(&mut self, enabled: bool) {
        self.gravity = enabled;
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn move_position(&mut self, position: Vec3) {
        self.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_vertical_speed() {
        let mut body = TestBody::moving(Vec3::new(6.0, -3.0, 8.0));
        body.clamp_horizontal_speed(5.0);
        assert!((body.horizontal_velocity().length() - 5.0).abs() < 1e-5);
        assert_eq!(body.velocity.y, -3.0);
        assert!(body.velocity.x > 0.0 && body.velocity.z > 0.0);
    }

    #[test]
    fn clamp_leaves_slow_bodies_alone() {
        let mut body = TestBody::moving(Vec3::new(1.0, 2.0, 1.0));
        body.clamp_horizontal_speed(5.0);
        assert_eq!(body.velocity, Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn stop_helpers_zero_one_axis_group() {
        let mut body = TestBody::moving(Vec3::new(1.0, 2.0, 3.0));
        body.stop_horizontal();
        assert_eq!(body.velocity, Vec3::new(0.0, 2.0, 0.0));

        let mut body = TestBody::moving(Vec3::new(1.0, 2.0, 3.0));
        body.stop_vertical();
        assert_eq!(body.velocity, Vec3::new(1.0, 0.0, 3.0));
    }

    #[test]
    fn force_modes_are_distinguished() {
        let mut body = TestBody::default();
        body.add_force(Vec3::Y, ForceMode::Impulse);
        body.add_force(Vec3::X, ForceMode::Force);
        assert_eq!(body.velocity, Vec3::Y);
        assert_eq!(body.total_force(), Vec3::X);
    }
}
