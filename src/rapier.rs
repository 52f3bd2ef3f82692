//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::CollisionData;
use crate::config::{horizontal, local_to_world, ControllerConfig, ControllerLinks};
use crate::detection::{AimReading, SensorReadings};
use crate::intent::MovementIntent;
use crate::tween::StanceHeight;
use crate::LocomotionSet;

/// Rapier3D physics backend for the locomotion controller.
///
/// Velocity and impulses go straight to Rapier's components. Forces are
/// accumulated in [`ForceAccumulator`] and moved into [`ExternalForce`] once
/// per fixed step so forces added by other code are preserved.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
        } else if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            // No ExternalImpulse: apply as a unit-mass velocity change.
            vel.linvel += impulse;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec3) {
        if let Some(mut forces) = world.get_mut::<ForceAccumulator>(entity) {
            forces.add(force);
        } else if let Some(mut ext_force) = world.get_mut::<ExternalForce>(entity) {
            ext_force.force += force;
        }
    }

    fn gravity_enabled(world: &World, entity: Entity) -> bool {
        world
            .get::<GravityScale>(entity)
            .is_none_or(|scale| scale.0 != 0.0)
    }

    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool) {
        let scale = if enabled { 1.0 } else { 0.0 };
        match world.get_mut::<GravityScale>(entity) {
            Some(mut gravity) => gravity.0 = scale,
            None => {
                world.entity_mut(entity).insert(GravityScale(scale));
            }
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Plugin that sets up Rapier3D-specific systems for the locomotion controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ForceAccumulator>();

        app.add_systems(Update, rapier_sensors.in_set(LocomotionSet::Sensors));
        app.add_systems(Update, sync_stance_collider.after(LocomotionSet::Effects));

        app.add_systems(
            FixedUpdate,
            clear_controller_forces.in_set(LocomotionSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            apply_controller_forces.in_set(LocomotionSet::FinalApplication),
        );
    }
}

/// Forces added by the controller during one fixed step.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct ForceAccumulator {
    /// Forces added this step, not yet in [`ExternalForce`].
    pub pending: Vec3,
    /// Forces moved into [`ExternalForce`] last step.
    pub applied: Vec3,
}

impl ForceAccumulator {
    pub fn add(&mut self, force: Vec3) {
        self.pending += force;
    }

    /// Start a new step. Returns the force to subtract from [`ExternalForce`].
    pub fn prepare_new_frame(&mut self) -> Vec3 {
        self.pending = Vec3::ZERO;
        std::mem::take(&mut self.applied)
    }

    /// Finish the step. Returns the force to add to [`ExternalForce`].
    pub fn finalize_frame(&mut self) -> Vec3 {
        self.applied = std::mem::take(&mut self.pending);
        self.applied
    }
}

/// Remove last step's controller forces from [`ExternalForce`].
pub fn clear_controller_forces(mut q: Query<(&mut ExternalForce, &mut ForceAccumulator)>) {
    for (mut ext_force, mut forces) in &mut q {
        ext_force.force -= forces.prepare_new_frame();
    }
}

/// Move this step's controller forces into [`ExternalForce`].
pub fn apply_controller_forces(mut q: Query<(&mut ExternalForce, &mut ForceAccumulator)>) {
    for (mut ext_force, mut forces) in &mut q {
        ext_force.force += forces.finalize_frame();
    }
}

/// Capsule collider for a character of full `height`.
pub fn stance_collider(height: f32, radius: f32) -> Collider {
    Collider::capsule_y((height * 0.5 - radius).max(0.0), radius)
}

/// Resize the body collider when the stance height changes.
pub fn sync_stance_collider(
    mut q: Query<(&StanceHeight, &ControllerConfig, &mut Collider), Changed<StanceHeight>>,
) {
    for (height, config, mut collider) in &mut q {
        *collider = stance_collider(height.collider, config.collider_radius);
    }
}

fn query_filter(entity: Entity, mask: u32) -> QueryFilter<'static> {
    QueryFilter::default()
        .exclude_rigid_body(entity)
        .exclude_collider(entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(mask),
        ))
}

/// Perform a raycast using RapierContext.
fn rapier_raycast(
    context: &RapierContext,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    filter: QueryFilter,
) -> Option<CollisionData> {
    if max_distance <= 0.0 || direction == Vec3::ZERO {
        return None;
    }
    context
        .cast_ray_and_get_normal(origin, direction, max_distance, true, filter)
        .map(|(hit_entity, hit)| {
            CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
        })
}

/// Whether a ball of `radius` at `center` touches any collider passing `filter`.
fn rapier_overlap(context: &RapierContext, center: Vec3, radius: f32, filter: QueryFilter) -> bool {
    if radius <= 0.0 {
        return false;
    }
    let mut hit = false;
    context.intersections_with_shape(center, Quat::IDENTITY, &Collider::ball(radius), filter, |_| {
        hit = true;
        false
    });
    hit
}

/// Collect every sensor reading the controller needs for this frame.
///
/// Ground, slope and wall probes use the body's yaw only, so pitch or roll on
/// the body transform never tilts them.
fn rapier_sensors(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &ControllerConfig,
        &MovementIntent,
        &StanceHeight,
        Option<&ControllerLinks>,
        &mut SensorReadings,
    )>,
    q_links: Query<&GlobalTransform, Without<SensorReadings>>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, intent, stance, links, mut readings) in &mut q_controllers {
        let position = transform.translation();
        let (yaw, _, _) = transform.rotation().to_euler(EulerRot::YXZ);
        let rotation = Quat::from_rotation_y(yaw);
        let half_height = stance.collider * 0.5;
        let bottom = position - Vec3::Y * half_height;

        let ground_filter = query_filter(entity, config.ground_filter);
        let solid_filter = query_filter(entity, u32::MAX);

        // Ground: ray and sphere from just above the collider bottom.
        let ground_point = bottom + config.ground_point_offset;
        let ground_ray = rapier_raycast(
            &context,
            ground_point,
            Vec3::NEG_Y,
            config.ground_point_offset.y.max(0.0) + config.ground_check_distance,
            ground_filter,
        );
        let ground_overlap = rapier_overlap(
            &context,
            ground_point,
            config.ground_check_radius,
            ground_filter,
        );

        let slope_point = bottom + config.slope_check_offset;
        let slope_ray = rapier_raycast(
            &context,
            slope_point,
            Vec3::NEG_Y,
            config.slope_check_offset.y.max(0.0) + config.slope_check_distance,
            ground_filter,
        );

        // Obstacle along the movement intent.
        let move_dir = horizontal(local_to_world(rotation, intent.direction)).normalize_or_zero();
        let blocked_ahead = rapier_raycast(
            &context,
            position,
            move_dir,
            config.wall_check_distance,
            solid_filter,
        )
        .is_some();

        let right = rotation * Vec3::X;
        let wall_left = rapier_raycast(
            &context,
            position,
            -right,
            config.wall_run_check_distance,
            solid_filter,
        );
        let wall_right = rapier_raycast(
            &context,
            position,
            right,
            config.wall_run_check_distance,
            solid_filter,
        );
        let near_ground_below = rapier_raycast(
            &context,
            position,
            Vec3::NEG_Y,
            half_height + config.min_wall_run_height,
            ground_filter,
        )
        .is_some();

        // Room to stand back up from the current center.
        let ceiling_blocked = rapier_raycast(
            &context,
            position,
            Vec3::Y,
            config.standing_height - half_height,
            solid_filter,
        )
        .is_some();

        let camera = links
            .and_then(|l| l.camera)
            .and_then(|camera| q_links.get(camera).ok());
        let (aim_origin, aim_direction) = match camera {
            Some(camera) => (camera.translation(), *camera.forward()),
            None => (
                position + Vec3::Y * stance.camera,
                rotation * Vec3::NEG_Z,
            ),
        };
        let aim_hit = rapier_raycast(
            &context,
            aim_origin,
            aim_direction,
            config.max_grapple_distance,
            query_filter(entity, config.grapple_filter),
        )
        .map(|hit| hit.point);

        let rope_origin = links
            .and_then(|l| l.rope_origin)
            .and_then(|origin| q_links.get(origin).ok())
            .map(|origin| origin.translation());

        *readings = SensorReadings {
            position,
            rotation,
            ground_ray,
            ground_overlap,
            slope_ray,
            blocked_ahead,
            wall_left,
            wall_right,
            near_ground_below,
            ceiling_blocked,
            aim: Some(AimReading {
                origin: aim_origin,
                direction: aim_direction,
                hit: aim_hit,
            }),
            rope_origin,
        };
    }
}

/// Bundle for creating a character with Rapier3D physics.
///
/// Provides the rigid body, velocity tracking, external forces and impulses,
/// axis locking, damping, mass properties, gravity scale and the controller's
/// force accumulator. Add a collider sized for the standing stance, for
/// example with [`stance_collider`].
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use msg_locomotion::prelude::*;
/// use msg_locomotion::rapier::{stance_collider, Rapier3dCharacterBundle};
///
/// fn spawn_player(mut commands: Commands) {
///     let config = ControllerConfig::player();
///     commands.spawn((
///         Transform::from_xyz(0.0, 1.0, 0.0),
///         LocomotionBundle::new(config),
///         Rapier3dCharacterBundle::rotation_locked(),
///         stance_collider(config.standing_height, config.collider_radius),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `locked_axes`: empty from [`Rapier3dCharacterBundle::new()`],
///   [`LockedAxes::ROTATION_LOCKED`] from [`Rapier3dCharacterBundle::rotation_locked()`]
/// - `damping`: linear 0.5, angular 1.0
/// - `gravity_scale`: 1.0, toggled off by wall running and slope handling
#[derive(Bundle, Default)]
pub struct Rapier3dCharacterBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub external_force: ExternalForce,
    /// Used for jumps, crouch push-down and wall jumps.
    pub external_impulse: ExternalImpulse,
    pub locked_axes: LockedAxes,
    pub damping: Damping,
    pub gravity_scale: GravityScale,
    pub forces: ForceAccumulator,
}

impl Rapier3dCharacterBundle {
    /// Create a new character bundle with rotation enabled.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            locked_axes: LockedAxes::empty(),
            damping: Damping {
                linear_damping: 0.5,
                angular_damping: 1.0,
            },
            gravity_scale: GravityScale(1.0),
            forces: ForceAccumulator::default(),
        }
    }

    /// Create a character bundle with rotation locked.
    ///
    /// The usual choice for a first-person body: the host sets yaw on the
    /// transform and physics never tips the capsule over.
    pub fn rotation_locked() -> Self {
        Self {
            locked_axes: LockedAxes::ROTATION_LOCKED,
            ..Self::new()
        }
    }

    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients for velocity reduction.
    ///
    /// Low linear damping makes the character slide on, high damping stops it
    /// quickly. Angular damping only matters when rotation is not locked.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
