//! Environment sensor evaluation.
//!
//! Physics backends collect raw query results into [`SensorReadings`] once per
//! variable tick. [`refresh_context`] turns those readings into the live sensor
//! fields of [`CharacterController`] and reports the grounded edge, so the
//! decision logic can be tested without a physics engine.

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::{CharacterController, ControllerConfig};

/// How the ground check combines its ray and sphere probes.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroundCheckType {
    /// A single downward ray from the ground point.
    Raycast,
    /// A sphere overlap at the ground point.
    Sphere,
    /// Both probes must report ground.
    Both,
    /// Either probe is enough.
    #[default]
    Either,
}

impl GroundCheckType {
    /// Combine the two probe results according to this policy.
    pub fn combine(self, ray_hit: bool, sphere_hit: bool) -> bool {
        match self {
            GroundCheckType::Raycast => ray_hit,
            GroundCheckType::Sphere => sphere_hit,
            GroundCheckType::Both => ray_hit && sphere_hit,
            GroundCheckType::Either => ray_hit || sphere_hit,
        }
    }
}

/// Which side of the character a wall was found on.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSide {
    Left,
    Right,
}

impl WallSide {
    /// Sign used for camera tilt and lateral directions (left = -1, right = 1).
    pub fn sign(self) -> f32 {
        match self {
            WallSide::Left => -1.0,
            WallSide::Right => 1.0,
        }
    }
}

/// A wall detected beside the character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallInfo {
    pub side: WallSide,
    pub hit: CollisionData,
}

/// Result of the slope probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeInfo {
    /// Angle between world up and the surface normal, in radians.
    pub angle: f32,
    /// Surface normal under the slope probe (world up when nothing was hit).
    pub normal: Vec3,
    /// True when `0 < angle < max_slope_angle`.
    pub on_slope: bool,
}

impl SlopeInfo {
    /// Nothing under the probe.
    pub const NONE: Self = Self {
        angle: 0.0,
        normal: Vec3::Y,
        on_slope: false,
    };
}

/// Tolerance under which a surface counts as flat.
///
/// Ray normals on flat colliders are rarely exactly `Vec3::Y`.
pub const FLAT_TOLERANCE: f32 = 1e-3;

/// Evaluate the slope probe against the configured maximum walkable angle.
///
/// Flat ground and surfaces at or above `max_angle` are not slopes.
pub fn evaluate_slope(hit: Option<&CollisionData>, max_angle: f32) -> SlopeInfo {
    let Some(hit) = hit else {
        return SlopeInfo::NONE;
    };
    let angle = hit.angle_from(Vec3::Y);
    SlopeInfo {
        angle,
        normal: hit.normal,
        on_slope: angle > FLAT_TOLERANCE && angle < max_angle,
    }
}

/// Grapple aim captured from the linked camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimReading {
    pub origin: Vec3,
    pub direction: Vec3,
    /// First grappleable surface along the aim, if any within range.
    pub hit: Option<Vec3>,
}

/// Raw physics query results for one character, written by the backend.
#[derive(Component, Debug, Clone, Default)]
pub struct SensorReadings {
    /// Character position at sampling time.
    pub position: Vec3,
    /// Character facing at sampling time.
    pub rotation: Quat,
    /// Downward ray from the ground point.
    pub ground_ray: Option<CollisionData>,
    /// Sphere overlap at the ground point.
    pub ground_overlap: bool,
    /// Downward ray from the slope probe point.
    pub slope_ray: Option<CollisionData>,
    /// Obstacle along the world movement direction.
    pub blocked_ahead: bool,
    /// Ray along the character's left.
    pub wall_left: Option<CollisionData>,
    /// Ray along the character's right.
    pub wall_right: Option<CollisionData>,
    /// Ground found within the minimum wall-run height.
    pub near_ground_below: bool,
    /// Something overhead within standing height.
    pub ceiling_blocked: bool,
    /// Grapple aim from the linked camera.
    pub aim: Option<AimReading>,
    /// World position the rope is drawn from.
    pub rope_origin: Option<Vec3>,
}

/// Edges produced by a sensor refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorEdges {
    /// Ground contact went from false to true this tick.
    pub grounded: bool,
}

/// Copy one tick of readings into the context.
///
/// Resets the air-jump counter on the grounded edge. Side walls are only
/// reported when the character is far enough above the ground to wall run.
pub fn refresh_context(
    ctx: &mut CharacterController,
    readings: &SensorReadings,
    config: &ControllerConfig,
) -> SensorEdges {
    ctx.rotation = readings.rotation;

    ctx.was_grounded = ctx.is_grounded;
    ctx.is_grounded = config
        .ground_check_type
        .combine(readings.ground_ray.is_some(), readings.ground_overlap);

    let slope = evaluate_slope(readings.slope_ray.as_ref(), config.max_slope_angle);
    ctx.ground_angle = slope.angle;
    ctx.slope_normal = slope.normal;
    ctx.on_slope = slope.on_slope;

    ctx.blocked_ahead = readings.blocked_ahead;
    ctx.can_stand = !readings.ceiling_blocked;

    if readings.near_ground_below {
        ctx.wall_left = None;
        ctx.wall_right = None;
    } else {
        ctx.wall_left = readings.wall_left;
        ctx.wall_right = readings.wall_right;
    }

    match readings.aim {
        Some(aim) => {
            ctx.aim_origin = aim.origin;
            ctx.aim_direction = aim.direction;
            ctx.aim_hit = aim.hit;
        }
        None => {
            ctx.aim_origin = readings.position;
            ctx.aim_direction = ctx.forward();
            ctx.aim_hit = None;
        }
    }
    ctx.rope_origin = readings.rope_origin.unwrap_or(readings.position);

    let grounded = ctx.is_grounded && !ctx.was_grounded;
    if grounded {
        ctx.reset_jump_count();
    }
    SensorEdges { grounded }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_with_angle(degrees: f32) -> CollisionData {
        let normal = Quat::from_rotation_x(degrees.to_radians()) * Vec3::Y;
        CollisionData::new(0.2, normal, Vec3::ZERO, None)
    }

    fn grounded_readings() -> SensorReadings {
        SensorReadings {
            ground_ray: Some(CollisionData::new(0.05, Vec3::Y, Vec3::ZERO, None)),
            ground_overlap: true,
            slope_ray: Some(CollisionData::new(0.1, Vec3::Y, Vec3::ZERO, None)),
            rotation: Quat::IDENTITY,
            ..default()
        }
    }

    // ==================== Ground Policy Tests ====================

    #[test]
    fn ground_policies_combine_probes() {
        use GroundCheckType::*;
        let cases = [
            (Raycast, [false, false, true, true]),
            (Sphere, [false, true, false, true]),
            (Both, [false, false, false, true]),
            (Either, [false, true, true, true]),
        ];
        let inputs = [(false, false), (false, true), (true, false), (true, true)];
        for (policy, expected) in cases {
            for ((ray, sphere), want) in inputs.iter().zip(expected) {
                assert_eq!(
                    policy.combine(*ray, *sphere),
                    want,
                    "{policy:?} ray={ray} sphere={sphere}"
                );
            }
        }
    }

    // ==================== Slope Tests ====================

    #[test]
    fn slope_at_45_degrees_is_walkable_slope() {
        let slope = evaluate_slope(Some(&hit_with_angle(45.0)), 60f32.to_radians());
        assert!(slope.on_slope);
        assert!((slope.angle - 45f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn slope_at_75_degrees_is_not_a_slope() {
        let slope = evaluate_slope(Some(&hit_with_angle(75.0)), 60f32.to_radians());
        assert!(!slope.on_slope);
    }

    #[test]
    fn flat_ground_is_not_a_slope() {
        let slope = evaluate_slope(Some(&hit_with_angle(0.0)), 60f32.to_radians());
        assert!(!slope.on_slope);
        assert_eq!(evaluate_slope(None, 1.0), SlopeInfo::NONE);
    }

    // ==================== Context Refresh Tests ====================

    #[test]
    fn grounded_edge_fires_once_and_resets_jumps() {
        let config = ControllerConfig::default();
        let mut ctx = CharacterController::new();
        ctx.current_jump_amount = 2;

        let airborne = SensorReadings::default();
        let grounded = grounded_readings();

        assert!(!refresh_context(&mut ctx, &airborne, &config).grounded);
        assert_eq!(ctx.current_jump_amount, 2);

        let edge = refresh_context(&mut ctx, &grounded, &config);
        assert!(edge.grounded);
        assert_eq!(ctx.current_jump_amount, 0);

        ctx.current_jump_amount = 1;
        for _ in 0..5 {
            assert!(!refresh_context(&mut ctx, &grounded, &config).grounded);
        }
        assert_eq!(ctx.current_jump_amount, 1, "no reset without a new edge");
    }

    #[test]
    fn slope_limit_comes_from_config() {
        let readings = SensorReadings {
            slope_ray: Some(hit_with_angle(45.0)),
            ..grounded_readings()
        };

        let mut ctx = CharacterController::new();
        refresh_context(&mut ctx, &readings, &ControllerConfig::default());
        assert!(ctx.on_slope);

        let steep = ControllerConfig::default().with_max_slope_angle(30f32.to_radians());
        refresh_context(&mut ctx, &readings, &steep);
        assert!(!ctx.on_slope);
        assert!((ctx.ground_angle - 45f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn side_walls_ignored_close_to_ground() {
        let config = ControllerConfig::default();
        let mut ctx = CharacterController::new();
        let wall = CollisionData::new(0.4, Vec3::X, Vec3::new(-0.4, 1.0, 0.0), None);

        let mut readings = SensorReadings {
            wall_left: Some(wall),
            near_ground_below: true,
            ..default()
        };
        refresh_context(&mut ctx, &readings, &config);
        assert!(ctx.wall().is_none());

        readings.near_ground_below = false;
        refresh_context(&mut ctx, &readings, &config);
        let info = ctx.wall().expect("left wall reported");
        assert_eq!(info.side, WallSide::Left);
    }

    #[test]
    fn ceiling_blocks_standing() {
        let config = ControllerConfig::default();
        let mut ctx = CharacterController::new();
        let readings = SensorReadings {
            ceiling_blocked: true,
            ..grounded_readings()
        };
        refresh_context(&mut ctx, &readings, &config);
        assert!(!ctx.can_stand);
    }

    #[test]
    fn missing_aim_falls_back_to_facing() {
        let config = ControllerConfig::default();
        let mut ctx = CharacterController::new();
        let readings = SensorReadings {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
            ..default()
        };
        refresh_context(&mut ctx, &readings, &config);
        assert_eq!(ctx.aim_origin, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ctx.aim_direction, Vec3::NEG_Z);
        assert_eq!(ctx.rope_origin, Vec3::new(1.0, 2.0, 3.0));
    }
}
