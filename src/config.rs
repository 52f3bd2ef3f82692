//! Controller configuration and live character context.
//!
//! [`ControllerConfig`] holds the tuning values, immutable after setup.
//! [`CharacterController`] is the shared mutable record every state reads and
//! writes: sensor results, stamina, the air-jump counter and behavioural flags.
//! [`RopeConfig`] tunes the grapple rope sub-simulation.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::detection::{GroundCheckType, WallInfo, WallSide};

/// How sprinting is expressed as states.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SprintStyle {
    /// Moving handles sprint itself by raising its target speed.
    #[default]
    Momentum,
    /// Moving hands off to the dedicated Sprinting state, which drives the
    /// body at a fixed sprint speed without carrying momentum.
    Locked,
}

/// How Moving behaves on a walkable slope.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeMovePolicy {
    /// Velocity is set along the slope at full target speed.
    #[default]
    MaintainVelocity,
    /// Velocity along the slope is attenuated by the cosine of its angle.
    NaturalPhysics,
}

/// Configuration for the locomotion controller.
///
/// All distances are in metres, angles in radians, times in seconds.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct ControllerConfig {
    // === General movement ===
    /// Ground acceleration along the movement direction.
    pub move_speed: f32,
    /// Multiplier applied to the target speed while sprinting.
    pub sprint_multiplier: f32,
    /// Allow sprinting in any direction instead of forward only.
    pub multi_dir_sprint: bool,
    /// Whether sprint stays inside Moving or uses the Sprinting state.
    pub sprint_style: SprintStyle,
    /// Ceiling for horizontal speed on the ground, while sliding and while wall running.
    pub speed_cap: f32,
    /// Ceiling for horizontal speed while falling.
    pub max_in_air_speed: f32,
    /// Length of the probe along the movement direction that stops the
    /// character from pushing into walls.
    pub wall_check_distance: f32,

    // === Ground checks ===
    /// How the ray and sphere probes are combined.
    pub ground_check_type: GroundCheckType,
    /// Ground probe origin relative to the bottom of the collider.
    pub ground_point_offset: Vec3,
    /// Radius of the sphere probe.
    pub ground_check_radius: f32,
    /// Length of the downward ground ray.
    pub ground_check_distance: f32,
    /// Collision group bits that count as ground.
    pub ground_filter: u32,

    // === Air and jumps ===
    /// Grace period after leaving ground before the extra fall force starts.
    pub coyote_time: f32,
    /// Holding jump extends the ground jump.
    pub extend_jumps: bool,
    /// Enables air jumps.
    pub multiple_jumps: bool,
    /// Number of air jumps allowed before landing.
    pub jump_amount: u32,
    /// Horizontal force while steering in the air.
    pub in_air_move_speed: f32,
    /// Maximum time the ground jump can be extended.
    pub jump_duration: f32,
    /// Maximum time an air jump can be extended.
    pub multi_jump_duration: f32,
    /// Extra downward force once coyote time has passed.
    pub fall_force: f32,
    /// Upward impulse of the ground jump.
    pub base_jump_force: f32,
    /// Upward impulse per second while extending the ground jump.
    pub extended_jump_force: f32,
    /// Drop all horizontal velocity when air steering stops.
    pub instant_air_stop: bool,
    /// Decay factor (0..1) for the air-steering force when input stops.
    pub slow_down: f32,
    /// Upward impulse of an air jump.
    pub multi_jump_force: f32,
    /// Holding jump extends air jumps.
    pub extend_multi_jumps: bool,
    /// Upward impulse per second while extending an air jump.
    pub extended_multi_jump_force: f32,
    /// Zero vertical velocity on landing.
    pub lock_on_landing: bool,
    /// Add the current horizontal velocity direction to the ground jump impulse.
    pub jump_carries_momentum: bool,

    // === Slopes ===
    /// Slope probe origin relative to the bottom of the collider.
    pub slope_check_offset: Vec3,
    /// Length of the downward slope ray.
    pub slope_check_distance: f32,
    /// Steepest surface that still counts as a walkable slope.
    pub max_slope_angle: f32,
    /// Keep body gravity enabled while on a slope.
    pub slope_gravity: bool,
    /// Velocity policy for Moving on slopes.
    pub slope_move_policy: SlopeMovePolicy,
    /// Speed along a slope before the sprint multiplier.
    pub slope_speed: f32,

    // === Stance ===
    /// Collider height while standing.
    pub standing_height: f32,
    /// Collider height while crouched or sliding.
    pub crouch_height: f32,
    /// Capsule radius used when the collider is resized.
    pub collider_radius: f32,
    /// Camera holder height while standing.
    pub standing_camera_height: f32,
    /// Camera holder height while crouched.
    pub crouch_camera_height: f32,
    /// Duration of the crouch stance tween.
    pub to_crouch_speed: f32,
    /// Speed multiplier while crouch walking.
    pub crouch_speed_modifier: f32,
    /// Downward impulse when dropping into a crouch.
    pub crouch_down_force: f32,

    // === Sliding ===
    /// Initial slide multiplier and base slide force.
    pub slide_speed: f32,
    /// Per-tick decay of the slide multiplier (< 1).
    pub slide_speed_reduction: f32,
    /// Slide ends once the multiplier drops to this value.
    pub slide_stop_threshold: f32,
    /// Duration of the slide stance tween.
    pub slide_transition_speed: f32,
    /// Sliding consumes stamina and ends when it runs out.
    pub slide_uses_stamina: bool,

    // === Stamina ===
    pub stamina_capacity: f32,
    /// Stamina consumed per second of sprinting or sliding.
    pub stamina_drain_rate: f32,
    /// Stamina recovered per second while not draining.
    pub stamina_regen_rate: f32,
    /// Sprinting consumes stamina.
    pub sprint_uses_stamina: bool,

    // === Footsteps ===
    pub footstep_interval: f32,
    pub sprint_step_interval: f32,

    // === Wall running ===
    /// Length of the side rays that look for runnable walls.
    pub wall_run_check_distance: f32,
    /// Minimum clearance above ground before a wall run can start.
    pub min_wall_run_height: f32,
    /// Force along the wall.
    pub wall_run_speed: f32,
    /// Reduced downward force while running on a wall.
    pub wall_run_fall_force: f32,
    /// Force pressing the character into the wall.
    pub wall_stick_force: f32,
    /// Force pushing away when steering off the wall.
    pub wall_escape_force: f32,
    /// Maximum duration of a wall run.
    pub max_wall_run_time: f32,
    /// A wall jump is ignored until the run has lasted this long.
    pub min_time_to_wall_jump: f32,
    /// Upward impulse of a wall jump.
    pub wall_jump_force: f32,
    /// Impulse away from the wall on a wall jump.
    pub wall_jump_side_force: f32,
    /// Camera field of view while wall running.
    pub wall_run_fov: f32,
    /// Camera roll while wall running, leaning away from the wall.
    pub wall_run_camera_tilt: f32,

    // === Grappling ===
    /// Longest reachable grapple anchor.
    pub max_grapple_distance: f32,
    /// Collision group bits that can be grappled.
    pub grapple_filter: u32,
    /// Speed at which the body is pulled to the anchor.
    pub grapple_speed: f32,
    /// Grapple ends once the body is this close to the anchor.
    pub grapple_arrive_distance: f32,
    /// Downward force while waiting for the rope when the grapple started airborne.
    pub grapple_wait_fall_force: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            move_speed: 100.0,
            sprint_multiplier: 1.2,
            multi_dir_sprint: false,
            sprint_style: SprintStyle::Momentum,
            speed_cap: 5.0,
            max_in_air_speed: 5.0,
            wall_check_distance: 0.6,

            ground_check_type: GroundCheckType::Either,
            ground_point_offset: Vec3::new(0.0, 0.05, 0.0),
            ground_check_radius: 0.25,
            ground_check_distance: 0.2,
            ground_filter: u32::MAX,

            coyote_time: 0.2,
            extend_jumps: true,
            multiple_jumps: true,
            jump_amount: 2,
            in_air_move_speed: 10.0,
            jump_duration: 0.3,
            multi_jump_duration: 0.3,
            fall_force: 10.0,
            base_jump_force: 5.0,
            extended_jump_force: 20.0,
            instant_air_stop: false,
            slow_down: 0.2,
            multi_jump_force: 5.0,
            extend_multi_jumps: false,
            extended_multi_jump_force: 20.0,
            lock_on_landing: false,
            jump_carries_momentum: false,

            slope_check_offset: Vec3::new(0.0, 0.1, 0.0),
            slope_check_distance: 1.0,
            max_slope_angle: PI / 3.0,
            slope_gravity: true,
            slope_move_policy: SlopeMovePolicy::MaintainVelocity,
            slope_speed: 4.0,

            standing_height: 2.0,
            crouch_height: 1.0,
            collider_radius: 0.5,
            standing_camera_height: 0.6,
            crouch_camera_height: 0.1,
            to_crouch_speed: 0.2,
            crouch_speed_modifier: 0.5,
            crouch_down_force: 5.0,

            slide_speed: 10.0,
            slide_speed_reduction: 0.98,
            slide_stop_threshold: 1.5,
            slide_transition_speed: 0.2,
            slide_uses_stamina: false,

            stamina_capacity: 5.0,
            stamina_drain_rate: 1.0,
            stamina_regen_rate: 0.5,
            sprint_uses_stamina: true,

            footstep_interval: 0.5,
            sprint_step_interval: 0.35,

            wall_run_check_distance: 0.8,
            min_wall_run_height: 1.0,
            wall_run_speed: 20.0,
            wall_run_fall_force: 2.0,
            wall_stick_force: 10.0,
            wall_escape_force: 100.0,
            max_wall_run_time: 1.5,
            min_time_to_wall_jump: 0.15,
            wall_jump_force: 6.0,
            wall_jump_side_force: 4.0,
            wall_run_fov: 100f32.to_radians(),
            wall_run_camera_tilt: 8f32.to_radians(),

            max_grapple_distance: 40.0,
            grapple_filter: u32::MAX,
            grapple_speed: 20.0,
            grapple_arrive_distance: 1.5,
            grapple_wait_fall_force: 20.0,
        }
    }
}

impl ControllerConfig {
    /// Preset for a first-person player.
    pub fn player() -> Self {
        Self::default()
    }

    /// Preset favouring air control: more air jumps, longer wall runs and
    /// multi-directional sprint.
    pub fn arcade() -> Self {
        Self {
            multi_dir_sprint: true,
            jump_amount: 3,
            extend_multi_jumps: true,
            in_air_move_speed: 15.0,
            max_in_air_speed: 7.0,
            max_wall_run_time: 2.5,
            stamina_capacity: 10.0,
            ..Self::default()
        }
    }

    // === Builder methods ===

    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    pub fn with_speed_cap(mut self, cap: f32) -> Self {
        self.speed_cap = cap;
        self
    }

    pub fn with_sprint_style(mut self, style: SprintStyle) -> Self {
        self.sprint_style = style;
        self
    }

    pub fn with_ground_check(mut self, check: GroundCheckType) -> Self {
        self.ground_check_type = check;
        self
    }

    /// Set the air-jump limit. Zero disables air jumps entirely.
    pub fn with_jump_amount(mut self, amount: u32) -> Self {
        self.jump_amount = amount;
        self.multiple_jumps = amount > 0;
        self
    }

    pub fn with_coyote_time(mut self, seconds: f32) -> Self {
        self.coyote_time = seconds;
        self
    }

    pub fn with_max_slope_angle(mut self, radians: f32) -> Self {
        self.max_slope_angle = radians;
        self
    }

    pub fn with_slope_gravity(mut self, enabled: bool) -> Self {
        self.slope_gravity = enabled;
        self
    }

    pub fn with_stamina(mut self, capacity: f32, drain_rate: f32) -> Self {
        self.stamina_capacity = capacity;
        self.stamina_drain_rate = drain_rate;
        self
    }

    pub fn with_lock_on_landing(mut self, lock: bool) -> Self {
        self.lock_on_landing = lock;
        self
    }

    pub fn with_jump_carries_momentum(mut self, enabled: bool) -> Self {
        self.jump_carries_momentum = enabled;
        self
    }

    /// Target ground speed for the current sprint state.
    pub fn target_speed(&self, sprinting: bool) -> f32 {
        if sprinting {
            self.move_speed * self.sprint_multiplier
        } else {
            self.move_speed
        }
    }
}

/// Shape of the rope wave envelope along its length.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub enum FalloffCurve {
    /// Full amplitude everywhere.
    Flat,
    /// Linearly fades to nothing at the anchor end.
    Taper,
    /// `sin(pi * t)`: pinned at both ends.
    Bell,
    /// User curve as `(t, value)` keys sorted by `t`, linearly interpolated.
    Keyframes(Vec<Vec2>),
}

impl FalloffCurve {
    /// Sample the curve at `t` in `[0, 1]`.
    pub fn sample(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            FalloffCurve::Flat => 1.0,
            FalloffCurve::Taper => 1.0 - t,
            FalloffCurve::Bell => (PI * t).sin(),
            FalloffCurve::Keyframes(keys) => {
                let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
                    return 1.0;
                };
                if t <= first.x {
                    return first.y;
                }
                if t >= last.x {
                    return last.y;
                }
                keys.windows(2)
                    .find(|pair| t >= pair[0].x && t <= pair[1].x)
                    .map(|pair| {
                        let span = pair[1].x - pair[0].x;
                        if span <= f32::EPSILON {
                            pair[1].y
                        } else {
                            pair[0].y + (pair[1].y - pair[0].y) * (t - pair[0].x) / span
                        }
                    })
                    .unwrap_or(last.y)
            }
        }
    }
}

/// Tuning for the grapple rope sub-simulation.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct RopeConfig {
    /// Number of points sampled along the rope.
    pub quality: usize,
    /// Spring damping coefficient.
    pub damping: f32,
    /// Spring stiffness.
    pub strength: f32,
    /// Number of half-waves along the rope.
    pub wave_count: f32,
    /// Peak wave displacement.
    pub wave_height: f32,
    /// Spring distance to the anchor that authorizes pulling the body.
    pub tolerance: f32,
    /// Wave envelope along the rope.
    pub falloff: FalloffCurve,
}

impl Default for RopeConfig {
    fn default() -> Self {
        let strength = 800.0;
        Self {
            quality: 50,
            damping: 2.0 * f32::sqrt(strength),
            strength,
            wave_count: 3.0,
            wave_height: 1.0,
            tolerance: 0.1,
            falloff: FalloffCurve::Taper,
        }
    }
}

/// Entities the controller drives besides the body itself.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct ControllerLinks {
    /// Camera used for grapple aim and camera effects.
    pub camera: Option<Entity>,
    /// Parent of the camera whose height follows the stance.
    pub camera_holder: Option<Entity>,
    /// Point the grapple rope is drawn from.
    pub rope_origin: Option<Entity>,
}

impl ControllerLinks {
    pub fn with_camera(mut self, camera: Entity) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_camera_holder(mut self, holder: Entity) -> Self {
        self.camera_holder = Some(holder);
        self
    }

    pub fn with_rope_origin(mut self, origin: Entity) -> Self {
        self.rope_origin = Some(origin);
        self
    }
}

/// Live character context shared by every locomotion state.
///
/// Sensor fields are refreshed once per variable tick before any state reads
/// them. Resources and flags are owned by the states.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CharacterController {
    // === Sensors ===
    pub is_grounded: bool,
    pub was_grounded: bool,
    /// Standing on a surface between flat and the maximum slope angle.
    pub on_slope: bool,
    /// Angle of the surface under the slope probe, in radians.
    pub ground_angle: f32,
    pub slope_normal: Vec3,
    #[reflect(ignore)]
    pub wall_left: Option<CollisionData>,
    #[reflect(ignore)]
    pub wall_right: Option<CollisionData>,
    /// Something lies along the movement direction within `wall_check_distance`.
    pub blocked_ahead: bool,
    /// No obstruction overhead within standing height.
    pub can_stand: bool,
    /// Facing of the character body.
    pub rotation: Quat,
    pub aim_origin: Vec3,
    pub aim_direction: Vec3,
    pub aim_hit: Option<Vec3>,
    /// Where the grapple rope starts.
    pub rope_origin: Vec3,

    // === Resources ===
    pub current_stamina: f32,
    /// Air jumps used since last landing.
    pub current_jump_amount: u32,

    // === Flags ===
    /// Local movement intent: x right, y up, z forward.
    pub movement_dir: Vec3,
    pub jump_key_down: bool,
    pub sprinting: bool,
    pub should_crouch: bool,
    /// The stance is currently lowered.
    pub is_crouching: bool,
    pub wall_running: bool,
    pub grappling: bool,
    pub can_wall_run: bool,
    pub can_grapple: bool,
    /// Most recent non-zero local movement direction of a grounded move state.
    pub last_movement_dir: Vec3,
    /// Sprint requested during the last grounded move tick, even when stamina revoked it.
    pub last_sprinting: bool,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            is_grounded: false,
            was_grounded: false,
            on_slope: false,
            ground_angle: 0.0,
            slope_normal: Vec3::Y,
            wall_left: None,
            wall_right: None,
            blocked_ahead: false,
            can_stand: true,
            rotation: Quat::IDENTITY,
            aim_origin: Vec3::ZERO,
            aim_direction: Vec3::NEG_Z,
            aim_hit: None,
            rope_origin: Vec3::ZERO,
            current_stamina: 0.0,
            current_jump_amount: 0,
            movement_dir: Vec3::ZERO,
            jump_key_down: false,
            sprinting: false,
            should_crouch: false,
            is_crouching: false,
            wall_running: false,
            grappling: false,
            can_wall_run: true,
            can_grapple: true,
            last_movement_dir: Vec3::ZERO,
            last_sprinting: false,
        }
    }
}

/// Convert a local intent vector (x right, y up, z forward) into world space.
pub fn local_to_world(rotation: Quat, local: Vec3) -> Vec3 {
    rotation * Vec3::X * local.x + Vec3::Y * local.y + rotation * Vec3::NEG_Z * local.z
}

/// Horizontal part of a world vector.
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

impl CharacterController {
    /// Create a context with default values. Stamina is filled by the machine on init.
    pub fn new() -> Self {
        Self::default()
    }

    /// Facing direction in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Movement intent in world space.
    pub fn world_movement_dir(&self) -> Vec3 {
        local_to_world(self.rotation, self.movement_dir)
    }

    /// Any non-zero movement intent.
    pub fn has_movement_intent(&self) -> bool {
        self.movement_dir != Vec3::ZERO
    }

    /// The wall currently beside the character, left side first.
    pub fn wall(&self) -> Option<WallInfo> {
        self.wall_left
            .map(|hit| WallInfo {
                side: WallSide::Left,
                hit,
            })
            .or_else(|| {
                self.wall_right.map(|hit| WallInfo {
                    side: WallSide::Right,
                    hit,
                })
            })
    }

    /// Set stamina, clamped to `[0, capacity]`.
    pub fn set_stamina(&mut self, value: f32, capacity: f32) {
        self.current_stamina = value.clamp(0.0, capacity.max(0.0));
    }

    /// Drain stamina for `dt` seconds. Returns true when stamina is exhausted.
    pub fn drain_stamina(&mut self, config: &ControllerConfig, dt: f32) -> bool {
        self.set_stamina(
            self.current_stamina - config.stamina_drain_rate * dt,
            config.stamina_capacity,
        );
        self.current_stamina <= 0.0
    }

    /// Recover stamina for `dt` seconds.
    pub fn regenerate_stamina(&mut self, config: &ControllerConfig, dt: f32) {
        self.set_stamina(
            self.current_stamina + config.stamina_regen_rate * dt,
            config.stamina_capacity,
        );
    }

    /// An air jump is still available.
    pub fn can_air_jump(&self, config: &ControllerConfig) -> bool {
        config.multiple_jumps && self.current_jump_amount < config.jump_amount
    }

    pub fn reset_jump_count(&mut self) {
        self.current_jump_amount = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Config Tests ====================

    #[test]
    fn default_config_has_expected_tuning() {
        let config = ControllerConfig::default();
        assert_eq!(config.move_speed, 100.0);
        assert_eq!(config.jump_amount, 2);
        assert_eq!(config.speed_cap, 5.0);
        assert!((config.max_slope_angle - 60f32.to_radians()).abs() < 1e-5);
        assert!(config.slide_speed_reduction < 1.0);
    }

    #[test]
    fn target_speed_applies_sprint_multiplier() {
        let config = ControllerConfig::default().with_move_speed(10.0);
        assert_eq!(config.target_speed(false), 10.0);
        assert!((config.target_speed(true) - 12.0).abs() < 1e-5);
    }

    #[test]
    fn zero_jump_amount_disables_air_jumps() {
        let config = ControllerConfig::default().with_jump_amount(0);
        assert!(!config.multiple_jumps);
        assert!(!CharacterController::new().can_air_jump(&config));
    }

    #[test]
    fn arcade_preset_builds_on_defaults() {
        let config = ControllerConfig::arcade();
        assert!(config.multi_dir_sprint);
        assert_eq!(config.jump_amount, 3);
        assert_eq!(config.move_speed, ControllerConfig::default().move_speed);
    }

    // ==================== Stamina Tests ====================

    #[test]
    fn stamina_is_clamped_to_capacity() {
        let config = ControllerConfig::default().with_stamina(5.0, 1.0);
        let mut ctx = CharacterController::new();

        ctx.set_stamina(12.0, config.stamina_capacity);
        assert_eq!(ctx.current_stamina, 5.0);

        ctx.set_stamina(-3.0, config.stamina_capacity);
        assert_eq!(ctx.current_stamina, 0.0);
    }

    #[test]
    fn draining_past_zero_clamps_and_reports_exhaustion() {
        let config = ControllerConfig::default().with_stamina(5.0, 1.0);
        let mut ctx = CharacterController::new();
        ctx.current_stamina = 0.05;

        assert!(ctx.drain_stamina(&config, 0.1));
        assert_eq!(ctx.current_stamina, 0.0);
    }

    #[test]
    fn regeneration_stops_at_capacity() {
        let config = ControllerConfig::default().with_stamina(1.0, 1.0);
        let mut ctx = CharacterController::new();
        ctx.current_stamina = 0.9;
        ctx.regenerate_stamina(&config, 10.0);
        assert_eq!(ctx.current_stamina, 1.0);
    }

    // ==================== Direction Tests ====================

    #[test]
    fn forward_intent_maps_to_negative_z() {
        let ctx = CharacterController {
            movement_dir: Vec3::Z,
            ..default()
        };
        assert!(ctx.world_movement_dir().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn intent_follows_facing() {
        let ctx = CharacterController {
            movement_dir: Vec3::Z,
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..default()
        };
        // Turning left by 90 degrees faces -X.
        assert!(ctx.world_movement_dir().abs_diff_eq(Vec3::NEG_X, 1e-5));
        assert!(ctx.right().abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    // ==================== Falloff Tests ====================

    #[test]
    fn falloff_presets() {
        assert_eq!(FalloffCurve::Flat.sample(0.7), 1.0);
        assert!((FalloffCurve::Taper.sample(0.25) - 0.75).abs() < 1e-6);
        assert!(FalloffCurve::Bell.sample(0.0).abs() < 1e-6);
        assert!((FalloffCurve::Bell.sample(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn keyframe_falloff_interpolates_and_clamps() {
        let curve = FalloffCurve::Keyframes(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 1.0),
            Vec2::new(1.0, 0.5),
        ]);
        assert!((curve.sample(0.25) - 0.5).abs() < 1e-6);
        assert!((curve.sample(0.75) - 0.75).abs() < 1e-6);
        assert_eq!(curve.sample(2.0), 0.5);
        assert_eq!(FalloffCurve::Keyframes(Vec::new()).sample(0.3), 1.0);
    }
}
