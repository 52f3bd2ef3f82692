//! # `msg_locomotion`
//!
//! A state-machine driven first-person locomotion controller for Bevy with
//! physics backend abstraction.
//!
//! The character is a dynamic rigidbody moved by forces, impulses and
//! velocity writes. Twelve locomotion states cover walking, sprinting,
//! jumping with air jumps, falling with coyote time, slopes, crouching,
//! sliding, wall running and grappling:
//! - Environment sensors (ground, slope, walls, ceiling, grapple aim) are
//!   collected by the physics backend every frame
//! - [`LocomotionMachine`](machine::LocomotionMachine) runs the active state
//!   at variable rate for transitions and at fixed rate for forces
//! - Side effects (sounds, stance tweens, camera FOV and roll) are emitted as
//!   [`LocomotionCue`](cue::LocomotionCue) events and handled by small systems
//! - The grapple rope head is a damped spring, sampled into a wavy polyline
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_locomotion::prelude::*;
//!
//! let config = ControllerConfig::player();
//! let mut intent = MovementIntent::default();
//! intent.set_direction(Vec3::Z);
//!
//! // Spawn with a physics bundle and a collider from the backend.
//! let bundle = LocomotionBundle::new(config);
//! ```

use bevy::prelude::*;

pub mod audio;
pub mod backend;
pub mod camera;
pub mod collision;
pub mod config;
pub mod cue;
pub mod detection;
pub mod error;
pub mod intent;
pub mod machine;
pub mod spring;
pub mod state;
pub mod states;
pub mod systems;
pub mod tween;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::audio::{SoundBank, SoundName};
    pub use crate::backend::{BodyAccess, BodyAccessExt, CharacterPhysicsBackend, ForceMode};
    pub use crate::camera::CameraEffects;
    pub use crate::config::{
        CharacterController, ControllerConfig, ControllerLinks, FalloffCurve, RopeConfig,
        SlopeMovePolicy, SprintStyle,
    };
    pub use crate::cue::{CueKind, LocomotionCue, Stance};
    pub use crate::detection::{GroundCheckType, SensorReadings, WallSide};
    pub use crate::error::LocomotionError;
    pub use crate::intent::MovementIntent;
    pub use crate::machine::LocomotionMachine;
    pub use crate::spring::{GrappleRope, Spring};
    pub use crate::state::{Airborne, Grounded, TouchingWall};
    pub use crate::states::{LocomotionState, StateId};
    pub use crate::tween::StanceHeight;
    pub use crate::{CharacterControllerPlugin, LocomotionBundle, LocomotionSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for ordering locomotion systems.
///
/// `Sensors`, `StateUpdate` and `Effects` run chained in `Update`.
/// `Preparation`, `FixedStep` and `FinalApplication` run chained in
/// `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Backend queries fill [`SensorReadings`](detection::SensorReadings).
    Sensors,
    /// Context refresh, input and the variable-rate state tick.
    StateUpdate,
    /// Cue handling: sounds, stance tweens, camera effects.
    Effects,
    /// Controller forces from the previous fixed step are removed.
    Preparation,
    /// The fixed-rate state tick.
    FixedStep,
    /// Accumulated forces are handed to the physics engine.
    FinalApplication,
}

/// Main plugin for the locomotion controller.
///
/// Generic over a physics backend `B` which provides body access and adds
/// its own sensor and force systems.
///
/// # Examples
///
/// With the Rapier3D backend. Physics runs in the fixed schedule so every
/// fixed locomotion step is followed by exactly one simulation step:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::RopeConfig>();
        app.register_type::<config::ControllerLinks>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<states::StateId>();
        app.register_type::<tween::StanceHeight>();
        app.register_type::<camera::CameraEffects>();

        app.add_event::<cue::LocomotionCue>();
        app.init_resource::<audio::SoundBank>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            Update,
            (
                LocomotionSet::Sensors,
                LocomotionSet::StateUpdate,
                LocomotionSet::Effects,
            )
                .chain(),
        );
        app.configure_sets(
            FixedUpdate,
            (
                LocomotionSet::Preparation,
                LocomotionSet::FixedStep,
                LocomotionSet::FinalApplication,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (
                systems::run_locomotion_update::<B>,
                systems::sync_state_markers,
            )
                .chain()
                .in_set(LocomotionSet::StateUpdate),
        );
        app.add_systems(
            Update,
            (
                audio::play_locomotion_sounds,
                (
                    tween::start_stance_tweens,
                    tween::advance_stance_tweens,
                    tween::apply_camera_holder_height,
                )
                    .chain(),
                (camera::apply_camera_cues, camera::animate_camera_effects).chain(),
            )
                .in_set(LocomotionSet::Effects),
        );

        app.add_systems(
            FixedUpdate,
            systems::run_locomotion_fixed_update::<B>.in_set(LocomotionSet::FixedStep),
        );

        app.add_systems(PostUpdate, systems::sample_grapple_ropes);
    }
}

/// Everything a character needs apart from physics components.
///
/// Pair it with a backend bundle such as
/// [`Rapier3dCharacterBundle`](rapier::Rapier3dCharacterBundle) and a collider.
#[derive(Bundle)]
pub struct LocomotionBundle {
    pub controller: config::CharacterController,
    pub config: config::ControllerConfig,
    pub rope: config::RopeConfig,
    pub links: config::ControllerLinks,
    pub intent: intent::MovementIntent,
    pub machine: machine::LocomotionMachine,
    pub readings: detection::SensorReadings,
    pub stance: tween::StanceHeight,
    pub rope_points: spring::GrappleRope,
}

impl LocomotionBundle {
    pub fn new(config: config::ControllerConfig) -> Self {
        Self {
            controller: config::CharacterController::new(),
            config,
            rope: config::RopeConfig::default(),
            links: config::ControllerLinks::default(),
            intent: intent::MovementIntent::new(),
            machine: machine::LocomotionMachine::new(),
            readings: detection::SensorReadings::default(),
            stance: tween::StanceHeight::standing(&config),
            rope_points: spring::GrappleRope::default(),
        }
    }

    pub fn with_rope(mut self, rope: config::RopeConfig) -> Self {
        self.rope = rope;
        self
    }

    pub fn with_links(mut self, links: config::ControllerLinks) -> Self {
        self.links = links;
        self
    }

    /// Limit the machine to a subset of states, see [`LocomotionMachine::with_states`](machine::LocomotionMachine::with_states).
    pub fn with_states(mut self, states: &[states::StateId]) -> Self {
        self.machine = machine::LocomotionMachine::with_states(states);
        self
    }
}
