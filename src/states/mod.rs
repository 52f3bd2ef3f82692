//! The locomotion state library.
//!
//! Each movement mode is one variant of [`LocomotionState`]. A variant only
//! holds data scoped to one occupancy of that mode (timers, cached
//! directions, decaying multipliers, the grapple spring); the data is built
//! fresh by `enter` and dropped on `exit`. Everything that outlives an
//! occupancy lives in [`CharacterController`].
//!
//! Hooks never change state themselves. They return the state they want to
//! move to and [`LocomotionMachine`](crate::machine::LocomotionMachine)
//! performs the exit and enter.

use bevy::prelude::*;

use crate::backend::{BodyAccess, BodyAccessExt};
use crate::config::{CharacterController, ControllerConfig, RopeConfig};
use crate::cue::CueBuffer;

mod air;
mod crouch;
mod ground;
mod grapple;
mod wall_run;

pub use air::{FallData, JumpData};
pub use crouch::SlideData;
pub use ground::{MoveData, SprintData};
pub use grapple::GrappleData;
pub use wall_run::WallRunData;

/// Identifies a locomotion state without its occupancy data.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Idle,
    Moving,
    Sprinting,
    Jumping,
    AirJumping,
    Falling,
    OnSlope,
    Crouching,
    CrouchWalking,
    Sliding,
    WallRunning,
    Grappling,
}

impl StateId {
    pub const ALL: [StateId; 12] = [
        StateId::Idle,
        StateId::Moving,
        StateId::Sprinting,
        StateId::Jumping,
        StateId::AirJumping,
        StateId::Falling,
        StateId::OnSlope,
        StateId::Crouching,
        StateId::CrouchWalking,
        StateId::Sliding,
        StateId::WallRunning,
        StateId::Grappling,
    ];

    /// States that only make sense with ground under the feet.
    ///
    /// These are forced into Falling when ground and slope contact are lost.
    pub fn is_ground_mode(self) -> bool {
        matches!(
            self,
            StateId::Idle
                | StateId::Moving
                | StateId::Sprinting
                | StateId::OnSlope
                | StateId::Crouching
                | StateId::CrouchWalking
                | StateId::Sliding
        )
    }

    /// States that end on landing.
    pub fn is_airborne_mode(self) -> bool {
        !self.is_ground_mode()
    }

    /// States that keep the stance lowered.
    pub fn is_crouched(self) -> bool {
        matches!(
            self,
            StateId::Crouching | StateId::CrouchWalking | StateId::Sliding
        )
    }

    pub(crate) fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// A set of [`StateId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSet(u16);

impl StateSet {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(0x0FFF);

    pub fn contains(self, id: StateId) -> bool {
        self.0 & id.bit() != 0
    }

    pub fn insert(&mut self, id: StateId) {
        self.0 |= id.bit();
    }

    pub fn iter(self) -> impl Iterator<Item = StateId> {
        StateId::ALL.into_iter().filter(move |id| self.contains(*id))
    }
}

impl FromIterator<StateId> for StateSet {
    fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
        let mut set = StateSet::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Events published by the character context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextEvent {
    /// Ground contact went from false to true.
    Grounded,
    /// Jump was pressed while airborne.
    AirJump,
}

/// Everything a state hook may touch during one call.
pub struct Tick<'a> {
    pub ctx: &'a mut CharacterController,
    pub config: &'a ControllerConfig,
    pub rope: &'a RopeConfig,
    pub body: &'a mut dyn BodyAccess,
    pub cues: &'a mut CueBuffer,
    /// Seconds covered by this tick: variable delta in `update`, fixed step in `fixed_update`.
    pub dt: f32,
    /// States the owning machine can transition to.
    pub registered: StateSet,
}

/// State a hook asks to move to.
pub type Transition = Option<StateId>;

/// The active movement mode and its occupancy data.
#[derive(Debug, Clone)]
pub enum LocomotionState {
    Idle,
    Moving(MoveData),
    Sprinting(SprintData),
    Jumping(JumpData),
    AirJumping(JumpData),
    Falling(FallData),
    OnSlope,
    Crouching,
    CrouchWalking,
    Sliding(SlideData),
    WallRunning(WallRunData),
    Grappling(GrappleData),
}

impl LocomotionState {
    pub fn id(&self) -> StateId {
        match self {
            LocomotionState::Idle => StateId::Idle,
            LocomotionState::Moving(_) => StateId::Moving,
            LocomotionState::Sprinting(_) => StateId::Sprinting,
            LocomotionState::Jumping(_) => StateId::Jumping,
            LocomotionState::AirJumping(_) => StateId::AirJumping,
            LocomotionState::Falling(_) => StateId::Falling,
            LocomotionState::OnSlope => StateId::OnSlope,
            LocomotionState::Crouching => StateId::Crouching,
            LocomotionState::CrouchWalking => StateId::CrouchWalking,
            LocomotionState::Sliding(_) => StateId::Sliding,
            LocomotionState::WallRunning(_) => StateId::WallRunning,
            LocomotionState::Grappling(_) => StateId::Grappling,
        }
    }

    /// Grapple data while grappling.
    pub fn grapple(&self) -> Option<&GrappleData> {
        match self {
            LocomotionState::Grappling(data) => Some(data),
            _ => None,
        }
    }

    /// Build the state `id` and run its enter hook.
    pub(crate) fn enter(id: StateId, tick: &mut Tick) -> Self {
        match id {
            StateId::Idle => {
                ground::idle_enter(tick);
                LocomotionState::Idle
            }
            StateId::Moving => LocomotionState::Moving(MoveData::enter(tick)),
            StateId::Sprinting => LocomotionState::Sprinting(SprintData::enter(tick)),
            StateId::Jumping => LocomotionState::Jumping(JumpData::enter_ground_jump(tick)),
            StateId::AirJumping => LocomotionState::AirJumping(JumpData::enter_air_jump(tick)),
            StateId::Falling => LocomotionState::Falling(FallData::default()),
            StateId::OnSlope => {
                ground::on_slope_enter(tick);
                LocomotionState::OnSlope
            }
            StateId::Crouching => {
                crouch::crouch_enter(tick);
                LocomotionState::Crouching
            }
            StateId::CrouchWalking => {
                crouch::crouch_enter(tick);
                LocomotionState::CrouchWalking
            }
            StateId::Sliding => LocomotionState::Sliding(SlideData::enter(tick)),
            StateId::WallRunning => LocomotionState::WallRunning(WallRunData::enter(tick)),
            StateId::Grappling => LocomotionState::Grappling(GrappleData::enter(tick)),
        }
    }

    /// Release everything this occupancy started. `next` is the incoming state.
    pub(crate) fn exit(&mut self, next: StateId, tick: &mut Tick) {
        match self {
            LocomotionState::Crouching | LocomotionState::CrouchWalking => {
                crouch::exit_stance(next, tick)
            }
            LocomotionState::Sliding(data) => data.exit(next, tick),
            LocomotionState::WallRunning(data) => data.exit(tick),
            LocomotionState::Grappling(data) => data.exit(tick),
            _ => {}
        }
    }

    /// Variable-rate logic: transitions, caps and bookkeeping.
    pub(crate) fn update(&mut self, tick: &mut Tick) -> Transition {
        match self {
            LocomotionState::Idle => ground::idle_update(tick),
            LocomotionState::Moving(data) => data.update(tick),
            LocomotionState::Sprinting(data) => data.update(tick),
            LocomotionState::Jumping(_) | LocomotionState::AirJumping(_) => None,
            LocomotionState::Falling(data) => data.update(tick),
            LocomotionState::OnSlope => ground::on_slope_update(tick),
            LocomotionState::Crouching => crouch::crouching_update(tick),
            LocomotionState::CrouchWalking => crouch::crouch_walking_update(tick),
            LocomotionState::Sliding(data) => data.update(tick),
            LocomotionState::WallRunning(data) => data.update(tick),
            LocomotionState::Grappling(_) => None,
        }
    }

    /// Horizontal speed ceiling of this state, if it has one.
    pub fn horizontal_cap(&self, config: &ControllerConfig) -> Option<f32> {
        match self {
            LocomotionState::Moving(_)
            | LocomotionState::Sliding(_)
            | LocomotionState::WallRunning(_) => Some(config.speed_cap),
            LocomotionState::Sprinting(_) => Some(config.speed_cap * config.sprint_multiplier),
            LocomotionState::CrouchWalking => Some(config.speed_cap * config.crouch_speed_modifier),
            LocomotionState::Falling(_) => Some(config.max_in_air_speed),
            _ => None,
        }
    }

    /// Fixed-rate logic: forces and velocity writes, then the horizontal cap.
    pub(crate) fn fixed_update(&mut self, tick: &mut Tick) -> Transition {
        let transition = match self {
            LocomotionState::Idle => None,
            LocomotionState::Moving(data) => {
                ground::drive(tick, data.target_speed);
                None
            }
            LocomotionState::Sprinting(_) => {
                ground::drive_locked_sprint(tick);
                None
            }
            LocomotionState::Jumping(data) => data.fixed_update_ground_jump(tick),
            LocomotionState::AirJumping(data) => data.fixed_update_air_jump(tick),
            LocomotionState::Falling(data) => data.fixed_update(tick),
            LocomotionState::OnSlope => ground::on_slope_fixed_update(tick),
            LocomotionState::Crouching => None,
            LocomotionState::CrouchWalking => {
                let speed = tick.config.move_speed * tick.config.crouch_speed_modifier;
                ground::drive(tick, speed);
                None
            }
            LocomotionState::Sliding(data) => data.fixed_update(tick),
            LocomotionState::WallRunning(data) => data.fixed_update(tick),
            LocomotionState::Grappling(data) => data.fixed_update(tick),
        };
        if let Some(cap) = self.horizontal_cap(tick.config) {
            tick.body.clamp_horizontal_speed(cap);
        }
        transition
    }

    /// Subscriptions that only exist while this state is active.
    pub(crate) fn on_event(&mut self, event: ContextEvent, tick: &mut Tick) -> Transition {
        match (self, event) {
            (LocomotionState::WallRunning(data), ContextEvent::AirJump) => data.wall_jump(tick),
            _ => None,
        }
    }
}

/// States subscribed to `event` for the lifetime of the machine.
pub(crate) fn subscribes_at_init(id: StateId, event: ContextEvent) -> bool {
    matches!(
        (id, event),
        (StateId::Falling, ContextEvent::Grounded)
            | (StateId::Falling, ContextEvent::AirJump)
            | (StateId::WallRunning, ContextEvent::Grounded)
            | (StateId::Grappling, ContextEvent::Grounded)
    )
}

/// Run the machine-lifetime handler that `listener` registered for `event`.
///
/// These handlers fire whichever state is active, so each one checks that
/// it applies to `active` before acting.
pub(crate) fn run_init_listener(
    listener: StateId,
    event: ContextEvent,
    active: StateId,
    tick: &mut Tick,
) -> Transition {
    match (listener, event) {
        (StateId::Falling, ContextEvent::Grounded) => air::on_landed(active, tick),
        (StateId::Falling, ContextEvent::AirJump) => air::on_air_jump(active, tick),
        (StateId::WallRunning, ContextEvent::Grounded) => {
            tick.ctx.can_wall_run = true;
            None
        }
        (StateId::Grappling, ContextEvent::Grounded) => {
            tick.ctx.can_grapple = true;
            None
        }
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;

    #[test]
    fn ground_and_air_modes_partition_states() {
        for id in StateId::ALL {
            assert_ne!(id.is_ground_mode(), id.is_airborne_mode(), "{id:?}");
        }
        assert!(StateId::Sliding.is_ground_mode());
        assert!(StateId::WallRunning.is_airborne_mode());
        assert!(StateId::Grappling.is_airborne_mode());
    }

    #[test]
    fn state_set_tracks_membership() {
        let set: StateSet = [StateId::Idle, StateId::Falling].into_iter().collect();
        assert!(set.contains(StateId::Idle));
        assert!(set.contains(StateId::Falling));
        assert!(!set.contains(StateId::Grappling));
        assert_eq!(set.iter().count(), 2);
        assert_eq!(StateSet::ALL.iter().count(), 12);
    }

    #[test]
    fn only_declared_init_subscriptions() {
        let grounded: Vec<_> = StateId::ALL
            .into_iter()
            .filter(|id| subscribes_at_init(*id, ContextEvent::Grounded))
            .collect();
        assert_eq!(
            grounded,
            vec![StateId::Falling, StateId::WallRunning, StateId::Grappling]
        );

        let air_jump: Vec<_> = StateId::ALL
            .into_iter()
            .filter(|id| subscribes_at_init(*id, ContextEvent::AirJump))
            .collect();
        assert_eq!(air_jump, vec![StateId::Falling]);
    }

    #[test]
    fn fixed_step_caps_horizontal_speed() {
        let config = ControllerConfig::default().with_speed_cap(3.0);
        let mut h = Harness::new(config);
        h.ctx.movement_dir = Vec3::Z;
        let mut state = LocomotionState::enter(StateId::Moving, &mut h.tick(0.02));
        h.body.velocity = Vec3::new(0.0, -1.0, -9.0);

        for _ in 0..3 {
            state.fixed_update(&mut h.tick(0.02));
            assert!(h.body.horizontal_velocity().length() <= 3.0 + 1e-4);
        }
        assert_eq!(h.body.velocity.y, -1.0);
    }

    #[test]
    fn caps_follow_the_active_state() {
        let config = ControllerConfig::default();
        assert_eq!(LocomotionState::Idle.horizontal_cap(&config), None);
        assert_eq!(
            LocomotionState::CrouchWalking.horizontal_cap(&config),
            Some(config.speed_cap * config.crouch_speed_modifier)
        );
        assert_eq!(
            LocomotionState::Falling(FallData::default()).horizontal_cap(&config),
            Some(config.max_in_air_speed)
        );
    }
}
