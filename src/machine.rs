//! The locomotion state machine.
//!
//! [`LocomotionMachine`] owns the active [`LocomotionState`] and the set of
//! states it may enter. Each frame the driving system refreshes the
//! [`CharacterController`](crate::config::CharacterController) from sensors,
//! then calls [`LocomotionMachine::run_update`]; each fixed step it calls
//! [`LocomotionMachine::fixed_update`].
//!
//! # Frame order
//!
//! 1. Grounded edge is dispatched to its listeners.
//! 2. Slope gravity is toggled when slope gravity is disabled.
//! 3. Input edges are applied (crouch, jump, air jump, grapple).
//! 4. The active state's `update` runs.
//! 5. Ground modes without ground or slope contact are forced into Falling.
//! 6. Stamina regenerates unless a draining state is active or sprint is held.

use bevy::prelude::*;

use crate::detection::SensorEdges;
use crate::error::LocomotionError;
use crate::intent::{IntentEdges, MovementIntent};
use crate::states::{
    run_init_listener, subscribes_at_init, ContextEvent, LocomotionState, StateId, StateSet, Tick,
    Transition,
};

/// Active locomotion state and registered states for one character.
#[derive(Component, Debug, Clone)]
pub struct LocomotionMachine {
    state: LocomotionState,
    registered: StateSet,
    previous: Option<StateId>,
    initialized: bool,
}

impl Default for LocomotionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocomotionMachine {
    /// A machine with every state registered.
    pub fn new() -> Self {
        Self {
            state: LocomotionState::Idle,
            registered: StateSet::ALL,
            previous: None,
            initialized: false,
        }
    }

    /// A machine limited to `states`. Idle and Falling are always registered.
    ///
    /// Leaving out an ability such as [`StateId::WallRunning`] or
    /// [`StateId::Grappling`] disables it. Leaving out a state that another
    /// registered state transitions to is an integration error and fails the
    /// transition with [`LocomotionError::UnregisteredState`].
    pub fn with_states(states: &[StateId]) -> Self {
        let mut registered: StateSet = states.iter().copied().collect();
        registered.insert(StateId::Idle);
        registered.insert(StateId::Falling);
        Self {
            registered,
            ..Self::new()
        }
    }

    pub fn current(&self) -> &LocomotionState {
        &self.state
    }

    pub fn id(&self) -> StateId {
        self.state.id()
    }

    /// State active before the last transition.
    pub fn previous(&self) -> Option<StateId> {
        self.previous
    }

    pub fn registered(&self) -> StateSet {
        self.registered
    }

    pub fn is_registered(&self, id: StateId) -> bool {
        self.registered.contains(id)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Fill stamina, arm ability gates and enter Idle. Runs once.
    pub fn init(&mut self, tick: &mut Tick) {
        if self.initialized {
            return;
        }
        let config = tick.config;
        tick.ctx
            .set_stamina(config.stamina_capacity, config.stamina_capacity);
        tick.ctx.can_wall_run = true;
        tick.ctx.can_grapple = true;
        self.state = LocomotionState::enter(StateId::Idle, tick);
        self.previous = None;
        self.initialized = true;
    }

    /// Exit the active state and enter `next`.
    pub fn change_state(&mut self, next: StateId, tick: &mut Tick) -> Result<(), LocomotionError> {
        if !self.registered.contains(next) {
            return Err(LocomotionError::UnregisteredState(next));
        }
        let from = self.state.id();
        self.state.exit(next, tick);
        self.state = LocomotionState::enter(next, tick);
        self.previous = Some(from);
        debug!("locomotion {from:?} -> {next:?}");
        Ok(())
    }

    fn apply(&mut self, transition: Transition, tick: &mut Tick) -> Result<(), LocomotionError> {
        match transition {
            Some(next) => self.change_state(next, tick),
            None => Ok(()),
        }
    }

    /// Deliver `event` to machine-lifetime listeners, then to the active state.
    ///
    /// The first transition requested wins; the active state only sees the
    /// event when no listener asked for a transition.
    pub fn dispatch(&mut self, event: ContextEvent, tick: &mut Tick) -> Result<(), LocomotionError> {
        let active = self.state.id();
        let mut transition = None;
        for listener in self.registered.iter() {
            if !subscribes_at_init(listener, event) {
                continue;
            }
            let requested = run_init_listener(listener, event, active, tick);
            transition = transition.or(requested);
        }
        if transition.is_none() {
            transition = self.state.on_event(event, tick);
        }
        self.apply(transition, tick)
    }

    /// One variable-rate tick. See the module docs for the order of work.
    pub fn run_update(
        &mut self,
        tick: &mut Tick,
        sensors: SensorEdges,
        intent: &MovementIntent,
        input: IntentEdges,
    ) -> Result<(), LocomotionError> {
        let config = tick.config;

        if sensors.grounded {
            self.dispatch(ContextEvent::Grounded, tick)?;
        }

        if !config.slope_gravity && !tick.ctx.wall_running {
            let on_slope = tick.ctx.on_slope;
            tick.body.set_use_gravity(!on_slope);
        }

        self.apply_input(tick, intent, input)?;

        let requested = self.state.update(tick);
        let id = self.state.id();
        let lost_ground = !tick.ctx.is_grounded && !tick.ctx.on_slope && id.is_ground_mode();
        let transition = if lost_ground {
            Some(StateId::Falling)
        } else {
            requested
        };
        self.apply(transition, tick)?;

        if !self.is_draining_stamina(tick) {
            tick.ctx.regenerate_stamina(config, tick.dt);
        }
        Ok(())
    }

    /// One fixed-rate tick of the active state.
    pub fn fixed_update(&mut self, tick: &mut Tick) -> Result<(), LocomotionError> {
        let transition = self.state.fixed_update(tick);
        self.apply(transition, tick)
    }

    fn apply_input(
        &mut self,
        tick: &mut Tick,
        intent: &MovementIntent,
        input: IntentEdges,
    ) -> Result<(), LocomotionError> {
        let config = tick.config;
        let ctx = &mut *tick.ctx;
        ctx.movement_dir = intent.direction;
        ctx.sprinting = intent.sprint && (intent.direction.z > 0.0 || config.multi_dir_sprint);

        if input.crouch_pressed && ctx.is_grounded {
            ctx.should_crouch = true;
        }
        if input.crouch_released {
            ctx.should_crouch = false;
        }
        if input.jump_released {
            ctx.jump_key_down = false;
        }

        let id = self.state.id();
        if input.jump_pressed {
            if tick.ctx.is_grounded && id.is_ground_mode() {
                let blocked = id.is_crouched() && !tick.ctx.can_stand;
                if !blocked && self.registered.contains(StateId::Jumping) {
                    tick.ctx.jump_key_down = true;
                    self.change_state(StateId::Jumping, tick)?;
                }
            } else if id.is_airborne_mode() {
                tick.ctx.jump_key_down = true;
                self.dispatch(ContextEvent::AirJump, tick)?;
            }
        }

        if input.grapple_pressed
            && tick.ctx.can_grapple
            && self.registered.contains(StateId::Grappling)
            && self.state.id() != StateId::Grappling
        {
            self.change_state(StateId::Grappling, tick)?;
        }
        Ok(())
    }

    /// A held sprint blocks regeneration even once stamina has hit zero.
    fn is_draining_stamina(&self, tick: &Tick) -> bool {
        let config = tick.config;
        match self.state.id() {
            StateId::Moving => config.sprint_uses_stamina && tick.ctx.last_sprinting,
            StateId::Sprinting => config.sprint_uses_stamina,
            StateId::Sliding => config.slide_uses_stamina,
            _ => false,
        }
    }
}
