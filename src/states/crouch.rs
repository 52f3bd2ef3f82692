//! Lowered stance: Crouching, CrouchWalking and Sliding.

use bevy::prelude::*;

use super::{StateId, Tick, Transition};
use crate::backend::{BodyAccessExt, ForceMode};
use crate::config::horizontal;
use crate::cue::{CueKind, Stance, SLIDE_SOUND};

/// Lower the stance unless it is already low.
fn lower_stance(tick: &mut Tick, duration: f32) {
    if tick.ctx.is_crouching {
        return;
    }
    tick.cues.push(CueKind::Stance {
        stance: Stance::Crouched,
        duration,
    });
    tick.body
        .add_force(Vec3::NEG_Y * tick.config.crouch_down_force, ForceMode::Impulse);
    tick.ctx.is_crouching = true;
}

pub(super) fn crouch_enter(tick: &mut Tick) {
    let duration = tick.config.to_crouch_speed;
    lower_stance(tick, duration);
}

/// Stand back up unless `next` keeps the stance low.
pub(super) fn exit_stance(next: StateId, tick: &mut Tick) {
    if next.is_crouched() || !tick.ctx.is_crouching {
        return;
    }
    tick.cues.push(CueKind::Stance {
        stance: Stance::Standing,
        duration: tick.config.to_crouch_speed,
    });
    tick.ctx.is_crouching = false;
}

pub(super) fn crouching_update(tick: &mut Tick) -> Transition {
    tick.body.stop_horizontal();
    let ctx = &tick.ctx;
    if !ctx.should_crouch && ctx.can_stand {
        Some(StateId::Idle)
    } else if ctx.has_movement_intent() {
        Some(StateId::CrouchWalking)
    } else {
        None
    }
}

pub(super) fn crouch_walking_update(tick: &mut Tick) -> Transition {
    let config = tick.config;
    tick.body
        .clamp_horizontal_speed(config.speed_cap * config.crouch_speed_modifier);

    let ctx = &tick.ctx;
    let stays_low = ctx.should_crouch || !ctx.can_stand;
    if !ctx.has_movement_intent() {
        Some(if stays_low {
            StateId::Crouching
        } else {
            StateId::Idle
        })
    } else if !stays_low {
        Some(StateId::Moving)
    } else {
        None
    }
}

/// A decaying slide along the facing direction at entry.
#[derive(Debug, Clone)]
pub struct SlideData {
    pub direction: Vec3,
    /// Decays every fixed step; the slide ends below `slide_stop_threshold`.
    pub multiplier: f32,
}

impl SlideData {
    pub(super) fn enter(tick: &mut Tick) -> Self {
        let direction = horizontal(tick.ctx.forward()).normalize_or_zero();
        tick.cues.push(CueKind::PlaySound(SLIDE_SOUND));
        let duration = tick.config.slide_transition_speed;
        lower_stance(tick, duration);
        Self {
            direction,
            multiplier: tick.config.slide_speed,
        }
    }

    fn permitted(&self, tick: &Tick) -> bool {
        let config = tick.config;
        tick.ctx.should_crouch
            && self.multiplier > config.slide_stop_threshold
            && !tick.ctx.on_slope
            && (!config.slide_uses_stamina || tick.ctx.current_stamina > 0.0)
    }

    pub(super) fn fixed_update(&mut self, tick: &mut Tick) -> Transition {
        if !self.permitted(tick) {
            return None;
        }
        let config = tick.config;
        tick.body.add_force(
            self.direction * config.slide_speed * self.multiplier,
            ForceMode::Force,
        );
        self.multiplier *= config.slide_speed_reduction;
        if config.slide_uses_stamina {
            tick.ctx.drain_stamina(config, tick.dt);
        }
        None
    }

    pub(super) fn update(&mut self, tick: &mut Tick) -> Transition {
        tick.body.clamp_horizontal_speed(tick.config.speed_cap);
        if self.permitted(tick) {
            None
        } else if tick.ctx.should_crouch || !tick.ctx.can_stand {
            Some(StateId::Crouching)
        } else {
            Some(StateId::Idle)
        }
    }

    pub(super) fn exit(&mut self, next: StateId, tick: &mut Tick) {
        tick.cues.push(CueKind::StopSound(SLIDE_SOUND));
        exit_stance(next, tick);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::LocomotionState;
    use super::*;
    use crate::config::ControllerConfig;

    const DT: f32 = 0.02;

    fn stance_cues(cues: &[CueKind]) -> Vec<Stance> {
        cues.iter()
            .filter_map(|cue| match cue {
                CueKind::Stance { stance, .. } => Some(*stance),
                _ => None,
            })
            .collect()
    }

    // ==================== Crouch Tests ====================

    #[test]
    fn crouch_lowers_stance_once() {
        let config = ControllerConfig::default();
        let mut h = Harness::new(config);
        h.ctx.should_crouch = true;

        let mut state = LocomotionState::enter(StateId::Crouching, &mut h.tick(DT));
        assert!(h.ctx.is_crouching);
        assert_eq!(
            h.body.impulses,
            vec![Vec3::NEG_Y * config.crouch_down_force]
        );

        state.exit(StateId::CrouchWalking, &mut h.tick(DT));
        LocomotionState::enter(StateId::CrouchWalking, &mut h.tick(DT));
        assert_eq!(stance_cues(&h.cues), vec![Stance::Crouched]);
        assert_eq!(h.body.impulses.len(), 1);
    }

    #[test]
    fn crouching_stops_sliding_around_and_stands_when_clear() {
        let mut h = Harness::new(ControllerConfig::default());
        h.ctx.should_crouch = true;
        h.body.velocity = Vec3::new(2.0, -1.0, 1.0);
        let mut state = LocomotionState::enter(StateId::Crouching, &mut h.tick(DT));

        assert_eq!(state.update(&mut h.tick(DT)), None);
        assert_eq!(h.body.horizontal_velocity(), Vec3::ZERO);

        h.ctx.should_crouch = false;
        h.ctx.can_stand = false;
        assert_eq!(state.update(&mut h.tick(DT)), None, "ceiling overhead");

        h.ctx.can_stand = true;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Idle));

        state.exit(StateId::Idle, &mut h.tick(DT));
        assert!(!h.ctx.is_crouching);
        assert_eq!(
            stance_cues(&h.cues),
            vec![Stance::Crouched, Stance::Standing]
        );
    }

    #[test]
    fn crouch_walk_transitions() {
        let mut h = Harness::new(ControllerConfig::default());
        h.ctx.should_crouch = true;
        h.ctx.movement_dir = Vec3::Z;
        let mut state = LocomotionState::enter(StateId::Crouching, &mut h.tick(DT));
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::CrouchWalking));

        let mut state = LocomotionState::enter(StateId::CrouchWalking, &mut h.tick(DT));
        assert_eq!(state.update(&mut h.tick(DT)), None);

        h.ctx.should_crouch = false;
        h.ctx.can_stand = false;
        assert_eq!(state.update(&mut h.tick(DT)), None);

        h.ctx.can_stand = true;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Moving));

        h.ctx.movement_dir = Vec3::ZERO;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Idle));

        h.ctx.should_crouch = true;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Crouching));
    }

    #[test]
    fn crouch_walk_is_slower_than_walking() {
        let config = ControllerConfig::default();
        let mut h = Harness::new(config);
        h.ctx.should_crouch = true;
        h.ctx.movement_dir = Vec3::Z;
        let mut state = LocomotionState::enter(StateId::CrouchWalking, &mut h.tick(DT));
        h.body.impulses.clear();

        state.fixed_update(&mut h.tick(DT));
        let expected = config.move_speed * config.crouch_speed_modifier * DT;
        assert!(h.body.impulses[0].abs_diff_eq(Vec3::NEG_Z * expected, 1e-5));

        h.body.velocity = Vec3::new(0.0, 0.0, -10.0);
        state.update(&mut h.tick(DT));
        let cap = config.speed_cap * config.crouch_speed_modifier;
        assert!(h.body.horizontal_velocity().length() <= cap + 1e-4);
    }

    // ==================== Slide Tests ====================

    #[test]
    fn slide_plays_sound_and_lowers_stance() {
        let config = ControllerConfig::default();
        let mut h = Harness::new(config);
        h.ctx.should_crouch = true;
        let state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));

        let LocomotionState::Sliding(data) = &state else {
            panic!("expected slide, got {:?}", state.id());
        };
        assert_eq!(data.multiplier, config.slide_speed);
        assert!(data.direction.abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert_eq!(h.cues[0], CueKind::PlaySound(SLIDE_SOUND));
        assert_eq!(
            h.cues[1],
            CueKind::Stance {
                stance: Stance::Crouched,
                duration: config.slide_transition_speed
            }
        );
    }

    #[test]
    fn slide_decays_then_ends_within_one_tick() {
        let config = ControllerConfig::default();
        let mut h = Harness::new(config);
        h.ctx.should_crouch = true;
        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));

        let multiplier = |state: &LocomotionState| match state {
            LocomotionState::Sliding(data) => data.multiplier,
            _ => unreachable!(),
        };

        let mut last = multiplier(&state);
        let mut ticks = 0;
        while multiplier(&state) > config.slide_stop_threshold {
            state.fixed_update(&mut h.tick(DT));
            let now = multiplier(&state);
            assert!(now < last);
            last = now;
            ticks += 1;
            assert!(ticks < 1_000, "slide never decayed");
        }

        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Crouching), "crouch held");
        h.ctx.should_crouch = false;
        h.ctx.can_stand = false;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Crouching));
        h.ctx.can_stand = true;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Idle));
    }

    #[test]
    fn slide_pushes_along_entry_direction() {
        let config = ControllerConfig::default();
        let mut h = Harness::new(config);
        h.ctx.should_crouch = true;
        h.ctx.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));

        h.ctx.rotation = Quat::IDENTITY;
        state.fixed_update(&mut h.tick(DT));
        let expected = Vec3::NEG_X * config.slide_speed * config.slide_speed;
        assert!(h.body.total_force().abs_diff_eq(expected, 1e-3));
    }

    #[test]
    fn releasing_crouch_ends_slide() {
        let mut h = Harness::new(ControllerConfig::default());
        h.ctx.should_crouch = true;
        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));
        assert_eq!(state.update(&mut h.tick(DT)), None);

        h.ctx.should_crouch = false;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Idle));
    }

    #[test]
    fn stamina_gated_slide_drains_and_stops() {
        let mut config = ControllerConfig::default();
        config.slide_uses_stamina = true;
        let mut h = Harness::new(config);
        h.ctx.should_crouch = true;
        h.ctx.current_stamina = 0.01;
        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));

        state.fixed_update(&mut h.tick(DT));
        assert_eq!(h.ctx.current_stamina, 0.0);
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Crouching));
        h.ctx.should_crouch = false;
        assert_eq!(state.update(&mut h.tick(DT)), Some(StateId::Idle));
    }

    #[test]
    fn exhausted_slide_with_crouch_held_stays_low() {
        let mut config = ControllerConfig::default();
        config.slide_uses_stamina = true;
        let mut h = Harness::new(config);
        h.ctx.should_crouch = true;
        h.ctx.current_stamina = 0.0;
        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));

        let next = state.update(&mut h.tick(DT));
        assert_eq!(next, Some(StateId::Crouching));
        state.exit(StateId::Crouching, &mut h.tick(DT));
        let mut state = LocomotionState::enter(StateId::Crouching, &mut h.tick(DT));
        assert_eq!(state.update(&mut h.tick(DT)), None);

        assert!(h.ctx.is_crouching);
        assert_eq!(stance_cues(&h.cues), vec![Stance::Crouched]);
    }

    #[test]
    fn blocked_slide_exit_crouches_without_standing() {
        let mut h = Harness::new(ControllerConfig::default());
        h.ctx.should_crouch = true;
        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));

        h.ctx.should_crouch = false;
        h.ctx.can_stand = false;
        let next = state.update(&mut h.tick(DT));
        assert_eq!(next, Some(StateId::Crouching));
        state.exit(StateId::Crouching, &mut h.tick(DT));
        let mut state = LocomotionState::enter(StateId::Crouching, &mut h.tick(DT));
        assert_eq!(state.update(&mut h.tick(DT)), None, "ceiling overhead");

        assert!(h.ctx.is_crouching);
        assert_eq!(stance_cues(&h.cues), vec![Stance::Crouched]);
    }

    #[test]
    fn slide_exit_keeps_stance_low_for_crouching() {
        let mut h = Harness::new(ControllerConfig::default());
        h.ctx.should_crouch = true;
        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));

        state.exit(StateId::Crouching, &mut h.tick(DT));
        assert!(h.ctx.is_crouching);
        assert_eq!(h.cues.last(), Some(&CueKind::StopSound(SLIDE_SOUND)));

        let mut state = LocomotionState::enter(StateId::Sliding, &mut h.tick(DT));
        state.exit(StateId::Idle, &mut h.tick(DT));
        assert!(!h.ctx.is_crouching);
        assert_eq!(stance_cues(&h.cues), vec![Stance::Crouched, Stance::Standing]);
    }
}
