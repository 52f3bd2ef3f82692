//! Core locomotion systems.
//!
//! The machine runs in exclusive systems generic over the physics backend:
//! components are copied out of the world, the machine ticks against a
//! [`BackendBody`], then the components are written back and the collected
//! cues are sent as [`LocomotionCue`] events.

use bevy::prelude::*;

use crate::backend::{BackendBody, BodyAccessExt, CharacterPhysicsBackend};
use crate::config::{CharacterController, ControllerConfig, RopeConfig};
use crate::cue::{CueBuffer, LocomotionCue};
use crate::detection::{refresh_context, SensorReadings};
use crate::error::LocomotionError;
use crate::intent::MovementIntent;
use crate::machine::LocomotionMachine;
use crate::spring::{sample_rope, GrappleRope};
use crate::state::{Airborne, Grounded, TouchingWall};
use crate::states::Tick;

/// Components the machine reads and writes, copied out of the world.
struct Character {
    entity: Entity,
    ctx: CharacterController,
    config: ControllerConfig,
    rope: RopeConfig,
    intent: MovementIntent,
    machine: LocomotionMachine,
}

fn collect_characters(world: &mut World) -> Vec<(Character, SensorReadings)> {
    world
        .query::<(
            Entity,
            &CharacterController,
            &ControllerConfig,
            &RopeConfig,
            &MovementIntent,
            &LocomotionMachine,
            &SensorReadings,
        )>()
        .iter(world)
        .map(|(entity, ctx, config, rope, intent, machine, readings)| {
            (
                Character {
                    entity,
                    ctx: ctx.clone(),
                    config: *config,
                    rope: rope.clone(),
                    intent: intent.clone(),
                    machine: machine.clone(),
                },
                readings.clone(),
            )
        })
        .collect()
}

fn write_back(world: &mut World, character: Character, cues: CueBuffer) {
    let Character {
        entity,
        ctx,
        intent,
        machine,
        ..
    } = character;
    if let Some(mut c) = world.get_mut::<CharacterController>(entity) {
        *c = ctx;
    }
    if let Some(mut i) = world.get_mut::<MovementIntent>(entity) {
        *i = intent;
    }
    if let Some(mut m) = world.get_mut::<LocomotionMachine>(entity) {
        *m = machine;
    }
    world.send_event_batch(cues.into_iter().map(|kind| LocomotionCue { entity, kind }));
}

fn fail(entity: Entity, err: LocomotionError) -> ! {
    error!("locomotion of {entity} failed: {err}");
    panic!("{err}");
}

/// Refresh the context from sensor readings and run the variable-rate tick.
///
/// Initializes machines on their first tick.
pub fn run_locomotion_update<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = world.resource::<Time>().delta_secs();

    for (mut character, readings) in collect_characters(world) {
        let entity = character.entity;
        let sensors = refresh_context(&mut character.ctx, &readings, &character.config);
        let edges = character.intent.take_edges();
        let mut cues = CueBuffer::new();

        let result = {
            let mut body = BackendBody::<B>::new(world, entity);
            let mut tick = Tick {
                ctx: &mut character.ctx,
                config: &character.config,
                rope: &character.rope,
                body: &mut body,
                cues: &mut cues,
                dt,
                registered: character.machine.registered(),
            };
            character.machine.init(&mut tick);
            character
                .machine
                .run_update(&mut tick, sensors, &character.intent, edges)
        };
        if let Err(err) = result {
            fail(entity, err);
        }

        write_back(world, character, cues);
    }
}

/// Run the fixed-rate tick: state forces, then the wall-ahead stop.
pub fn run_locomotion_fixed_update<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    for (mut character, _) in collect_characters(world) {
        if !character.machine.is_initialized() {
            continue;
        }
        let entity = character.entity;
        let mut cues = CueBuffer::new();

        let result = {
            let mut body = BackendBody::<B>::new(world, entity);
            let mut tick = Tick {
                ctx: &mut character.ctx,
                config: &character.config,
                rope: &character.rope,
                body: &mut body,
                cues: &mut cues,
                dt,
                registered: character.machine.registered(),
            };
            let result = character.machine.fixed_update(&mut tick);
            if tick.ctx.blocked_ahead {
                tick.body.stop_horizontal();
            }
            result
        };
        if let Err(err) = result {
            fail(entity, err);
        }

        write_back(world, character, cues);
    }
}

/// Sync the [`Grounded`], [`Airborne`] and [`TouchingWall`] markers.
pub fn sync_state_markers(
    mut commands: Commands,
    q: Query<(
        Entity,
        &CharacterController,
        Has<Grounded>,
        Has<Airborne>,
        Option<&TouchingWall>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, touching_wall) in &q {
        let mut entity_commands = commands.entity(entity);

        if controller.is_grounded {
            if !has_grounded {
                entity_commands.insert(Grounded);
            }
            if has_airborne {
                entity_commands.remove::<Airborne>();
            }
        } else {
            if !has_airborne {
                entity_commands.insert(Airborne);
            }
            if has_grounded {
                entity_commands.remove::<Grounded>();
            }
        }

        match controller.wall() {
            Some(wall) => {
                let marker = TouchingWall::new(wall.side, wall.hit.normal);
                let changed = touching_wall
                    .is_none_or(|t| t.side != marker.side || t.normal != marker.normal);
                if changed {
                    entity_commands.insert(marker);
                }
            }
            None => {
                if touching_wall.is_some() {
                    entity_commands.remove::<TouchingWall>();
                }
            }
        }
    }
}

/// Sample the grapple rope of grappling characters; clear it otherwise.
pub fn sample_grapple_ropes(
    mut q: Query<(
        &LocomotionMachine,
        &CharacterController,
        &RopeConfig,
        &mut GrappleRope,
    )>,
) {
    for (machine, controller, rope_config, mut rope) in &mut q {
        match machine.current().grapple() {
            Some(grapple) => sample_rope(
                controller.rope_origin,
                &grapple.spring,
                grapple.initial_distance,
                rope_config,
                &mut rope.points,
            ),
            None => {
                if !rope.points.is_empty() {
                    rope.points.clear();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoOpBackendPlugin;
    use crate::collision::CollisionData;
    use crate::detection::WallSide;
    use crate::states::StateId;

    /// Backend with no physics: zero velocity, gravity on, positions ignored.
    struct NullBackend;

    impl CharacterPhysicsBackend for NullBackend {
        fn plugin() -> impl Plugin {
            NoOpBackendPlugin
        }
        fn get_velocity(_: &World, _: Entity) -> Vec3 {
            Vec3::ZERO
        }
        fn set_velocity(_: &mut World, _: Entity, _: Vec3) {}
        fn apply_impulse(_: &mut World, _: Entity, _: Vec3) {}
        fn apply_force(_: &mut World, _: Entity, _: Vec3) {}
        fn gravity_enabled(_: &World, _: Entity) -> bool {
            true
        }
        fn set_gravity_enabled(_: &mut World, _: Entity, _: bool) {}
        fn get_position(_: &World, _: Entity) -> Vec3 {
            Vec3::ZERO
        }
        fn set_position(_: &mut World, _: Entity, _: Vec3) {}
        fn get_fixed_timestep(_: &World) -> f32 {
            1.0 / 60.0
        }
    }

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_event::<LocomotionCue>();
        app.add_systems(
            Update,
            (run_locomotion_update::<NullBackend>, sync_state_markers).chain(),
        );
        app
    }

    fn spawn_character(app: &mut App, readings: SensorReadings) -> Entity {
        app.world_mut()
            .spawn((
                CharacterController::new(),
                ControllerConfig::default(),
                RopeConfig::default(),
                MovementIntent::new(),
                LocomotionMachine::new(),
                readings,
                GrappleRope::default(),
            ))
            .id()
    }

    fn grounded_readings() -> SensorReadings {
        SensorReadings {
            ground_ray: Some(CollisionData::new(0.05, Vec3::Y, Vec3::ZERO, None)),
            ground_overlap: true,
            ..default()
        }
    }

    #[test]
    fn first_update_initializes_the_machine() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app, grounded_readings());
        app.update();

        let machine = app.world().get::<LocomotionMachine>(entity).unwrap();
        assert!(machine.is_initialized());
        assert_eq!(machine.id(), StateId::Idle);
        assert!(app.world().get::<Grounded>(entity).is_some());
        assert!(app.world().get::<Airborne>(entity).is_none());
    }

    #[test]
    fn intent_drives_the_machine() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app, grounded_readings());
        app.update();

        app.world_mut()
            .get_mut::<MovementIntent>(entity)
            .unwrap()
            .set_direction(Vec3::Z);
        app.update();
        assert_eq!(
            app.world().get::<LocomotionMachine>(entity).unwrap().id(),
            StateId::Moving
        );
    }

    #[test]
    fn no_ground_falls_and_marks_airborne() {
        let mut app = create_test_app();
        let entity = spawn_character(&mut app, SensorReadings::default());
        app.update();

        assert_eq!(
            app.world().get::<LocomotionMachine>(entity).unwrap().id(),
            StateId::Falling
        );
        assert!(app.world().get::<Airborne>(entity).is_some());
    }

    #[test]
    fn wall_marker_follows_side_walls() {
        let mut app = create_test_app();
        let entity = spawn_character(
            &mut app,
            SensorReadings {
                wall_left: Some(CollisionData::new(0.3, Vec3::X, Vec3::NEG_X, None)),
                ..default()
            },
        );
        app.update();

        let wall = app.world().get::<TouchingWall>(entity).copied().unwrap();
        assert_eq!(wall.side, WallSide::Left);

        app.world_mut().get_mut::<SensorReadings>(entity).unwrap().wall_left = None;
        app.update();
        assert!(app.world().get::<TouchingWall>(entity).is_none());
    }

    #[test]
    fn rope_is_sampled_only_while_grappling() {
        let mut app = create_test_app();
        app.add_systems(PostUpdate, sample_grapple_ropes);
        let entity = spawn_character(
            &mut app,
            SensorReadings {
                aim: Some(crate::detection::AimReading {
                    origin: Vec3::Y,
                    direction: Vec3::NEG_Z,
                    hit: Some(Vec3::new(0.0, 1.0, -10.0)),
                }),
                ..grounded_readings()
            },
        );
        app.update();

        app.world_mut()
            .get_mut::<MovementIntent>(entity)
            .unwrap()
            .set_grapple_pressed(true);
        app.update();
        let rope = app.world().get::<GrappleRope>(entity).unwrap();
        assert_eq!(rope.points.len(), RopeConfig::default().quality);
    }
}
