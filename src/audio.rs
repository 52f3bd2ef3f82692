//! Named sound playback for locomotion cues.
//!
//! Sounds are registered by name in [`SoundBank`]. Each playing sound is an
//! audio entity tagged with [`SoundName`] so it can be found again to stop
//! it or to check whether it is still audible.

use std::collections::HashMap;

use bevy::prelude::*;
use rand::seq::SliceRandom;

use crate::cue::{CueKind, LocomotionCue, FOOTSTEP_SOUNDS};
use crate::error::LocomotionError;

/// Sound clips by name.
#[derive(Resource, Debug, Default)]
pub struct SoundBank {
    clips: HashMap<String, Handle<AudioSource>>,
}

/// Tags a playing sound with its name and the character that started it.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct SoundName {
    pub owner: Entity,
    pub name: String,
}

impl SoundBank {
    pub fn register(&mut self, name: impl Into<String>, clip: Handle<AudioSource>) {
        self.clips.insert(name.into(), clip);
    }

    pub fn get(&self, name: &str) -> Result<Handle<AudioSource>, LocomotionError> {
        self.clips
            .get(name)
            .cloned()
            .ok_or_else(|| LocomotionError::MissingSound(name.to_string()))
    }

    /// Spawn a one-shot player for `name`, owned by `owner`.
    pub fn play(
        &self,
        commands: &mut Commands,
        owner: Entity,
        name: &str,
    ) -> Result<Entity, LocomotionError> {
        let clip = self.get(name)?;
        Ok(commands
            .spawn((
                AudioPlayer::new(clip),
                PlaybackSettings::DESPAWN,
                SoundName {
                    owner,
                    name: name.to_string(),
                },
            ))
            .id())
    }

    /// Despawn every instance of `name` started by `owner`.
    pub fn stop(
        commands: &mut Commands,
        playing: &Query<(Entity, &SoundName)>,
        owner: Entity,
        name: &str,
    ) {
        for (entity, sound) in playing {
            if sound.owner == owner && sound.name == name {
                commands.entity(entity).despawn();
            }
        }
    }

    pub fn is_playing(playing: &Query<(Entity, &SoundName)>, owner: Entity, name: &str) -> bool {
        playing
            .iter()
            .any(|(_, sound)| sound.owner == owner && sound.name == name)
    }
}

/// Play and stop sounds requested by locomotion cues.
pub fn play_locomotion_sounds(
    mut commands: Commands,
    bank: Res<SoundBank>,
    mut cues: EventReader<LocomotionCue>,
    playing: Query<(Entity, &SoundName)>,
) {
    for cue in cues.read() {
        let owner = cue.entity;
        let result = match cue.kind {
            CueKind::PlaySound(name) => bank.play(&mut commands, owner, name).map(drop),
            CueKind::StopSound(name) => {
                SoundBank::stop(&mut commands, &playing, owner, name);
                Ok(())
            }
            CueKind::Footstep { skip_if_playing } => {
                let audible = FOOTSTEP_SOUNDS
                    .iter()
                    .any(|name| SoundBank::is_playing(&playing, owner, name));
                if skip_if_playing && audible {
                    Ok(())
                } else {
                    match FOOTSTEP_SOUNDS.choose(&mut rand::thread_rng()) {
                        Some(name) => bank.play(&mut commands, owner, name).map(drop),
                        None => Ok(()),
                    }
                }
            }
            _ => Ok(()),
        };
        if let Err(err) = result {
            warn!("{err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::SLIDE_SOUND;

    fn sound_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_event::<LocomotionCue>();
        app.init_resource::<SoundBank>();
        app.add_systems(Update, play_locomotion_sounds);
        app
    }

    fn sounds(app: &mut App) -> Vec<SoundName> {
        app.world_mut()
            .query::<&SoundName>()
            .iter(app.world())
            .cloned()
            .collect()
    }

    #[test]
    fn missing_sound_is_an_error() {
        let bank = SoundBank::default();
        assert_eq!(
            bank.get("nope"),
            Err(LocomotionError::MissingSound("nope".into()))
        );
    }

    #[test]
    fn unregistered_cue_is_skipped() {
        let mut app = sound_app();
        let owner = app.world_mut().spawn_empty().id();
        app.world_mut().send_event(LocomotionCue {
            entity: owner,
            kind: CueKind::PlaySound(SLIDE_SOUND),
        });
        app.update();
        assert!(sounds(&mut app).is_empty());
    }

    #[test]
    fn play_then_stop() {
        let mut app = sound_app();
        app.world_mut()
            .resource_mut::<SoundBank>()
            .register(SLIDE_SOUND, Handle::default());
        let owner = app.world_mut().spawn_empty().id();

        app.world_mut().send_event(LocomotionCue {
            entity: owner,
            kind: CueKind::PlaySound(SLIDE_SOUND),
        });
        app.update();
        assert_eq!(
            sounds(&mut app),
            vec![SoundName {
                owner,
                name: SLIDE_SOUND.to_string()
            }]
        );

        app.world_mut().send_event(LocomotionCue {
            entity: owner,
            kind: CueKind::StopSound(SLIDE_SOUND),
        });
        app.update();
        assert!(sounds(&mut app).is_empty());
    }

    #[test]
    fn footstep_can_wait_for_the_previous_one() {
        let mut app = sound_app();
        {
            let mut bank = app.world_mut().resource_mut::<SoundBank>();
            for name in FOOTSTEP_SOUNDS {
                bank.register(name, Handle::default());
            }
        }
        let owner = app.world_mut().spawn_empty().id();

        app.world_mut().send_event(LocomotionCue {
            entity: owner,
            kind: CueKind::Footstep {
                skip_if_playing: true,
            },
        });
        app.update();
        let played = sounds(&mut app);
        assert_eq!(played.len(), 1);
        assert!(FOOTSTEP_SOUNDS.contains(&played[0].name.as_str()));

        app.world_mut().send_event(LocomotionCue {
            entity: owner,
            kind: CueKind::Footstep {
                skip_if_playing: true,
            },
        });
        app.update();
        assert_eq!(sounds(&mut app).len(), 1);

        app.world_mut().send_event(LocomotionCue {
            entity: owner,
            kind: CueKind::Footstep {
                skip_if_playing: false,
            },
        });
        app.update();
        assert_eq!(sounds(&mut app).len(), 2);
    }
}
