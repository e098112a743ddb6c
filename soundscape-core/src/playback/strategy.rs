//! Output transport abstraction shared by local and cast playback.

use serde::{Deserialize, Serialize};

use crate::config::Sound;
use crate::error::Result;
use crate::playback::cast::CastPlaybackStrategy;
use crate::playback::local::LocalPlaybackStrategy;
use crate::scheduler::TaskId;

/// What the audio is used for. Alarms keep playing through focus rules that
/// silence media on most platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioUsage {
    #[default]
    Media,
    Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct AudioAttributes {
    pub usage: AudioUsage,
}

impl AudioAttributes {
    pub fn media() -> Self {
        Self {
            usage: AudioUsage::Media,
        }
    }

    pub fn alarm() -> Self {
        Self {
            usage: AudioUsage::Alarm,
        }
    }
}

/// Renders one sound somewhere.
///
/// Implementations must be idempotent: repeating `play()` or `pause()` while
/// already in that state must not re-trigger rendering or resend messages.
/// Burst sounds are the exception: every `play()` after the previous burst
/// ended is a new trigger.
pub trait PlaybackStrategy {
    /// Sets the normalized volume (0.0..=1.0).
    fn set_volume(&mut self, volume: f32);
    fn play(&mut self);
    /// Stops rendering but keeps the underlying resource.
    fn pause(&mut self);
    /// Releases the underlying resource. The strategy is unusable afterwards.
    fn stop(&mut self);
    fn set_audio_attributes(&mut self, attributes: AudioAttributes);

    /// Delivers a scheduler fade step. Strategies without fades ignore it.
    fn on_fade_step(&mut self, _task: TaskId) {}

    /// True while a `stop()` is still fading out and has not released yet.
    fn is_releasing(&self) -> bool {
        false
    }
}

/// The backend a player currently renders through.
pub enum Transport {
    Local(LocalPlaybackStrategy),
    Remote(CastPlaybackStrategy),
}

impl Transport {
    pub fn is_local(&self) -> bool {
        matches!(self, Transport::Local(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Transport::Remote(_))
    }

    fn strategy(&self) -> &dyn PlaybackStrategy {
        match self {
            Transport::Local(local) => local,
            Transport::Remote(remote) => remote,
        }
    }

    fn strategy_mut(&mut self) -> &mut dyn PlaybackStrategy {
        match self {
            Transport::Local(local) => local,
            Transport::Remote(remote) => remote,
        }
    }
}

impl PlaybackStrategy for Transport {
    fn set_volume(&mut self, volume: f32) {
        self.strategy_mut().set_volume(volume);
    }

    fn play(&mut self) {
        self.strategy_mut().play();
    }

    fn pause(&mut self) {
        self.strategy_mut().pause();
    }

    fn stop(&mut self) {
        self.strategy_mut().stop();
    }

    fn set_audio_attributes(&mut self, attributes: AudioAttributes) {
        self.strategy_mut().set_audio_attributes(attributes);
    }

    fn on_fade_step(&mut self, task: TaskId) {
        self.strategy_mut().on_fade_step(task);
    }

    fn is_releasing(&self) -> bool {
        self.strategy().is_releasing()
    }
}

/// Builds transports for sounds. Which factory is active is decided by the
/// caller (e.g. switched to cast when a receiver session starts).
pub trait PlaybackStrategyFactory {
    fn new_instance(&self, sound: &Sound) -> Result<Transport>;
}
