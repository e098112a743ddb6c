//! One sound in the mix: its user-facing state plus the transport it renders
//! through.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Sound;
use crate::error::Result;
use crate::playback::strategy::{
    AudioAttributes, PlaybackStrategy, PlaybackStrategyFactory, Transport,
};
use crate::playback::{
    DEFAULT_TIME_PERIOD, DEFAULT_VOLUME, MAX_TIME_PERIOD, MAX_VOLUME, MIN_TIME_PERIOD,
};
use crate::scheduler::{Scheduler, Task, TaskId, TaskKind};

/// Persisted per-sound settings. Values are clamped into range on every write,
/// including deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "PlayerStateRecord")]
pub struct PlayerState {
    sound_id: String,
    volume: u32,
    time_period: u32,
}

#[derive(Deserialize)]
struct PlayerStateRecord {
    sound_id: String,
    #[serde(default = "default_volume")]
    volume: u32,
    #[serde(default = "default_time_period")]
    time_period: u32,
}

fn default_volume() -> u32 {
    DEFAULT_VOLUME
}

fn default_time_period() -> u32 {
    DEFAULT_TIME_PERIOD
}

impl From<PlayerStateRecord> for PlayerState {
    fn from(record: PlayerStateRecord) -> Self {
        PlayerState::with(record.sound_id, record.volume, record.time_period)
    }
}

impl PlayerState {
    /// Default volume and time period.
    pub fn new(sound_id: impl Into<String>) -> Self {
        Self::with(sound_id, DEFAULT_VOLUME, DEFAULT_TIME_PERIOD)
    }

    pub fn with(sound_id: impl Into<String>, volume: u32, time_period: u32) -> Self {
        let mut state = Self {
            sound_id: sound_id.into(),
            volume: DEFAULT_VOLUME,
            time_period: DEFAULT_TIME_PERIOD,
        };
        state.set_volume(volume);
        state.set_time_period(time_period);
        state
    }

    pub fn sound_id(&self) -> &str {
        &self.sound_id
    }

    /// Volume in `0..=MAX_VOLUME`.
    pub fn volume(&self) -> u32 {
        self.volume
    }

    /// Burst replay spread in seconds, `MIN_TIME_PERIOD..=MAX_TIME_PERIOD`.
    pub fn time_period(&self) -> u32 {
        self.time_period
    }

    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume.min(MAX_VOLUME);
    }

    pub fn set_time_period(&mut self, time_period: u32) {
        self.time_period = time_period.clamp(MIN_TIME_PERIOD, MAX_TIME_PERIOD);
    }

    /// Volume normalized for transports.
    pub fn scaled_volume(&self) -> f32 {
        self.volume as f32 / MAX_VOLUME as f32
    }
}

/// Drives one sound. Loopable sounds play continuously; bursts are rendered
/// once and then re-rendered after a random delay for as long as the player
/// is playing.
pub struct Player {
    sound: Sound,
    state: PlayerState,
    is_playing: bool,
    transport: Option<Transport>,
    attributes: AudioAttributes,
    scheduler: Scheduler,
    replay: Option<TaskId>,
}

impl Player {
    pub fn new(
        sound: Sound,
        factory: &dyn PlaybackStrategyFactory,
        scheduler: Scheduler,
        attributes: AudioAttributes,
    ) -> Result<Self> {
        let mut transport = factory.new_instance(&sound)?;
        let state = PlayerState::new(sound.id.clone());
        transport.set_audio_attributes(attributes);
        transport.set_volume(state.scaled_volume());
        tracing::info!(
            "Created player for '{}' ({})",
            sound.id,
            if transport.is_local() { "local" } else { "cast" }
        );
        Ok(Self {
            sound,
            state,
            is_playing: false,
            transport: Some(transport),
            attributes,
            scheduler,
            replay: None,
        })
    }

    pub fn sound(&self) -> &Sound {
        &self.sound
    }

    pub fn sound_id(&self) -> &str {
        &self.sound.id
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_ref()
    }

    /// Id of the pending burst replay, if any.
    pub fn pending_replay(&self) -> Option<TaskId> {
        self.replay
    }

    pub fn play(&mut self) {
        if self.transport.is_none() {
            tracing::warn!("play() on '{}' without a transport", self.sound.id);
            return;
        }
        if self.sound.is_loopable {
            self.is_playing = true;
            if let Some(transport) = self.transport.as_mut() {
                transport.play();
            }
            return;
        }
        // Already cycling; a second play must not add a second replay chain
        if self.is_playing && self.replay.is_some() {
            return;
        }
        self.is_playing = true;
        self.play_burst();
    }

    pub fn pause(&mut self) {
        self.cancel_replay();
        self.is_playing = false;
        if let Some(transport) = self.transport.as_mut() {
            transport.pause();
        }
    }

    pub fn stop(&mut self) {
        self.cancel_replay();
        self.is_playing = false;
        if let Some(transport) = self.transport.as_mut() {
            transport.stop();
        }
    }

    pub fn set_volume(&mut self, volume: u32) {
        self.state.set_volume(volume);
        let scaled = self.state.scaled_volume();
        tracing::debug!("Volume for '{}': {} ({:.2})", self.sound.id, self.state.volume(), scaled);
        if let Some(transport) = self.transport.as_mut() {
            transport.set_volume(scaled);
        }
    }

    pub fn set_time_period(&mut self, time_period: u32) {
        self.state.set_time_period(time_period);
    }

    pub fn set_audio_attributes(&mut self, attributes: AudioAttributes) {
        self.attributes = attributes;
        if let Some(transport) = self.transport.as_mut() {
            transport.set_audio_attributes(attributes);
        }
    }

    /// Swaps the transport. The old one is paused and then stopped, so it
    /// releases without a fade, before the new one is created.
    ///
    /// On error the player is left without a transport and not playing.
    pub fn recreate_player_with_factory(
        &mut self,
        factory: &dyn PlaybackStrategyFactory,
    ) -> Result<()> {
        self.cancel_replay();
        if let Some(mut old) = self.transport.take() {
            old.pause();
            old.stop();
        }

        let mut transport = match factory.new_instance(&self.sound) {
            Ok(transport) => transport,
            Err(e) => {
                self.is_playing = false;
                return Err(e);
            }
        };
        transport.set_audio_attributes(self.attributes);
        transport.set_volume(self.state.scaled_volume());
        self.transport = Some(transport);
        tracing::info!("Recreated transport for '{}'", self.sound.id);

        if self.is_playing {
            self.play();
        }
        Ok(())
    }

    /// Handles a due scheduler task addressed to this sound.
    pub fn handle_task(&mut self, task: &Task) {
        match task.kind {
            TaskKind::Replay => {
                if self.replay != Some(task.id) {
                    tracing::trace!("Dropping stale replay {:?} for '{}'", task.id, self.sound.id);
                    return;
                }
                self.replay = None;
                if self.is_playing {
                    self.play_burst();
                }
            }
            TaskKind::FadeStep => {
                if let Some(transport) = self.transport.as_mut() {
                    transport.on_fade_step(task.id);
                }
            }
        }
    }

    /// True while a stopped transport is still fading out.
    pub fn is_releasing(&self) -> bool {
        self.transport.as_ref().map_or(false, |t| t.is_releasing())
    }

    fn play_burst(&mut self) {
        self.cancel_replay();
        if let Some(transport) = self.transport.as_mut() {
            transport.play();
        }
        let period = u64::from(self.state.time_period());
        let min = u64::from(MIN_TIME_PERIOD);
        let delay = Duration::from_secs(rand::thread_rng().gen_range(min..min + period));
        self.replay = Some(self.scheduler.schedule(&self.sound.id, TaskKind::Replay, delay));
        tracing::debug!("Next '{}' burst in {:?}", self.sound.id, delay);
    }

    fn cancel_replay(&mut self) {
        if let Some(task) = self.replay.take() {
            self.scheduler.cancel(task);
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.cancel_replay();
    }
}
