//! Low-level media player: a five-state machine over one [`Renderer`] plus a
//! stepped volume fade driven by the [`Scheduler`].

use std::path::PathBuf;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::playback::audio_output::Renderer;
use crate::playback::strategy::AudioAttributes;
use crate::playback::FADE_STEP_INTERVAL;
use crate::scheduler::{Scheduler, TaskId, TaskKind};

/// Media player lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlayerState {
    Idle,
    Buffering,
    Playing,
    Paused,
    Stopped,
}

/// Invoked once when a fade reaches its target.
pub type FadeCallback = Box<dyn FnOnce(&mut MediaPlayer)>;

/// Observes state transitions.
pub type StateListener = Box<dyn FnMut(MediaPlayerState)>;

struct Fade {
    task: TaskId,
    target: f32,
    step: f32,
    remaining: u32,
    callback: Option<FadeCallback>,
}

pub struct MediaPlayer {
    sound_id: String,
    scheduler: Scheduler,
    renderer: Box<dyn Renderer>,
    playlist: Vec<PathBuf>,
    looping: bool,
    state: MediaPlayerState,
    play_requested: bool,
    volume: f32,
    fade: Option<Fade>,
    attributes: AudioAttributes,
    listener: Option<StateListener>,
}

impl MediaPlayer {
    /// Creates an idle player. `sound_id` addresses its fade steps.
    pub fn new(
        sound_id: &str,
        looping: bool,
        renderer: Box<dyn Renderer>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            sound_id: sound_id.to_string(),
            scheduler,
            renderer,
            playlist: Vec::new(),
            looping,
            state: MediaPlayerState::Idle,
            play_requested: false,
            volume: 1.0,
            fade: None,
            attributes: AudioAttributes::default(),
            listener: None,
        }
    }

    pub fn state(&self) -> MediaPlayerState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn audio_attributes(&self) -> AudioAttributes {
        self.attributes
    }

    /// True while audio is actually being rendered.
    pub fn is_playing(&self) -> bool {
        self.state == MediaPlayerState::Playing && !self.renderer.has_ended()
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    pub fn set_state_listener(&mut self, listener: StateListener) {
        self.listener = Some(listener);
    }

    /// Queues a source. Starts buffering if play was already requested.
    pub fn add_to_playlist(&mut self, source: PathBuf) {
        self.playlist.push(source);
        if self.play_requested && self.state == MediaPlayerState::Idle {
            self.buffer_and_start();
        }
    }

    /// Drops all sources and returns to idle. A pending play request survives,
    /// so the next `add_to_playlist` starts playback again.
    pub fn clear_playlist(&mut self) {
        self.playlist.clear();
        if matches!(
            self.state,
            MediaPlayerState::Buffering | MediaPlayerState::Playing | MediaPlayerState::Paused
        ) {
            self.cancel_fade();
            self.renderer.release();
            self.set_state(MediaPlayerState::Idle);
        }
    }

    pub fn play(&mut self) {
        match self.state {
            MediaPlayerState::Stopped => {
                tracing::warn!("play() on stopped media player for '{}'", self.sound_id);
            }
            MediaPlayerState::Idle => {
                self.play_requested = true;
                if !self.playlist.is_empty() {
                    self.buffer_and_start();
                }
            }
            MediaPlayerState::Buffering => self.play_requested = true,
            MediaPlayerState::Playing => {
                if self.renderer.has_ended() {
                    self.restart();
                }
            }
            MediaPlayerState::Paused => {
                self.play_requested = true;
                if self.renderer.has_ended() {
                    self.restart();
                } else {
                    self.renderer.set_volume(self.volume);
                    self.renderer.resume();
                    self.set_state(MediaPlayerState::Playing);
                }
            }
        }
    }

    /// Pauses rendering. An in-flight fade cannot progress while paused, so it
    /// completes immediately and its callback fires.
    pub fn pause(&mut self) {
        self.play_requested = false;
        if self.state != MediaPlayerState::Playing {
            return;
        }
        self.renderer.pause();
        self.set_state(MediaPlayerState::Paused);
        self.finish_fade();
    }

    /// Releases the renderer. The player cannot be used afterwards.
    pub fn stop(&mut self) {
        if self.state == MediaPlayerState::Stopped {
            return;
        }
        self.cancel_fade();
        self.renderer.release();
        self.play_requested = false;
        self.set_state(MediaPlayerState::Stopped);
    }

    /// Sets the volume immediately. Does not touch an in-flight fade.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.renderer.set_volume(self.volume);
    }

    pub fn set_audio_attributes(&mut self, attributes: AudioAttributes) {
        tracing::debug!("Audio attributes for '{}': {:?}", self.sound_id, attributes);
        self.attributes = attributes;
    }

    /// Ramps the volume to `target` over `duration` in fixed steps, then calls
    /// `callback` once.
    ///
    /// Supersedes any in-flight fade; the superseded fade's callback is dropped.
    /// When nothing is playing the volume jumps to `target` and the callback runs
    /// before this returns.
    pub fn fade_to(&mut self, target: f32, duration: Duration, callback: Option<FadeCallback>) {
        self.cancel_fade();
        let target = target.clamp(0.0, 1.0);

        if !self.is_playing() || duration < FADE_STEP_INTERVAL {
            self.set_volume(target);
            if let Some(callback) = callback {
                callback(self);
            }
            return;
        }

        let steps = (duration.as_millis() / FADE_STEP_INTERVAL.as_millis()).max(1) as u32;
        let step = (target - self.volume) / steps as f32;
        let task = self
            .scheduler
            .schedule(&self.sound_id, TaskKind::FadeStep, FADE_STEP_INTERVAL);
        tracing::debug!(
            "Fading '{}' from {:.2} to {:.2} over {:?}",
            self.sound_id, self.volume, target, duration
        );
        self.fade = Some(Fade {
            task,
            target,
            step,
            remaining: steps,
            callback,
        });
    }

    /// Advances the fade identified by `task`. Stale ids are ignored.
    pub fn on_fade_step(&mut self, task: TaskId) {
        let (next_volume, done) = match self.fade.as_mut() {
            Some(fade) if fade.task == task => {
                fade.remaining = fade.remaining.saturating_sub(1);
                (self.volume + fade.step, fade.remaining == 0)
            }
            _ => {
                tracing::trace!("Dropping stale fade step {:?} for '{}'", task, self.sound_id);
                return;
            }
        };

        if done || !self.is_playing() {
            self.finish_fade();
            return;
        }

        self.set_volume(next_volume);
        let next = self
            .scheduler
            .schedule(&self.sound_id, TaskKind::FadeStep, FADE_STEP_INTERVAL);
        if let Some(fade) = self.fade.as_mut() {
            fade.task = next;
        }
    }

    fn finish_fade(&mut self) {
        if let Some(fade) = self.fade.take() {
            self.scheduler.cancel(fade.task);
            self.set_volume(fade.target);
            if let Some(callback) = fade.callback {
                callback(self);
            }
        }
    }

    fn cancel_fade(&mut self) {
        if let Some(fade) = self.fade.take() {
            self.scheduler.cancel(fade.task);
            if fade.callback.is_some() {
                tracing::debug!("Fade for '{}' superseded, dropping its callback", self.sound_id);
            }
        }
    }

    fn pick_source(&self) -> Option<PathBuf> {
        if self.looping {
            self.playlist.first().cloned()
        } else {
            self.playlist.choose(&mut rand::thread_rng()).cloned()
        }
    }

    fn buffer_and_start(&mut self) {
        let Some(source) = self.pick_source() else {
            return;
        };
        self.set_state(MediaPlayerState::Buffering);

        if let Err(e) = self.renderer.load(&source, self.looping) {
            tracing::warn!("Failed to load {}, skipping: {}", source.display(), e);
            self.play_requested = false;
            self.set_state(MediaPlayerState::Idle);
            return;
        }
        self.start_renderer();
    }

    fn restart(&mut self) {
        // Bursts pick a fresh variant each time they are rendered
        if !self.looping && self.playlist.len() > 1 {
            self.buffer_and_start();
            return;
        }
        self.start_renderer();
    }

    fn start_renderer(&mut self) {
        match self.renderer.start(self.volume) {
            Ok(()) => self.set_state(MediaPlayerState::Playing),
            Err(e) => {
                tracing::warn!("Failed to start '{}': {}", self.sound_id, e);
                self.play_requested = false;
                self.set_state(MediaPlayerState::Idle);
            }
        }
    }

    fn set_state(&mut self, state: MediaPlayerState) {
        if self.state == state {
            return;
        }
        tracing::debug!("Media player '{}': {:?} -> {:?}", self.sound_id, self.state, state);
        self.state = state;
        if let Some(listener) = self.listener.as_mut() {
            listener(state);
        }
    }
}

impl Drop for MediaPlayer {
    fn drop(&mut self) {
        if let Some(fade) = self.fade.take() {
            self.scheduler.cancel(fade.task);
        }
        if self.state != MediaPlayerState::Stopped {
            self.renderer.release();
        }
    }
}
