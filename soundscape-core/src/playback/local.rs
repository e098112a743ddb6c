//! On-device playback through a [`MediaPlayer`].

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crate::config::Sound;
use crate::error::Result;
use crate::playback::audio_output::{AudioSink, Renderer};
use crate::playback::media_player::{MediaPlayer, MediaPlayerState};
use crate::playback::strategy::{
    AudioAttributes, PlaybackStrategy, PlaybackStrategyFactory, Transport,
};
use crate::playback::{FADE_IN_DURATION, FADE_OUT_DURATION};
use crate::scheduler::{Scheduler, TaskId};

/// Renders a sound locally. Loops fade in on play; bursts start at full volume.
/// `stop()` fades out before releasing the decoder.
pub struct LocalPlaybackStrategy {
    media: MediaPlayer,
    looping: bool,
    volume: f32,
    stop_requested: bool,
}

impl LocalPlaybackStrategy {
    pub fn new(
        sound: &Sound,
        sources: Vec<PathBuf>,
        renderer: Box<dyn Renderer>,
        scheduler: Scheduler,
    ) -> Self {
        let mut media = MediaPlayer::new(&sound.id, sound.is_loopable, renderer, scheduler);
        media.set_volume(0.0);
        for source in sources {
            media.add_to_playlist(source);
        }
        Self {
            media,
            looping: sound.is_loopable,
            volume: 0.0,
            stop_requested: false,
        }
    }

    pub fn media_player(&self) -> &MediaPlayer {
        &self.media
    }
}

impl PlaybackStrategy for LocalPlaybackStrategy {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if self.stop_requested {
            return;
        }
        if self.media.is_fading() {
            // Re-target the running fade-in instead of fighting it
            self.media.fade_to(volume, FADE_IN_DURATION, None);
        } else {
            self.media.set_volume(volume);
        }
    }

    fn play(&mut self) {
        // A play during a stop fade supersedes the fade, and the release with it
        let stopping = std::mem::take(&mut self.stop_requested);
        if self.media.is_playing() && !stopping {
            return;
        }

        if self.looping {
            if !self.media.is_playing() {
                self.media.set_volume(0.0);
                self.media.play();
            }
            self.media.fade_to(self.volume, FADE_IN_DURATION, None);
        } else {
            if stopping {
                self.media.fade_to(self.volume, Duration::ZERO, None);
            }
            self.media.set_volume(self.volume);
            self.media.play();
        }
    }

    fn pause(&mut self) {
        self.media.pause();
    }

    fn stop(&mut self) {
        self.stop_requested = true;
        self.media.fade_to(
            0.0,
            FADE_OUT_DURATION,
            Some(Box::new(|media: &mut MediaPlayer| media.stop())),
        );
    }

    fn set_audio_attributes(&mut self, attributes: AudioAttributes) {
        self.media.set_audio_attributes(attributes);
    }

    fn on_fade_step(&mut self, task: TaskId) {
        self.media.on_fade_step(task);
    }

    fn is_releasing(&self) -> bool {
        self.stop_requested && self.media.state() != MediaPlayerState::Stopped
    }
}

/// Creates [`LocalPlaybackStrategy`] instances rendering through `sink`.
pub struct LocalPlaybackStrategyFactory {
    sink: Rc<dyn AudioSink>,
    scheduler: Scheduler,
    assets_dir: PathBuf,
}

impl LocalPlaybackStrategyFactory {
    /// Sound sources are resolved relative to `assets_dir`.
    pub fn new(sink: Rc<dyn AudioSink>, scheduler: Scheduler, assets_dir: PathBuf) -> Self {
        Self {
            sink,
            scheduler,
            assets_dir,
        }
    }
}

impl PlaybackStrategyFactory for LocalPlaybackStrategyFactory {
    fn new_instance(&self, sound: &Sound) -> Result<Transport> {
        let sources = sound.src.iter().map(|s| self.assets_dir.join(s)).collect();
        Ok(Transport::Local(LocalPlaybackStrategy::new(
            sound,
            sources,
            self.sink.create_renderer(),
            self.scheduler.clone(),
        )))
    }
}
