//! Audio output seam between the media player and the device.
//!
//! Every sound renders through one shared kira `AudioManager` (one cpal
//! stream); each [`Renderer`] owns a single `StaticSoundHandle` with per-sound
//! volume through kira's internal mixer. `AudioManager` is not `Send`, so the
//! output lives on the playback thread and is shared with `Rc`.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::sound::PlaybackState;
use kira::{AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Tween};

use crate::error::{Error, Result};

/// Decodes and renders one sound. Implementations hold at most one active voice.
pub trait Renderer {
    /// Decodes `source` and prepares it for playback, replacing anything loaded before.
    fn load(&mut self, source: &Path, looping: bool) -> Result<()>;
    /// Starts the loaded sound from the beginning at `volume` (0.0..=1.0).
    fn start(&mut self, volume: f32) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// True once a non-looping voice has played to its end (or nothing is playing).
    fn has_ended(&self) -> bool;
    /// Stops the voice and frees decoded data.
    fn release(&mut self);
}

/// Creates renderers for new media players.
pub trait AudioSink {
    fn create_renderer(&self) -> Box<dyn Renderer>;
}

/// Converts a linear volume (0.0..=1.0) into kira decibels.
pub fn volume_to_db(volume: f32) -> Decibels {
    if volume <= 0.001 {
        Decibels::SILENCE
    } else {
        Decibels(20.0 * volume.min(1.0).log10())
    }
}

/// Device output backed by a kira `AudioManager`.
pub struct KiraOutput {
    manager: Rc<RefCell<AudioManager<DefaultBackend>>>,
}

impl KiraOutput {
    /// Opens the default output device.
    pub fn new() -> Result<Self> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| Error::AudioOutput(e.to_string()))?;
        tracing::info!("Opened kira audio output");
        Ok(Self {
            manager: Rc::new(RefCell::new(manager)),
        })
    }
}

impl AudioSink for KiraOutput {
    fn create_renderer(&self) -> Box<dyn Renderer> {
        Box::new(KiraRenderer {
            manager: Rc::clone(&self.manager),
            data: None,
            handle: None,
        })
    }
}

struct KiraRenderer {
    manager: Rc<RefCell<AudioManager<DefaultBackend>>>,
    data: Option<StaticSoundData>,
    handle: Option<StaticSoundHandle>,
}

impl Renderer for KiraRenderer {
    fn load(&mut self, source: &Path, looping: bool) -> Result<()> {
        let data = StaticSoundData::from_file(source)
            .map_err(|e| Error::Decode(source.display().to_string(), e.to_string()))?;
        self.release();
        self.data = Some(if looping { data.loop_region(..) } else { data });
        Ok(())
    }

    fn start(&mut self, volume: f32) -> Result<()> {
        let data = self.data.clone().ok_or(Error::NothingLoaded)?;
        if let Some(mut old) = self.handle.take() {
            old.stop(Tween::default());
        }
        let handle = self
            .manager
            .borrow_mut()
            .play(data.volume(volume_to_db(volume)))
            .map_err(|e| Error::AudioOutput(format!("{}", e)))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.pause(Tween::default());
        }
    }

    fn resume(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.resume(Tween::default());
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(volume_to_db(volume), Tween::default());
        }
    }

    fn has_ended(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(true, |h| matches!(h.state(), PlaybackState::Stopped))
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop(Tween::default());
        }
        self.data = None;
    }
}

/// Output used when no audio device is available. Renders nothing.
#[derive(Debug, Default)]
pub struct SilentOutput;

impl AudioSink for SilentOutput {
    fn create_renderer(&self) -> Box<dyn Renderer> {
        Box::new(SilentRenderer::default())
    }
}

#[derive(Default)]
struct SilentRenderer {
    loaded: bool,
    looping: bool,
    started: bool,
}

impl Renderer for SilentRenderer {
    fn load(&mut self, _source: &Path, looping: bool) -> Result<()> {
        self.loaded = true;
        self.looping = looping;
        Ok(())
    }

    fn start(&mut self, _volume: f32) -> Result<()> {
        if !self.loaded {
            return Err(Error::NothingLoaded);
        }
        self.started = true;
        Ok(())
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn set_volume(&mut self, _volume: f32) {}

    // Bursts have no duration without audio, so they end as soon as they start.
    fn has_ended(&self) -> bool {
        !(self.started && self.looping)
    }

    fn release(&mut self) {
        self.loaded = false;
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_to_db() {
        assert_eq!(volume_to_db(0.0), Decibels::SILENCE);
        assert_eq!(volume_to_db(1.0), Decibels(0.0));
        assert!((volume_to_db(0.5).0 + 6.0206).abs() < 0.001);
    }

    #[test]
    fn test_silent_renderer_requires_load() {
        let mut renderer = SilentOutput.create_renderer();
        assert!(matches!(renderer.start(1.0), Err(Error::NothingLoaded)));

        renderer.load(Path::new("rain.ogg"), true).unwrap();
        renderer.start(1.0).unwrap();
        assert!(!renderer.has_ended());

        renderer.release();
        assert!(renderer.has_ended());
    }

    /// Plays a generated tone through the real device.
    ///
    /// Requires a working audio device — skip in CI.
    #[test]
    #[ignore] // Requires audio device — run with: cargo test -- --ignored
    fn test_kira_renderer_plays_and_ends() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("tone.wav");
        create_test_wav(&path, 440.0, 0.3, 44100);

        let output = KiraOutput::new().unwrap();
        let mut renderer = output.create_renderer();
        renderer.load(&path, false).unwrap();
        renderer.start(0.5).unwrap();
        assert!(!renderer.has_ended());

        std::thread::sleep(std::time::Duration::from_secs(1));
        assert!(renderer.has_ended());
        renderer.release();
    }

    fn create_test_wav(path: &Path, frequency: f32, duration_secs: f32, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        for i in 0..num_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (t * frequency * 2.0 * std::f32::consts::PI).sin();
            writer
                .write_sample((sample * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
}
