//! Remote playback on a cast receiver.
//!
//! The receiver is driven with JSON messages on a custom namespace. Every
//! message carries the full state of one sound so the receiver never has to
//! reconstruct it from earlier messages:
//!
//! ```json
//! {"src":["rain.ogg"],"isLooping":true,"volume":0.4,"action":"play","fadeInDuration":1000}
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::Sound;
use crate::error::{Error, Result};
use crate::playback::strategy::{
    AudioAttributes, PlaybackStrategy, PlaybackStrategyFactory, Transport,
};
use crate::playback::FADE_IN_DURATION;

/// Connection to a cast receiver session.
pub trait CastChannel {
    fn is_connected(&self) -> bool;
    fn send_message(&self, namespace: &str, message: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CastAction {
    Create,
    Play,
    Pause,
    Stop,
}

/// Wire format of a single receiver message. `action` is null for pure
/// volume updates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMessage {
    pub src: Vec<String>,
    pub is_looping: bool,
    pub volume: f32,
    pub action: Option<CastAction>,
    /// Milliseconds; zero for bursts.
    pub fade_in_duration: u64,
}

/// Mirrors a sound on the receiver. Send failures are logged and otherwise
/// ignored, so a dropped session never takes local state down with it.
pub struct CastPlaybackStrategy {
    channel: Rc<dyn CastChannel>,
    namespace: String,
    sound_id: String,
    src: Vec<String>,
    is_looping: bool,
    volume: f32,
    playing: bool,
    stopped: bool,
}

impl CastPlaybackStrategy {
    /// Announces the sound to the receiver with a `create` message.
    pub fn new(channel: Rc<dyn CastChannel>, namespace: &str, sound: &Sound) -> Self {
        let strategy = Self {
            channel,
            namespace: namespace.to_string(),
            sound_id: sound.id.clone(),
            src: sound.src.clone(),
            is_looping: sound.is_loopable,
            volume: 0.0,
            playing: false,
            stopped: false,
        };
        strategy.send(Some(CastAction::Create));
        strategy
    }

    pub fn message(&self, action: Option<CastAction>) -> CastMessage {
        CastMessage {
            src: self.src.clone(),
            is_looping: self.is_looping,
            volume: self.volume,
            action,
            fade_in_duration: if self.is_looping {
                FADE_IN_DURATION.as_millis() as u64
            } else {
                0
            },
        }
    }

    fn send(&self, action: Option<CastAction>) {
        let json = match serde_json::to_string(&self.message(action)) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to encode cast message for '{}': {}", self.sound_id, e);
                return;
            }
        };
        tracing::trace!("Cast -> {}: {}", self.namespace, json);
        if let Err(e) = self.channel.send_message(&self.namespace, &json) {
            tracing::warn!("Cast message for '{}' not delivered: {}", self.sound_id, e);
        }
    }
}

impl PlaybackStrategy for CastPlaybackStrategy {
    fn set_volume(&mut self, volume: f32) {
        if self.stopped || (self.volume - volume).abs() < f32::EPSILON {
            return;
        }
        self.volume = volume;
        self.send(None);
    }

    fn play(&mut self) {
        if self.stopped {
            tracing::warn!("play() on released cast strategy for '{}'", self.sound_id);
            return;
        }
        // Bursts re-trigger on every play; loops only on state change
        if self.playing && self.is_looping {
            return;
        }
        self.playing = true;
        self.send(Some(CastAction::Play));
    }

    fn pause(&mut self) {
        if self.stopped || !self.playing {
            return;
        }
        self.playing = false;
        self.send(Some(CastAction::Pause));
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.playing = false;
        self.send(Some(CastAction::Stop));
    }

    fn set_audio_attributes(&mut self, attributes: AudioAttributes) {
        // Receivers have no notion of usage
        tracing::trace!("Ignoring {:?} for cast sound '{}'", attributes, self.sound_id);
    }
}

/// Creates [`CastPlaybackStrategy`] instances while a session is connected.
pub struct CastPlaybackStrategyFactory {
    channel: Rc<dyn CastChannel>,
    namespace: String,
}

impl CastPlaybackStrategyFactory {
    pub fn new(channel: Rc<dyn CastChannel>, namespace: impl Into<String>) -> Self {
        Self {
            channel,
            namespace: namespace.into(),
        }
    }
}

impl PlaybackStrategyFactory for CastPlaybackStrategyFactory {
    fn new_instance(&self, sound: &Sound) -> Result<Transport> {
        if !self.channel.is_connected() {
            return Err(Error::CastUnavailable(sound.id.clone()));
        }
        Ok(Transport::Remote(CastPlaybackStrategy::new(
            Rc::clone(&self.channel),
            &self.namespace,
            sound,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{burst_sound, loop_sound, FakeCastChannel};

    const NS: &str = "urn:x-cast:test";

    fn strategy(channel: &FakeCastChannel, sound: &Sound) -> CastPlaybackStrategy {
        let factory = CastPlaybackStrategyFactory::new(Rc::new(channel.clone()), NS);
        match factory.new_instance(sound).unwrap() {
            Transport::Remote(remote) => remote,
            Transport::Local(_) => panic!("expected remote transport"),
        }
    }

    fn actions(channel: &FakeCastChannel) -> Vec<Option<CastAction>> {
        channel.messages().into_iter().map(|m| m.action).collect()
    }

    #[test]
    fn test_message_wire_format() {
        let channel = FakeCastChannel::connected();
        let mut cast = strategy(&channel, &loop_sound("rain"));
        cast.set_volume(0.4);

        let json = serde_json::to_value(cast.message(Some(CastAction::Play))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "src": ["rain.ogg"],
                "isLooping": true,
                "volume": 0.4f32,
                "action": "play",
                "fadeInDuration": 1000
            })
        );
        assert_eq!(channel.namespaces(), vec![NS.to_string(), NS.to_string()]);
    }

    #[test]
    fn test_volume_update_has_null_action() {
        let channel = FakeCastChannel::connected();
        let mut cast = strategy(&channel, &loop_sound("rain"));

        cast.set_volume(0.5);
        let raw = channel.raw_messages();
        assert!(raw[1].contains("\"action\":null"));
    }

    #[test]
    fn test_create_sent_on_construction() {
        let channel = FakeCastChannel::connected();
        let _cast = strategy(&channel, &loop_sound("rain"));
        assert_eq!(actions(&channel), vec![Some(CastAction::Create)]);
    }

    #[test]
    fn test_loop_play_is_idempotent() {
        let channel = FakeCastChannel::connected();
        let mut cast = strategy(&channel, &loop_sound("rain"));

        cast.play();
        cast.play();
        cast.pause();
        cast.pause();
        assert_eq!(
            actions(&channel),
            vec![
                Some(CastAction::Create),
                Some(CastAction::Play),
                Some(CastAction::Pause)
            ]
        );
    }

    #[test]
    fn test_burst_play_retriggers_without_fade() {
        let channel = FakeCastChannel::connected();
        let mut cast = strategy(&channel, &burst_sound("rolling_thunder"));

        cast.play();
        cast.play();
        let messages = channel.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.fade_in_duration == 0));
    }

    #[test]
    fn test_unchanged_volume_not_resent() {
        let channel = FakeCastChannel::connected();
        let mut cast = strategy(&channel, &loop_sound("rain"));

        cast.set_volume(0.2);
        cast.set_volume(0.2);
        assert_eq!(channel.messages().len(), 2);
    }

    #[test]
    fn test_nothing_sent_after_stop() {
        let channel = FakeCastChannel::connected();
        let mut cast = strategy(&channel, &loop_sound("rain"));
        cast.play();
        cast.stop();

        cast.play();
        cast.set_volume(0.9);
        cast.stop();
        assert_eq!(
            actions(&channel).last().copied().flatten(),
            Some(CastAction::Stop)
        );
        assert_eq!(channel.messages().len(), 3);
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let channel = FakeCastChannel::connected();
        let mut cast = strategy(&channel, &loop_sound("rain"));
        channel.fail_sends();

        cast.play();
        cast.set_volume(0.3);
        assert_eq!(channel.messages().len(), 1);
    }

    #[test]
    fn test_factory_requires_session() {
        let channel = FakeCastChannel::disconnected();
        let factory = CastPlaybackStrategyFactory::new(Rc::new(channel.clone()), NS);

        let result = factory.new_instance(&loop_sound("rain"));
        assert!(matches!(result, Err(Error::CastUnavailable(id)) if id == "rain"));
        assert!(channel.messages().is_empty());
    }
}
