//! Playback engine: players, transports, fades and audio focus.

use std::time::Duration;

pub mod audio_output;
pub mod cast;
pub mod focus;
pub mod local;
pub mod manager;
pub mod media_player;
pub mod player;
pub mod strategy;

pub use audio_output::{AudioSink, KiraOutput, Renderer, SilentOutput};
pub use cast::{CastAction, CastChannel, CastMessage, CastPlaybackStrategy, CastPlaybackStrategyFactory};
pub use focus::{AudioFocus, DesktopFocus, FocusChange, FocusRequest, FocusState};
pub use local::{LocalPlaybackStrategy, LocalPlaybackStrategyFactory};
pub use manager::{ListenerId, PlaybackListener, PlaybackManager, PlaybackState, PlaybackUpdate};
pub use media_player::{MediaPlayer, MediaPlayerState};
pub use player::{Player, PlayerState};
pub use strategy::{
    AudioAttributes, AudioUsage, PlaybackStrategy, PlaybackStrategyFactory, Transport,
};

/// Upper bound of a player's volume.
pub const MAX_VOLUME: u32 = 25;
pub const DEFAULT_VOLUME: u32 = 4;

/// Burst replay spread bounds, in seconds.
pub const MIN_TIME_PERIOD: u32 = 30;
pub const DEFAULT_TIME_PERIOD: u32 = 60;
pub const MAX_TIME_PERIOD: u32 = 240;

pub const FADE_IN_DURATION: Duration = Duration::from_millis(1000);
pub const FADE_OUT_DURATION: Duration = Duration::from_millis(1000);
/// Interval between fade volume steps.
pub const FADE_STEP_INTERVAL: Duration = Duration::from_millis(50);
