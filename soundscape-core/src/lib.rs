//! Soundscape Core - playback engine for an ambient sound mixer.
//!
//! This library provides:
//! - Sound catalog loading and validation from YAML files
//! - Per-sound players with randomized burst replay
//! - Local (kira) and cast transports with volume fades
//! - Audio focus arbitration and aggregate playback state
//! - Presets: order-independent snapshots of a mix
//!
//! Everything in the engine runs on one thread. Delayed work (burst replays,
//! fade steps) is queued on a [`scheduler::Scheduler`] and dispatched by
//! [`playback::PlaybackManager::run_pending`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::rc::Rc;
//! use soundscape_core::prelude::*;
//!
//! let catalog = CatalogLoader::new("library").load_all().unwrap();
//! let scheduler = Scheduler::with_system_clock();
//! let output = Rc::new(KiraOutput::new().unwrap());
//! let factory = Rc::new(LocalPlaybackStrategyFactory::new(
//!     output,
//!     scheduler.clone(),
//!     PathBuf::from("sounds"),
//! ));
//!
//! let mut manager = PlaybackManager::new(
//!     Rc::new(catalog),
//!     factory,
//!     Box::new(DesktopFocus),
//!     scheduler,
//! );
//! manager.play(Some("rain")).unwrap();
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod playback;
pub mod preset;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::config::{load_settings, CatalogLoader, Settings, Sound};
    pub use crate::error::{Error, Result};
    pub use crate::playback::{
        AudioAttributes, AudioFocus, CastChannel, CastPlaybackStrategyFactory, DesktopFocus,
        FocusChange, KiraOutput, LocalPlaybackStrategyFactory, PlaybackManager, PlaybackState,
        PlaybackUpdate, PlayerState, SilentOutput,
    };
    pub use crate::preset::Preset;
    pub use crate::scheduler::{Scheduler, SystemClock};
}
