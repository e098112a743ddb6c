//! Audio focus: the platform arbitration that decides which app may play.

use crate::playback::strategy::AudioAttributes;

/// Outcome of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Granted,
    /// Focus will be granted later through [`FocusChange::Gain`].
    Delayed,
    Failed,
}

/// Focus change reported by the platform after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

/// Where the manager stands with the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    NoFocus,
    /// A request is outstanding; do not request again.
    Delayed,
    HasFocus,
}

/// Platform focus API. Focus changes are delivered separately through
/// [`crate::playback::PlaybackManager::on_audio_focus_change`].
pub trait AudioFocus {
    fn request(&mut self, attributes: &AudioAttributes) -> FocusRequest;
    fn abandon(&mut self);
}

/// Focus for platforms without arbitration: every request is granted.
#[derive(Debug, Default)]
pub struct DesktopFocus;

impl AudioFocus for DesktopFocus {
    fn request(&mut self, attributes: &AudioAttributes) -> FocusRequest {
        tracing::trace!("Granting focus for {:?}", attributes);
        FocusRequest::Granted
    }

    fn abandon(&mut self) {}
}
