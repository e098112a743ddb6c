//! Owner of every active [`Player`]: audio focus arbitration, aggregate state
//! and change notifications.
//!
//! The manager is the single writer. Everything, including due scheduler
//! tasks, reaches players through it on the owning thread.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::playback::focus::{AudioFocus, FocusChange, FocusRequest, FocusState};
use crate::playback::player::{Player, PlayerState};
use crate::playback::strategy::{AudioAttributes, PlaybackStrategyFactory};
use crate::preset::Preset;
use crate::scheduler::Scheduler;

/// Aggregate playback state, derived from the player map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// Snapshot delivered to listeners after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackUpdate {
    pub players: BTreeMap<String, PlayerState>,
    pub state: PlaybackState,
}

pub type PlaybackListener = Box<dyn FnMut(&PlaybackUpdate)>;

/// Handle returned by [`PlaybackManager::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct PlaybackManager {
    catalog: Rc<Catalog>,
    factory: Rc<dyn PlaybackStrategyFactory>,
    focus: Box<dyn AudioFocus>,
    scheduler: Scheduler,
    players: HashMap<String, Player>,
    /// Stopped players whose transport is still fading out.
    retiring: Vec<Player>,
    is_paused: bool,
    focus_state: FocusState,
    resume_on_focus_gain: bool,
    attributes: AudioAttributes,
    listeners: Vec<(ListenerId, PlaybackListener)>,
    next_listener: u64,
}

impl PlaybackManager {
    pub fn new(
        catalog: Rc<Catalog>,
        factory: Rc<dyn PlaybackStrategyFactory>,
        focus: Box<dyn AudioFocus>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            catalog,
            factory,
            focus,
            scheduler,
            players: HashMap::new(),
            retiring: Vec::new(),
            is_paused: false,
            focus_state: FocusState::NoFocus,
            resume_on_focus_gain: false,
            attributes: AudioAttributes::default(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    // ---- Queries ----

    pub fn state(&self) -> PlaybackState {
        if self.players.is_empty() {
            PlaybackState::Stopped
        } else if self.is_paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, sound_id: &str) -> Option<&Player> {
        self.players.get(sound_id)
    }

    pub fn player_states(&self) -> BTreeMap<String, PlayerState> {
        self.players
            .iter()
            .map(|(id, p)| (id.clone(), p.state().clone()))
            .collect()
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus_state
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn audio_attributes(&self) -> AudioAttributes {
        self.attributes
    }

    /// True while stopped players are still fading out.
    pub fn is_releasing(&self) -> bool {
        !self.retiring.is_empty()
    }

    /// Due time of the next scheduler task on the scheduler's clock.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    // ---- Listeners ----

    /// Registers a listener. Listeners are called in registration order.
    pub fn add_listener(&mut self, listener: PlaybackListener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    // ---- Commands ----

    /// Plays `sound_id`, creating its player if needed, or resumes every
    /// retained player when `None`.
    pub fn play(&mut self, sound_id: Option<&str>) -> Result<()> {
        if let Some(id) = sound_id {
            self.ensure_player(id)?;
        }
        self.start_playback(sound_id);
        self.notify();
        Ok(())
    }

    /// Stops and releases `sound_id`, or every player when `None`.
    pub fn stop(&mut self, sound_id: Option<&str>) -> Result<()> {
        match sound_id {
            Some(id) => {
                self.catalog.get(id)?;
                if let Some(player) = self.players.remove(id) {
                    self.retire(player);
                }
            }
            None => {
                let players: Vec<Player> = self.players.drain().map(|(_, p)| p).collect();
                for player in players {
                    self.retire(player);
                }
            }
        }

        if self.players.is_empty() {
            self.is_paused = false;
            self.abandon_focus();
        }
        self.notify();
        Ok(())
    }

    /// Pauses every player, keeping them resumable, and gives up focus.
    pub fn pause(&mut self) {
        self.pause_all();
        self.abandon_focus();
        self.notify();
    }

    /// Updates volume and time period of an active player. No-op when the
    /// sound is not playing.
    pub fn update_playback(&mut self, sound_id: &str, volume: u32, time_period: u32) -> Result<()> {
        self.catalog.get(sound_id)?;
        match self.players.get_mut(sound_id) {
            Some(player) => {
                player.set_volume(volume);
                player.set_time_period(time_period);
                self.notify();
            }
            None => tracing::debug!("Ignoring update for inactive sound '{}'", sound_id),
        }
        Ok(())
    }

    /// Applies a platform focus change.
    pub fn on_audio_focus_change(&mut self, change: FocusChange) {
        tracing::info!("Audio focus change: {:?} (state {:?})", change, self.focus_state);
        match change {
            FocusChange::Gain => {
                let resume = match self.focus_state {
                    FocusState::Delayed => true,
                    FocusState::NoFocus => self.resume_on_focus_gain,
                    FocusState::HasFocus => false,
                };
                if !resume {
                    return;
                }
                self.focus_state = FocusState::HasFocus;
                self.resume_on_focus_gain = false;
                self.resume_all();
            }
            // Ducking is not honored; a duckable loss pauses like any transient loss
            FocusChange::Loss | FocusChange::LossTransient | FocusChange::LossTransientCanDuck => {
                if self.focus_state != FocusState::HasFocus {
                    return;
                }
                self.focus_state = FocusState::NoFocus;
                self.resume_on_focus_gain = true;
                self.pause_all();
            }
        }
        self.notify();
    }

    /// Makes the mix match `preset`: players not in it are stopped, every
    /// entry is created or updated, then playback starts.
    ///
    /// Missing players are built before anything is stopped, so an error
    /// leaves the current mix untouched.
    pub fn play_preset(&mut self, preset: &Preset) -> Result<()> {
        let mut created = Vec::new();
        for state in preset.player_states() {
            if !self.players.contains_key(state.sound_id()) {
                created.push(self.build_player(state.sound_id())?);
            }
        }

        let stale: Vec<String> = self
            .players
            .keys()
            .filter(|id| !preset.player_states().iter().any(|s| s.sound_id() == id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(player) = self.players.remove(&id) {
                self.retire(player);
            }
        }

        for player in created {
            self.players.insert(player.sound_id().to_string(), player);
        }
        for state in preset.player_states() {
            if let Some(player) = self.players.get_mut(state.sound_id()) {
                player.set_volume(state.volume());
                player.set_time_period(state.time_period());
            }
        }
        tracing::info!(
            "Playing preset '{}' ({} sounds)",
            preset.name(),
            preset.player_states().len()
        );

        if self.players.is_empty() {
            self.is_paused = false;
            self.abandon_focus();
        } else {
            self.start_playback(None);
        }
        self.notify();
        Ok(())
    }

    /// Moves every player to transports built by `factory`.
    ///
    /// Players whose new transport cannot be built are released and removed;
    /// the first such error is returned after all players were attempted.
    pub fn set_strategy_factory(&mut self, factory: Rc<dyn PlaybackStrategyFactory>) -> Result<()> {
        self.factory = factory;
        let mut first_error = None;
        let mut failed = Vec::new();

        for (id, player) in self.players.iter_mut() {
            if let Err(e) = player.recreate_player_with_factory(self.factory.as_ref()) {
                tracing::warn!("Dropping '{}' after transport switch failed: {}", id, e);
                failed.push(id.clone());
                first_error.get_or_insert(e);
            }
        }
        for id in failed {
            self.players.remove(&id);
        }

        if self.players.is_empty() {
            self.is_paused = false;
            self.abandon_focus();
        }
        self.notify();
        first_error.map_or(Ok(()), Err)
    }

    /// Stores `attributes` for later focus requests and forwards them to every
    /// player. Held or pending focus is requested again under the new attributes.
    pub fn set_audio_attributes(&mut self, attributes: AudioAttributes) {
        if self.attributes == attributes {
            return;
        }
        self.attributes = attributes;
        for player in self.players.values_mut() {
            player.set_audio_attributes(attributes);
        }
        if self.focus_state != FocusState::NoFocus {
            self.focus.abandon();
            self.focus_state = FocusState::NoFocus;
            self.request_focus();
        }
        self.notify();
    }

    /// Dispatches every due scheduler task. Returns the number dispatched.
    pub fn run_pending(&mut self) -> usize {
        let mut dispatched = 0;
        loop {
            let due = self.scheduler.take_due();
            if due.is_empty() {
                break;
            }
            for task in due {
                dispatched += 1;
                if let Some(player) = self.players.get_mut(&task.sound_id) {
                    player.handle_task(&task);
                }
                for player in self
                    .retiring
                    .iter_mut()
                    .filter(|p| p.sound_id() == task.sound_id)
                {
                    player.handle_task(&task);
                }
            }
            self.reap_retired();
        }
        dispatched
    }

    // ---- Internals ----

    fn ensure_player(&mut self, sound_id: &str) -> Result<()> {
        if !self.players.contains_key(sound_id) {
            let player = self.build_player(sound_id)?;
            self.players.insert(sound_id.to_string(), player);
        }
        Ok(())
    }

    fn build_player(&self, sound_id: &str) -> Result<Player> {
        let sound = self.catalog.get(sound_id)?.clone();
        Player::new(
            sound,
            self.factory.as_ref(),
            self.scheduler.clone(),
            self.attributes,
        )
    }

    /// Starts rendering `target` (or every player) if focus allows it,
    /// requesting focus first when needed.
    fn start_playback(&mut self, target: Option<&str>) {
        if self.players.is_empty() {
            return;
        }
        match self.focus_state {
            FocusState::HasFocus => {
                self.is_paused = false;
                match target.and_then(|id| self.players.get_mut(id)) {
                    Some(player) => player.play(),
                    None => self.resume_all(),
                }
            }
            // Rendering waits for the Gain callback
            FocusState::Delayed => self.pause_all(),
            FocusState::NoFocus => self.request_focus(),
        }
    }

    fn request_focus(&mut self) {
        let result = self.focus.request(&self.attributes);
        tracing::info!("Audio focus request: {:?}", result);
        match result {
            FocusRequest::Granted => {
                self.focus_state = FocusState::HasFocus;
                self.resume_on_focus_gain = false;
                self.resume_all();
            }
            FocusRequest::Delayed => {
                self.focus_state = FocusState::Delayed;
                self.pause_all();
            }
            FocusRequest::Failed => {
                self.focus_state = FocusState::NoFocus;
                self.resume_on_focus_gain = false;
                self.pause_all();
            }
        }
    }

    fn abandon_focus(&mut self) {
        if self.focus_state != FocusState::NoFocus {
            self.focus.abandon();
            tracing::info!("Abandoned audio focus");
        }
        self.focus_state = FocusState::NoFocus;
        self.resume_on_focus_gain = false;
    }

    fn resume_all(&mut self) {
        self.is_paused = false;
        for player in self.players.values_mut() {
            player.play();
        }
    }

    fn pause_all(&mut self) {
        self.is_paused = true;
        for player in self.players.values_mut() {
            player.pause();
        }
    }

    fn retire(&mut self, mut player: Player) {
        player.stop();
        if player.is_releasing() {
            self.retiring.push(player);
        } else {
            tracing::info!("Released player for '{}'", player.sound_id());
        }
    }

    fn reap_retired(&mut self) {
        self.retiring.retain(|p| {
            let keep = p.is_releasing();
            if !keep {
                tracing::info!("Released player for '{}'", p.sound_id());
            }
            keep
        });
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let update = PlaybackUpdate {
            players: self.player_states(),
            state: self.state(),
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&update);
        }
    }
}

impl Drop for PlaybackManager {
    fn drop(&mut self) {
        // Pause first so transports release without waiting for a fade
        for player in self.players.values_mut().chain(self.retiring.iter_mut()) {
            player.pause();
            player.stop();
        }
        self.abandon_focus();
    }
}
