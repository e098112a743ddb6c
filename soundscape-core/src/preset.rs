//! Saved mixes.
//!
//! A preset is a snapshot of player states. Two presets are equal when they
//! hold the same states, regardless of id, name or the order states were
//! captured in.

use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::Sound;
use crate::error::{Error, Result};
use crate::playback::{Player, PlayerState, MAX_TIME_PERIOD, MAX_VOLUME, MIN_TIME_PERIOD};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PresetRecord")]
pub struct Preset {
    id: String,
    name: String,
    player_states: Vec<PlayerState>,
}

#[derive(Deserialize)]
struct PresetRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    player_states: Vec<PlayerState>,
}

impl From<PresetRecord> for Preset {
    fn from(record: PresetRecord) -> Self {
        Preset::new(record.id, record.name, record.player_states)
    }
}

impl Preset {
    /// States are stored sorted by sound id.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mut player_states: Vec<PlayerState>,
    ) -> Self {
        player_states.sort();
        Self {
            id: id.into(),
            name: name.into(),
            player_states,
        }
    }

    /// Captures the current state of `players` under a fresh id.
    pub fn from_players<'a>(
        name: impl Into<String>,
        players: impl IntoIterator<Item = &'a Player>,
    ) -> Self {
        let states = players.into_iter().map(|p| p.state().clone()).collect();
        Self::new(Uuid::new_v4().to_string(), name, states)
    }

    /// Builds an unnamed preset from a random selection of catalog sounds.
    ///
    /// Picks between `intensity.start()` and `intensity.end()` distinct sounds
    /// (capped by how many match `tag`), each with a random volume in
    /// `1..=MAX_VOLUME` and time period in `MIN_TIME_PERIOD..=MAX_TIME_PERIOD`.
    pub fn random<R: Rng>(
        catalog: &Catalog,
        tag: Option<&str>,
        intensity: RangeInclusive<usize>,
        rng: &mut R,
    ) -> Self {
        let candidates: Vec<&Sound> = catalog.with_tag(tag).collect();
        let count = if intensity.is_empty() {
            0
        } else {
            rng.gen_range(intensity).min(candidates.len())
        };

        let states = candidates
            .choose_multiple(rng, count)
            .map(|sound| {
                PlayerState::with(
                    sound.id.clone(),
                    rng.gen_range(1..=MAX_VOLUME),
                    rng.gen_range(MIN_TIME_PERIOD..=MAX_TIME_PERIOD),
                )
            })
            .collect();
        Self::new(Uuid::new_v4().to_string(), "", states)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Empty for unnamed presets.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn player_states(&self) -> &[PlayerState] {
        &self.player_states
    }

    /// True when `players` hold exactly this preset's states.
    pub fn has_matching_player_states<'a>(
        &self,
        players: impl IntoIterator<Item = &'a Player>,
    ) -> bool {
        let mut states: Vec<PlayerState> = players.into_iter().map(|p| p.state().clone()).collect();
        states.sort();
        states == self.player_states
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::PresetEncode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::PresetParse(e.to_string()))
    }
}

impl PartialEq for Preset {
    fn eq(&self, other: &Self) -> bool {
        self.player_states == other.player_states
    }
}

impl Eq for Preset {}

impl Hash for Preset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.player_states.hash(state);
    }
}
