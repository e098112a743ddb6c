//! Configuration types for the sound catalog and engine settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A catalog entry describing one ambient sound.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Sound {
    /// Unique key, e.g. "rolling_thunder".
    pub id: String,
    /// Display name. Falls back to the id when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Group used for display ordering (e.g. "weather", "animals").
    #[serde(default)]
    pub group: String,
    /// Whether this sound plays as a seamless loop. Non-looping sounds are
    /// bursts replayed at randomized intervals.
    #[serde(default, rename = "loop")]
    pub is_loopable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Asset sources, relative to the assets directory for local playback
    /// and passed through unchanged to cast receivers.
    #[serde(default)]
    pub src: Vec<String>,
}

impl Sound {
    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Returns true if the sound carries `tag` (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// On-disk catalog file format.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub sounds: Vec<Sound>,
}

/// Engine settings loaded from YAML. Every field has a default.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Directories scanned for catalog files. Later directories override earlier ones.
    #[serde(default = "default_catalog_dirs")]
    pub catalog_dirs: Vec<PathBuf>,
    /// Root directory local sound sources are resolved against.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    /// Default tracing filter directive (overridden by RUST_LOG).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Namespace cast messages are sent on.
    #[serde(default = "default_cast_namespace")]
    pub cast_namespace: String,
    /// Number of sounds picked for a random preset.
    #[serde(default)]
    pub random_intensity: IntensityRange,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_dirs: default_catalog_dirs(),
            assets_dir: default_assets_dir(),
            log_level: default_log_level(),
            cast_namespace: default_cast_namespace(),
            random_intensity: IntensityRange::default(),
        }
    }
}

/// Inclusive range of sound counts for random presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntensityRange {
    #[serde(default = "default_min_sounds")]
    pub min: usize,
    #[serde(default = "default_max_sounds")]
    pub max: usize,
}

impl Default for IntensityRange {
    fn default() -> Self {
        Self {
            min: default_min_sounds(),
            max: default_max_sounds(),
        }
    }
}

impl IntensityRange {
    pub fn as_range(&self) -> std::ops::RangeInclusive<usize> {
        self.min..=self.max
    }
}

fn default_catalog_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("library")]
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("sounds")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cast_namespace() -> String {
    "urn:x-cast:soundscape".to_string()
}

fn default_min_sounds() -> usize {
    2
}

fn default_max_sounds() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_parses_loop_flag() {
        let sound: Sound = serde_yaml::from_str(
            "id: rain\ngroup: weather\nloop: true\ntags: [calm]\nsrc: [rain.ogg]",
        )
        .unwrap();

        assert!(sound.is_loopable);
        assert_eq!(sound.display_name(), "rain");
        assert!(sound.has_tag("CALM"));
    }

    #[test]
    fn test_settings_defaults_for_empty_document() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();

        assert_eq!(settings.catalog_dirs, vec![PathBuf::from("library")]);
        assert_eq!(settings.random_intensity.as_range(), 2..=5);
        assert_eq!(settings.cast_namespace, "urn:x-cast:soundscape");
    }
}
