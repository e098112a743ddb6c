//! Immutable sound catalog injected into the playback engine.

use std::collections::BTreeMap;

use crate::config::Sound;
use crate::error::{Error, Result};

/// Read-only lookup of [`Sound`]s by id.
///
/// Built once (usually by [`crate::config::CatalogLoader`]) and shared by
/// reference; the engine never mutates it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sounds: BTreeMap<String, Sound>,
}

impl Catalog {
    /// Creates a catalog from a set of sounds. Later duplicates win.
    pub fn new(sounds: impl IntoIterator<Item = Sound>) -> Self {
        Self {
            sounds: sounds.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// Looks up a sound by id.
    pub fn get(&self, id: &str) -> Result<&Sound> {
        self.sounds
            .get(id)
            .ok_or_else(|| Error::UnknownSound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    /// Iterates sounds ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Sound> {
        self.sounds.values()
    }

    /// Iterates sounds carrying `tag`, or every sound when `tag` is `None`.
    pub fn with_tag<'a>(&'a self, tag: Option<&'a str>) -> impl Iterator<Item = &'a Sound> + 'a {
        self.sounds
            .values()
            .filter(move |s| tag.map_or(true, |t| s.has_tag(t)))
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{burst_sound, loop_sound};

    #[test]
    fn test_unknown_sound() {
        let catalog = Catalog::new(vec![loop_sound("birds")]);

        assert!(catalog.get("birds").is_ok());
        assert!(matches!(catalog.get("whale"), Err(Error::UnknownSound(id)) if id == "whale"));
    }

    #[test]
    fn test_with_tag_filters() {
        let mut thunder = burst_sound("rolling_thunder");
        thunder.tags.push("storm".to_string());
        let catalog = Catalog::new(vec![loop_sound("birds"), thunder]);

        let storm: Vec<&str> = catalog.with_tag(Some("storm")).map(|s| s.id.as_str()).collect();
        assert_eq!(storm, vec!["rolling_thunder"]);
        assert_eq!(catalog.with_tag(None).count(), 2);
    }
}
