//! Catalog validation.

use std::collections::HashSet;

use crate::config::types::{CatalogFile, Settings, Sound};
use crate::error::{Error, Result};

/// Validator for catalog files and settings.
pub struct CatalogValidator;

impl CatalogValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates every sound in a catalog file and rejects duplicate ids.
    pub fn validate(&self, file: &CatalogFile) -> Result<()> {
        let mut seen = HashSet::new();
        for sound in &file.sounds {
            self.validate_sound(sound)?;
            if !seen.insert(sound.id.as_str()) {
                return Err(Error::ConfigValidation(
                    format!("sounds.{}", sound.id),
                    "Duplicate sound id".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn validate_sound(&self, sound: &Sound) -> Result<()> {
        if sound.id.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "sounds.id".to_string(),
                "Sound id cannot be empty".to_string(),
            ));
        }

        if sound.src.is_empty() {
            return Err(Error::ConfigValidation(
                format!("sounds.{}.src", sound.id),
                "Sound must have at least one source".to_string(),
            ));
        }

        if sound.src.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::ConfigValidation(
                format!("sounds.{}.src", sound.id),
                "Sound source path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates engine settings.
    pub fn validate_settings(&self, settings: &Settings) -> Result<()> {
        let range = settings.random_intensity;
        if range.min == 0 || range.min > range.max {
            return Err(Error::ConfigValidation(
                "random_intensity".to_string(),
                format!("Invalid range {}..={}", range.min, range.max),
            ));
        }
        if settings.cast_namespace.is_empty() {
            return Err(Error::ConfigValidation(
                "cast_namespace".to_string(),
                "Cast namespace cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CatalogValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::IntensityRange;

    fn sound(id: &str) -> Sound {
        Sound {
            id: id.to_string(),
            name: None,
            group: "test".to_string(),
            is_loopable: true,
            tags: Vec::new(),
            src: vec![format!("{}.ogg", id)],
        }
    }

    #[test]
    fn test_validate_empty_id() {
        let validator = CatalogValidator::new();
        let file = CatalogFile {
            sounds: vec![sound("")],
        };

        assert!(validator.validate(&file).is_err());
    }

    #[test]
    fn test_validate_missing_sources() {
        let validator = CatalogValidator::new();
        let mut rain = sound("rain");
        rain.src.clear();

        let result = validator.validate(&CatalogFile { sounds: vec![rain] });
        assert!(matches!(result, Err(Error::ConfigValidation(_, _))));
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let validator = CatalogValidator::new();
        let file = CatalogFile {
            sounds: vec![sound("rain"), sound("rain")],
        };

        assert!(validator.validate(&file).is_err());
    }

    #[test]
    fn test_validate_settings_range() {
        let validator = CatalogValidator::new();
        let mut settings = Settings::default();
        assert!(validator.validate_settings(&settings).is_ok());

        settings.random_intensity = IntensityRange { min: 4, max: 2 };
        assert!(validator.validate_settings(&settings).is_err());
    }
}
