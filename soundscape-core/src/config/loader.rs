//! YAML catalog and settings loader with directory discovery.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::config::types::{CatalogFile, Settings, Sound};
use crate::config::validator::CatalogValidator;
use crate::error::{Error, Result};

/// Catalog loader.
/// Supports scanning multiple directories (e.g., built-in + user content).
/// When sound ids collide, later directories override earlier ones.
pub struct CatalogLoader {
    catalog_dirs: Vec<PathBuf>,
    validator: CatalogValidator,
}

impl CatalogLoader {
    /// Creates a new catalog loader for a single directory.
    pub fn new<P: AsRef<Path>>(catalog_dir: P) -> Self {
        Self::new_with_dirs(vec![catalog_dir.as_ref().to_path_buf()])
    }

    /// Creates a new catalog loader that scans multiple directories in order.
    pub fn new_with_dirs(catalog_dirs: Vec<PathBuf>) -> Self {
        Self {
            catalog_dirs,
            validator: CatalogValidator::new(),
        }
    }

    /// Loads and validates a single catalog file by filename (searches all directories).
    pub fn load(&self, filename: &str) -> Result<CatalogFile> {
        // Later dirs take priority
        let path = self
            .catalog_dirs
            .iter()
            .rev()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                Error::ConfigLoad(
                    filename.to_string(),
                    "File not found in any catalog directory".to_string(),
                )
            })?;

        let file = Self::load_from_path(&path)?;
        self.validator.validate(&file)?;
        Ok(file)
    }

    fn load_from_path(path: &Path) -> Result<CatalogFile> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(path.display().to_string(), e.to_string()))?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigParse(path.display().to_string(), e.to_string()))
    }

    /// Discovers all catalog files across all directories.
    /// Returns (filename, full_path) pairs sorted by filename; later directories
    /// override earlier ones for the same filename.
    fn discover_all_with_paths(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut by_name: HashMap<String, PathBuf> = HashMap::new();

        for dir in &self.catalog_dirs {
            if !dir.exists() {
                continue;
            }
            let entries = fs::read_dir(dir)
                .map_err(|e| Error::ConfigLoad(dir.display().to_string(), e.to_string()))?;

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml") {
                    if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                        by_name.insert(filename.to_string(), path);
                    }
                }
            }
        }

        let mut files: Vec<(String, PathBuf)> = by_name.into_iter().collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    /// Discovers all catalog filenames across all directories.
    pub fn discover_all(&self) -> Result<Vec<String>> {
        Ok(self
            .discover_all_with_paths()?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Loads every catalog file into one immutable [`Catalog`].
    /// Files that fail to parse or validate are skipped with a warning.
    pub fn load_all(&self) -> Result<Catalog> {
        let mut sounds: HashMap<String, Sound> = HashMap::new();

        // Directory order first, so later directories override by sound id
        for dir in &self.catalog_dirs {
            let loader = CatalogLoader::new(dir);
            for (filename, path) in loader.discover_all_with_paths()? {
                let file = match Self::load_from_path(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        tracing::warn!("Failed to load catalog {}: {}", filename, e);
                        continue;
                    }
                };
                if let Err(e) = self.validator.validate(&file) {
                    tracing::warn!("Catalog {} failed validation: {}", filename, e);
                    continue;
                }
                for sound in file.sounds {
                    if sounds.contains_key(&sound.id) {
                        tracing::debug!("Sound '{}' overridden by {}", sound.id, path.display());
                    }
                    sounds.insert(sound.id.clone(), sound);
                }
            }
        }

        tracing::info!("Loaded catalog with {} sounds", sounds.len());
        Ok(Catalog::new(sounds.into_values()))
    }

    /// Returns all catalog directories.
    pub fn catalog_dirs(&self) -> &[PathBuf] {
        &self.catalog_dirs
    }
}

/// Loads engine settings from a YAML file. A missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::info!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::ConfigLoad(path.display().to_string(), e.to_string()))?;
    let settings: Settings = serde_yaml::from_str(&content)
        .map_err(|e| Error::ConfigParse(path.display().to_string(), e.to_string()))?;

    CatalogValidator::new().validate_settings(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        let mut file = fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const WEATHER: &str = r#"
sounds:
  - id: rain
    group: weather
    loop: true
    src: [rain.ogg]
  - id: rolling_thunder
    group: weather
    tags: [storm]
    src: [thunder_0.ogg, thunder_1.ogg]
"#;

    #[test]
    fn test_load_catalog_file() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "weather.yaml", WEATHER);

        let loader = CatalogLoader::new(temp_dir.path());
        let file = loader.load("weather.yaml").unwrap();

        assert_eq!(file.sounds.len(), 2);
        assert!(file.sounds[0].is_loopable);
        assert!(!file.sounds[1].is_loopable);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = CatalogLoader::new(temp_dir.path());

        assert!(matches!(loader.load("nope.yaml"), Err(Error::ConfigLoad(_, _))));
    }

    #[test]
    fn test_load_reports_validation_error_once() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(
            temp_dir.path(),
            "dupes.yaml",
            "sounds:\n  - id: rain\n    src: [a.ogg]\n  - id: rain\n    src: [b.ogg]\n",
        );
        let loader = CatalogLoader::new(temp_dir.path());

        match loader.load("dupes.yaml") {
            Err(Error::ConfigValidation(field, message)) => {
                assert_eq!(field, "sounds.rain");
                assert_eq!(message, "Duplicate sound id");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_all() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "weather.yaml", WEATHER);
        create_test_file(temp_dir.path(), "animals.yml", "sounds: []");
        create_test_file(temp_dir.path(), "notes.txt", "ignored");

        let loader = CatalogLoader::new(temp_dir.path());
        let files = loader.discover_all().unwrap();

        assert_eq!(files, vec!["animals.yml".to_string(), "weather.yaml".to_string()]);
    }

    #[test]
    fn test_multi_dir_override_by_sound_id() {
        let builtin_dir = TempDir::new().unwrap();
        let user_dir = TempDir::new().unwrap();

        create_test_file(builtin_dir.path(), "weather.yaml", WEATHER);
        create_test_file(
            user_dir.path(),
            "custom.yaml",
            "sounds:\n  - id: rain\n    name: Heavy Rain\n    loop: true\n    src: [heavy_rain.ogg]\n",
        );

        let loader = CatalogLoader::new_with_dirs(vec![
            builtin_dir.path().to_path_buf(),
            user_dir.path().to_path_buf(),
        ]);

        let catalog = loader.load_all().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("rain").unwrap().display_name(), "Heavy Rain");
    }

    #[test]
    fn test_invalid_file_skipped() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "weather.yaml", WEATHER);
        create_test_file(temp_dir.path(), "broken.yaml", "sounds:\n  - id: wind\n");

        let loader = CatalogLoader::new(temp_dir.path());
        let catalog = loader.load_all().unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("wind").is_err());
    }

    #[test]
    fn test_missing_user_dir() {
        let builtin_dir = TempDir::new().unwrap();
        create_test_file(builtin_dir.path(), "weather.yaml", WEATHER);

        let loader = CatalogLoader::new_with_dirs(vec![
            builtin_dir.path().to_path_buf(),
            PathBuf::from("/tmp/nonexistent_soundscape_catalog_dir"),
        ]);

        assert_eq!(loader.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_load_settings() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(
            temp_dir.path(),
            "settings.yaml",
            "assets_dir: /opt/sounds\nrandom_intensity:\n  min: 1\n  max: 3\n",
        );

        let settings = load_settings(&temp_dir.path().join("settings.yaml")).unwrap();
        assert_eq!(settings.assets_dir, PathBuf::from("/opt/sounds"));
        assert_eq!(settings.random_intensity.as_range(), 1..=3);

        let defaults = load_settings(&temp_dir.path().join("missing.yaml")).unwrap();
        assert_eq!(defaults.log_level, "info");
    }
}
