use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Persisted settings. The two preference keys keep their wire names so the
/// stored file reads the same way the panel's storage contract is written.
/// Every field is optional: a missing key is "not yet set", never an error.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(rename = "learningStyle")]
    pub learning_style: Option<String>,
    #[serde(rename = "enhancementType")]
    pub enhancement_type: Option<String>,
    pub default_model: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            learning_style: None,
            enhancement_type: None,
            default_model: None,
            openai_api_key: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Write both preference keys. Callers treat this as fire-and-forget; a
    /// failed write costs nothing but the persistence of the change.
    pub fn save_preferences(learning_style: &str, enhancement_type: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.learning_style = Some(learning_style.to_string());
        config.enhancement_type = Some(enhancement_type.to_string());
        config.save()
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("lectern").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.learning_style.is_none());
        assert!(config.enhancement_type.is_none());
    }

    #[test]
    fn test_round_trip_preserves_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::new();
        config.learning_style = Some("linguistic".to_string());
        config.enhancement_type = Some("Interactive Q&A".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.learning_style.as_deref(), Some("linguistic"));
        assert_eq!(loaded.enhancement_type.as_deref(), Some("Interactive Q&A"));
    }

    #[test]
    fn test_wire_key_names() {
        let mut config = Config::new();
        config.learning_style = Some("spatial".to_string());
        config.enhancement_type = Some("Chunking Information".to_string());

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"learningStyle\""));
        assert!(json.contains("\"enhancementType\""));
    }

    #[test]
    fn test_partial_file_leaves_other_keys_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"learningStyle": "spatial"}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.learning_style.as_deref(), Some("spatial"));
        assert!(loaded.enhancement_type.is_none());
        assert!(loaded.openai_api_key.is_none());
    }
}
