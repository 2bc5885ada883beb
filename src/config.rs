//! Editor configuration
//!
//! Handles loading and managing configuration from config.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Global editor config
static EDITOR_CONFIG: OnceLock<EditorConfig> = OnceLock::new();

/// Get the global editor config
pub fn get_config() -> &'static EditorConfig {
    EDITOR_CONFIG.get_or_init(EditorConfig::load)
}

/// Root editor configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EditorConfig {
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub new_image: NewImageDefaults,
}

/// External image builder settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WriterConfig {
    /// Program to run, looked up on PATH when not absolute
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the generated ones, e.g. `["-as", "mkisofs"]`
    #[serde(default)]
    pub leading_args: Vec<String>,
    /// Parent directory for staging trees (system temp dir when unset)
    #[serde(default)]
    pub staging_root: Option<PathBuf>,
}

fn default_program() -> String {
    "genisoimage".to_string()
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            leading_args: Vec::new(),
            staging_root: None,
        }
    }
}

/// Metadata given to a freshly initialized image
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NewImageDefaults {
    #[serde(default = "default_volume_id")]
    pub volume_id: String,
    #[serde(default)]
    pub system_id: String,
}

fn default_volume_id() -> String {
    "NEW_ISO".to_string()
}

impl Default for NewImageDefaults {
    fn default() -> Self {
        Self {
            volume_id: default_volume_id(),
            system_id: String::new(),
        }
    }
}

impl EditorConfig {
    /// Load configuration from config.json
    pub fn load() -> Self {
        // Try to load from current directory first
        if let Ok(config) = Self::load_from_path("config.json") {
            log::info!("Loaded config from ./config.json");
            return config;
        }

        // Try to load from executable directory
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let config_path = exe_dir.join("config.json");
                if let Ok(config) = Self::load_from_path(&config_path) {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
            }
        }

        log::info!("No config.json found, using defaults");
        Self::default()
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.into();
        let content = fs::read_to_string(&path)?;
        let config: EditorConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.writer.program, "genisoimage");
        assert!(config.writer.leading_args.is_empty());
        assert_eq!(config.new_image.volume_id, "NEW_ISO");
        assert_eq!(config.new_image.system_id, "");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "writer": { "program": "xorriso", "leading_args": ["-as", "mkisofs"] } }"#,
        )
        .unwrap();

        let config = EditorConfig::load_from_path(&path).unwrap();
        assert_eq!(config.writer.program, "xorriso");
        assert_eq!(config.writer.leading_args, vec!["-as", "mkisofs"]);
        assert!(config.writer.staging_root.is_none());
        assert_eq!(config.new_image.volume_id, "NEW_ISO");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(EditorConfig::load_from_path(&path).is_err());
    }
}
