use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::modules::catalog::{default_categories, Category, CategoryCatalog, DEFAULT_SCAN_BONUS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wizard: WizardConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    // Upper bound for the submission handler call, in milliseconds
    pub submit_timeout_ms: u64,
    // Points added to the estimate when a code was scanned
    pub scan_bonus: u32,
    // Encoder quality requested from the camera on capture, in (0, 1]
    pub camera_jpeg_quality: f32,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            submit_timeout_ms: 5000,
            scan_bonus: DEFAULT_SCAN_BONUS,
            camera_jpeg_quality: 0.8,
        }
    }
}

impl WizardConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wizard: WizardConfig::default(),
            categories: default_categories(),
        }
    }
}

impl Config {
    // Build the category lookup shared by the wizards of a session
    pub fn catalog(&self) -> CategoryCatalog {
        CategoryCatalog::new(self.categories.clone(), self.wizard.scan_bonus)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.wizard.submit_timeout_ms == 0 {
            return Err(ConfigError::Invalid("submit_timeout_ms must be positive".to_string()));
        }
        let quality = self.wizard.camera_jpeg_quality;
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "camera_jpeg_quality must be in (0, 1], got {}",
                quality
            )));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("at least one category is required".to_string()));
        }

        // Category ids are what the draft stores, they must be non-empty and unique
        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.id.trim().is_empty() {
                return Err(ConfigError::Invalid("category id must not be empty".to_string()));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate category id: {}", category.id)));
            }
        }
        Ok(())
    }
}

pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    parse_config(&contents)
}
