use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::idea::GeneratorOptions;

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_data_folder")]
    pub data_folder: String,

    #[serde(default)]
    pub unattended: bool,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub defaults: GeneratorOptions,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "default_title_count")]
    pub title_count: usize,

    /// Cosmetic pause before an idea is shown. Front-ends only.
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            title_count: default_title_count(),
            delay_ms: 0,
        }
    }
}

fn default_data_folder() -> String {
    "data_store".to_string()
}
fn default_title_count() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
            unattended: false,
            generator: GeneratorConfig::default(),
            defaults: GeneratorOptions::default(),
        }
    }
}

impl Config {
    /// Loads `config.yml` from the working directory, falling back to the
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Path::new(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// True when `config.yml` exists in the working directory.
    pub fn exists() -> bool {
        Path::new(CONFIG_FILE).exists()
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.data_folder)
            .with_context(|| format!("Failed to create {}", self.data_folder))?;
        Ok(())
    }
}
