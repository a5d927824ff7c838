use eyre::{Context, Result};
use ibqueue::domain::PriorityDefaults;
use ibqueue::scheduler::DEFAULT_REFRESH_THRESHOLD_MINUTES;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub priority: PriorityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Minutes after which `review` reloads its queue from the store
    pub refresh_threshold_minutes: f64,
    /// Reference tags offered as filters; a list or one "a, b, c" string
    #[serde(deserialize_with = "deserialize_refs")]
    pub subset_queries: Vec<String>,
    /// Filter applied when no --refs is given
    #[serde(deserialize_with = "deserialize_refs")]
    pub selected_refs: Vec<String>,
    pub query_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            refresh_threshold_minutes: DEFAULT_REFRESH_THRESHOLD_MINUTES,
            subset_queries: Vec::new(),
            selected_refs: Vec::new(),
            query_timeout_ms: 10000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub items_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            items_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ibqueue")
                .join("items.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub default_a: f64,
    pub default_b: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        let defaults = PriorityDefaults::default();
        Self {
            default_a: defaults.a,
            default_b: defaults.b,
        }
    }
}

impl PriorityConfig {
    pub fn defaults(&self) -> PriorityDefaults {
        PriorityDefaults {
            a: self.default_a,
            b: self.default_b,
        }
    }
}

/// Split a comma-separated tag list, dropping blanks.
pub fn parse_refs(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RefList {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_refs<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RefList::deserialize(deserializer)? {
        RefList::Joined(s) => parse_refs(&s),
        RefList::List(list) => list
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect(),
    })
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
