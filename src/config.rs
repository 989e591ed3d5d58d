//! Configuration file handling.
//!
//! Settings come from built-in defaults, an optional `dashboard.toml`,
//! environment variables, and finally command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analytics::AnalyticsConfig;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub narrative: NarrativeConfig,

    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Worker threads; `None` lets actix pick one per core.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeProvider {
    /// Ollama-compatible chat endpoint.
    Ollama,
    /// Offline extractive summary, no network calls.
    Extractive,
}

/// Narrative generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    #[serde(default = "default_provider")]
    pub provider: NarrativeProvider,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Upper bound on the length of extractive summaries.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            ollama_url: default_ollama_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_provider() -> NarrativeProvider {
    NarrativeProvider::Ollama
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    30
}

fn default_max_chars() -> usize {
    1200
}

/// Where student records come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV or JSON file; when absent a sample cohort is generated.
    #[serde(default)]
    pub students_file: Option<PathBuf>,

    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            students_file: None,
            sample_size: default_sample_size(),
            seed: None,
        }
    }
}

fn default_sample_size() -> usize {
    100
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `path` if given, else `dashboard.toml` when it exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply overrides from environment variables.
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    fn merge_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(model) = var("MODEL_NAME") {
            self.narrative.model = model;
        }
        if let Some(url) = var("OLLAMA_URL") {
            self.narrative.ollama_url = url;
        }
        if let Some(file) = var("STUDENTS_FILE") {
            self.data.students_file = Some(PathBuf::from(file));
        }
    }

    /// Merge command-line arguments; explicit flags take precedence.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref students) = args.students {
            self.data.students_file = Some(students.clone());
        }
        if let Some(seed) = args.seed {
            self.data.seed = Some(seed);
        }
        if args.offline {
            self.narrative.provider = NarrativeProvider::Extractive;
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.analytics.top_performers_count, 5);
        assert_eq!(config.analytics.attendance_threshold, 80.0);
        assert_eq!(config.narrative.provider, NarrativeProvider::Ollama);
        assert_eq!(config.data.sample_size, 100);
        assert!(config.data.students_file.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[server]
port = 9000

[analytics]
attendance_threshold = 75.0

[narrative]
provider = "extractive"
max_chars = 400

[data]
students_file = "data/students.csv"
seed = 11
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.analytics.attendance_threshold, 75.0);
        assert_eq!(config.analytics.top_performers_count, 5);
        assert_eq!(config.narrative.provider, NarrativeProvider::Extractive);
        assert_eq!(config.narrative.max_chars, 400);
        assert_eq!(
            config.data.students_file,
            Some(PathBuf::from("data/students.csv"))
        );
        assert_eq!(config.data.seed, Some(11));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analytics]\ntop_performers_count = 3").unwrap();

        let config = Config::resolve(Some(file.path())).unwrap();
        assert_eq!(config.analytics.top_performers_count, 3);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = 1").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [("MODEL_NAME", "mistral:7b"), ("STUDENTS_FILE", "s.json")]
            .into_iter()
            .collect();

        let mut config = Config::default();
        config.merge_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.narrative.model, "mistral:7b");
        assert_eq!(config.narrative.ollama_url, "http://localhost:11434");
        assert_eq!(config.data.students_file, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn test_toml_round_trip_keeps_sections() {
        let toml_str = Config::default().to_toml().unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[analytics]"));
        assert!(toml_str.contains("[narrative]"));
        assert!(toml_str.contains("[data]"));
    }
}
