use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::model::Model;

/// Optional settings file. The client never writes it back.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub host: Option<String>,
    pub default_model: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Missing file means defaults; a file that does not parse is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Host from the command line or `OLLAMA_HOST` wins over the file. Blank
    /// values count as unset.
    pub fn resolve_host(&self, cli_host: Option<&str>) -> Option<String> {
        cli_host
            .map(str::to_string)
            .or_else(|| self.host.clone())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
    }

    /// An unknown `default_model` falls back to the picker default.
    pub fn resolve_model(&self, cli_model: Option<Model>) -> Model {
        cli_model
            .or_else(|| self.default_model.as_deref().and_then(Model::from_str))
            .unwrap_or_default()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ollama-chat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"host": "http://gpu-box:11434", "default_model": "codellama"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.host.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.resolve_model(None), Model::Codellama);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_cli_host_wins() {
        let config = Config {
            host: Some("http://from-file:11434".to_string()),
            default_model: None,
        };
        assert_eq!(
            config.resolve_host(Some("http://from-env:11434")).as_deref(),
            Some("http://from-env:11434")
        );
        assert_eq!(
            config.resolve_host(None).as_deref(),
            Some("http://from-file:11434")
        );
    }

    #[test]
    fn test_blank_host_is_unset() {
        let config = Config::default();
        assert_eq!(config.resolve_host(Some("   ")), None);
        assert_eq!(config.resolve_host(None), None);
    }

    #[test]
    fn test_unknown_default_model_falls_back() {
        let config = Config {
            host: None,
            default_model: Some("gpt-4".to_string()),
        };
        assert_eq!(config.resolve_model(None), Model::Llama2);
        assert_eq!(config.resolve_model(Some(Model::Mistral)), Model::Mistral);
    }
}
