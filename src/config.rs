use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Fallback task store. A free-tier deployment that scales to zero between
/// uses, hence the wake-up dance in `remote`.
const DEFAULT_BACKEND_URL: &str = "https://snag-taskstore.onrender.com";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub backend: Option<BackendConfig>,
    pub jira: Option<JiraConfig>,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    pub domain: String,
    pub email: String,
    pub api_token: String,
    pub project_key: String,
    pub default_assignee: Option<String>,
}

impl AppConfig {
    /// The task store base URL, config override first.
    pub fn backend_url(&self) -> String {
        self.backend
            .as_ref()
            .map(|b| b.url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".snag")
        .join("config.toml")
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".snag")
}

pub fn load_config() -> Result<AppConfig> {
    let path = config_path();
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_url_defaults_without_config() {
        let config = AppConfig::default();
        assert_eq!(config.backend_url(), DEFAULT_BACKEND_URL);
    }

    #[test]
    fn backend_url_override_strips_trailing_slash() {
        let config: AppConfig = toml::from_str(
            r#"
            [backend]
            url = "http://localhost:5000/"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_url(), "http://localhost:5000");
    }

    #[test]
    fn jira_config_parses() {
        let config: AppConfig = toml::from_str(
            r#"
            [jira]
            domain = "acme"
            email = "dev@acme.com"
            api_token = "secret"
            project_key = "PROJ"
            "#,
        )
        .unwrap();
        let jira = config.jira.unwrap();
        assert_eq!(jira.domain, "acme");
        assert_eq!(jira.project_key, "PROJ");
        assert!(jira.default_assignee.is_none());
    }
}
