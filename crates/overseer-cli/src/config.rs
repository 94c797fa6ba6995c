use anyhow::Context;
use overseer_orchestrator::OrchestratorConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Contents of `overseer.toml`. Every table is optional.
#[derive(Debug, Deserialize, Default)]
pub struct OverseerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Action name to shell command, shared by process steps and healing
    /// strategies.
    #[serde(default)]
    pub actions: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_keys: vec![],
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl OverseerConfig {
    /// Read and validate `path`. A missing file yields the defaults.
    ///
    /// `OVERSEER_API_KEY` from the environment (or `.env`) is added to the
    /// configured keys.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config: OverseerConfig = match tokio::fs::read_to_string(path).await {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("Failed to parse config file '{}'", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                OverseerConfig::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file '{}'", path.display()))
            }
        };

        if let Ok(key) = std::env::var("OVERSEER_API_KEY") {
            if !key.is_empty() && !config.server.api_keys.contains(&key) {
                config.server.api_keys.push(key);
            }
        }

        config.orchestrator.validate()?;
        Ok(config)
    }
}
