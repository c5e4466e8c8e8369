use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::cli_args::Cli;
use crate::llm::{ProviderConfig, ProviderKind};
use crate::types::Style;

const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Final resolved configuration for worklogbot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub provider: ProviderConfig,
    pub default_style: Style,
}

impl Config {
    /// Build the final config from CLI flags, environment, TOML file, and defaults.
    ///
    /// Precedence:
    ///   1. CLI flags (`--provider`, `--model`, `--api-key`, `--endpoint`)
    ///   2. Env vars (`WORKLOGBOT_PROVIDER`, `WORKLOGBOT_MODEL`, `WORKLOGBOT_STYLE`,
    ///      `GEMINI_API_KEY` / `OPENAI_API_KEY`, `WORKLOGBOT_LOCAL_ENDPOINT`)
    ///   3. TOML `~/.config/worklogbot.toml` (or `--config`)
    ///   4. Defaults (Gemini, technical style)
    ///
    /// A missing credential is not an error here; the provider reports it
    /// when it is about to be used.
    pub fn from_sources(cli: &Cli) -> Result<Self> {
        let file_cfg = match &cli.config {
            Some(path) => load_file_config(path)?
                .ok_or_else(|| anyhow!("config file {} does not exist", path.display()))?,
            None => match config_path() {
                Some(path) => load_file_config(&path)?.unwrap_or_default(),
                None => FileConfig::default(),
            },
        };

        Self::resolve(cli, &file_cfg, |key| env::var(key).ok())
    }

    fn resolve(
        cli: &Cli,
        file_cfg: &FileConfig,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let kind = match cli.provider {
            Some(kind) => kind,
            None => match env_var("WORKLOGBOT_PROVIDER") {
                Some(raw) => raw
                    .parse::<ProviderKind>()
                    .map_err(|e: String| anyhow!(e))
                    .context("invalid WORKLOGBOT_PROVIDER")?,
                None => file_cfg.provider.unwrap_or_default(),
            },
        };

        let default_style = match env_var("WORKLOGBOT_STYLE") {
            Some(raw) => raw
                .parse::<Style>()
                .map_err(|e: String| anyhow!(e))
                .context("invalid WORKLOGBOT_STYLE")?,
            None => file_cfg.style.unwrap_or_default(),
        };

        let section = file_cfg.section(kind);
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let model = non_empty(cli.model.clone())
            .or_else(|| non_empty(env_var("WORKLOGBOT_MODEL")))
            .or_else(|| non_empty(section.model.clone()))
            .unwrap_or_else(|| kind.default_model().to_string());

        let key_env = match kind {
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Local => None,
        };
        let api_key = non_empty(cli.api_key.clone())
            .or_else(|| key_env.and_then(|k| non_empty(env_var(k))))
            .or_else(|| non_empty(section.api_key.clone()));

        let endpoint_env = match kind {
            ProviderKind::Local => env_var("WORKLOGBOT_LOCAL_ENDPOINT"),
            _ => None,
        };
        let endpoint = non_empty(cli.endpoint.clone())
            .or_else(|| non_empty(endpoint_env))
            .or_else(|| non_empty(section.endpoint.clone()));

        let timeout_secs = file_cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Config {
            provider: ProviderConfig {
                kind,
                model,
                api_key,
                endpoint,
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
            default_style,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    /// Default provider when not given via CLI or env.
    provider: Option<ProviderKind>,
    style: Option<Style>,
    /// Request timeout in seconds; 0 disables it.
    timeout_secs: Option<u64>,
    #[serde(default)]
    gemini: ProviderSection,
    #[serde(default)]
    openai: ProviderSection,
    #[serde(default)]
    local: ProviderSection,
}

impl FileConfig {
    fn section(&self, kind: ProviderKind) -> &ProviderSection {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Local => &self.local,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSection {
    api_key: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

/// Return `~/.config/worklogbot.toml`
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("worklogbot.toml"))
}

fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg = toml::from_str::<FileConfig>(&data)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(Some(cfg))
}
