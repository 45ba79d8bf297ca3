// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Every section has defaults, so an absent file yields a working configuration
use crate::gateway::{DEFAULT_SUMMARY_PROMPT, DEFAULT_UI_AGENTS};
use crate::paths;
use crate::queue::QueueDiscipline;
use crate::router::{RouterOptions, DEFAULT_HISTORY_LIMIT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use switchboard_delivery::cache::DEFAULT_CACHE_LIMIT;
use switchboard_delivery::DriverPreference;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coordinates: CoordinatesConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatesConfig {
    /// JSON file mapping agent ids to delivery targets
    #[serde(default = "default_coordinates_path")]
    pub path: String,
}

impl Default for CoordinatesConfig {
    fn default() -> Self {
        Self {
            path: default_coordinates_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub dry_run: bool,
    /// Agents whose windows are driven by UI automation
    #[serde(default = "default_ui_agents")]
    pub ui_agents: Vec<String>,
    #[serde(default = "default_summary_prompt")]
    pub summary_prompt: String,
    /// Directory holding one folder per agent for inbox delivery
    #[serde(default = "default_workspace_root")]
    pub workspace_root: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            ui_agents: default_ui_agents(),
            summary_prompt: default_summary_prompt(),
            workspace_root: default_workspace_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub queue: QueueDiscipline,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            queue: QueueDiscipline::default(),
            max_retries: 0,
            stop_timeout_ms: default_stop_timeout_ms(),
            history_limit: default_history_limit(),
        }
    }
}

impl RouterConfig {
    pub fn options(&self) -> RouterOptions {
        RouterOptions {
            discipline: self.queue,
            max_retries: self.max_retries,
            history_limit: self.history_limit,
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub driver: DriverPreference,
    /// Pause between UI steps so focus changes land
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            driver: DriverPreference::default(),
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

impl UiConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_webhook_username")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
    /// Audit cache file; defaults to the XDG data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
    #[serde(default = "default_cache_limit")]
    pub cache_limit: usize,
}

// Webhook URLs embed their token, keep them out of logs
impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("avatar_url", &self.avatar_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("cache_path", &self.cache_path)
            .field("cache_limit", &self.cache_limit)
            .finish()
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: default_webhook_username(),
            avatar_url: None,
            timeout_secs: default_webhook_timeout_secs(),
            cache_path: None,
            cache_limit: default_cache_limit(),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::cache_file)
    }
}

fn default_coordinates_path() -> String {
    paths::coordinates_file().to_string_lossy().to_string()
}

fn default_ui_agents() -> Vec<String> {
    DEFAULT_UI_AGENTS.iter().map(|a| a.to_string()).collect()
}

fn default_summary_prompt() -> String {
    DEFAULT_SUMMARY_PROMPT.to_string()
}

fn default_workspace_root() -> String {
    "./agent_workspaces".to_string()
}

fn default_stop_timeout_ms() -> u64 {
    2000
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_step_delay_ms() -> u64 {
    250
}

fn default_webhook_username() -> Option<String> {
    Some("Switchboard".to_string())
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

fn default_cache_limit() -> usize {
    DEFAULT_CACHE_LIMIT
}

/// Expand tilde (~) to home directory in paths
/// Logs a warning if expansion fails and falls back to the original path
pub fn expand_tilde(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs
                .home_dir()
                .join(stripped)
                .to_string_lossy()
                .to_string();
        }
        tracing::warn!(path = %path, "Failed to expand tilde: could not determine home directory");
    } else if path == "~" {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs.home_dir().to_string_lossy().to_string();
        }
        tracing::warn!("Failed to expand tilde: could not determine home directory");
    }
    path.to_string()
}

fn parse_bool(name: &str, val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean (true/false), got: {}", name, val),
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. SWITCHBOARD_CONFIG_PATH env var (if set)
    /// 2. ./switchboard.toml (current directory)
    /// 3. ~/.config/switchboard/switchboard.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("SWITCHBOARD_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!(path = %env_path, "SWITCHBOARD_CONFIG_PATH does not exist, ignoring");
        }

        let local_config = PathBuf::from("switchboard.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration from the first config file found, with environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`Config::load`], but an explicit path wins over the search order
    /// and must exist.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut config = match path {
            Some(config_path) => {
                tracing::info!(path = %config_path.display(), "Loading configuration from file");
                Self::from_file(&config_path)?
            }
            None => {
                tracing::info!("No config file found, using environment variables and defaults");
                Config::default()
            }
        };

        config.apply_env_overrides()?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_nonempty("SWITCHBOARD_COORDINATES") {
            self.coordinates.path = val;
        }
        if let Ok(val) = std::env::var("SWITCHBOARD_DRY_RUN") {
            self.gateway.dry_run = parse_bool("SWITCHBOARD_DRY_RUN", &val)?;
        }
        if let Some(val) = env_nonempty("SWITCHBOARD_SUMMARY_PROMPT") {
            self.gateway.summary_prompt = val;
        }
        if let Some(val) = env_nonempty("SWITCHBOARD_WORKSPACE_ROOT") {
            self.gateway.workspace_root = val;
        }
        if let Some(val) = env_nonempty("SWITCHBOARD_WEBHOOK_URL") {
            self.webhook.url = Some(val);
        } else if let Some(val) = env_nonempty("DISCORD_WEBHOOK_URL") {
            // Legacy env var support
            self.webhook.url = Some(val);
        }
        if let Some(val) = env_nonempty("SWITCHBOARD_UI_DRIVER") {
            self.ui.driver = val
                .parse()
                .with_context(|| format!("SWITCHBOARD_UI_DRIVER is invalid: {}", val))?;
        }
        if let Some(val) = env_nonempty("SWITCHBOARD_QUEUE") {
            self.router.queue = val
                .parse()
                .with_context(|| format!("SWITCHBOARD_QUEUE is invalid: {}", val))?;
        }
        if let Some(val) = env_nonempty("SWITCHBOARD_MAX_RETRIES") {
            self.router.max_retries = val.parse().with_context(|| {
                format!("SWITCHBOARD_MAX_RETRIES must be a valid number, got: {}", val)
            })?;
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        self.coordinates.path = expand_tilde(&self.coordinates.path);
        self.gateway.workspace_root = expand_tilde(&self.gateway.workspace_root);
        if let Some(cache_path) = self.webhook.cache_path.as_deref() {
            self.webhook.cache_path = Some(expand_tilde(cache_path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.coordinates.path.trim().is_empty() {
            anyhow::bail!("coordinates.path must not be empty");
        }
        if self.gateway.summary_prompt.trim().is_empty() {
            anyhow::bail!(
                "gateway.summary_prompt must not be empty (set in switchboard.toml or SWITCHBOARD_SUMMARY_PROMPT)"
            );
        }
        if self.gateway.workspace_root.trim().is_empty() {
            anyhow::bail!("gateway.workspace_root must not be empty");
        }
        if self.router.stop_timeout_ms == 0 {
            anyhow::bail!("router.stop_timeout_ms must be greater than zero");
        }
        if self.router.history_limit == 0 {
            anyhow::bail!("router.history_limit must be greater than zero");
        }
        if self.webhook.timeout_secs == 0 {
            anyhow::bail!("webhook.timeout_secs must be greater than zero");
        }
        if self.webhook.cache_limit == 0 {
            anyhow::bail!("webhook.cache_limit must be greater than zero");
        }
        if let Some(url) = &self.webhook.url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                anyhow::bail!("webhook.url must be an http(s) URL");
            }
        }
        Ok(())
    }
}
