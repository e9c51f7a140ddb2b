// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates values and provides defaults; token loading lives here too

use crate::error::{BotError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub slack: SlackConfig,
    pub names: NamesConfig,
    pub commands: CommandsConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

// ─── SlackConfig ────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// File holding the bot token (xoxb-...)
    pub token_path: String,
    /// App-level token (xapp-...) for Socket Mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_token: Option<String>,
    pub debug: bool,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            app_token: None,
            debug: false,
        }
    }
}

// Custom Debug impl to redact app_token
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token_path", &self.token_path)
            .field("app_token", &self.app_token.as_ref().map(|_| "[REDACTED]"))
            .field("debug", &self.debug)
            .finish()
    }
}

// ─── NamesConfig ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamesConfig {
    pub refresh_interval_secs: u64,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
        }
    }
}

impl NamesConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

// ─── CommandsConfig ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// IANA timezone used by the time and menu commands
    pub timezone: String,
    /// HTTP timeout for menu lookups
    pub menu_timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            menu_timeout_secs: 10,
        }
    }
}

impl CommandsConfig {
    /// Parsed timezone. Validated at load time, so UTC is only a fallback
    /// for hand-built configs.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn menu_timeout(&self) -> Duration {
        Duration::from_secs(self.menu_timeout_secs)
    }
}

// ─── LoggingConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(BotError::Config(format!(
                "unknown log format '{}', expected 'pretty' or 'json'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Also write logs to a daily rolling file
    pub to_file: bool,
    /// Log file directory; defaults to the XDG data dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl LoggingConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.directory
            .as_deref()
            .map(|d| PathBuf::from(expand_tilde(d)))
            .unwrap_or_else(paths::log_dir)
    }
}

// ─── MetricsConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Socket address for the Prometheus exporter, e.g. "127.0.0.1:9000"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
}

fn default_token_path() -> String {
    "/etc/slackbot/TOKEN".to_string()
}

fn default_timezone() -> String {
    // Try to detect system timezone, fall back to UTC
    if let Ok(tz) = std::env::var("TZ") {
        if tz.parse::<chrono_tz::Tz>().is_ok() {
            return tz;
        }
    }
    #[cfg(unix)]
    {
        if let Ok(link) = std::fs::read_link("/etc/localtime") {
            if let Some(tz) = link.to_str() {
                // e.g. /usr/share/zoneinfo/Europe/Ljubljana
                if let Some(pos) = tz.find("zoneinfo/") {
                    let detected = tz[pos + 9..].to_string();
                    if detected.parse::<chrono_tz::Tz>().is_ok() {
                        return detected;
                    }
                }
            }
        }
    }
    "UTC".to_string()
}

/// Expand a leading `~` to the home directory
fn expand_tilde(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs
                .home_dir()
                .join(stripped)
                .to_string_lossy()
                .to_string();
        }
        tracing::warn!(path = %path, "Could not determine home directory for tilde expansion");
    } else if path == "~" {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs.home_dir().to_string_lossy().to_string();
        }
    }
    path.to_string()
}

fn parse_env<T: std::str::FromStr>(name: &str, val: &str) -> Result<T> {
    val.trim()
        .parse()
        .map_err(|_| BotError::Config(format!("{} has an invalid value: {}", name, val)))
}

fn parse_bool(name: &str, val: &str) -> Result<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(BotError::Config(format!(
            "{} must be a boolean, got: {}",
            name, val
        ))),
    }
}

impl Config {
    /// Find the config file, checking in order:
    /// 1. SLACKBOT_CONFIG_PATH env var (if set)
    /// 2. ./config.toml
    /// 3. ~/.config/slackbot/config.toml
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("SLACKBOT_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load from the first config file found, then apply env overrides
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::info!("No config file found, using environment variables and defaults");
                Self::finish(Config::default())
            }
        }
    }

    /// Load from an explicit file, then apply env overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| BotError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        Self::finish(config)
    }

    /// Parse TOML without env overrides or validation
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn finish(mut config: Config) -> Result<Self> {
        config.apply_env_overrides()?;
        config.slack.token_path = expand_tilde(&config.slack.token_path);
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SLACKBOT_TOKEN_PATH") {
            self.slack.token_path = val;
        }
        if let Ok(val) = std::env::var("SLACK_APP_TOKEN") {
            self.slack.app_token = Some(val);
        }
        if let Ok(val) = std::env::var("SLACKBOT_DEBUG") {
            self.slack.debug = parse_bool("SLACKBOT_DEBUG", &val)?;
        }
        if let Ok(val) = std::env::var("SLACKBOT_REFRESH_SECS") {
            self.names.refresh_interval_secs = parse_env("SLACKBOT_REFRESH_SECS", &val)?;
        }
        if let Ok(val) = std::env::var("SLACKBOT_TIMEZONE") {
            self.commands.timezone = val;
        }
        if let Ok(val) = std::env::var("SLACKBOT_LOG_FORMAT") {
            self.logging.format = val.parse()?;
        }
        if let Ok(val) = std::env::var("SLACKBOT_METRICS_LISTEN") {
            self.metrics.listen = Some(val);
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.slack.token_path.trim().is_empty() {
            return Err(BotError::Config("slack.token_path is required".to_string()));
        }
        if self.names.refresh_interval_secs == 0 {
            return Err(BotError::Config(
                "names.refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.commands.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(BotError::Config(format!(
                "Invalid timezone '{}'. Use IANA timezone names like 'Europe/Ljubljana' or 'UTC'",
                self.commands.timezone
            )));
        }
        if let Some(listen) = &self.metrics.listen {
            if listen.parse::<std::net::SocketAddr>().is_err() {
                return Err(BotError::Config(format!(
                    "metrics.listen must be a socket address, got: {}",
                    listen
                )));
            }
        }
        Ok(())
    }
}

/// Read the bot token from a file, trimming surrounding whitespace
pub fn read_token(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        BotError::Config(format!("error reading slack token {}: {}", path.display(), e))
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(BotError::Config(format!(
            "slack token file {} is empty",
            path.display()
        )));
    }
    Ok(token.to_string())
}
