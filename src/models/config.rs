//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Notification channel settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Event store location
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP behavior for source adapters
    #[serde(default)]
    pub http: HttpConfig,

    /// Dispatch pacing
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Dispatch policy
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Ticketing sites to scrape
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Sources with `enabled = true`.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(AppError::config("telegram.bot_token is empty"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(AppError::config("telegram.chat_id is empty"));
        }
        if self.telegram.timeout_secs == 0 {
            return Err(AppError::config("telegram.timeout_secs must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        if self.rate_limit.burst_size == 0 {
            return Err(AppError::config("rate_limit.burst_size must be > 0"));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(AppError::config("store.path is empty"));
        }
        if self.enabled_sources().next().is_none() {
            return Err(AppError::config("No enabled sources defined"));
        }
        for source in self.enabled_sources() {
            if let SourceConfig::Secutix {
                username, password, ..
            } = source
            {
                if username.trim().is_empty() || password.is_empty() {
                    return Err(AppError::config(
                        "secutix source requires username and password",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    /// Chat receiving event notifications
    #[serde(default)]
    pub chat_id: String,

    /// Operator chat receiving delivery failures
    #[serde(default)]
    pub alert_chat_id: Option<String>,

    #[serde(default = "defaults::telegram_api_url")]
    pub api_url: String,

    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            alert_chat_id: None,
            api_url: defaults::telegram_api_url(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Event store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding every stored event
    #[serde(default = "defaults::store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::store_path(),
        }
    }
}

/// HTTP client settings for scraping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Spacing between dispatch calls.
///
/// Telegram allows roughly one message per second and twenty per minute in a
/// group; the defaults stay just under both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Pause after every dispatch call
    #[serde(default = "defaults::min_interval_ms")]
    pub min_interval_ms: u64,

    /// Number of calls between extended pauses
    #[serde(default = "defaults::burst_size")]
    pub burst_size: u64,

    /// Extended pause after every `burst_size`-th call
    #[serde(default = "defaults::burst_pause_secs")]
    pub burst_pause_secs: u64,
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn burst_pause(&self) -> Duration {
        Duration::from_secs(self.burst_pause_secs)
    }

    /// No pacing at all; meant for tests and dry runs.
    pub fn unthrottled() -> Self {
        Self {
            min_interval_ms: 0,
            burst_size: defaults::burst_size(),
            burst_pause_secs: 0,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: defaults::min_interval_ms(),
            burst_size: defaults::burst_size(),
            burst_pause_secs: defaults::burst_pause_secs(),
        }
    }
}

/// What the dispatcher announces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Announce new events even when they are already sold out
    #[serde(default = "defaults::announce_sold_out")]
    pub announce_sold_out: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            announce_sold_out: defaults::announce_sold_out(),
        }
    }
}

/// A ticketing site to scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// JOBO shop on the Secutix platform (login required)
    Secutix {
        #[serde(default = "defaults::enabled")]
        enabled: bool,
        #[serde(default = "defaults::secutix_base_url")]
        base_url: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    /// Madrid Destino shop, JOBO listing
    MadridDestino {
        #[serde(default = "defaults::enabled")]
        enabled: bool,
        #[serde(default = "defaults::madrid_destino_base_url")]
        base_url: String,
    },
}

impl SourceConfig {
    pub fn enabled(&self) -> bool {
        match self {
            Self::Secutix { enabled, .. } | Self::MadridDestino { enabled, .. } => *enabled,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Secutix { .. } => "secutix",
            Self::MadridDestino { .. } => "madrid_destino",
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn telegram_api_url() -> String {
        "https://api.telegram.org".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn store_path() -> PathBuf {
        PathBuf::from("data/events.json")
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; jobo-bot/1.0)".into()
    }

    // Rate limit defaults
    pub fn min_interval_ms() -> u64 {
        1050
    }
    pub fn burst_size() -> u64 {
        20
    }
    pub fn burst_pause_secs() -> u64 {
        40
    }

    pub fn announce_sold_out() -> bool {
        true
    }

    // Source defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn secutix_base_url() -> String {
        "https://madridcultura-jobo.shop.secutix.com".into()
    }
    pub fn madrid_destino_base_url() -> String {
        "https://tienda.madrid-destino.com/es".into()
    }
}
