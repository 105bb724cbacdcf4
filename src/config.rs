// src/config.rs

//! Configuration loading utilities.
//!
//! Secrets can stay out of the TOML file: the environment variables below
//! override the matching config values when set and non-empty.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, SourceConfig};

pub const ENV_BOT_TOKEN: &str = "JOBO_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "JOBO_CHAT_ID";
pub const ENV_ALERT_CHAT_ID: &str = "JOBO_ALERT_CHAT_ID";
pub const ENV_SECUTIX_USER: &str = "JOBO_SECUTIX_USER";
pub const ENV_SECUTIX_PASSWORD: &str = "JOBO_SECUTIX_PASSWORD";

/// Load configuration from a TOML file and apply environment overrides.
///
/// Unlike [`Config::load_or_default`], a missing or malformed file is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load(path)
        .map_err(|e| AppError::config(format!("Failed to load config from {path:?}: {e}")))?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration and reject it if it cannot drive a run.
pub fn load_validated(path: &Path) -> Result<Config> {
    let config = load_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Override secrets from a key lookup (normally the process environment).
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = get(ENV_BOT_TOKEN) {
        config.telegram.bot_token = token;
    }
    if let Some(chat_id) = get(ENV_CHAT_ID) {
        config.telegram.chat_id = chat_id;
    }
    if let Some(alert) = get(ENV_ALERT_CHAT_ID) {
        config.telegram.alert_chat_id = Some(alert);
    }

    for source in &mut config.sources {
        if let SourceConfig::Secutix {
            username, password, ..
        } = source
        {
            if let Some(user) = get(ENV_SECUTIX_USER) {
                *username = user;
            }
            if let Some(pass) = get(ENV_SECUTIX_PASSWORD) {
                *password = pass;
            }
        }
    }
}
