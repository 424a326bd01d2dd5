//! Configuration management for warden-bot

#[path = "config_tests.rs"]
mod config_tests;

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use single_flight::{DEFAULT_MAX_TTL, DEFAULT_SWEEP_INTERVAL, GuardConfig};

use crate::actions::GuardedAction;

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordBotConfig,
    #[serde(default)]
    pub guard: GuardSettings,
}

/// Discord bot specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token from the Discord developer portal
    #[serde(default = "default_bot_token")]
    pub bot_token: String,
    /// Category new ticket channels are created under
    #[serde(default)]
    pub ticket_category_id: Option<u64>,
    /// Role that can see tickets, review suggestions and gets pinged
    #[serde(default)]
    pub staff_role_id: Option<u64>,
    /// Channel staff notifications are posted to
    #[serde(default)]
    pub staff_channel_id: Option<u64>,
    /// Channel suggestions are posted to
    #[serde(default)]
    pub suggestion_channel_id: Option<u64>,
}

/// Single-flight guard tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardSettings {
    /// Upper bound applied to every ttl
    #[serde(default = "default_max_ttl_secs")]
    pub max_ttl_secs: u64,
    /// Period of the background sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Per-action ttl in seconds, keyed by action name (e.g. `ticket_create`)
    #[serde(default)]
    pub ttl_overrides: HashMap<String, u64>,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            max_ttl_secs: default_max_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            ttl_overrides: HashMap::new(),
        }
    }
}

impl GuardSettings {
    pub fn guard_config(&self) -> GuardConfig {
        GuardConfig::default().with_max_ttl(Duration::from_secs(self.max_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// A zero ttl would be raised to the guard's 1 ms floor, which lets
    /// duplicates through while the first request is still running.
    pub fn validate(&self) -> Result<()> {
        if self.max_ttl_secs == 0 {
            anyhow::bail!("max_ttl_secs must be at least 1");
        }
        let mut zero: Vec<&str> = self
            .ttl_overrides
            .iter()
            .filter(|(_, secs)| **secs == 0)
            .map(|(name, _)| name.as_str())
            .collect();
        if !zero.is_empty() {
            zero.sort();
            anyhow::bail!("ttl override must be at least 1 second: {}", zero.join(", "));
        }
        Ok(())
    }

    /// Configured ttl for `action`, falling back to its default.
    pub fn ttl_for(&self, action: GuardedAction) -> Duration {
        self.ttl_overrides
            .get(action.name())
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or_else(|| action.default_ttl())
    }
}

/// Environment variable access, swappable in tests.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config
            .guard
            .validate()
            .with_context(|| format!("Invalid guard settings in config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_impl(&SystemEnv)
    }

    pub(crate) fn from_env_impl(env: &impl ReadEnv) -> Result<Self> {
        let bot_token = env
            .var("DISCORD_BOT_TOKEN")
            .context("DISCORD_BOT_TOKEN not set")?;

        let id = |name: &str| -> Result<Option<u64>> {
            match env.var(name).filter(|v| !v.trim().is_empty()) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .with_context(|| format!("{} is not a valid id: {}", name, v)),
                None => Ok(None),
            }
        };

        let secs = |name: &str, default: u64| -> Result<u64> {
            match env.var(name).filter(|v| !v.trim().is_empty()) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{} is not a number of seconds: {}", name, v)),
                None => Ok(default),
            }
        };

        let ttl_overrides = match env.var("WARDEN_GUARD_TTL_OVERRIDES") {
            Some(raw) => parse_ttl_overrides(&raw)?,
            None => HashMap::new(),
        };

        let guard = GuardSettings {
            max_ttl_secs: secs("WARDEN_GUARD_MAX_TTL_SECS", default_max_ttl_secs())?,
            sweep_interval_secs: secs(
                "WARDEN_GUARD_SWEEP_INTERVAL_SECS",
                default_sweep_interval_secs(),
            )?,
            ttl_overrides,
        };
        guard
            .validate()
            .context("Invalid guard settings in environment")?;

        Ok(Config {
            discord: DiscordBotConfig {
                bot_token,
                ticket_category_id: id("WARDEN_TICKET_CATEGORY_ID")?,
                staff_role_id: id("WARDEN_STAFF_ROLE_ID")?,
                staff_channel_id: id("WARDEN_STAFF_CHANNEL_ID")?,
                suggestion_channel_id: id("WARDEN_SUGGESTION_CHANNEL_ID")?,
            },
            guard,
        })
    }

    /// Settings that load fine but are probably a mistake.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for name in self.guard.ttl_overrides.keys() {
            if GuardedAction::from_name(name).is_none() {
                warnings.push(format!("ttl override for unknown action '{}' is ignored", name));
            }
        }
        for (name, secs) in &self.guard.ttl_overrides {
            if *secs > self.guard.max_ttl_secs {
                warnings.push(format!(
                    "ttl override for '{}' ({}s) exceeds max_ttl_secs ({}s) and will be capped",
                    name, secs, self.guard.max_ttl_secs
                ));
            }
        }
        if self.discord.staff_role_id.is_none() {
            warnings.push("staff_role_id not set: suggestion review and staff notify are disabled".to_string());
        }
        if self.discord.staff_channel_id.is_none() {
            warnings.push("staff_channel_id not set: staff notify is disabled".to_string());
        }
        if self.discord.suggestion_channel_id.is_none() {
            warnings.push("suggestion_channel_id not set: suggestions are disabled".to_string());
        }

        warnings.sort();
        warnings
    }
}

fn default_bot_token() -> String {
    std::env::var("DISCORD_BOT_TOKEN").unwrap_or_default()
}

fn default_max_ttl_secs() -> u64 {
    DEFAULT_MAX_TTL.as_secs()
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

/// Parses `action=secs,action=secs`.
fn parse_ttl_overrides(s: &str) -> Result<HashMap<String, u64>> {
    s.split(',')
        .map(|pair| pair.trim())
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, secs) = pair
                .split_once('=')
                .with_context(|| format!("ttl override '{}' is not action=secs", pair))?;
            let secs = secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("ttl override '{}' has an invalid number", pair))?;
            Ok((name.trim().to_string(), secs))
        })
        .collect()
}
