#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the coin bank monitor.
//!
//! - `Config` and its sections are deserialized from TOML. Every section is
//!   optional and falls back to defaults for the reference hardware
//!   (Rs.2 coins on an Arduino at 115200 baud).
//! - `Config::validate` rejects values the engine cannot run with, naming the
//!   offending key in the error.
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkCfg {
    /// Port used when auto-detection finds nothing (or is disabled).
    pub port: String,
    /// Scan serial ports for one that looks like an Arduino.
    pub auto_detect: bool,
    pub baud: u32,
    /// Max wait for one line (ms). Also accepts alias "timeout_ms".
    #[serde(alias = "timeout_ms")]
    pub read_timeout_ms: u64,
    /// Pause between read cycles (ms).
    pub poll_ms: u64,
    /// Pause after a link error before the next attempt (ms).
    pub retry_backoff_ms: u64,
    /// Consecutive link errors before the port is reopened.
    pub reconnect_after: u32,
    /// Wait after opening the port before flushing stale input (ms).
    pub settle_ms: u64,
}

impl Default for LinkCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM1".to_string(),
            auto_detect: true,
            baud: 115_200,
            read_timeout_ms: 2_000,
            poll_ms: 500,
            retry_backoff_ms: 1_000,
            reconnect_after: 3,
            settle_ms: 3_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackerCfg {
    /// Changes at or below this many grams are treated as noise.
    pub significance_g: f64,
    pub initial_weight_g: f64,
    /// Start from the last weight in the reading log when one exists.
    pub restore_from_store: bool,
}

impl Default for TrackerCfg {
    fn default() -> Self {
        Self {
            significance_g: 0.001,
            initial_weight_g: 0.0,
            restore_from_store: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CoinCfg {
    /// Display name of the denomination, e.g. "Rs.2".
    pub label: String,
    /// Mass of one coin in grams.
    pub mass_g: f64,
    /// Monetary value of one coin.
    pub value: f64,
}

impl Default for CoinCfg {
    fn default() -> Self {
        Self {
            label: "Rs.2".to_string(),
            mass_g: 0.008,
            value: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramCfg {
    /// Bot token. When absent the CLI reads COINBANK_TELEGRAM_TOKEN.
    #[serde(default)]
    pub bot_token: Option<String>,
    pub chat_id: i64,
    #[serde(default = "default_telegram_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_telegram_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertCfg {
    /// Minimum seconds between two fired alerts.
    pub cooldown_s: u64,
    /// Ignore drops when the previous weight was below this (nearly empty bank).
    pub min_weight_g: f64,
    /// Fire only when the drop exceeds this many grams.
    pub drop_threshold_g: f64,
    pub telegram: Option<TelegramCfg>,
}

impl Default for AlertCfg {
    fn default() -> Self {
        Self {
            cooldown_s: 300,
            min_weight_g: 0.05,
            drop_threshold_g: 0.016,
            telegram: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Csv,
    Sqlite,
    None,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreCfg {
    pub kind: StoreKind,
    pub path: PathBuf,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            kind: StoreKind::Csv,
            path: PathBuf::from("data/readings.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub link: LinkCfg,
    pub tracker: TrackerCfg,
    pub coin: CoinCfg,
    pub alert: AlertCfg,
    pub store: StoreCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

fn finite_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Link
        if self.link.port.trim().is_empty() {
            eyre::bail!("link.port must not be empty");
        }
        if self.link.baud == 0 {
            eyre::bail!("link.baud must be > 0");
        }
        if self.link.read_timeout_ms == 0 {
            eyre::bail!("link.read_timeout_ms must be >= 1");
        }
        if self.link.poll_ms == 0 {
            eyre::bail!("link.poll_ms must be >= 1");
        }
        if self.link.reconnect_after == 0 {
            eyre::bail!("link.reconnect_after must be >= 1");
        }
        if self.link.retry_backoff_ms > 60_000 {
            eyre::bail!("link.retry_backoff_ms is unreasonably large (>60s)");
        }

        // Tracker
        if !finite_non_negative(self.tracker.significance_g) {
            eyre::bail!("tracker.significance_g must be a finite value >= 0");
        }
        if !finite_non_negative(self.tracker.initial_weight_g) {
            eyre::bail!("tracker.initial_weight_g must be a finite value >= 0");
        }

        // Coin
        if !(self.coin.mass_g.is_finite() && self.coin.mass_g > 0.0) {
            eyre::bail!("coin.mass_g must be > 0");
        }
        if !finite_non_negative(self.coin.value) {
            eyre::bail!("coin.value must be a finite value >= 0");
        }

        // Alert
        if self.alert.cooldown_s > 24 * 60 * 60 {
            eyre::bail!("alert.cooldown_s is unreasonably large (>24h)");
        }
        if !finite_non_negative(self.alert.min_weight_g) {
            eyre::bail!("alert.min_weight_g must be a finite value >= 0");
        }
        if !finite_non_negative(self.alert.drop_threshold_g) {
            eyre::bail!("alert.drop_threshold_g must be a finite value >= 0");
        }
        if let Some(tg) = &self.alert.telegram {
            if let Some(token) = &tg.bot_token
                && token.trim().is_empty()
            {
                eyre::bail!("alert.telegram.bot_token must not be empty when set");
            }
            if tg.timeout_ms == 0 {
                eyre::bail!("alert.telegram.timeout_ms must be >= 1");
            }
        }

        // Store
        if self.store.kind != StoreKind::None && self.store.path.as_os_str().is_empty() {
            eyre::bail!("store.path must be set unless store.kind = \"none\"");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly (got {rot})");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").unwrap();
        assert_eq!(cfg.link.baud, 115_200);
        assert_eq!(cfg.alert.cooldown_s, 300);
        assert!((cfg.alert.drop_threshold_g - 0.016).abs() < 1e-12);
        assert!((cfg.coin.mass_g - 0.008).abs() < 1e-12);
        assert_eq!(cfg.store.kind, StoreKind::Csv);
        cfg.validate().unwrap();
    }

    #[test]
    fn timeout_alias_is_accepted() {
        let cfg = load_toml("[link]\ntimeout_ms = 750\n").unwrap();
        assert_eq!(cfg.link.read_timeout_ms, 750);
    }
}
