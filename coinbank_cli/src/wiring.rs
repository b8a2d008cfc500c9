//! Config loading and collaborator assembly.

use std::path::Path;
#[cfg(feature = "telegram")]
use std::time::Duration;

use coinbank_config::{Config, StoreKind};
use coinbank_core::error::CoinbankError;
use coinbank_core::{AlertCfg, CoinCfg, Engine, TrackerCfg};
use coinbank_io::{CsvReadingStore, LogDispatcher, NullStore, SimulatedLink};
use coinbank_traits::{AlertDispatcher, ReadingStore, SensorLink};

use crate::cli::DEFAULT_CONFIG;

pub const TOKEN_ENV: &str = "COINBANK_TELEGRAM_TOKEN";

fn config_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(CoinbankError::Config(msg.into()))
}

fn link_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(CoinbankError::Link(msg.into()))
}

/// Load and validate the config. A missing file at the default path means
/// built-in defaults; a missing explicit path is an error.
pub fn load_config(explicit: Option<&Path>) -> eyre::Result<Config> {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
    if explicit.is_none() && !path.exists() {
        return Ok(Config::default());
    }
    coinbank_config::load_file(path).map_err(|e| config_error(format!("{e:#}")))
}

pub fn open_store(cfg: &Config) -> eyre::Result<Box<dyn ReadingStore + Send>> {
    match cfg.store.kind {
        StoreKind::Csv => {
            let s = CsvReadingStore::open(&cfg.store.path).map_err(|e| {
                config_error(format!("open reading log {}: {e}", cfg.store.path.display()))
            })?;
            Ok(Box::new(s))
        }
        #[cfg(feature = "sqlite")]
        StoreKind::Sqlite => {
            let s = coinbank_io::SqliteReadingStore::open(&cfg.store.path).map_err(|e| {
                config_error(format!("open database {}: {e}", cfg.store.path.display()))
            })?;
            Ok(Box::new(s))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreKind::Sqlite => Err(config_error(
            "store.kind = \"sqlite\" but this build has no sqlite support",
        )),
        StoreKind::None => Ok(Box::new(NullStore)),
    }
}

/// Last persisted weight when `tracker.restore_from_store` is on; otherwise
/// (or when nothing usable is stored) `tracker.initial_weight_g`.
pub fn initial_weight(cfg: &Config) -> f64 {
    let fallback = cfg.tracker.initial_weight_g;
    if !cfg.tracker.restore_from_store {
        return fallback;
    }
    let restored = match cfg.store.kind {
        StoreKind::Csv => CsvReadingStore::last_weight(&cfg.store.path).map_err(|e| e.to_string()),
        #[cfg(feature = "sqlite")]
        StoreKind::Sqlite => coinbank_io::SqliteReadingStore::open(&cfg.store.path)
            .and_then(|s| s.last_weight())
            .map_err(|e| e.to_string()),
        #[cfg(not(feature = "sqlite"))]
        StoreKind::Sqlite => Ok(None),
        StoreKind::None => Ok(None),
    };
    match restored {
        Ok(Some(w)) => {
            tracing::info!(weight_g = w, "restored last weight from store");
            w
        }
        Ok(None) => fallback,
        Err(e) => {
            tracing::warn!(error = %e, "could not restore last weight");
            fallback
        }
    }
}

pub fn open_dispatcher(cfg: &Config) -> eyre::Result<Box<dyn AlertDispatcher + Send>> {
    let Some(tg) = &cfg.alert.telegram else {
        tracing::info!("no alert channel configured, alerts go to the log");
        return Ok(Box::new(LogDispatcher));
    };
    let token = tg
        .bot_token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            config_error(format!(
                "alert.telegram is set but no bot token was given (alert.telegram.bot_token or {TOKEN_ENV})"
            ))
        })?;
    #[cfg(feature = "telegram")]
    {
        let d = coinbank_io::TelegramDispatcher::new(
            &token,
            tg.chat_id,
            Duration::from_millis(tg.timeout_ms),
        )
        .map_err(|e| config_error(format!("telegram: {e}")))?;
        Ok(Box::new(d))
    }
    #[cfg(not(feature = "telegram"))]
    {
        let _ = token;
        Err(config_error(
            "alert.telegram is set but this build has no telegram support",
        ))
    }
}

pub fn build_engine(
    cfg: &Config,
    store: Box<dyn ReadingStore + Send>,
    dispatcher: Box<dyn AlertDispatcher + Send>,
    initial_weight_g: f64,
) -> eyre::Result<Engine> {
    let mut tracker = TrackerCfg::from(&cfg.tracker);
    tracker.initial_weight_g = initial_weight_g;
    Engine::builder()
        .with_store(store)
        .with_dispatcher(dispatcher)
        .with_tracker(tracker)
        .with_coin(CoinCfg::from(&cfg.coin))
        .with_alert(AlertCfg::from(&cfg.alert))
        .try_build()
}

/// Simulated sensor starting from `start_g` that loses a few coins now and then.
pub fn sim_link(start_g: f64) -> SimulatedLink {
    let start = if start_g > 0.0 { start_g } else { 15.456 };
    SimulatedLink::new(start, 0.0004, 0x00C0_1B4E).with_removal_every(40, 0.04)
}

#[cfg(feature = "serial")]
fn serial_cfg(cfg: &coinbank_config::LinkCfg, settle: bool) -> coinbank_io::SerialLinkCfg {
    coinbank_io::SerialLinkCfg {
        port: cfg.port.clone(),
        auto_detect: cfg.auto_detect,
        baud: cfg.baud,
        settle: if settle {
            std::time::Duration::from_millis(cfg.settle_ms)
        } else {
            std::time::Duration::ZERO
        },
    }
}

/// Open the sensor port now; failure is a link error.
#[cfg(feature = "serial")]
pub fn open_link(
    cfg: &coinbank_config::LinkCfg,
    settle: bool,
) -> eyre::Result<Box<dyn SensorLink + Send>> {
    let link = coinbank_io::SerialLink::open(serial_cfg(cfg, settle))
        .map_err(|e| link_error(e.to_string()))?;
    tracing::info!(port = link.port_name(), "connected to sensor");
    Ok(Box::new(link))
}

/// Sensor link for the long-running loop: an absent board is left to the
/// ingestor's reconnect path instead of failing startup.
#[cfg(feature = "serial")]
pub fn open_link_waiting(
    cfg: &coinbank_config::LinkCfg,
) -> eyre::Result<Box<dyn SensorLink + Send>> {
    let link = coinbank_io::SerialLink::open_waiting(serial_cfg(cfg, true));
    if link.is_open() {
        tracing::info!(port = link.port_name(), "connected to sensor");
    }
    Ok(Box::new(link))
}

#[cfg(not(feature = "serial"))]
pub fn open_link(
    _cfg: &coinbank_config::LinkCfg,
    _settle: bool,
) -> eyre::Result<Box<dyn SensorLink + Send>> {
    Err(link_error("this build has no serial support; use --sim"))
}

#[cfg(not(feature = "serial"))]
pub fn open_link_waiting(
    cfg: &coinbank_config::LinkCfg,
) -> eyre::Result<Box<dyn SensorLink + Send>> {
    open_link(cfg, true)
}
