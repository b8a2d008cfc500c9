//! Runtime configuration types for the engine.
//!
//! These are the structs the engine and ingestion loop run with. They are
//! separate from the TOML-deserialized config in `coinbank_config`; see
//! `conversions` for the mapping.

/// Weight tracking.
#[derive(Debug, Clone)]
pub struct TrackerCfg {
    /// Changes at or below this many grams are noise. Default: 0.001 g.
    pub significance_g: f64,
    /// Weight the tracker starts from (0 or the last persisted value).
    pub initial_weight_g: f64,
}

impl Default for TrackerCfg {
    fn default() -> Self {
        Self {
            significance_g: 0.001,
            initial_weight_g: 0.0,
        }
    }
}

/// The single tracked denomination.
#[derive(Debug, Clone)]
pub struct CoinCfg {
    pub label: String,
    /// Mass of one coin in grams. Default: 0.008 g (Rs.2 reference coin).
    pub mass_g: f64,
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

/// Anomaly detector thresholds.
#[derive(Debug, Clone)]
pub struct AlertCfg {
    /// Minimum seconds between fired alerts. Default: 300.
    pub cooldown_s: u64,
    /// Drops from below this weight never alert. Default: 0.05 g.
    pub min_weight_g: f64,
    /// Drops must exceed this to alert. Default: 0.016 g (two coins).
    pub drop_threshold_g: f64,
}

impl Default for AlertCfg {
    fn default() -> Self {
        Self {
            cooldown_s: 300,
            min_weight_g: 0.05,
            drop_threshold_g: 0.016,
        }
    }
}

/// Ingestion loop pacing and recovery.
#[derive(Debug, Clone)]
pub struct IngestCfg {
    /// Max wait for one line per read (ms).
    pub read_timeout_ms: u64,
    /// Pause between read cycles (ms).
    pub poll_ms: u64,
    /// Pause after a link error (ms).
    pub retry_backoff_ms: u64,
    /// Consecutive link errors before asking the link to reconnect.
    pub reconnect_after: u32,
}

impl Default for IngestCfg {
    fn default() -> Self {
        Self {
            read_timeout_ms: 2_000,
            poll_ms: 500,
            retry_backoff_ms: 1_000,
            reconnect_after: 3,
        }
    }
}
