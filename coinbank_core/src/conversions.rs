//! `From` implementations bridging `coinbank_config` types to `coinbank_core` types.

use crate::config::{AlertCfg, CoinCfg, IngestCfg, TrackerCfg};

// ── TrackerCfg ───────────────────────────────────────────────────────────────

impl From<&coinbank_config::TrackerCfg> for TrackerCfg {
    fn from(c: &coinbank_config::TrackerCfg) -> Self {
        Self {
            significance_g: c.significance_g,
            initial_weight_g: c.initial_weight_g,
        }
    }
}

// ── CoinCfg ──────────────────────────────────────────────────────────────────

impl From<&coinbank_config::CoinCfg> for CoinCfg {
    fn from(c: &coinbank_config::CoinCfg) -> Self {
        Self {
            label: c.label.clone(),
            mass_g: c.mass_g,
            value: c.value,
        }
    }
}

// ── AlertCfg ─────────────────────────────────────────────────────────────────

impl From<&coinbank_config::AlertCfg> for AlertCfg {
    fn from(c: &coinbank_config::AlertCfg) -> Self {
        Self {
            cooldown_s: c.cooldown_s,
            min_weight_g: c.min_weight_g,
            drop_threshold_g: c.drop_threshold_g,
        }
    }
}

// ── IngestCfg ────────────────────────────────────────────────────────────────

impl From<&coinbank_config::LinkCfg> for IngestCfg {
    fn from(c: &coinbank_config::LinkCfg) -> Self {
        Self {
            read_timeout_ms: c.read_timeout_ms,
            poll_ms: c.poll_ms,
            retry_backoff_ms: c.retry_backoff_ms,
            reconnect_after: c.reconnect_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_line_up_with_file_defaults() {
        let file = coinbank_config::Config::default();
        let alert = AlertCfg::from(&file.alert);
        let runtime = AlertCfg::default();
        assert_eq!(alert.cooldown_s, runtime.cooldown_s);
        assert_eq!(alert.min_weight_g, runtime.min_weight_g);
        assert_eq!(alert.drop_threshold_g, runtime.drop_threshold_g);

        let coin = CoinCfg::from(&file.coin);
        assert_eq!(coin.label, "Rs.2");
        assert_eq!(coin.mass_g, 0.008);

        let ingest = IngestCfg::from(&file.link);
        assert_eq!(ingest.reconnect_after, 3);
        assert_eq!(ingest.poll_ms, 500);
    }
}
