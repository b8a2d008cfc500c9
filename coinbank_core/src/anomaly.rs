//! Cooldown-gated detection of coin removal.
//!
//! The detector is a two-state machine:
//!
//! - **Armed**: a qualifying drop fires an alert and moves to Cooling.
//! - **Cooling**: qualifying drops are suppressed until `cooldown_s` has
//!   elapsed since the last alert; the switch back to Armed is evaluated
//!   lazily on the next event, no timer runs.
//!
//! A drop qualifies when the previous weight was at least `min_weight_g` and
//! the decrease exceeds `drop_threshold_g`. Increases and small drops never
//! touch the state machine.
//!
//! Any attempted dispatch starts the cooldown, including one whose delivery
//! failed.
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use coinbank_traits::AlertDispatcher;

use crate::config::{AlertCfg, CoinCfg};
use crate::error::{BuildError, CoinbankError};
use crate::tracker::WeightChangeEvent;
use crate::util::{exceeds, whole_units};

/// A fired alert, ready to format.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub previous_g: f64,
    pub next_g: f64,
    pub drop_g: f64,
    pub coins_removed: u64,
    pub value_lost: f64,
    pub coin_label: String,
    pub at: DateTime<Local>,
}

impl Alert {
    /// Human-readable summary handed to the dispatcher.
    pub fn message(&self) -> String {
        format!(
            "COIN BANK ALERT\n\
             Significant coin removal detected!\n\
             \n\
             Previous weight: {:.3}g\n\
             Current weight: {:.3}g\n\
             Weight lost: {:.3}g\n\
             Estimated {} coins removed: {}\n\
             Estimated value taken: {}\n\
             \n\
             Time: {}\n\
             Someone may have taken coins, check the coin bank!",
            self.previous_g,
            self.next_g,
            self.drop_g,
            self.coin_label,
            self.coins_removed,
            self.value_lost,
            self.at.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

#[derive(Debug, Clone)]
pub enum Delivery {
    Delivered,
    Failed(CoinbankError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Suppression {
    /// Weight went up.
    Increase,
    /// Previous weight below `min_weight_g`.
    NearlyEmpty,
    /// Drop at or below `drop_threshold_g`.
    BelowThreshold { drop_g: f64 },
    /// Qualifying drop inside the cooldown window.
    CoolingDown { remaining: Duration },
}

/// Decision for one weight-change event.
#[derive(Debug, Clone)]
pub enum Verdict {
    Fired { alert: Alert, delivery: Delivery },
    Suppressed(Suppression),
}

impl Verdict {
    #[inline]
    pub fn fired(&self) -> bool {
        matches!(self, Verdict::Fired { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    Armed,
    Cooling { remaining: Duration },
}

/// Read-only view of the detector for status reporting.
#[derive(Debug, Clone)]
pub struct AlertStatus {
    pub phase: AlertPhase,
    pub last_alert_at: Option<DateTime<Local>>,
    pub since_last_alert: Option<Duration>,
    pub cooldown: Duration,
    pub min_weight_g: f64,
    pub drop_threshold_g: f64,
}

/// Detached detector state. Phase is derived from `now` on every query, so a
/// stale copy still reports the right remaining cooldown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertView {
    pub cooldown: Duration,
    pub min_weight_g: f64,
    pub drop_threshold_g: f64,
    pub last_alert: Option<(Instant, DateTime<Local>)>,
}

impl AlertView {
    pub fn phase(&self, now: Instant) -> AlertPhase {
        match self.last_alert {
            Some((last, _)) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.cooldown {
                    AlertPhase::Armed
                } else {
                    AlertPhase::Cooling {
                        remaining: self.cooldown - elapsed,
                    }
                }
            }
            None => AlertPhase::Armed,
        }
    }

    pub fn status(&self, now: Instant) -> AlertStatus {
        AlertStatus {
            phase: self.phase(now),
            last_alert_at: self.last_alert.map(|(_, wall)| wall),
            since_last_alert: self
                .last_alert
                .map(|(last, _)| now.saturating_duration_since(last)),
            cooldown: self.cooldown,
            min_weight_g: self.min_weight_g,
            drop_threshold_g: self.drop_threshold_g,
        }
    }
}

#[derive(Debug)]
pub struct AnomalyDetector {
    cooldown: Duration,
    min_weight_g: f64,
    drop_threshold_g: f64,
    coin: CoinCfg,
    last_alert: Option<(Instant, DateTime<Local>)>,
}

fn finite_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl AnomalyDetector {
    pub fn new(alert: &AlertCfg, coin: &CoinCfg) -> Result<Self, BuildError> {
        if !finite_non_negative(alert.drop_threshold_g) {
            return Err(BuildError::InvalidConfig("drop_threshold_g must be >= 0"));
        }
        if !finite_non_negative(alert.min_weight_g) {
            return Err(BuildError::InvalidConfig("min_weight_g must be >= 0"));
        }
        if !(coin.mass_g.is_finite() && coin.mass_g > 0.0) {
            return Err(BuildError::InvalidConfig("coin mass_g must be > 0"));
        }
        if !finite_non_negative(coin.value) {
            return Err(BuildError::InvalidConfig("coin value must be >= 0"));
        }
        Ok(Self {
            cooldown: Duration::from_secs(alert.cooldown_s),
            min_weight_g: alert.min_weight_g,
            drop_threshold_g: alert.drop_threshold_g,
            coin: coin.clone(),
            last_alert: None,
        })
    }

    /// Copy of the settings and last-alert bookkeeping.
    pub fn view(&self) -> AlertView {
        AlertView {
            cooldown: self.cooldown,
            min_weight_g: self.min_weight_g,
            drop_threshold_g: self.drop_threshold_g,
            last_alert: self.last_alert,
        }
    }

    #[inline]
    pub fn phase(&self, now: Instant) -> AlertPhase {
        self.view().phase(now)
    }

    #[inline]
    pub fn status(&self, now: Instant) -> AlertStatus {
        self.view().status(now)
    }

    /// Check a drop without touching state.
    pub fn classify(&self, event: &WeightChangeEvent, now: Instant) -> Option<Suppression> {
        if !event.is_decrease() {
            return Some(Suppression::Increase);
        }
        if event.previous_g < self.min_weight_g {
            return Some(Suppression::NearlyEmpty);
        }
        let drop_g = event.drop_g();
        if !exceeds(drop_g, self.drop_threshold_g) {
            return Some(Suppression::BelowThreshold { drop_g });
        }
        match self.phase(now) {
            AlertPhase::Cooling { remaining } => Some(Suppression::CoolingDown { remaining }),
            AlertPhase::Armed => None,
        }
    }

    /// Inspect one event; on a qualifying drop while armed, format the alert,
    /// hand it to `dispatcher` and start the cooldown.
    pub fn observe(
        &mut self,
        event: &WeightChangeEvent,
        now: Instant,
        dispatcher: &mut dyn AlertDispatcher,
    ) -> Verdict {
        if let Some(reason) = self.classify(event, now) {
            match &reason {
                Suppression::Increase => tracing::info!(
                    previous_g = event.previous_g,
                    next_g = event.next_g,
                    "weight increase"
                ),
                Suppression::NearlyEmpty => tracing::debug!(
                    previous_g = event.previous_g,
                    min_weight_g = self.min_weight_g,
                    "drop ignored, bank nearly empty"
                ),
                Suppression::BelowThreshold { drop_g } => tracing::info!(
                    drop_g = *drop_g,
                    threshold_g = self.drop_threshold_g,
                    "small drop, not enough for alert"
                ),
                Suppression::CoolingDown { remaining } => tracing::info!(
                    drop_g = event.drop_g(),
                    remaining_s = remaining.as_secs(),
                    "alert on cooldown"
                ),
            }
            return Verdict::Suppressed(reason);
        }

        let drop_g = event.drop_g();
        let coins_removed = whole_units(drop_g, self.coin.mass_g);
        let alert = Alert {
            previous_g: event.previous_g,
            next_g: event.next_g,
            drop_g,
            coins_removed,
            value_lost: coins_removed as f64 * self.coin.value,
            coin_label: self.coin.label.clone(),
            at: Local::now(),
        };
        tracing::warn!(
            previous_g = alert.previous_g,
            next_g = alert.next_g,
            drop_g,
            coins_removed,
            "weight drop above threshold, dispatching alert"
        );

        let delivery = match dispatcher.send(&alert.message()) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                tracing::error!(error = %e, "alert dispatch failed; cooldown still applies");
                Delivery::Failed(CoinbankError::Dispatch(e.to_string()))
            }
        };
        self.last_alert = Some((now, alert.at));
        Verdict::Fired { alert, delivery }
    }
}
