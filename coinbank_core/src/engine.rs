//! The engine handle: tracker, detector and collaborators wired into one pipeline.
//!
//! Every accepted sample runs tracker update → persist → detect while holding
//! the pipeline lock, so the ingestion loop and `force_weight` cannot
//! interleave and events reach the store and detector in acceptance order.
//! Weight and alert-status queries go through published copies and never
//! wait on the pipeline, which may be blocked in a slow alert dispatch.

use std::sync::Arc;

use coinbank_traits::clock::{Clock, MonotonicClock};
use coinbank_traits::{AlertDispatcher, ReadingStore, WeightSample};
use parking_lot::{Mutex, RwLock};

use crate::anomaly::{AlertStatus, AlertView, AnomalyDetector};
use crate::coins::{self, CoinBreakdown};
use crate::config::{AlertCfg, CoinCfg, TrackerCfg};
use crate::decoder;
use crate::error::{BuildError, Result};
use crate::status::IngestOutcome;
use crate::tracker::{WeightReader, WeightSnapshot, WeightTracker};
use crate::util::round_mg;

struct Pipeline {
    tracker: WeightTracker,
    detector: AnomalyDetector,
    store: Box<dyn ReadingStore + Send>,
    dispatcher: Box<dyn AlertDispatcher + Send>,
}

pub struct Engine {
    reader: WeightReader,
    alert_view: RwLock<AlertView>,
    pipeline: Mutex<Pipeline>,
    coin: CoinCfg,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let snap = self.reader.load();
        f.debug_struct("Engine")
            .field("weight_g", &snap.weight_g)
            .field("connected", &snap.connected)
            .field("coin", &self.coin.label)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Decode one raw sensor line and push it through the pipeline.
    ///
    /// A line that decodes marks the link connected, even when validation
    /// then rejects the value.
    pub fn ingest_line(&self, line: &str) -> IngestOutcome {
        let sample = match decoder::decode(line, self.clock.now()) {
            Ok(s) => s,
            Err(failure) => {
                tracing::debug!(line, %failure, "discarding sensor line");
                return IngestOutcome::Rejected(failure);
            }
        };
        self.reader.set_connected(true);
        match decoder::validate(sample) {
            Ok(s) => self.apply(s),
            Err(failure) => {
                tracing::warn!(value_g = sample.value_g, %failure, "rejecting reading");
                IngestOutcome::Rejected(failure)
            }
        }
    }

    /// Override hook: treat `grams` as if the sensor had reported it.
    ///
    /// Quantised to milligrams, then validated and thresholded like any
    /// reading; may fire an alert. Leaves the connected flag alone.
    pub fn force_weight(&self, grams: f64) -> IngestOutcome {
        match decoder::validate(WeightSample::new(round_mg(grams), self.clock.now())) {
            Ok(s) => {
                tracing::info!(grams, "forced weight");
                self.apply(s)
            }
            Err(failure) => {
                tracing::warn!(grams, %failure, "forced weight rejected");
                IngestOutcome::Rejected(failure)
            }
        }
    }

    fn apply(&self, sample: WeightSample) -> IngestOutcome {
        let mut guard = self.pipeline.lock();
        let p = &mut *guard;
        let Some(event) = p.tracker.update(&sample) else {
            return IngestOutcome::Noise;
        };
        tracing::info!(
            previous_g = event.previous_g,
            next_g = event.next_g,
            "weight changed"
        );
        if let Err(e) = p.store.append(&sample) {
            tracing::warn!(error = %e, value_g = sample.value_g, "failed to persist reading");
        }
        let verdict = p
            .detector
            .observe(&event, self.clock.now(), &mut *p.dispatcher);
        if verdict.fired() {
            *self.alert_view.write() = p.detector.view();
        }
        IngestOutcome::Changed { event, verdict }
    }

    /// Record a failed read attempt.
    pub fn mark_disconnected(&self) {
        self.reader.set_connected(false);
    }

    #[inline]
    pub fn snapshot(&self) -> WeightSnapshot {
        self.reader.load()
    }

    /// Handle for threads that only need the published weight.
    pub fn reader(&self) -> WeightReader {
        self.reader.clone()
    }

    #[inline]
    pub fn current_weight(&self) -> f64 {
        self.reader.load().weight_g
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.reader.load().connected
    }

    /// Coin breakdown of the current weight.
    pub fn breakdown(&self) -> CoinBreakdown {
        coins::breakdown(self.current_weight(), self.coin.mass_g, self.coin.value)
    }

    pub fn coin(&self) -> &CoinCfg {
        &self.coin
    }

    /// Detector phase and last-alert bookkeeping, as of the last fired alert.
    pub fn alert_status(&self) -> AlertStatus {
        self.alert_view.read().status(self.clock.now())
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }
}

/// Builder for `Engine`. Store and dispatcher are required; everything else defaults.
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Box<dyn ReadingStore + Send>>,
    dispatcher: Option<Box<dyn AlertDispatcher + Send>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    tracker: Option<TrackerCfg>,
    coin: Option<CoinCfg>,
    alert: Option<AlertCfg>,
}

impl EngineBuilder {
    pub fn with_store(mut self, store: impl ReadingStore + Send + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }
    pub fn with_dispatcher(mut self, dispatcher: impl AlertDispatcher + Send + 'static) -> Self {
        self.dispatcher = Some(Box::new(dispatcher));
        self
    }
    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }
    pub fn with_tracker(mut self, tracker: TrackerCfg) -> Self {
        self.tracker = Some(tracker);
        self
    }
    pub fn with_coin(mut self, coin: CoinCfg) -> Self {
        self.coin = Some(coin);
        self
    }
    pub fn with_alert(mut self, alert: AlertCfg) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn try_build(self) -> Result<Engine> {
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let dispatcher = self
            .dispatcher
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDispatcher))?;
        let tracker = self.tracker.unwrap_or_default();
        let coin = self.coin.unwrap_or_default();
        let alert = self.alert.unwrap_or_default();

        if !(tracker.significance_g.is_finite() && tracker.significance_g >= 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "significance_g must be >= 0",
            )));
        }
        if !(tracker.initial_weight_g.is_finite() && tracker.initial_weight_g >= 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "initial_weight_g must be >= 0",
            )));
        }
        let detector = AnomalyDetector::new(&alert, &coin).map_err(eyre::Report::new)?;

        let tracker = WeightTracker::new(tracker.initial_weight_g, tracker.significance_g);
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(Engine {
            reader: tracker.reader(),
            alert_view: RwLock::new(detector.view()),
            pipeline: Mutex::new(Pipeline {
                tracker,
                detector,
                store,
                dispatcher,
            }),
            coin,
            clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::anomaly::{AlertPhase, Suppression, Verdict};
    use crate::error::ParseFailure;
    use crate::mocks::{MemoryStore, RecordingDispatcher};

    fn engine() -> (Engine, MemoryStore, RecordingDispatcher) {
        let store = MemoryStore::default();
        let tx = RecordingDispatcher::default();
        let e = Engine::builder()
            .with_store(store.clone())
            .with_dispatcher(tx.clone())
            .try_build()
            .unwrap();
        (e, store, tx)
    }

    #[test]
    fn fresh_engine_reads_zero_and_disconnected() {
        let (e, _, _) = engine();
        assert_eq!(e.current_weight(), 0.0);
        assert!(!e.is_connected());
        assert_eq!(e.breakdown().count, 0);
    }

    #[test]
    fn rejected_line_touches_nothing() {
        let (e, store, _) = engine();
        assert!(matches!(
            e.ingest_line("   "),
            IngestOutcome::Rejected(ParseFailure::Empty)
        ));
        assert!(!e.is_connected());
        assert!(store.samples().is_empty());
    }

    #[test]
    fn negative_line_connects_but_is_rejected() {
        let (e, store, _) = engine();
        let out = e.ingest_line("-3.5g");
        assert!(matches!(out, IngestOutcome::Rejected(ParseFailure::Negative(_))));
        assert!(e.is_connected());
        assert_eq!(e.current_weight(), 0.0);
        assert!(store.samples().is_empty());
    }

    #[test]
    fn noise_is_not_persisted() {
        let (e, store, _) = engine();
        e.ingest_line("5.000g");
        assert!(matches!(e.ingest_line("5.001g"), IngestOutcome::Noise));
        assert_eq!(store.samples().len(), 1);
    }

    #[test]
    fn force_weight_can_fire_alert() {
        let (e, store, tx) = engine();
        e.force_weight(10.0);
        let out = e.force_weight(9.9);
        assert!(out.alert_fired());
        assert_eq!(tx.messages().len(), 1);
        assert_eq!(store.samples().len(), 2);
        assert!(!e.is_connected());
    }

    #[test]
    fn force_weight_quantises_like_sensor_lines() {
        let (forced, _, _) = engine();
        let (sensed, _, _) = engine();
        forced.force_weight(10.0004);
        sensed.ingest_line("10.0004g");
        assert_eq!(forced.current_weight(), 10.0);
        assert_eq!(forced.current_weight(), sensed.current_weight());
        assert!(matches!(forced.force_weight(10.0006), IngestOutcome::Noise));
    }

    #[test]
    fn one_milligram_and_two_coin_steps_stay_quiet() {
        let (e, store, tx) = engine();
        e.force_weight(10.0);
        assert!(matches!(e.force_weight(10.001), IngestOutcome::Noise));
        e.force_weight(10.0);
        let out = e.force_weight(9.984);
        assert!(matches!(
            out.verdict(),
            Some(Verdict::Suppressed(Suppression::BelowThreshold { .. }))
        ));
        assert!(tx.messages().is_empty());
        assert!(e.force_weight(9.967).alert_fired());
        assert_eq!(store.samples().len(), 3);
    }

    #[test]
    fn alert_status_does_not_wait_for_dispatch() {
        struct GatedDispatcher {
            entered: crossbeam_channel::Sender<()>,
            release: crossbeam_channel::Receiver<()>,
        }
        impl AlertDispatcher for GatedDispatcher {
            fn send(
                &mut self,
                _message: &str,
            ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
                let _ = self.entered.send(());
                let _ = self.release.recv_timeout(Duration::from_secs(5));
                Ok(())
            }
        }

        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded(1);
        let e = Arc::new(
            Engine::builder()
                .with_store(MemoryStore::default())
                .with_dispatcher(GatedDispatcher {
                    entered: entered_tx,
                    release: release_rx,
                })
                .try_build()
                .unwrap(),
        );
        e.force_weight(10.0);

        let writer = {
            let e = e.clone();
            std::thread::spawn(move || e.force_weight(9.0))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let (status_tx, status_rx) = crossbeam_channel::bounded(1);
        {
            let e = e.clone();
            std::thread::spawn(move || {
                let _ = status_tx.send(e.alert_status().phase);
            });
        }
        let phase = status_rx.recv_timeout(Duration::from_secs(1));
        release_tx.send(()).unwrap();
        assert!(writer.join().unwrap().alert_fired());
        assert_eq!(phase.unwrap(), AlertPhase::Armed);
        assert!(matches!(e.alert_status().phase, AlertPhase::Cooling { .. }));
    }

    #[test]
    fn force_weight_rejects_nan() {
        let (e, _, _) = engine();
        assert!(matches!(
            e.force_weight(f64::NAN),
            IngestOutcome::Rejected(ParseFailure::NonFinite)
        ));
    }

    #[test]
    fn store_failure_does_not_block_detection() {
        let tx = RecordingDispatcher::default();
        let e = Engine::builder()
            .with_store(MemoryStore::failing())
            .with_dispatcher(tx.clone())
            .try_build()
            .unwrap();
        e.force_weight(10.0);
        assert!(e.force_weight(9.0).alert_fired());
        assert_eq!(e.current_weight(), 9.0);
    }

    #[test]
    fn initial_weight_seeds_snapshot() {
        let e = Engine::builder()
            .with_store(MemoryStore::default())
            .with_dispatcher(RecordingDispatcher::default())
            .with_tracker(TrackerCfg {
                initial_weight_g: 2.404,
                ..TrackerCfg::default()
            })
            .try_build()
            .unwrap();
        assert_eq!(e.current_weight(), 2.404);
        assert_eq!(e.breakdown().count, 300);
    }
}
