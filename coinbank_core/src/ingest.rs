//! Background ingestion of sensor lines.
//!
//! `IngestLoop` is one read → decode → update cycle at a time and can be
//! driven by hand. `Ingestor` spawns a thread that owns the link and runs
//! the loop until stopped, forwarding accepted changes over a bounded
//! channel.
//!
//! Each `Ingestor` spawns exactly one thread; dropping it signals the stop
//! flag and joins the thread.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use coinbank_traits::clock::Clock;
use coinbank_traits::{LinkRead, SensorLink};
use eyre::WrapErr;

use crate::config::IngestCfg;
use crate::engine::Engine;
use crate::error::{CoinbankError, Result};
use crate::link_error::map_link_error;
use crate::status::IngestOutcome;

/// Longest single sleep between stop-flag checks.
const STOP_POLL: Duration = Duration::from_millis(50);
const EVENT_CAPACITY: usize = 64;

/// What one read attempt produced.
#[derive(Debug, Clone)]
pub enum ReadCycle {
    Line(IngestOutcome),
    Timeout,
    LinkError(CoinbankError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub rejected: u64,
    pub changes: u64,
    pub alerts: u64,
    pub timeouts: u64,
    pub link_errors: u64,
    pub reconnects: u64,
}

pub struct IngestLoop<L> {
    link: L,
    engine: Arc<Engine>,
    cfg: IngestCfg,
    consecutive_errors: u32,
    stats: IngestStats,
}

impl<L: SensorLink> IngestLoop<L> {
    pub fn new(link: L, engine: Arc<Engine>, cfg: IngestCfg) -> Self {
        Self {
            link,
            engine,
            cfg,
            consecutive_errors: 0,
            stats: IngestStats::default(),
        }
    }

    /// Perform a single read attempt and push the result through the engine.
    pub fn poll_once(&mut self) -> ReadCycle {
        let timeout = Duration::from_millis(self.cfg.read_timeout_ms);
        match self.link.read_line(timeout) {
            Ok(LinkRead::Line(line)) => {
                self.consecutive_errors = 0;
                self.stats.lines += 1;
                let outcome = self.engine.ingest_line(&line);
                match &outcome {
                    IngestOutcome::Rejected(_) => self.stats.rejected += 1,
                    IngestOutcome::Noise => {}
                    IngestOutcome::Changed { verdict, .. } => {
                        self.stats.changes += 1;
                        if verdict.fired() {
                            self.stats.alerts += 1;
                        }
                    }
                }
                ReadCycle::Line(outcome)
            }
            Ok(LinkRead::Timeout) => self.on_timeout(),
            Err(e) => match map_link_error(&*e) {
                CoinbankError::Timeout => self.on_timeout(),
                err => self.on_link_error(err),
            },
        }
    }

    fn on_timeout(&mut self) -> ReadCycle {
        self.stats.timeouts += 1;
        self.engine.mark_disconnected();
        tracing::debug!(timeout_ms = self.cfg.read_timeout_ms, "no sensor line before timeout");
        ReadCycle::Timeout
    }

    fn on_link_error(&mut self, err: CoinbankError) -> ReadCycle {
        self.stats.link_errors += 1;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.engine.mark_disconnected();
        tracing::warn!(
            error = %err,
            consecutive = self.consecutive_errors,
            "sensor link error"
        );
        if self.consecutive_errors >= self.cfg.reconnect_after.max(1) {
            self.consecutive_errors = 0;
            self.stats.reconnects += 1;
            match self.link.reconnect() {
                Ok(()) => tracing::info!("sensor link reconnected"),
                Err(e) => tracing::warn!(error = %e, "sensor link reconnect failed"),
            }
        }
        ReadCycle::LinkError(err)
    }

    /// How long to wait before the next read after `cycle`.
    pub fn pause_after(&self, cycle: &ReadCycle) -> Duration {
        match cycle {
            ReadCycle::LinkError(_) => Duration::from_millis(self.cfg.retry_backoff_ms),
            _ => Duration::from_millis(self.cfg.poll_ms),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Close the link; errors are logged.
    pub fn close(&mut self) {
        if self.link.is_open()
            && let Err(e) = self.link.close()
        {
            tracing::warn!(error = %e, "closing sensor link failed");
        }
    }

    pub fn into_link(self) -> L {
        self.link
    }
}

/// Sleep `total` in short slices so a stop request is seen promptly.
fn pause(clock: &dyn Clock, shutdown: &AtomicBool, total: Duration) {
    let mut left = total;
    while !left.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = left.min(STOP_POLL);
        clock.sleep(step);
        left -= step;
    }
}

pub struct Ingestor {
    rx: xch::Receiver<IngestOutcome>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<IngestStats>>,
}

impl Ingestor {
    /// Spawn the ingestion thread. The thread owns `link` and closes it on exit.
    pub fn spawn<L: SensorLink + Send + 'static>(
        link: L,
        engine: Arc<Engine>,
        cfg: IngestCfg,
    ) -> Result<Self> {
        let (tx, rx) = xch::bounded(EVENT_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let clock = engine.clock();

        let join_handle = std::thread::Builder::new()
            .name("coinbank-ingest".into())
            .spawn(move || {
                let mut lp = IngestLoop::new(link, engine, cfg);
                while !shutdown_clone.load(Ordering::Relaxed) {
                    let cycle = lp.poll_once();
                    if let ReadCycle::Line(outcome @ IngestOutcome::Changed { .. }) = &cycle
                        && tx.try_send(outcome.clone()).is_err()
                    {
                        tracing::trace!("event channel full or closed, dropping event");
                    }
                    if shutdown_clone.load(Ordering::Relaxed) {
                        break;
                    }
                    pause(&*clock, &shutdown_clone, lp.pause_after(&cycle));
                }
                lp.close();
                tracing::debug!(stats = ?lp.stats(), "ingestion thread exiting");
                lp.stats()
            })
            .wrap_err("spawn ingestion thread")?;

        Ok(Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Accepted changes produced since the last call, oldest first.
    pub fn events(&self) -> impl Iterator<Item = IngestOutcome> + '_ {
        self.rx.try_iter()
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait for it. Returns its counters, or `None`
    /// when already stopped or the thread panicked.
    pub fn stop(&mut self) -> Option<IngestStats> {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.join_handle.take()?;
        match handle.join() {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(?e, "ingestion thread panicked");
                None
            }
        }
    }
}

impl Drop for Ingestor {
    fn drop(&mut self) {
        // Exits after the in-flight read returns (at most read_timeout_ms).
        let _ = self.stop();
    }
}
