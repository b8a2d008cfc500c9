//! Test and helper mocks for coinbank_core.
//!
//! Handles returned by the recording mocks share their buffers, so a test can
//! move the mock into an `Engine` and still inspect what it received.
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use coinbank_traits::{AlertDispatcher, Clock, LinkRead, ReadingStore, SensorLink, WeightSample};
use parking_lot::Mutex;

/// One scripted link response.
#[derive(Debug, Clone)]
pub enum Scripted {
    Line(String),
    Timeout,
    Error(String),
}

/// A link that replays a script, then reports timeouts forever. Reads on a
/// closed link fail without consuming the script.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    script: VecDeque<Scripted>,
    open: bool,
    failing_reconnects: u32,
    reconnects: Arc<AtomicU32>,
    closes: Arc<AtomicU32>,
}

impl ScriptedLink {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            open: true,
            ..Self::default()
        }
    }

    /// Starts closed, as when the device was absent at startup. The first
    /// `failing_reconnects` reconnect attempts fail.
    pub fn unplugged(failing_reconnects: u32, script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            open: false,
            failing_reconnects,
            ..Self::default()
        }
    }

    /// Convenience: a script of good lines only.
    pub fn lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self::new(lines.into_iter().map(|l| Scripted::Line(l.into())))
    }

    pub fn reconnect_count(&self) -> Arc<AtomicU32> {
        self.reconnects.clone()
    }

    pub fn close_count(&self) -> Arc<AtomicU32> {
        self.closes.clone()
    }
}

impl SensorLink for ScriptedLink {
    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<LinkRead, Box<dyn std::error::Error + Send + Sync>> {
        if !self.open {
            return Err("link not open".into());
        }
        match self.script.pop_front() {
            Some(Scripted::Line(l)) => Ok(LinkRead::Line(l)),
            Some(Scripted::Timeout) | None => Ok(LinkRead::Timeout),
            Some(Scripted::Error(msg)) => Err(Box::new(std::io::Error::other(msg))),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.open = false;
        self.closes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        if self.failing_reconnects > 0 {
            self.failing_reconnects -= 1;
            return Err("device not found".into());
        }
        self.open = true;
        Ok(())
    }
}

/// In-memory reading store; optionally fails every append.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    samples: Arc<Mutex<Vec<WeightSample>>>,
    fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn samples(&self) -> Vec<WeightSample> {
        self.samples.lock().clone()
    }
}

impl ReadingStore for MemoryStore {
    fn append(
        &mut self,
        sample: &WeightSample,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail {
            return Err("store offline".into());
        }
        self.samples.lock().push(*sample);
        Ok(())
    }
}

/// Dispatcher that records every message; optionally reports failure after recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    messages: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl AlertDispatcher for RecordingDispatcher {
    fn send(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.messages.lock().push(message.to_string());
        if self.fail {
            return Err("channel unavailable".into());
        }
        Ok(())
    }
}

/// Dispatcher that rejects everything without recording it.
#[derive(Debug, Clone, Default)]
pub struct FailingDispatcher;

impl AlertDispatcher for FailingDispatcher {
    fn send(&mut self, _message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "dispatcher offline",
        )))
    }
}

/// Deterministic clock whose time only moves when advanced.
///
/// now() = origin + offset
/// sleep(d) advances internal time by d without actually sleeping.
#[derive(Debug, Clone)]
pub struct TestClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        let mut off = self.offset.lock();
        *off = off.saturating_add(d);
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
