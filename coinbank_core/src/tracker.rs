//! Authoritative weight state and change events.
//!
//! `WeightTracker` is the single writer of the tracked weight. Accepted
//! changes are published into a small `Copy` snapshot under a write lock held
//! only for the field assignments. Readers copy the snapshot out through a
//! cloned `WeightReader` and never see a partially updated value.
use std::sync::Arc;
use std::time::Instant;

use coinbank_traits::WeightSample;
use parking_lot::RwLock;

use crate::util::exceeds;

/// Consistent view of the tracked weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightSnapshot {
    pub weight_g: f64,
    /// When `weight_g` last changed; `None` until the first accepted change.
    pub updated_at: Option<Instant>,
    /// Advisory link health, false until the first successful decode.
    pub connected: bool,
}

/// One accepted state transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightChangeEvent {
    pub previous_g: f64,
    pub next_g: f64,
    pub at: Instant,
}

impl WeightChangeEvent {
    /// Decrease in grams; negative for an increase.
    #[inline]
    pub fn drop_g(&self) -> f64 {
        self.previous_g - self.next_g
    }

    #[inline]
    pub fn is_decrease(&self) -> bool {
        self.next_g < self.previous_g
    }
}

/// Cloneable read handle onto the published snapshot.
#[derive(Debug, Clone, Default)]
pub struct WeightReader {
    cell: Arc<RwLock<WeightSnapshot>>,
}

impl WeightReader {
    #[inline]
    pub fn load(&self) -> WeightSnapshot {
        *self.cell.read()
    }

    /// `f` runs under the write lock; keep it to plain field assignments.
    pub(crate) fn publish(&self, f: impl FnOnce(&mut WeightSnapshot)) {
        let mut guard = self.cell.write();
        f(&mut guard);
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.publish(|s| s.connected = connected);
    }
}

#[derive(Debug)]
pub struct WeightTracker {
    current_g: f64,
    significance_g: f64,
    reader: WeightReader,
}

impl WeightTracker {
    /// Start tracking from `initial_g` (zero or the last persisted weight).
    pub fn new(initial_g: f64, significance_g: f64) -> Self {
        let reader = WeightReader::default();
        reader.publish(|s| s.weight_g = initial_g);
        Self {
            current_g: initial_g,
            significance_g,
            reader,
        }
    }

    pub fn reader(&self) -> WeightReader {
        self.reader.clone()
    }

    #[inline]
    pub fn current_g(&self) -> f64 {
        self.current_g
    }

    /// Accept `sample` if it differs from the current weight by more than the
    /// significance threshold. Noise returns `None` and changes nothing.
    pub fn update(&mut self, sample: &WeightSample) -> Option<WeightChangeEvent> {
        let previous_g = self.current_g;
        if !exceeds((sample.value_g - previous_g).abs(), self.significance_g) {
            tracing::trace!(value_g = sample.value_g, previous_g, "reading within noise band");
            return None;
        }
        self.current_g = sample.value_g;
        self.reader.publish(|s| {
            s.weight_g = sample.value_g;
            s.updated_at = Some(sample.at);
        });
        Some(WeightChangeEvent {
            previous_g,
            next_g: sample.value_g,
            at: sample.at,
        })
    }
}
