//! Result of pushing one line or weight through the engine.

use crate::anomaly::Verdict;
use crate::error::ParseFailure;
use crate::tracker::WeightChangeEvent;

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Not a usable weight; no state changed.
    Rejected(ParseFailure),
    /// Within the significance threshold of the tracked weight.
    Noise,
    /// Accepted change, persisted and checked for anomalies.
    Changed {
        event: WeightChangeEvent,
        verdict: Verdict,
    },
}

impl IngestOutcome {
    pub fn event(&self) -> Option<&WeightChangeEvent> {
        match self {
            IngestOutcome::Changed { event, .. } => Some(event),
            _ => None,
        }
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            IngestOutcome::Changed { verdict, .. } => Some(verdict),
            _ => None,
        }
    }

    #[inline]
    pub fn alert_fired(&self) -> bool {
        self.verdict().is_some_and(Verdict::fired)
    }
}
