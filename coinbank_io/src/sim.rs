//! Synthetic sensor for running without hardware.
use std::time::Duration;

use coinbank_traits::{LinkRead, SensorLink};

use crate::error::IoError;

/// Prints `"{weight:.3}g"` lines like the firmware, with bounded jitter.
///
/// Optionally removes `grams` every `every` reads to exercise the detector.
#[derive(Debug, Clone)]
pub struct SimulatedLink {
    weight_g: f64,
    noise_g: f64,
    removal: Option<(u64, f64)>,
    reads: u64,
    rng: u32,
    open: bool,
}

impl SimulatedLink {
    pub fn new(start_g: f64, noise_g: f64, seed: u32) -> Self {
        Self {
            weight_g: start_g.max(0.0),
            noise_g: noise_g.abs(),
            removal: None,
            reads: 0,
            rng: seed.max(1),
            open: true,
        }
    }

    pub fn with_removal_every(mut self, every: u64, grams: f64) -> Self {
        self.removal = (every > 0).then_some((every, grams.abs()));
        self
    }

    pub fn weight_g(&self) -> f64 {
        self.weight_g
    }

    // xorshift32, uniform in [-1, 1)
    fn jitter(&mut self) -> f64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0) * 2.0 - 1.0
    }
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new(15.456, 0.0004, 0x5EED)
    }
}

impl SensorLink for SimulatedLink {
    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<LinkRead, Box<dyn std::error::Error + Send + Sync>> {
        if !self.open {
            return Err(Box::new(IoError::Closed));
        }
        self.reads += 1;
        if let Some((every, grams)) = self.removal
            && self.reads % every == 0
        {
            self.weight_g = (self.weight_g - grams).max(0.0);
            tracing::debug!(weight_g = self.weight_g, "simulated removal");
        }
        let shown = (self.weight_g + self.jitter() * self.noise_g).max(0.0);
        Ok(LinkRead::Line(format!("{shown:.3}g")))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.open = false;
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.open = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_of(read: LinkRead) -> f64 {
        match read {
            LinkRead::Line(l) => l.trim_end_matches('g').parse().unwrap(),
            LinkRead::Timeout => panic!("simulated link never times out"),
        }
    }

    #[test]
    fn jitter_stays_within_noise() {
        let mut link = SimulatedLink::new(10.0, 0.0004, 7);
        for _ in 0..200 {
            let w = weight_of(link.read_line(Duration::ZERO).unwrap());
            assert!((w - 10.0).abs() <= 0.0011, "{w}");
        }
    }

    #[test]
    fn scheduled_removal_lowers_weight() {
        let mut link = SimulatedLink::new(10.0, 0.0, 1).with_removal_every(2, 0.5);
        assert_eq!(weight_of(link.read_line(Duration::ZERO).unwrap()), 10.0);
        assert_eq!(weight_of(link.read_line(Duration::ZERO).unwrap()), 9.5);
        assert_eq!(link.weight_g(), 9.5);
    }

    #[test]
    fn closed_link_errors() {
        let mut link = SimulatedLink::default();
        link.close().unwrap();
        assert!(!link.is_open());
        assert!(link.read_line(Duration::ZERO).is_err());
        link.reconnect().unwrap();
        assert!(link.read_line(Duration::ZERO).is_ok());
    }
}
