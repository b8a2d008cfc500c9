use std::time::Instant;

/// One decoded weight reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    /// Grams, milligram resolution.
    pub value_g: f64,
    pub at: Instant,
}

impl WeightSample {
    #[inline]
    pub fn new(value_g: f64, at: Instant) -> Self {
        Self { value_g, at }
    }
}
