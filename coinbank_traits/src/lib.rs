//! Collaborator seams shared by the coinbank crates.
//!
//! The engine in `coinbank_core` only talks to the outside world through the
//! traits below. Errors cross these boundaries as `Box<dyn Error + Send + Sync>`
//! and are mapped to typed errors by the core.
pub mod clock;
pub mod sample;

pub use clock::{Clock, MonotonicClock};
pub use sample::WeightSample;

use std::time::Duration;

/// Result of one read attempt that did not fail at the transport level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRead {
    /// One line of text with the terminator stripped. May be garbage.
    Line(String),
    /// No complete line arrived before the timeout.
    Timeout,
}

/// Line-oriented link to the load-cell firmware.
pub trait SensorLink {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<LinkRead, Box<dyn std::error::Error + Send + Sync>>;
    fn is_open(&self) -> bool;
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Try to re-establish the link after repeated failures.
    fn reconnect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Append-only history of accepted weight samples.
pub trait ReadingStore {
    fn append(
        &mut self,
        sample: &WeightSample,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Notification channel for theft alerts. `Ok` means the message was delivered.
pub trait AlertDispatcher {
    fn send(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: SensorLink + ?Sized> SensorLink for Box<T> {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<LinkRead, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_line(timeout)
    }
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).close()
    }
    fn reconnect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).reconnect()
    }
}

impl<T: ReadingStore + ?Sized> ReadingStore for Box<T> {
    fn append(
        &mut self,
        sample: &WeightSample,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).append(sample)
    }
}

impl<T: AlertDispatcher + ?Sized> AlertDispatcher for Box<T> {
    fn send(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(message)
    }
}
