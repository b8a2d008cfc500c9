//! Concrete collaborators for the coinbank engine.
//!
//! - `SerialLink` (feature `serial`) and `SimulatedLink` implement `SensorLink`
//! - `CsvReadingStore`, `SqliteReadingStore` (feature `sqlite`) and `NullStore`
//!   implement `ReadingStore`
//! - `LogDispatcher` and `TelegramDispatcher` (feature `telegram`) implement
//!   `AlertDispatcher`
pub mod dispatch;
pub mod error;
pub mod lines;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;
pub mod store;

pub use dispatch::LogDispatcher;
#[cfg(feature = "telegram")]
pub use dispatch::TelegramDispatcher;
pub use error::IoError;
#[cfg(feature = "serial")]
pub use serial::{SerialLink, SerialLinkCfg, find_arduino_port};
pub use sim::SimulatedLink;
#[cfg(feature = "sqlite")]
pub use store::SqliteReadingStore;
pub use store::{CsvReadingStore, NullStore, ReadingRow};
