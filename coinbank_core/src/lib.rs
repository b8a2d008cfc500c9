#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Coin bank weight ingestion and anomaly detection (hardware-agnostic).
//!
//! All sensor, storage and notification access goes through the traits in
//! `coinbank_traits`: `SensorLink`, `ReadingStore` and `AlertDispatcher`.
//!
//! ## Architecture
//!
//! - **Decoding**: raw sensor line to validated `WeightSample` (`decoder`)
//! - **Tracking**: significance threshold and the published snapshot (`tracker`)
//! - **Coins**: weight to coin count and value (`coins`)
//! - **Detection**: cooldown-gated removal alerts (`anomaly`)
//! - **Engine**: the serialized pipeline and query API (`engine`)
//! - **Ingestion**: background read loop with backoff and reconnect (`ingest`)
//!
//! Weights are `f64` grams; decoded readings are quantized to milligrams.

pub mod anomaly;
pub mod coins;
pub mod config;
pub mod conversions;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod link_error;
pub mod mocks;
pub mod status;
pub mod tracker;
pub mod util;

pub use anomaly::{
    Alert, AlertPhase, AlertStatus, AlertView, AnomalyDetector, Delivery, Suppression, Verdict,
};
pub use coins::{CoinBreakdown, GoalProgress, breakdown, goal_progress};
pub use config::{AlertCfg, CoinCfg, IngestCfg, TrackerCfg};
pub use decoder::{decode, decode_weight, validate};
pub use engine::{Engine, EngineBuilder};
pub use error::{BuildError, CoinbankError, ParseFailure, Result};
pub use ingest::{IngestLoop, IngestStats, Ingestor, ReadCycle};
pub use status::IngestOutcome;
pub use tracker::{WeightChangeEvent, WeightReader, WeightSnapshot, WeightTracker};
