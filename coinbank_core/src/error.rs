use thiserror::Error;

/// Why a sensor line (or an injected weight) did not become a sample.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("empty line")]
    Empty,
    #[error("no numeric weight in line")]
    NoNumber,
    #[error("weight is not a finite number")]
    NonFinite,
    #[error("negative weight {0} g")]
    Negative(f64),
}

#[derive(Debug, Error, Clone)]
pub enum CoinbankError {
    #[error("link error: {0}")]
    Link(String),
    #[error("timeout waiting for sensor line")]
    Timeout,
    #[error("reading store error: {0}")]
    Store(String),
    #[error("alert dispatch failed: {0}")]
    Dispatch(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid weight: {0}")]
    Parse(#[from] ParseFailure),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing reading store")]
    MissingStore,
    #[error("missing alert dispatcher")]
    MissingDispatcher,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
