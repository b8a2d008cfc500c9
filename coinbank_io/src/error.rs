use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("sensor link is closed")]
    Closed,
    #[error("no serial port available")]
    NoPort,
    #[error("open serial port {port}: {reason}")]
    PortOpen { port: String, reason: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[cfg(feature = "telegram")]
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("telegram bot token is empty")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, IoError>;
