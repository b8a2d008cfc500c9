//! Maps `Box<dyn Error>` from collaborator traits to typed `CoinbankError`.
//!
//! The traits in `coinbank_traits` use `Box<dyn Error + Send + Sync>` so any
//! transport can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `coinbank_io::error::IoError`.

use crate::error::CoinbankError;

/// Map a sensor-link error to a typed `CoinbankError`.
///
/// Attempts to downcast known transport error types first, then falls back
/// to string-based heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static)) -> CoinbankError {
    // Feature-gated: try to downcast to IoError for precise mapping
    #[cfg(feature = "io-errors")]
    {
        if let Some(io) = e.downcast_ref::<coinbank_io::error::IoError>() {
            return match io {
                coinbank_io::error::IoError::Io(inner)
                    if inner.kind() == std::io::ErrorKind::TimedOut =>
                {
                    CoinbankError::Timeout
                }
                other => CoinbankError::Link(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>()
        && io.kind() == std::io::ErrorKind::TimedOut
    {
        return CoinbankError::Timeout;
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        CoinbankError::Timeout
    } else {
        CoinbankError::Link(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeout_maps_to_timeout() {
        let e = std::io::Error::new(std::io::ErrorKind::TimedOut, "port quiet");
        assert!(matches!(map_link_error(&e), CoinbankError::Timeout));
    }

    #[test]
    fn unknown_error_keeps_message() {
        let e: Box<dyn std::error::Error + Send + Sync> = "device unplugged".into();
        match map_link_error(&*e) {
            CoinbankError::Link(msg) => assert_eq!(msg, "device unplugged"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(feature = "io-errors")]
    #[test]
    fn typed_io_error_is_downcast() {
        let e = coinbank_io::error::IoError::Closed;
        assert!(matches!(map_link_error(&e), CoinbankError::Link(_)));
    }
}
