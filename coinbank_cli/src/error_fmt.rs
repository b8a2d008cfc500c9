//! Human-readable error descriptions and structured JSON error formatting.

use coinbank_core::error::{BuildError, CoinbankError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStore => {
                "What happened: No reading store was provided to the engine.\nLikely causes: The store failed to open or was not wired into the builder.\nHow to fix: Check [store] in the config, or set kind = \"none\".".to_string()
            }
            BuildError::MissingDispatcher => {
                "What happened: No alert dispatcher was provided to the engine.\nLikely causes: The alert channel failed to initialize.\nHow to fix: Check [alert.telegram], or remove it to log alerts instead.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CoinbankError>() {
        return match ce {
            CoinbankError::Config(msg) => format!(
                "What happened: The configuration could not be used: {msg}.\nLikely causes: A typo, a wrong type, or an out-of-range value in the TOML.\nHow to fix: Fix the named key and rerun `coinbank self-check`."
            ),
            CoinbankError::Link(msg) => format!(
                "What happened: Could not talk to the sensor: {msg}.\nLikely causes: Board unplugged, wrong port, or no permission on the serial device.\nHow to fix: Check the cable, set link.port (or enable link.auto_detect), and make sure your user is in the dialout group. Use --sim to run without hardware."
            ),
            CoinbankError::Timeout => {
                "What happened: The sensor did not send a line in time.\nLikely causes: Firmware not running, wrong baud rate, or link.read_timeout_ms too low.\nHow to fix: Verify link.baud matches the firmware and raise link.read_timeout_ms.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for the JSON `reason` field.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "Config",
            BuildError::MissingStore | BuildError::MissingDispatcher => "Build",
        };
    }
    match err.downcast_ref::<CoinbankError>() {
        Some(CoinbankError::Config(_)) => "Config",
        Some(CoinbankError::Link(_) | CoinbankError::Timeout) => "Link",
        Some(_) => "Engine",
        None => "Error",
    }
}

/// 2 for configuration problems, 3 for sensor link problems, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "Config" => 2,
        "Link" => 3,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let e = eyre::Report::new(CoinbankError::Config("coin.mass_g must be > 0".into()));
        assert_eq!(exit_code_for_error(&e), 2);
        assert!(humanize(&e).contains("coin.mass_g"));
        let e = eyre::Report::new(BuildError::InvalidConfig("coin mass_g must be > 0"));
        assert_eq!(exit_code_for_error(&e), 2);
    }

    #[test]
    fn link_errors_exit_with_three() {
        let e = eyre::Report::new(CoinbankError::Link("no such file".into()));
        assert_eq!(exit_code_for_error(&e), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Link");
        assert_eq!(v["exit_code"], 3);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let e = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&e), 1);
        assert!(humanize(&e).contains("boom"));
    }
}
