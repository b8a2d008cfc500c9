//! Sensor line decoding.
//!
//! The firmware prints lines such as `12.345g`, `Weight: 12.345 g` or debug
//! chatter with a number somewhere in it. Decoding is an ordered fallback:
//!
//! 1. If the line contains the unit marker `g`, parse the trimmed text before
//!    the first `g`.
//! 2. Otherwise (or if that failed) parse the first decimal number in the line.
//! 3. Otherwise report [`ParseFailure`].
//!
//! Values are quantized to milligrams. Negative values decode but are refused
//! by [`validate`]; [`decode_weight`] runs both steps.
use std::sync::OnceLock;
use std::time::Instant;

use coinbank_traits::WeightSample;
use regex::Regex;

use crate::error::ParseFailure;
use crate::util::round_mg;

const UNIT_MARKER: char = 'g';
const NUMBER_PATTERN: &str = r"[-+]?(?:\d+(?:\.\d+)?|\.\d+)";

fn number_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(NUMBER_PATTERN).ok())
        .as_ref()
}

/// Parse a trimmed token, distinguishing "not a number" from "not finite".
fn parse_token(token: &str) -> Result<f64, ParseFailure> {
    match token.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(ParseFailure::NonFinite),
        Err(_) => Err(ParseFailure::NoNumber),
    }
}

/// Decode one line into a sample stamped `at`. Pure; never touches state.
pub fn decode(line: &str, at: Instant) -> Result<WeightSample, ParseFailure> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let mut failure = ParseFailure::NoNumber;

    if let Some((before_unit, _)) = line.split_once(UNIT_MARKER) {
        match parse_token(before_unit) {
            Ok(v) => return Ok(WeightSample::new(round_mg(v), at)),
            Err(f) => failure = f,
        }
    }

    if let Some(m) = number_pattern().and_then(|re| re.find(line)) {
        match parse_token(m.as_str()) {
            Ok(v) => return Ok(WeightSample::new(round_mg(v), at)),
            Err(f) => failure = f,
        }
    }

    Err(failure)
}

/// Reject samples that cannot be a physical weight.
pub fn validate(sample: WeightSample) -> Result<WeightSample, ParseFailure> {
    if !sample.value_g.is_finite() {
        return Err(ParseFailure::NonFinite);
    }
    if sample.value_g < 0.0 {
        return Err(ParseFailure::Negative(sample.value_g));
    }
    Ok(sample)
}

/// Decode and validate: what the ingestion path feeds to the tracker.
#[inline]
pub fn decode_weight(line: &str, at: Instant) -> Result<WeightSample, ParseFailure> {
    decode(line, at).and_then(validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn value(line: &str) -> Result<f64, ParseFailure> {
        decode(line, Instant::now()).map(|s| s.value_g)
    }

    #[rstest]
    #[case("12.345g", 12.345)]
    #[case("  12.345 g  ", 12.345)]
    #[case("Weight: 12.345g|extra", 12.345)]
    #[case("Weight: 7.5 grams", 7.5)]
    #[case("reading 3 then 4", 3.0)]
    #[case("0.0004", 0.0)]
    #[case("1.23456", 1.235)]
    #[case("+2.5", 2.5)]
    #[case(".75g", 0.75)]
    #[case("-3.2g", -3.2)]
    #[case("tare offset -120", -120.0)]
    #[case("HX711 ready", 711.0)]
    fn decodes(#[case] line: &str, #[case] expected: f64) {
        assert_eq!(value(line), Ok(expected));
    }

    #[rstest]
    #[case("", ParseFailure::Empty)]
    #[case("   ", ParseFailure::Empty)]
    #[case("tare...", ParseFailure::NoNumber)]
    #[case("g", ParseFailure::NoNumber)]
    #[case("infg", ParseFailure::NonFinite)]
    fn fails(#[case] line: &str, #[case] expected: ParseFailure) {
        assert_eq!(value(line), Err(expected));
    }

    #[test]
    fn overflowing_digit_run_is_not_finite() {
        let line = "9".repeat(400);
        assert_eq!(value(&line), Err(ParseFailure::NonFinite));
    }

    #[test]
    fn validation_rejects_negative_without_clamping() {
        let at = Instant::now();
        let err = decode_weight("-0.5g", at).expect_err("negative weight");
        assert_eq!(err, ParseFailure::Negative(-0.5));
        assert_eq!(decode_weight("0.5g", at).map(|s| s.value_g), Ok(0.5));
    }

    #[test]
    fn keeps_timestamp() {
        let at = Instant::now();
        assert_eq!(decode("1g", at).map(|s| s.at), Ok(at));
    }
}
