//! Small numeric helpers shared by the decoder and the coin calculator.

/// Number of milligrams in one gram.
pub const MG_PER_G: f64 = 1_000.0;

/// Round grams to milligram resolution (3 decimal places), half away from zero.
/// Negative zero is normalized to `0.0`.
#[inline]
pub fn round_mg(grams: f64) -> f64 {
    let r = (grams * MG_PER_G).round() / MG_PER_G;
    if r == 0.0 { 0.0 } else { r }
}

/// Slack for comparing gram values that are whole milligrams in decimal but
/// not in binary. Far below the 1 mg sensor resolution.
pub const CMP_TOLERANCE_G: f64 = 1e-9;

/// `delta > threshold`, ignoring representation error: `5.001 - 5.000`
/// against `0.001` is not above the threshold.
#[inline]
pub fn exceeds(delta_g: f64, threshold_g: f64) -> bool {
    delta_g - threshold_g > CMP_TOLERANCE_G
}

/// Largest whole number of `unit`s contained in `total`, 0 for non-positive input.
/// A quotient within rounding error of the next integer counts as that integer.
#[inline]
pub fn whole_units(total: f64, unit: f64) -> u64 {
    if !(total.is_finite() && unit.is_finite()) || total <= 0.0 || unit <= 0.0 {
        return 0;
    }
    // `as` saturates for values beyond u64::MAX.
    (total / unit + CMP_TOLERANCE_G).floor() as u64
}
