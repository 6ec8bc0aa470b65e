//! Fixed-point arithmetic for 18-decimal scaled integers.
//!
//! All monetary amounts, shares and per-second rates the pool works with are
//! nonnegative integers scaled by [`FP`]. Multiplications are widened into a
//! 256-bit intermediate so that two full-width `u128` operands never
//! silently wrap; the final narrowing back to `u128` is checked and turns
//! into [`Error::overflow`] rather than truncating.

use alloy_primitives::U256;
use common_errors::Error;

/// One "unit" of fixed-point precision: 10^18.
pub const FP: u128 = 1_000_000_000_000_000_000;

/// Seconds in a 365-day year, used to normalize an annual rate to per-second.
pub const SECONDS_PER_YEAR: u128 = 31_536_000;

/// Basis-point denominator.
pub const BPS_DENOMINATOR: u128 = 10_000;

fn narrow(value: U256, context: &'static str) -> Result<u128, Error> {
    u128::try_from(value).map_err(|_| Error::overflow(context))
}

/// `x * y / FP`, rounding toward zero, computed without intermediate overflow.
pub fn mul(x: u128, y: u128) -> Result<u128, Error> {
    let product = U256::from(x).checked_mul(U256::from(y)).ok_or(Error::overflow("mul"))?;
    narrow(product / U256::from(FP), "mul overflow")
}

/// `x * FP / y`, rounding toward zero. `y == 0` is an overflow/fatal error,
/// never a panic.
pub fn div(x: u128, y: u128) -> Result<u128, Error> {
    if y == 0 {
        return Err(Error::overflow("div by zero"));
    }
    let numerator = U256::from(x).checked_mul(U256::from(FP)).ok_or(Error::overflow("div"))?;
    narrow(numerator / U256::from(y), "div overflow")
}

/// Multiplies two already-scaled values and keeps the result in the wider
/// integer, for callers that need to sum several such products before
/// narrowing back (e.g. weighted-rate accumulation in the sourcing walk).
pub fn widen_mul(x: u128, y: u128) -> Result<U256, Error> {
    U256::from(x).checked_mul(U256::from(y)).ok_or(Error::overflow("widen_mul"))
}

pub fn narrow_from(value: U256, context: &'static str) -> Result<u128, Error> {
    narrow(value, context)
}

/// Converts an annual rate (scaled by [`FP`]) into a per-second rate by
/// dividing by the number of seconds in a 365-day year.
pub fn normalize_rate(annual: u128) -> Result<u128, Error> {
    annual
        .checked_div(SECONDS_PER_YEAR)
        .ok_or(Error::overflow("normalize_rate"))
}

/// `value * bps / 10000`, used for admin-fee splits and tick-spacing ratios.
pub fn bps_of(value: u128, bps: u16) -> Result<u128, Error> {
    let scaled = U256::from(value)
        .checked_mul(U256::from(bps))
        .ok_or(Error::overflow("bps_of"))?;
    narrow(scaled / U256::from(BPS_DENOMINATOR), "bps_of overflow")
}

/// Checked addition with the same fatal-overflow discipline as `mul`/`div`.
pub fn add(x: u128, y: u128) -> Result<u128, Error> {
    x.checked_add(y).ok_or(Error::overflow("add overflow"))
}

/// Checked subtraction; spec invariants never allow a negative intermediate,
/// so underflow here always indicates a logic bug upstream and is fatal.
pub fn sub(x: u128, y: u128) -> Result<u128, Error> {
    x.checked_sub(y).ok_or(Error::overflow("sub underflow"))
}

pub fn min(a: u128, b: u128) -> u128 {
    if a < b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_roundtrip_truncates_toward_zero() {
        assert_eq!(mul(2 * FP, 3 * FP).unwrap(), 6 * FP);
        assert_eq!(div(6 * FP, 3 * FP).unwrap(), 2 * FP);
        // 1/3 truncates rather than rounding.
        assert_eq!(div(FP, 3 * FP).unwrap(), FP / 3);
    }

    #[test]
    fn mul_does_not_overflow_u128_intermediate() {
        let huge = u128::MAX / 2;
        // A naive `x * y` in u128 would panic/wrap here; the widened path
        // must not.
        assert!(mul(huge, FP).is_ok());
    }

    #[test]
    fn div_by_zero_is_fatal_not_panicking() {
        assert!(div(FP, 0).is_err());
    }

    #[test]
    fn normalize_rate_matches_annual_to_per_second() {
        // 10% APR, scaled.
        let annual = FP / 10;
        let per_second = normalize_rate(annual).unwrap();
        assert_eq!(per_second, annual / SECONDS_PER_YEAR);
    }

    #[test]
    fn bps_of_splits_correctly() {
        assert_eq!(bps_of(10_000 * FP, 500).unwrap(), 500 * FP);
    }
}
