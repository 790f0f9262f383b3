use num_traits::Float;

/// Direction in which [`round_to_interval`] moves a value that is not
/// already a multiple of the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Floor,
    Ceil,
}

/// Rounds `value` to a multiple of `interval`, never crossing `value`
/// in the wrong direction.
///
/// The candidate is `round(value / interval) * interval` (halves away
/// from zero); if it lands on the wrong side of `value` it is moved by
/// one interval.
pub fn round_to_interval<T: Float>(value: T, interval: T, rounding: Rounding) -> T {
    let interval = interval.abs();
    let nice = (value / interval).round() * interval;
    // Absorbs accumulated error such as 2999.9999999 vs 3000.
    let tolerance = interval * T::epsilon().sqrt();
    match rounding {
        Rounding::Floor if nice > value + tolerance => nice - interval,
        Rounding::Ceil if nice < value - tolerance => nice + interval,
        _ => nice,
    }
}
