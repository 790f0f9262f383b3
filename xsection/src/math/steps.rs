use num_traits::Float;

/// Returns `start, start + interval, ...` up to and including `end`.
///
/// Values are computed by multiplication, not accumulation, so the
/// sequence is identical for identical inputs.
pub fn steps<T: Float>(start: T, end: T, interval: T) -> impl Iterator<Item = T> {
    let count = if interval > T::zero() && end >= start {
        ((end - start) / interval).round().to_usize().map_or(0, |n| n + 1)
    } else {
        0
    };
    (0..count).scan(T::zero(), move |k, _| {
        let value = start + *k * interval;
        *k = *k + T::one();
        Some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::steps;

    #[test]
    fn test_steps() {
        let ticks: Vec<f64> = steps(0.0, 1500.0, 500.0).collect();
        assert_eq!(ticks, vec![0.0, 500.0, 1000.0, 1500.0]);

        let ticks: Vec<f64> = steps(-100.0, 550.0, 50.0).collect();
        assert_eq!(ticks.len(), 14);
        assert_eq!(ticks.first(), Some(&-100.0));
        assert_eq!(ticks.last(), Some(&550.0));
    }

    #[test]
    fn test_empty_steps() {
        assert_eq!(steps(10.0, 0.0, 1.0).count(), 0);
        assert_eq!(steps(0.0, 10.0, 0.0).count(), 0);
        assert_eq!(steps(5.0, 5.0, 1.0).collect::<Vec<f64>>(), vec![5.0]);
    }
}
