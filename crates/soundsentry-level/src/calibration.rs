/// Arithmetic mean of the retained calibration readings.
///
/// Readings that are exactly 0 are discarded as measurement errors: under
/// this scale a real quiet room still registers a small positive baseline,
/// and the estimator substitutes 0 for failed reads. Note this also discards
/// genuine digital silence, which biases the mean upward in very quiet
/// environments.
///
/// Returns `None` when nothing was retained, which callers must surface
/// distinctly from a 0.0 mean.
pub fn mean_level(readings: &[f32]) -> Option<f32> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for &r in readings {
        if r != 0.0 {
            sum += r as f64;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some((sum / count as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_stream_returns_that_value() {
        let readings = vec![42.5f32; 50];
        assert_eq!(mean_level(&readings), Some(42.5));
    }

    #[test]
    fn zeros_are_discarded() {
        let readings = [0.0, 40.0, 0.0, 60.0, 0.0];
        assert_eq!(mean_level(&readings), Some(50.0));
    }

    #[test]
    fn all_zero_is_failure_not_zero_mean() {
        let readings = [0.0f32; 20];
        assert_eq!(mean_level(&readings), None);
    }

    #[test]
    fn empty_input_is_failure() {
        assert_eq!(mean_level(&[]), None);
    }

    #[test]
    fn mean_of_mixed_readings() {
        let readings = [30.0, 35.0, 40.0];
        let mean = mean_level(&readings).unwrap();
        assert!((mean - 35.0).abs() < 1e-5);
    }
}
