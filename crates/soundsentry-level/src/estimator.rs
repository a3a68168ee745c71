use crate::constants::{DB_OFFSET, FULL_SCALE, MIN_RMS};
use std::time::Instant;

/// One level measurement: the estimated dB value and when it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub db: f32,
    pub at: Instant,
}

/// Converts a raw i16 buffer into a single rescaled dB value.
///
/// The scale is not calibrated to an absolute physical reference: full scale
/// maps to 96 and anything at or below the RMS floor maps near 5.7, with a
/// hard clamp at 0.
pub struct LevelEstimator {
    reference: f64,
    offset: f64,
}

impl LevelEstimator {
    pub fn new() -> Self {
        Self {
            reference: FULL_SCALE,
            offset: DB_OFFSET,
        }
    }

    /// Mean-square power of the buffer. i64 accumulation cannot overflow:
    /// 32768^2 * buffer lengths in any realistic chunk size stays far below i64::MAX.
    fn power(&self, samples: &[i16]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_squares: i64 = samples
            .iter()
            .map(|&sample| {
                let s = sample as i64;
                s * s
            })
            .sum();
        sum_squares as f64 / samples.len() as f64
    }

    /// RMS of the buffer, clamped to the floor that keeps the logarithm finite.
    pub fn rms(&self, samples: &[i16]) -> f64 {
        self.power(samples).sqrt().max(MIN_RMS)
    }

    /// Estimate the level of one buffer.
    ///
    /// A zero-power buffer (true silence) returns 0 directly, skipping the
    /// logarithm. Otherwise the result is 20*log10(rms/32767) + 96, clamped
    /// to a minimum of 0, which lands in [0, 96] for every valid buffer.
    pub fn estimate(&self, samples: &[i16]) -> f32 {
        let power = self.power(samples);
        if power <= 0.0 {
            return 0.0;
        }
        let rms = power.sqrt().max(MIN_RMS);
        let db = 20.0 * (rms / self.reference).log10() + self.offset;
        db.max(0.0) as f32
    }
}

impl Default for LevelEstimator {
    fn default() -> Self {
        Self::new()
    }
}
