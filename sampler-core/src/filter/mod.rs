//! Trimmed-mean filter applied to one burst of IADC conversions.
//!
//! A burst starts with a few warm-up conversions taken while the analog front
//! end settles; those never reach the accumulator. The remaining samples are
//! summed, one instance of the largest and one instance of the smallest value
//! are subtracted, and the rest is averaged with truncating integer division.

use core::fmt;

use heapless::Vec;

use crate::frontend::RawSample;

/// Number of conversions per burst.
pub const DEFAULT_BURST_LEN: usize = 9;
/// Leading conversions discarded while the front end settles.
pub const DEFAULT_WARMUP: usize = 3;
/// Samples removed from the average: one maximum and one minimum.
pub const TRIMMED_EXTREMES: usize = 2;
/// Upper bound on the burst length, sized for the fixed burst buffer.
pub const MAX_BURST_LEN: usize = 32;

/// Reasons a filter configuration or burst cannot be used.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// Nothing would be left to average after warm-up and trimming.
    BurstTooShort { burst_len: usize, warmup: usize },
    /// The burst does not fit the fixed buffer.
    BurstTooLong { burst_len: usize, max: usize },
    /// A burst of the wrong length was handed to the filter.
    BurstLengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BurstTooShort { burst_len, warmup } => write!(
                f,
                "burst of {burst_len} leaves no samples after {warmup} warm-up and {TRIMMED_EXTREMES} trimmed"
            ),
            ConfigError::BurstTooLong { burst_len, max } => {
                write!(f, "burst of {burst_len} exceeds the {max}-sample buffer")
            }
            ConfigError::BurstLengthMismatch { expected, actual } => {
                write!(f, "expected {expected} samples, got {actual}")
            }
        }
    }
}

/// Validated burst geometry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FilterConfig {
    burst_len: usize,
    warmup: usize,
}

impl FilterConfig {
    /// Nine conversions, the first three discarded.
    pub const DEFAULT: Self = Self {
        burst_len: DEFAULT_BURST_LEN,
        warmup: DEFAULT_WARMUP,
    };

    /// Validates that at least one sample survives warm-up and trimming.
    pub const fn new(burst_len: usize, warmup: usize) -> Result<Self, ConfigError> {
        if burst_len > MAX_BURST_LEN {
            return Err(ConfigError::BurstTooLong {
                burst_len,
                max: MAX_BURST_LEN,
            });
        }
        if burst_len.saturating_sub(warmup) <= TRIMMED_EXTREMES {
            return Err(ConfigError::BurstTooShort { burst_len, warmup });
        }
        Ok(Self { burst_len, warmup })
    }

    /// Total conversions per burst.
    pub const fn burst_len(&self) -> usize {
        self.burst_len
    }

    /// Conversions discarded at the start of each burst.
    pub const fn warmup(&self) -> usize {
        self.warmup
    }

    /// Conversions that feed the accumulator.
    pub const fn participating(&self) -> usize {
        self.burst_len - self.warmup
    }

    /// Divisor applied to the trimmed sum.
    pub const fn divisor(&self) -> usize {
        self.participating() - TRIMMED_EXTREMES
    }

    /// Returns `true` when the conversion at `index` feeds the accumulator.
    pub const fn is_participating(&self, index: usize) -> bool {
        index >= self.warmup
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Ordered raw codes collected during one acquisition.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SampleBurst {
    samples: Vec<RawSample, MAX_BURST_LEN>,
}

impl SampleBurst {
    /// Creates an empty burst.
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Builds a burst from existing codes.
    pub fn from_slice(samples: &[RawSample]) -> Result<Self, ConfigError> {
        let samples = Vec::from_slice(samples).map_err(|_| ConfigError::BurstTooLong {
            burst_len: samples.len(),
            max: MAX_BURST_LEN,
        })?;
        Ok(Self { samples })
    }

    pub(crate) fn push(&mut self, sample: RawSample) {
        // Capacity matches MAX_BURST_LEN, which FilterConfig enforces.
        let _ = self.samples.push(sample);
    }

    /// All codes in conversion order, warm-up included.
    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    /// Codes that fed the accumulator.
    pub fn participating(&self, config: &FilterConfig) -> &[RawSample] {
        self.samples.get(config.warmup()..).unwrap_or(&[])
    }

    /// Number of codes collected.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Intermediate values of one trimmed-mean computation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FilterResult {
    pub sum: i64,
    pub max: RawSample,
    pub min: RawSample,
    pub trimmed_sum: i64,
    pub divisor: i64,
    pub filtered_code: RawSample,
}

/// Streaming accumulator for the participating samples.
///
/// Only a single running maximum and minimum are tracked, so `finish`
/// subtracts exactly one instance of each extreme even when several samples
/// share that value.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TrimmedMean {
    sum: i64,
    max: RawSample,
    min: RawSample,
    count: usize,
}

impl TrimmedMean {
    /// Creates an empty accumulator.
    pub const fn new() -> Self {
        Self {
            sum: 0,
            max: 0,
            min: 0,
            count: 0,
        }
    }

    /// Adds one participating sample.
    pub fn push(&mut self, sample: RawSample) {
        if self.count == 0 {
            self.max = sample;
            self.min = sample;
        } else {
            self.max = self.max.max(sample);
            self.min = self.min.min(sample);
        }
        self.sum += i64::from(sample);
        self.count += 1;
    }

    /// Number of samples accumulated so far.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Produces the trimmed mean, or `None` when fewer than three samples were seen.
    pub fn finish(&self) -> Option<FilterResult> {
        if self.count <= TRIMMED_EXTREMES {
            return None;
        }

        let trimmed_sum = self.sum - (i64::from(self.max) + i64::from(self.min));
        let divisor = i64::try_from(self.count - TRIMMED_EXTREMES).ok()?;
        // The mean of the remaining samples lies between min and max.
        let filtered_code = RawSample::try_from(trimmed_sum / divisor).ok()?;

        Some(FilterResult {
            sum: self.sum,
            max: self.max,
            min: self.min,
            trimmed_sum,
            divisor,
            filtered_code,
        })
    }
}

/// Runs the filter over a complete burst.
pub fn trimmed_mean(
    samples: &[RawSample],
    config: &FilterConfig,
) -> Result<FilterResult, ConfigError> {
    if samples.len() != config.burst_len() {
        return Err(ConfigError::BurstLengthMismatch {
            expected: config.burst_len(),
            actual: samples.len(),
        });
    }

    let mut accumulator = TrimmedMean::new();
    for (index, sample) in samples.iter().enumerate() {
        if config.is_participating(index) {
            accumulator.push(*sample);
        }
    }

    accumulator.finish().ok_or(ConfigError::BurstTooShort {
        burst_len: config.burst_len(),
        warmup: config.warmup(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(participating: [RawSample; 6]) -> [RawSample; DEFAULT_BURST_LEN] {
        let mut samples = [0; DEFAULT_BURST_LEN];
        samples[DEFAULT_WARMUP..].copy_from_slice(&participating);
        samples
    }

    #[test]
    fn default_geometry_averages_four_samples() {
        let config = FilterConfig::DEFAULT;
        assert_eq!(config.burst_len(), 9);
        assert_eq!(config.warmup(), 3);
        assert_eq!(config.participating(), 6);
        assert_eq!(config.divisor(), 4);
        assert!(!config.is_participating(2));
        assert!(config.is_participating(3));
    }

    #[test]
    fn config_rejects_bursts_with_nothing_left_to_average() {
        assert_eq!(
            FilterConfig::new(5, 3),
            Err(ConfigError::BurstTooShort {
                burst_len: 5,
                warmup: 3
            })
        );
        assert!(FilterConfig::new(6, 3).is_ok());
        assert_eq!(
            FilterConfig::new(9, usize::MAX),
            Err(ConfigError::BurstTooShort {
                burst_len: 9,
                warmup: usize::MAX
            })
        );
        assert_eq!(
            FilterConfig::new(2, 9),
            Err(ConfigError::BurstTooShort {
                burst_len: 2,
                warmup: 9
            })
        );
        assert_eq!(
            FilterConfig::new(MAX_BURST_LEN + 1, 3),
            Err(ConfigError::BurstTooLong {
                burst_len: MAX_BURST_LEN + 1,
                max: MAX_BURST_LEN
            })
        );
    }

    #[test]
    fn ties_remove_a_single_extreme() {
        let result = trimmed_mean(&burst([10, 10, 10, 2, 2, 30]), &FilterConfig::DEFAULT)
            .expect("burst should filter");

        assert_eq!(result.sum, 64);
        assert_eq!(result.max, 30);
        assert_eq!(result.min, 2);
        assert_eq!(result.trimmed_sum, 32);
        assert_eq!(result.filtered_code, 8);
    }

    #[test]
    fn all_negative_codes_track_true_extremes() {
        let result = trimmed_mean(
            &burst([-100, -200, -300, -400, -500, -600]),
            &FilterConfig::DEFAULT,
        )
        .expect("burst should filter");

        assert_eq!(result.max, -100);
        assert_eq!(result.min, -600);
        assert_eq!(result.trimmed_sum, -1_400);
        assert_eq!(result.filtered_code, -350);
    }

    #[test]
    fn division_truncates_toward_zero() {
        let positive = trimmed_mean(&burst([0, 1, 1, 1, 2, 9]), &FilterConfig::DEFAULT)
            .expect("burst should filter");
        assert_eq!(positive.trimmed_sum, 5);
        assert_eq!(positive.filtered_code, 1);

        let negative = trimmed_mean(&burst([0, -1, -1, -1, -2, -9]), &FilterConfig::DEFAULT)
            .expect("burst should filter");
        assert_eq!(negative.trimmed_sum, -5);
        assert_eq!(negative.filtered_code, -1);
    }

    #[test]
    fn streaming_accumulator_needs_three_samples() {
        let mut accumulator = TrimmedMean::new();
        accumulator.push(1);
        accumulator.push(2);
        assert_eq!(accumulator.finish(), None);

        accumulator.push(3);
        let result = accumulator.finish().expect("three samples suffice");
        assert_eq!(result.filtered_code, 2);
        assert_eq!(result.divisor, 1);
    }

    #[test]
    fn length_mismatch_is_reported() {
        assert_eq!(
            trimmed_mean(&[1, 2, 3], &FilterConfig::DEFAULT),
            Err(ConfigError::BurstLengthMismatch {
                expected: 9,
                actual: 3
            })
        );
    }

    #[test]
    fn burst_exposes_participating_suffix() {
        let samples = burst([1, 2, 3, 4, 5, 6]);
        let collected = SampleBurst::from_slice(&samples).expect("burst fits");
        assert_eq!(collected.len(), 9);
        assert_eq!(
            collected.participating(&FilterConfig::DEFAULT),
            &[1, 2, 3, 4, 5, 6]
        );
    }
}
