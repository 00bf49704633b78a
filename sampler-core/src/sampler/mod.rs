//! Burst acquisition driving the analog front end.
//!
//! One call powers the front end, converts a full burst, feeds the
//! participating samples into a [`TrimmedMean`], powers the front end back down
//! and scales the result. Nothing survives between calls apart from the
//! peripheral itself.
//!
//! Polling for the ready flag is bounded by [`PollPolicy`]. A conversion whose
//! ready flag never asserts is re-triggered up to `conversion_retries` times
//! and then reported as [`AcquireError::ConversionTimeout`] instead of hanging
//! the caller. [`PollPolicy::unbounded`] restores the unbounded busy-wait.

use core::{fmt, time::Duration};

use crate::bootstrap::{BootstrapPlan, Bootstrapped};
use crate::filter::{ConfigError, FilterConfig, FilterResult, SampleBurst, TrimmedMean};
use crate::frontend::{AnalogFrontEnd, BusyPoll, PollDelay, RawSample};
use crate::scale::{FullScale, ScaledVoltage, to_output};

/// Ready polls allowed per conversion before it counts as timed out.
pub const DEFAULT_MAX_POLLS: u32 = 100_000;
/// Extra conversion attempts after a timeout.
pub const DEFAULT_CONVERSION_RETRIES: u8 = 1;

/// Bounds on the ready-flag busy-wait.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    max_polls: u32,
    poll_interval: Duration,
    conversion_retries: u8,
}

impl PollPolicy {
    pub const DEFAULT: Self = Self::new(
        DEFAULT_MAX_POLLS,
        Duration::ZERO,
        DEFAULT_CONVERSION_RETRIES,
    );

    /// Creates a policy. `max_polls == 0` disables the bound.
    pub const fn new(max_polls: u32, poll_interval: Duration, conversion_retries: u8) -> Self {
        Self {
            max_polls,
            poll_interval,
            conversion_retries,
        }
    }

    /// Polls forever without retries.
    pub const fn unbounded() -> Self {
        Self::new(0, Duration::ZERO, 0)
    }

    pub const fn max_polls(&self) -> u32 {
        self.max_polls
    }

    /// Pause requested between unsuccessful polls.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub const fn conversion_retries(&self) -> u8 {
        self.conversion_retries
    }

    /// Returns `true` when polling gives up after `max_polls`.
    pub const fn has_limit(&self) -> bool {
        self.max_polls != 0
    }

    /// Total conversion attempts per sample.
    pub fn attempts(&self) -> u16 {
        u16::from(self.conversion_retries) + 1
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sampler settings.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SamplerConfig {
    pub filter: FilterConfig,
    pub scale: FullScale,
    pub poll: PollPolicy,
}

impl SamplerConfig {
    /// Replaces the poll policy.
    #[must_use]
    pub const fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Replaces the burst geometry.
    #[must_use]
    pub const fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Replaces the full-scale conversion.
    #[must_use]
    pub const fn with_scale(mut self, scale: FullScale) -> Self {
        self.scale = scale;
        self
    }
}

/// Everything produced by one acquisition.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub burst: SampleBurst,
    pub filter: FilterResult,
    pub volts: f64,
    pub millivolts: i32,
    pub output: ScaledVoltage,
    /// Ready polls issued across the burst.
    pub polls: u32,
    /// Conversions re-triggered after a timeout.
    pub retries: u16,
}

/// Failures surfaced by [`Sampler::acquire`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AcquireError {
    /// The ready flag never asserted for the sample at `sample_index`.
    ConversionTimeout {
        sample_index: usize,
        polls: u32,
        attempts: u16,
    },
    Config(ConfigError),
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireError::ConversionTimeout {
                sample_index,
                polls,
                attempts,
            } => write!(
                f,
                "conversion {sample_index} not ready after {polls} polls over {attempts} attempts"
            ),
            AcquireError::Config(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl From<ConfigError> for AcquireError {
    fn from(value: ConfigError) -> Self {
        AcquireError::Config(value)
    }
}

enum PollOutcome {
    Ready(u32),
    TimedOut(u32),
}

struct Conversion {
    sample: RawSample,
    polls: u32,
    retries: u16,
}

/// Drives a bootstrapped front end through filtered acquisitions.
pub struct Sampler<F, D = BusyPoll> {
    front_end: F,
    delay: D,
    config: SamplerConfig,
    plan: BootstrapPlan,
}

impl<F> Sampler<F, BusyPoll>
where
    F: AnalogFrontEnd,
{
    /// Creates a sampler that busy-polls between ready checks.
    pub fn new(front_end: Bootstrapped<F>, config: SamplerConfig) -> Self {
        Self::with_delay(front_end, config, BusyPoll::new())
    }
}

impl<F, D> Sampler<F, D>
where
    F: AnalogFrontEnd,
    D: PollDelay,
{
    /// Creates a sampler that calls `delay` between unsuccessful polls.
    pub fn with_delay(front_end: Bootstrapped<F>, config: SamplerConfig, delay: D) -> Self {
        let (front_end, plan) = front_end.into_parts();
        Self {
            front_end,
            delay,
            config,
            plan,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Returns the bring-up plan the front end was initialized with.
    pub fn plan(&self) -> &BootstrapPlan {
        &self.plan
    }

    pub fn front_end(&self) -> &F {
        &self.front_end
    }

    pub fn front_end_mut(&mut self) -> &mut F {
        &mut self.front_end
    }

    /// Consumes the sampler and returns the front end and delay.
    pub fn into_inner(self) -> (F, D) {
        (self.front_end, self.delay)
    }

    /// Acquires one filtered reading and returns the 16-bit scaled output.
    pub fn acquire_filtered_sample(&mut self) -> Result<ScaledVoltage, AcquireError> {
        self.acquire().map(|reading| reading.output)
    }

    /// Acquires one filtered reading with its intermediate values.
    ///
    /// The front end is disabled again before this returns, whether or not the
    /// burst completed.
    pub fn acquire(&mut self) -> Result<Reading, AcquireError> {
        self.front_end.enable();
        let collected = self.collect_burst();
        self.front_end.disable();

        let (burst, accumulator, polls, retries) = collected?;
        let filter = accumulator.finish().ok_or(ConfigError::BurstTooShort {
            burst_len: self.config.filter.burst_len(),
            warmup: self.config.filter.warmup(),
        })?;

        let scale = self.config.scale;
        let volts = scale.volts(filter.filtered_code);

        Ok(Reading {
            burst,
            filter,
            volts,
            millivolts: scale.millivolts(filter.filtered_code),
            output: to_output(volts),
            polls,
            retries,
        })
    }

    fn collect_burst(&mut self) -> Result<(SampleBurst, TrimmedMean, u32, u16), AcquireError> {
        let filter = self.config.filter;
        let mut burst = SampleBurst::new();
        let mut accumulator = TrimmedMean::new();
        let mut polls = 0u32;
        let mut retries = 0u16;

        for index in 0..filter.burst_len() {
            let conversion = self.convert(index)?;
            polls = polls.saturating_add(conversion.polls);
            retries = retries.saturating_add(conversion.retries);

            burst.push(conversion.sample);
            if filter.is_participating(index) {
                accumulator.push(conversion.sample);
            }
        }

        Ok((burst, accumulator, polls, retries))
    }

    fn convert(&mut self, sample_index: usize) -> Result<Conversion, AcquireError> {
        let attempts = self.config.poll.attempts();
        let mut polls = 0u32;

        for attempt in 0..attempts {
            self.front_end.start_conversion();
            match self.wait_ready() {
                PollOutcome::Ready(count) => {
                    return Ok(Conversion {
                        sample: self.front_end.read_result(),
                        polls: polls.saturating_add(count),
                        retries: attempt,
                    });
                }
                PollOutcome::TimedOut(count) => polls = polls.saturating_add(count),
            }
        }

        Err(AcquireError::ConversionTimeout {
            sample_index,
            polls,
            attempts,
        })
    }

    fn wait_ready(&mut self) -> PollOutcome {
        let policy = self.config.poll;
        let mut polls = 0u32;

        loop {
            polls = polls.saturating_add(1);
            if self.front_end.is_result_ready() {
                return PollOutcome::Ready(polls);
            }
            if policy.has_limit() && polls >= policy.max_polls() {
                return PollOutcome::TimedOut(polls);
            }
            self.delay.pause(policy.poll_interval());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{BootstrapConfig, bootstrap};
    use crate::frontend::ScriptedFrontEnd;

    fn sampler_with(
        script: &[RawSample],
        config: SamplerConfig,
    ) -> Sampler<ScriptedFrontEnd> {
        let front_end = ScriptedFrontEnd::with_script(script).expect("script fits");
        let ready = bootstrap(front_end, &BootstrapConfig::default()).expect("bootstrap");
        Sampler::new(ready, config)
    }

    #[derive(Default)]
    struct CountingDelay {
        pauses: u32,
        total: Duration,
    }

    impl PollDelay for CountingDelay {
        fn pause(&mut self, interval: Duration) {
            self.pauses += 1;
            self.total += interval;
        }
    }

    #[test]
    fn acquisition_reports_intermediate_values() {
        let mut sampler = sampler_with(
            &[9, 9, 9, 0, 4_095, 2_000, 2_000, 2_000, 2_000],
            SamplerConfig::default(),
        );

        let reading = sampler.acquire().expect("reading");
        assert_eq!(reading.burst.len(), 9);
        assert_eq!(reading.filter.sum, 12_095);
        assert_eq!(reading.filter.trimmed_sum, 8_000);
        assert_eq!(reading.filter.filtered_code, 2_000);
        assert_eq!(reading.millivolts, 2_344);
        assert_eq!(reading.output, 2_344);
        assert_eq!(reading.polls, 9);
        assert_eq!(reading.retries, 0);
        assert!(!sampler.front_end().is_enabled());
    }

    #[test]
    fn poll_interval_is_passed_to_delay() {
        let front_end = ScriptedFrontEnd::with_script(&[1; 9])
            .expect("script fits")
            .with_ready_latency(2);
        let ready = bootstrap(front_end, &BootstrapConfig::default()).expect("bootstrap");
        let policy = PollPolicy::new(10, Duration::from_micros(5), 0);
        let mut sampler = Sampler::with_delay(
            ready,
            SamplerConfig::default().with_poll(policy),
            CountingDelay::default(),
        );

        let reading = sampler.acquire().expect("reading");
        assert_eq!(reading.polls, 27);

        let (_, delay) = sampler.into_inner();
        assert_eq!(delay.pauses, 18);
        assert_eq!(delay.total, Duration::from_micros(90));
    }

    #[test]
    fn timeout_reports_sample_index_and_attempts() {
        let mut sampler = sampler_with(
            &[1, 2, 3, 4],
            SamplerConfig::default().with_poll(PollPolicy::new(8, Duration::ZERO, 2)),
        );

        let err = sampler.acquire().expect_err("script runs dry");
        assert_eq!(
            err,
            AcquireError::ConversionTimeout {
                sample_index: 4,
                polls: 24,
                attempts: 3,
            }
        );
        assert!(!sampler.front_end().is_enabled());
    }

    #[test]
    fn policy_attempts_include_first_conversion() {
        assert_eq!(PollPolicy::DEFAULT.attempts(), 2);
        assert_eq!(PollPolicy::unbounded().attempts(), 1);
        assert!(!PollPolicy::unbounded().has_limit());
        assert_eq!(PollPolicy::new(1, Duration::ZERO, u8::MAX).attempts(), 256);
    }
}
