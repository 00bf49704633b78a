//! Reading log shared by firmware and host targets.
//!
//! Every acquisition outcome is captured as a compact record in a fixed-size
//! ring so the latest readings and failures can be inspected after the fact
//! (emulator `status`, debugger post-mortem on target). Event kinds encode to
//! numeric codes for transport over diagnostics channels.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::filter::ConfigError;
use crate::frontend::RawSample;
use crate::sampler::{AcquireError, Reading};
use crate::scale::ScaledVoltage;

/// Monotonic identifier assigned to each record.
pub type EventId = u32;

/// Total number of records retained in memory.
pub const READING_LOG_CAPACITY: usize = 32;

/// Discriminated reading-log events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    FrontEndEnabled,
    FrontEndDisabled,
    ReadingComplete,
    ConversionRetried,
    ConversionTimeout,
    ConfigRejected,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::FrontEndEnabled => f.write_str("front-end-enabled"),
            TelemetryEventKind::FrontEndDisabled => f.write_str("front-end-disabled"),
            TelemetryEventKind::ReadingComplete => f.write_str("reading-complete"),
            TelemetryEventKind::ConversionRetried => f.write_str("conversion-retried"),
            TelemetryEventKind::ConversionTimeout => f.write_str("conversion-timeout"),
            TelemetryEventKind::ConfigRejected => f.write_str("config-rejected"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const FRONT_END_ENABLED_CODE: u16 = 0x0001;
    const FRONT_END_DISABLED_CODE: u16 = 0x0002;
    const READING_COMPLETE_CODE: u16 = 0x0010;
    const CONVERSION_RETRIED_CODE: u16 = 0x0011;
    const CONVERSION_TIMEOUT_CODE: u16 = 0x0020;
    const CONFIG_REJECTED_CODE: u16 = 0x0021;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::FrontEndEnabled => Self::FRONT_END_ENABLED_CODE,
            TelemetryEventKind::FrontEndDisabled => Self::FRONT_END_DISABLED_CODE,
            TelemetryEventKind::ReadingComplete => Self::READING_COMPLETE_CODE,
            TelemetryEventKind::ConversionRetried => Self::CONVERSION_RETRIED_CODE,
            TelemetryEventKind::ConversionTimeout => Self::CONVERSION_TIMEOUT_CODE,
            TelemetryEventKind::ConfigRejected => Self::CONFIG_REJECTED_CODE,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`Custom`](Self::Custom).
    #[must_use]
    pub const fn from_raw(code: u16) -> Self {
        match code {
            Self::FRONT_END_ENABLED_CODE => TelemetryEventKind::FrontEndEnabled,
            Self::FRONT_END_DISABLED_CODE => TelemetryEventKind::FrontEndDisabled,
            Self::READING_COMPLETE_CODE => TelemetryEventKind::ReadingComplete,
            Self::CONVERSION_RETRIED_CODE => TelemetryEventKind::ConversionRetried,
            Self::CONVERSION_TIMEOUT_CODE => TelemetryEventKind::ConversionTimeout,
            Self::CONFIG_REJECTED_CODE => TelemetryEventKind::ConfigRejected,
            other => TelemetryEventKind::Custom(other),
        }
    }

    /// Returns `true` for events describing a failed acquisition.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            TelemetryEventKind::ConversionTimeout | TelemetryEventKind::ConfigRejected
        )
    }
}

/// Payloads carried alongside reading-log events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    None,
    Reading(ReadingTelemetry),
    Retry(RetryTelemetry),
    Timeout(TimeoutTelemetry),
    Config(ConfigError),
}

impl TelemetryPayload {
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

/// Summary of a completed reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReadingTelemetry {
    pub output: ScaledVoltage,
    pub millivolts: i32,
    pub filtered_code: RawSample,
    pub polls: u32,
    pub retries: u16,
    pub elapsed_since_previous: Option<Duration>,
}

impl ReadingTelemetry {
    #[must_use]
    pub fn from_reading(reading: &Reading, elapsed_since_previous: Option<Duration>) -> Self {
        Self {
            output: reading.output,
            millivolts: reading.millivolts,
            filtered_code: reading.filter.filtered_code,
            polls: reading.polls,
            retries: reading.retries,
            elapsed_since_previous,
        }
    }
}

/// Conversions that had to be re-triggered during one reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryTelemetry {
    pub retries: u16,
}

/// Details of a conversion that never became ready.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeoutTelemetry {
    pub sample_index: u8,
    pub polls: u32,
    pub attempts: u16,
}

impl TimeoutTelemetry {
    #[must_use]
    pub fn new(sample_index: usize, polls: u32, attempts: u16) -> Self {
        Self {
            sample_index: truncate_index(sample_index),
            polls,
            attempts,
        }
    }
}

/// Monotonic instant wrapper used to time records.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Record stored in the reading log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Fixed-size ring of acquisition outcomes.
pub struct ReadingLog<TInstant, const CAPACITY: usize = READING_LOG_CAPACITY>
where
    TInstant: Copy,
{
    ring: HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>,
    last_reading_at: Option<TInstant>,
    next_event_id: EventId,
    readings: u32,
    failures: u32,
}

impl<TInstant, const CAPACITY: usize> ReadingLog<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_reading_at: None,
            next_event_id: 0,
            readings: 0,
            failures: 0,
        }
    }

    /// Iterates over retained records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if any.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the most recent completed reading, if still retained.
    pub fn latest_reading(&self) -> Option<ReadingTelemetry> {
        self.oldest_first()
            .filter_map(|record| match record.details {
                TelemetryPayload::Reading(reading) => Some(reading),
                _ => None,
            })
            .last()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Readings completed since the log was created. Not bounded by capacity.
    pub const fn readings(&self) -> u32 {
        self.readings
    }

    /// Failed acquisitions since the log was created.
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Records the front end changing power state.
    pub fn record_power(&mut self, enabled: bool, timestamp: TInstant) -> EventId {
        let event = if enabled {
            TelemetryEventKind::FrontEndEnabled
        } else {
            TelemetryEventKind::FrontEndDisabled
        };
        self.record(event, TelemetryPayload::none(), timestamp)
    }

    /// Records one full acquisition: the front end powering up at
    /// `started_at`, powering down at `finished_at`, then the outcome.
    ///
    /// The outcome comes last because filtering completes after the front end
    /// has been disabled.
    pub fn record_acquisition(
        &mut self,
        outcome: &Result<Reading, AcquireError>,
        started_at: TInstant,
        finished_at: TInstant,
    ) -> EventId {
        self.record_power(true, started_at);
        self.record_power(false, finished_at);
        self.record_outcome(outcome, finished_at)
    }

    /// Records the outcome of one acquisition and returns the id of the last
    /// record written.
    ///
    /// A reading that needed retries produces a `ConversionRetried` record
    /// ahead of its `ReadingComplete` record.
    pub fn record_outcome(
        &mut self,
        outcome: &Result<Reading, AcquireError>,
        timestamp: TInstant,
    ) -> EventId {
        match outcome {
            Ok(reading) => {
                if reading.retries > 0 {
                    self.record(
                        TelemetryEventKind::ConversionRetried,
                        TelemetryPayload::Retry(RetryTelemetry {
                            retries: reading.retries,
                        }),
                        timestamp,
                    );
                }
                self.record_reading(reading, timestamp)
            }
            Err(AcquireError::ConversionTimeout {
                sample_index,
                polls,
                attempts,
            }) => {
                self.failures = self.failures.wrapping_add(1);
                self.record(
                    TelemetryEventKind::ConversionTimeout,
                    TelemetryPayload::Timeout(TimeoutTelemetry::new(
                        *sample_index,
                        *polls,
                        *attempts,
                    )),
                    timestamp,
                )
            }
            Err(AcquireError::Config(err)) => {
                self.failures = self.failures.wrapping_add(1);
                self.record(
                    TelemetryEventKind::ConfigRejected,
                    TelemetryPayload::Config(*err),
                    timestamp,
                )
            }
        }
    }

    /// Records a completed reading and the time since the previous one.
    pub fn record_reading(&mut self, reading: &Reading, timestamp: TInstant) -> EventId {
        let elapsed = self
            .last_reading_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_reading_at = Some(timestamp);
        self.readings = self.readings.wrapping_add(1);

        self.record(
            TelemetryEventKind::ReadingComplete,
            TelemetryPayload::Reading(ReadingTelemetry::from_reading(reading, elapsed)),
            timestamp,
        )
    }

    /// Records an arbitrary event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for ReadingLog<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_index(index: usize) -> u8 {
    match u8::try_from(index) {
        Ok(value) => value,
        Err(_) => u8::MAX,
    }
}
