//! Cycle-counter timestamps for the reading log.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::time::Duration;

use sampler_core::telemetry::TelemetryInstant;

/// Core clock after reset (HFRCODPLL default band).
pub const CORE_CLOCK_HZ: u32 = 19_000_000;

/// Raw DWT cycle count. Wraps every few minutes at the core clock, so only
/// differences between nearby instants are meaningful.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FirmwareInstant {
    cycles: u32,
}

impl FirmwareInstant {
    #[must_use]
    pub const fn from_cycles(cycles: u32) -> Self {
        Self { cycles }
    }

    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self::from_cycles(cortex_m::peripheral::DWT::cycle_count())
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let elapsed = self.cycles.wrapping_sub(earlier.cycles);
        let micros = u64::from(elapsed) * 1_000_000 / u64::from(CORE_CLOCK_HZ);
        Duration::from_micros(micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_survives_counter_wrap() {
        let before = FirmwareInstant::from_cycles(u32::MAX - 18_999);
        let after = FirmwareInstant::from_cycles(19_000);

        assert_eq!(
            after.saturating_duration_since(before),
            Duration::from_millis(2)
        );
    }

    #[test]
    fn one_second_of_cycles() {
        let start = FirmwareInstant::from_cycles(0);
        let end = FirmwareInstant::from_cycles(CORE_CLOCK_HZ);
        assert_eq!(end.saturating_duration_since(start), Duration::from_secs(1));
    }
}
