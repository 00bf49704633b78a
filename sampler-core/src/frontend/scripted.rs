//! Simulated IADC that replays scripted conversion results.
//!
//! The simulator models the parts of the peripheral the sampler depends on:
//! power state, a ready flag that asserts after a configurable number of polls,
//! and conversions that never complete. Counters record every interaction so
//! tests can check the call protocol as well as the filtered value.

use core::convert::Infallible;

use heapless::Deque;

use super::{AnalogFrontEnd, RawSample};
use crate::bootstrap::{BootstrapPlan, PeripheralBootstrap};

/// Number of conversion results that can be queued ahead of time.
pub const SCRIPT_CAPACITY: usize = 64;

/// Interaction counters captured by [`ScriptedFrontEnd`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FrontEndStats {
    pub initializations: u32,
    pub enables: u32,
    pub disables: u32,
    pub conversions: u32,
    pub conversions_while_disabled: u32,
    pub polls: u32,
    pub reads: u32,
    pub premature_reads: u32,
}

/// Error returned when the script queue cannot take more samples.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptFull {
    /// Number of samples accepted before the queue filled up.
    pub accepted: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct PendingConversion {
    value: Option<RawSample>,
    polls_left: u32,
}

/// Scripted stand-in for the IADC single-conversion path.
#[derive(Clone, Debug)]
pub struct ScriptedFrontEnd {
    script: Deque<RawSample, SCRIPT_CAPACITY>,
    level: Option<RawSample>,
    ready_latency: u32,
    stall_next: u32,
    stall_forever: bool,
    pending: Option<PendingConversion>,
    enabled: bool,
    plan: Option<BootstrapPlan>,
    stats: FrontEndStats,
}

impl ScriptedFrontEnd {
    /// Creates a powered-down simulator with an empty script.
    pub const fn new() -> Self {
        Self {
            script: Deque::new(),
            level: None,
            ready_latency: 0,
            stall_next: 0,
            stall_forever: false,
            pending: None,
            enabled: false,
            plan: None,
            stats: FrontEndStats {
                initializations: 0,
                enables: 0,
                disables: 0,
                conversions: 0,
                conversions_while_disabled: 0,
                polls: 0,
                reads: 0,
                premature_reads: 0,
            },
        }
    }

    /// Creates a simulator preloaded with `samples`.
    pub fn with_script(samples: &[RawSample]) -> Result<Self, ScriptFull> {
        let mut front_end = Self::new();
        front_end.push_samples(samples)?;
        Ok(front_end)
    }

    /// Sets how many unsuccessful polls precede each ready assertion.
    #[must_use]
    pub fn with_ready_latency(mut self, polls: u32) -> Self {
        self.ready_latency = polls;
        self
    }

    /// Appends samples to the script.
    pub fn push_samples(&mut self, samples: &[RawSample]) -> Result<(), ScriptFull> {
        for (accepted, sample) in samples.iter().enumerate() {
            self.script
                .push_back(*sample)
                .map_err(|_| ScriptFull { accepted })?;
        }
        Ok(())
    }

    /// Drops any samples that have not been converted yet.
    pub fn clear_script(&mut self) {
        self.script.clear();
    }

    /// Number of scripted samples still queued.
    pub fn samples_remaining(&self) -> usize {
        self.script.len()
    }

    /// Sets the code returned once the script runs dry. `None` makes such
    /// conversions hang.
    pub fn set_level(&mut self, level: Option<RawSample>) {
        self.level = level;
    }

    /// Returns the fallback input level.
    pub const fn level(&self) -> Option<RawSample> {
        self.level
    }

    /// Sets the ready latency in polls.
    pub fn set_ready_latency(&mut self, polls: u32) {
        self.ready_latency = polls;
    }

    /// Makes the next `count` conversions hang without consuming script entries.
    pub fn stall_conversions(&mut self, count: u32) {
        self.stall_next = count;
    }

    /// Makes every subsequent conversion hang until [`resume`](Self::resume) is called.
    pub fn stall_forever(&mut self) {
        self.stall_forever = true;
    }

    /// Clears any stall injection.
    pub fn resume(&mut self) {
        self.stall_forever = false;
        self.stall_next = 0;
    }

    /// Returns `true` when a stall is currently injected.
    pub const fn is_stalled(&self) -> bool {
        self.stall_forever || self.stall_next > 0
    }

    /// Returns `true` while the simulated front end is powered.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Plan applied by the most recent bring-up, if any.
    pub const fn bootstrap_plan(&self) -> Option<&BootstrapPlan> {
        self.plan.as_ref()
    }

    /// Returns the interaction counters.
    pub const fn stats(&self) -> FrontEndStats {
        self.stats
    }

    /// Resets the interaction counters.
    pub fn reset_stats(&mut self) {
        self.stats = FrontEndStats::default();
    }

    fn next_value(&mut self) -> Option<RawSample> {
        if self.stall_forever {
            return None;
        }
        if self.stall_next > 0 {
            self.stall_next -= 1;
            return None;
        }
        self.script.pop_front().or(self.level)
    }
}

impl Default for ScriptedFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogFrontEnd for ScriptedFrontEnd {
    fn enable(&mut self) {
        self.stats.enables = self.stats.enables.wrapping_add(1);
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.stats.disables = self.stats.disables.wrapping_add(1);
        self.enabled = false;
        self.pending = None;
    }

    fn start_conversion(&mut self) {
        self.stats.conversions = self.stats.conversions.wrapping_add(1);
        if !self.enabled {
            self.stats.conversions_while_disabled =
                self.stats.conversions_while_disabled.wrapping_add(1);
            self.pending = None;
            return;
        }

        self.pending = Some(PendingConversion {
            value: self.next_value(),
            polls_left: self.ready_latency,
        });
    }

    fn is_result_ready(&mut self) -> bool {
        self.stats.polls = self.stats.polls.wrapping_add(1);
        match self.pending.as_mut() {
            Some(PendingConversion {
                value: Some(_),
                polls_left,
            }) => {
                if *polls_left == 0 {
                    true
                } else {
                    *polls_left -= 1;
                    false
                }
            }
            _ => false,
        }
    }

    fn read_result(&mut self) -> RawSample {
        self.stats.reads = self.stats.reads.wrapping_add(1);
        match self.pending {
            Some(PendingConversion {
                value: Some(value),
                polls_left: 0,
            }) => {
                self.pending = None;
                value
            }
            _ => {
                self.stats.premature_reads = self.stats.premature_reads.wrapping_add(1);
                0
            }
        }
    }
}

impl PeripheralBootstrap for ScriptedFrontEnd {
    type Error = Infallible;

    fn initialize(&mut self, plan: &BootstrapPlan) -> Result<(), Self::Error> {
        self.stats.initializations = self.stats.initializations.wrapping_add(1);
        self.plan = Some(*plan);
        self.pending = None;
        Ok(())
    }
}
