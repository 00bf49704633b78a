//! Capability traits for the analog front end consumed by the sampler.
//!
//! The IADC register block is reduced to the five operations the sampling
//! loop needs. Firmware implements them with volatile register access while
//! host tests and the emulator use [`ScriptedFrontEnd`], so the filter logic
//! never touches hardware directly.

use core::time::Duration;

pub mod scripted;

pub use scripted::{FrontEndStats, SCRIPT_CAPACITY, ScriptedFrontEnd};

/// Raw conversion result produced by the IADC (12-bit differential, sign-extended).
pub type RawSample = i32;

/// Abstraction over the single-conversion path of the IADC.
pub trait AnalogFrontEnd {
    /// Powers the analog front end. Calling it while already enabled is a no-op.
    fn enable(&mut self);

    /// Removes power from the analog front end. Idempotent.
    fn disable(&mut self);

    /// Queues one conversion on the single-input path without waiting for it.
    fn start_conversion(&mut self);

    /// Reports whether a conversion result is waiting to be read.
    fn is_result_ready(&mut self) -> bool;

    /// Pops the pending conversion result, clearing the ready state.
    ///
    /// Callers must only invoke this after [`is_result_ready`](Self::is_result_ready)
    /// returned `true`.
    fn read_result(&mut self) -> RawSample;
}

impl<T> AnalogFrontEnd for &mut T
where
    T: AnalogFrontEnd + ?Sized,
{
    fn enable(&mut self) {
        (**self).enable();
    }

    fn disable(&mut self) {
        (**self).disable();
    }

    fn start_conversion(&mut self) {
        (**self).start_conversion();
    }

    fn is_result_ready(&mut self) -> bool {
        (**self).is_result_ready()
    }

    fn read_result(&mut self) -> RawSample {
        (**self).read_result()
    }
}

/// Back-off hook invoked between unsuccessful ready polls.
pub trait PollDelay {
    /// Waits for roughly `interval` before the next poll.
    fn pause(&mut self, interval: Duration);
}

/// Poll delay that returns immediately, giving a tight busy-wait loop.
#[derive(Copy, Clone, Debug, Default)]
pub struct BusyPoll;

impl BusyPoll {
    /// Creates a new busy-poll delay.
    pub const fn new() -> Self {
        Self
    }
}

impl PollDelay for BusyPoll {
    fn pause(&mut self, _: Duration) {}
}

impl<T> PollDelay for &mut T
where
    T: PollDelay + ?Sized,
{
    fn pause(&mut self, interval: Duration) {
        (**self).pause(interval);
    }
}
