use cortex_m::interrupt;
use cortex_m::peripheral::Peripherals;
use cortex_m::register::primask;
use cortex_m_rt::entry;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use sampler_core::bootstrap::{BootstrapConfig, bootstrap};
use sampler_core::sampler::{Sampler, SamplerConfig};
use sampler_core::telemetry::ReadingLog;

use crate::clock::{CORE_CLOCK_HZ, FirmwareInstant};
use crate::hw::iadc::Iadc;
use crate::logging;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Gap between readings, in core clock cycles.
const READING_PERIOD_CYCLES: u32 = CORE_CLOCK_HZ / 2;

#[entry]
fn main() -> ! {
    let Some(mut core) = Peripherals::take() else {
        defmt::error!("runtime: core peripherals already taken");
        halt();
    };
    core.DCB.enable_trace();
    core.DWT.enable_cycle_counter();

    // SAFETY: the IADC and its clock and bus registers are only touched here.
    let iadc = unsafe { Iadc::steal() };
    let ready = match bootstrap(iadc, &BootstrapConfig::default()) {
        Ok(ready) => ready,
        Err(failure) => {
            logging::log_bootstrap_failure(&failure);
            halt();
        }
    };
    logging::log_plan(ready.plan());

    let mut sampler = Sampler::new(ready, SamplerConfig::default());
    let mut history: ReadingLog<FirmwareInstant> = ReadingLog::new();
    let mut sequence: u32 = 0;

    loop {
        sequence = sequence.wrapping_add(1);
        let started_at = FirmwareInstant::now();
        let outcome = sampler.acquire();
        history.record_acquisition(&outcome, started_at, FirmwareInstant::now());
        logging::log_outcome(sequence, &outcome);

        if let Some(latest) = history.latest_reading()
            && let Some(elapsed) = latest.elapsed_since_previous
        {
            defmt::debug!(
                "runtime: {} readings, {} failures, {}us since previous",
                history.readings(),
                history.failures(),
                elapsed.as_micros()
            );
        }

        cortex_m::asm::delay(READING_PERIOD_CYCLES);
    }
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
