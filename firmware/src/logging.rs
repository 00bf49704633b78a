//! Log lines for bring-up and each reading.
//!
//! Target builds go out over RTT through `defmt`; host builds print the same
//! text so the formatting can be exercised off-target.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use sampler_core::bootstrap::{BootstrapFailure, BootstrapPlan};
use sampler_core::sampler::{AcquireError, Reading};

pub fn log_plan(plan: &BootstrapPlan) {
    emit_plan(
        plan.src_clock_hz,
        plan.src_prescale,
        plan.adc_clock_hz,
        plan.adc_prescale,
        plan.config.reference.millivolts(),
    );
}

pub fn log_outcome(sequence: u32, outcome: &Result<Reading, AcquireError>) {
    match outcome {
        Ok(reading) => emit_reading(
            sequence,
            reading.output,
            reading.filter.filtered_code,
            reading.polls,
            reading.retries,
        ),
        Err(AcquireError::ConversionTimeout {
            sample_index,
            polls,
            attempts,
        }) => emit_timeout(sequence, *sample_index, *polls, *attempts),
        Err(err @ AcquireError::Config(_)) => emit_acquire_error(sequence, err),
    }
}

pub fn log_bootstrap_failure<E: core::fmt::Debug>(failure: &BootstrapFailure<E>) {
    emit_bootstrap_failure(failure);
}

#[cfg(target_os = "none")]
fn emit_plan(src_hz: u32, src_prescale: u8, adc_hz: u32, adc_prescale: u16, vref_mv: u16) {
    defmt::info!(
        "iadc: CLK_SRC_ADC={}Hz (/{}) CLK_ADC={}Hz (/{}) VREF={}mV",
        src_hz,
        u16::from(src_prescale) + 1,
        adc_hz,
        u32::from(adc_prescale) + 1,
        vref_mv
    );
}

#[cfg(not(target_os = "none"))]
fn emit_plan(src_hz: u32, src_prescale: u8, adc_hz: u32, adc_prescale: u16, vref_mv: u16) {
    println!(
        "iadc: CLK_SRC_ADC={}Hz (/{}) CLK_ADC={}Hz (/{}) VREF={}mV",
        src_hz,
        u16::from(src_prescale) + 1,
        adc_hz,
        u32::from(adc_prescale) + 1,
        vref_mv
    );
}

#[cfg(target_os = "none")]
fn emit_reading(sequence: u32, output: u16, code: i32, polls: u32, retries: u16) {
    if retries > 0 {
        defmt::warn!(
            "reading #{}: output={} code={} polls={} retries={}",
            sequence,
            output,
            code,
            polls,
            retries
        );
    } else {
        defmt::info!(
            "reading #{}: output={} code={} polls={}",
            sequence,
            output,
            code,
            polls
        );
    }
}

#[cfg(not(target_os = "none"))]
fn emit_reading(sequence: u32, output: u16, code: i32, polls: u32, retries: u16) {
    if retries > 0 {
        println!("reading #{sequence}: output={output} code={code} polls={polls} retries={retries}");
    } else {
        println!("reading #{sequence}: output={output} code={code} polls={polls}");
    }
}

#[cfg(target_os = "none")]
fn emit_timeout(sequence: u32, sample_index: usize, polls: u32, attempts: u16) {
    defmt::error!(
        "reading #{}: conversion {} never became ready ({} polls, {} attempts)",
        sequence,
        sample_index,
        polls,
        attempts
    );
}

#[cfg(not(target_os = "none"))]
fn emit_timeout(sequence: u32, sample_index: usize, polls: u32, attempts: u16) {
    println!(
        "reading #{sequence}: conversion {sample_index} never became ready ({polls} polls, {attempts} attempts)"
    );
}

#[cfg(target_os = "none")]
fn emit_acquire_error(sequence: u32, err: &AcquireError) {
    defmt::error!("reading #{}: {}", sequence, defmt::Display2Format(err));
}

#[cfg(not(target_os = "none"))]
fn emit_acquire_error(sequence: u32, err: &AcquireError) {
    println!("reading #{sequence}: {err}");
}

#[cfg(target_os = "none")]
fn emit_bootstrap_failure<E: core::fmt::Debug>(failure: &BootstrapFailure<E>) {
    defmt::error!("iadc: {}", defmt::Display2Format(failure));
}

#[cfg(not(target_os = "none"))]
fn emit_bootstrap_failure<E: core::fmt::Debug>(failure: &BootstrapFailure<E>) {
    println!("iadc: {failure}");
}
