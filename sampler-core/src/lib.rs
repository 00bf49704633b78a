#![no_std]

// Shared logic for the differential IADC sampler.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Register access lives behind the `frontend` traits so the
// filtering algorithm can run against the simulated peripheral on the host.

pub mod bootstrap;
pub mod filter;
pub mod frontend;
pub mod repl;
pub mod sampler;
pub mod scale;
pub mod telemetry;
