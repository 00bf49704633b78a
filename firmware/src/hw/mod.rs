//! EFR32xG21 peripheral access for the sampler.
//!
//! [`regs`] holds the register map and the pure field encoders; [`iadc`] wraps
//! the memory-mapped IADC0 behind the `sampler-core` front-end traits.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

pub mod iadc;
pub mod regs;
