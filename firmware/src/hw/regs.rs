//! EFR32xG21 register map and field encoders for the IADC single path.
//!
//! Everything here is plain arithmetic over a [`BootstrapPlan`] so the words
//! written at bring-up can be checked on the host. Only [`super::iadc`] touches
//! memory.

use sampler_core::bootstrap::{
    AnalogBus, BootstrapPlan, ConversionMode, NegativeInput, Port, PortPin, PositiveInput,
    Reference, WarmupMode,
};
use sampler_core::frontend::RawSample;

pub const IADC0_BASE: usize = 0x5000_4000;
pub const CMU_BASE: usize = 0x5000_8000;
pub const GPIO_BASE: usize = 0x5003_C000;

/// Offset of the bit-set alias of a peripheral.
pub const SET_ALIAS: usize = 0x1000;
/// Offset of the bit-clear alias of a peripheral.
pub const CLR_ALIAS: usize = 0x2000;

pub const IADC_EN: usize = 0x004;
pub const IADC_CTRL: usize = 0x008;
pub const IADC_CMD: usize = 0x00C;
pub const IADC_STATUS: usize = 0x014;
pub const IADC_CFG0: usize = 0x048;
pub const IADC_SCHED0: usize = 0x050;
pub const IADC_SINGLEFIFODATA: usize = 0x074;
pub const IADC_SINGLE: usize = 0x098;

pub const CMU_IADCCLKCTRL: usize = 0x100;
pub const GPIO_ABUSALLOC: usize = 0x320;
pub const GPIO_BBUSALLOC: usize = 0x324;
pub const GPIO_CDBUSALLOC: usize = 0x328;

pub const EN_EN: u32 = 1 << 0;
pub const CMD_SINGLESTART: u32 = 1 << 0;
pub const STATUS_CONVERTING: u32 = 1 << 6;
pub const STATUS_SINGLEFIFODV: u32 = 1 << 8;

/// `CMU_IADCCLKCTRL.CLKSEL` value selecting FSRCO.
pub const IADCCLK_SEL_FSRCO: u32 = 2;

const CTRL_WARMUPMODE_SHIFT: u32 = 4;
const CTRL_TIMEBASE_SHIFT: u32 = 16;
const CTRL_TIMEBASE_MASK: u32 = 0x7F;
const CTRL_HSCLKRATE_SHIFT: u32 = 28;
const CTRL_HSCLKRATE_MASK: u32 = 0x7;

const CFG0_ADCMODE_NORMAL: u32 = 0;
const CFG0_ADCMODE_HIGHACCURACY: u32 = 2;
const CFG0_ANALOGGAIN_1X: u32 = 1 << 12;
const CFG0_REFSEL_SHIFT: u32 = 16;

const SCHED_PRESCALE_MASK: u32 = 0x3FF;

const SINGLE_PORTNEG_SHIFT: u32 = 4;
const SINGLE_PINPOS_SHIFT: u32 = 8;
const SINGLE_PORTPOS_SHIFT: u32 = 12;
const INPUT_PORT_GND: u32 = 0;
const INPUT_PORT_SUPPLY: u32 = 1;
const INPUT_PORT_A: u32 = 8;
const SUPPLY_PIN_AVDD: u32 = 0;
const SUPPLY_PIN_VDDIO: u32 = 1;

const BUSALLOC_EVEN0_ADC0: u32 = 1 << 0;
const BUSALLOC_ODD0_ADC0: u32 = 1 << 16;

const MICROSECOND_HZ: u32 = 1_000_000;

/// `IADC_CTRL` word: warm-up policy, 1 µs timebase and high-speed clock divider.
pub fn ctrl_word(plan: &BootstrapPlan) -> u32 {
    let warmup = match plan.config.warmup {
        WarmupMode::Normal => 0,
        WarmupMode::KeepInStandby => 1,
        WarmupMode::KeepWarm => 2,
    };
    let timebase = plan.src_clock_hz.div_ceil(MICROSECOND_HZ).saturating_sub(1);

    (warmup << CTRL_WARMUPMODE_SHIFT)
        | ((timebase & CTRL_TIMEBASE_MASK) << CTRL_TIMEBASE_SHIFT)
        | ((u32::from(plan.src_prescale) & CTRL_HSCLKRATE_MASK) << CTRL_HSCLKRATE_SHIFT)
}

/// `IADC_CFG0` word: conversion mode, unity gain and reference selection.
pub fn cfg0_word(plan: &BootstrapPlan) -> u32 {
    let mode = match plan.config.mode {
        ConversionMode::Normal => CFG0_ADCMODE_NORMAL,
        ConversionMode::HighAccuracy => CFG0_ADCMODE_HIGHACCURACY,
    };
    let refsel = match plan.config.reference {
        Reference::Internal1V2 => 0,
        Reference::External { .. } => 1,
        Reference::Avdd => 2,
    };

    mode | CFG0_ANALOGGAIN_1X | (refsel << CFG0_REFSEL_SHIFT)
}

/// `IADC_SCHED0` word carrying the `CLK_ADC` prescaler.
pub fn sched0_word(plan: &BootstrapPlan) -> u32 {
    u32::from(plan.adc_prescale) & SCHED_PRESCALE_MASK
}

/// `IADC_SINGLE` word routing the differential pair.
pub fn single_word(positive: PositiveInput, negative: NegativeInput) -> u32 {
    let (port_pos, pin_pos) = match positive {
        PositiveInput::Gnd => (INPUT_PORT_GND, 0),
        PositiveInput::Avdd => (INPUT_PORT_SUPPLY, SUPPLY_PIN_AVDD),
        PositiveInput::Vddio => (INPUT_PORT_SUPPLY, SUPPLY_PIN_VDDIO),
        PositiveInput::Pin(pin) => port_pin(pin),
    };
    let (port_neg, pin_neg) = match negative {
        NegativeInput::Gnd => (INPUT_PORT_GND, 0),
        NegativeInput::Pin(pin) => port_pin(pin),
    };

    pin_neg
        | (port_neg << SINGLE_PORTNEG_SHIFT)
        | (pin_pos << SINGLE_PINPOS_SHIFT)
        | (port_pos << SINGLE_PORTPOS_SHIFT)
}

fn port_pin(pin: PortPin) -> (u32, u32) {
    let port = match pin.port {
        Port::A => INPUT_PORT_A,
        Port::B => INPUT_PORT_A + 1,
        Port::C => INPUT_PORT_A + 2,
        Port::D => INPUT_PORT_A + 3,
    };
    (port, u32::from(pin.pin & 0xF))
}

/// Bus allocation register offset and the bits that hand lanes to ADC0.
pub fn bus_allocation(plan: &BootstrapPlan) -> (usize, u32) {
    let allocation = plan.config.bus;
    let offset = match allocation.bus {
        AnalogBus::A => GPIO_ABUSALLOC,
        AnalogBus::B => GPIO_BBUSALLOC,
        AnalogBus::Cd => GPIO_CDBUSALLOC,
    };

    let mut bits = 0;
    if allocation.even_to_adc0 {
        bits |= BUSALLOC_EVEN0_ADC0;
    }
    if allocation.odd_to_adc0 {
        bits |= BUSALLOC_ODD0_ADC0;
    }
    (offset, bits)
}

/// A result is ready once the FIFO holds data and no conversion is running.
pub const fn is_ready(status: u32) -> bool {
    status & (STATUS_CONVERTING | STATUS_SINGLEFIFODV) == STATUS_SINGLEFIFODV
}

/// Sign-extends the 12-bit two's-complement result in a FIFO word.
#[allow(clippy::cast_possible_wrap)]
pub const fn sign_extend_12(fifo: u32) -> RawSample {
    ((fifo << 20) as i32) >> 20
}
