//! Memory-mapped IADC0 adapter.

#![cfg(target_os = "none")]

use core::convert::Infallible;
use core::ptr;

use sampler_core::bootstrap::{BootstrapPlan, PeripheralBootstrap};
use sampler_core::frontend::{AnalogFrontEnd, RawSample};

use super::regs::{
    self, CLR_ALIAS, CMD_SINGLESTART, CMU_BASE, CMU_IADCCLKCTRL, EN_EN, GPIO_BASE, IADC_CFG0,
    IADC_CMD, IADC_CTRL, IADC_EN, IADC_SCHED0, IADC_SINGLE, IADC_SINGLEFIFODATA, IADC_STATUS,
    IADC0_BASE, IADCCLK_SEL_FSRCO, SET_ALIAS,
};

/// Exclusive handle to IADC0 and the clock and bus registers it depends on.
pub struct Iadc {
    _private: (),
}

impl Iadc {
    /// Claims the peripheral.
    ///
    /// # Safety
    ///
    /// Nothing else may touch IADC0, `CMU_IADCCLKCTRL` or the GPIO bus
    /// allocation registers while the handle exists.
    pub unsafe fn steal() -> Self {
        Self { _private: () }
    }

    fn write(address: usize, value: u32) {
        // Addresses come from the register map and are valid MMIO words.
        unsafe { ptr::write_volatile(address as *mut u32, value) }
    }

    fn read(address: usize) -> u32 {
        unsafe { ptr::read_volatile(address as *const u32) }
    }
}

impl AnalogFrontEnd for Iadc {
    fn enable(&mut self) {
        Self::write(IADC0_BASE + SET_ALIAS + IADC_EN, EN_EN);
    }

    fn disable(&mut self) {
        Self::write(IADC0_BASE + CLR_ALIAS + IADC_EN, EN_EN);
    }

    fn start_conversion(&mut self) {
        Self::write(IADC0_BASE + IADC_CMD, CMD_SINGLESTART);
    }

    fn is_result_ready(&mut self) -> bool {
        regs::is_ready(Self::read(IADC0_BASE + IADC_STATUS))
    }

    fn read_result(&mut self) -> RawSample {
        regs::sign_extend_12(Self::read(IADC0_BASE + IADC_SINGLEFIFODATA))
    }
}

impl PeripheralBootstrap for Iadc {
    type Error = Infallible;

    fn initialize(&mut self, plan: &BootstrapPlan) -> Result<(), Self::Error> {
        Self::write(CMU_BASE + CMU_IADCCLKCTRL, IADCCLK_SEL_FSRCO);

        self.disable();
        Self::write(IADC0_BASE + IADC_CTRL, regs::ctrl_word(plan));
        Self::write(IADC0_BASE + IADC_CFG0, regs::cfg0_word(plan));
        Self::write(IADC0_BASE + IADC_SCHED0, regs::sched0_word(plan));
        Self::write(
            IADC0_BASE + IADC_SINGLE,
            regs::single_word(plan.config.positive, plan.config.negative),
        );

        let (offset, bits) = regs::bus_allocation(plan);
        Self::write(GPIO_BASE + SET_ALIAS + offset, bits);
        Ok(())
    }
}
