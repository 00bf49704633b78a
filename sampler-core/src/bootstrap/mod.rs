//! One-time IADC bring-up shared by firmware and host targets.
//!
//! Bring-up configures the clock tree, the reference, the differential input
//! routing and the analog bus allocation, then leaves the front end powered
//! down. The register writes themselves belong to the platform; this module
//! owns the configuration data, the prescaler arithmetic, and the
//! [`Bootstrapped`] token that proves bring-up ran before a sampler is built.

use core::fmt;

use crate::frontend::AnalogFrontEnd;

/// Frequency of the free-running oscillator feeding `CLK_SRC_ADC`.
pub const FSRCO_HZ: u32 = 20_000_000;
/// Target frequency for `CLK_SRC_ADC` after the high-speed prescaler.
pub const DEFAULT_SRC_CLOCK_HZ: u32 = 10_000_000;
/// Target frequency for `CLK_ADC`.
pub const DEFAULT_ADC_CLOCK_HZ: u32 = 10_000_000;
/// Largest value accepted by the high-speed clock prescaler field.
pub const MAX_SRC_CLK_PRESCALE: u8 = 3;
/// Largest value accepted by the ADC clock prescaler field.
pub const MAX_ADC_CLK_PRESCALE: u16 = 1023;
/// `CLK_ADC` ceiling in normal conversion mode.
pub const NORMAL_MODE_MAX_ADC_CLOCK_HZ: u32 = 10_000_000;
/// `CLK_ADC` ceiling in high-accuracy conversion mode.
pub const HIGH_ACCURACY_MAX_ADC_CLOCK_HZ: u32 = 5_000_000;

/// Voltage reference selection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Reference {
    /// Internal 1.2 V bandgap.
    Internal1V2,
    /// Unbuffered analog supply.
    Avdd,
    /// External reference pin with the supplied level.
    External { millivolts: u16 },
}

impl Reference {
    /// Reference level in millivolts, assuming a 3.3 V analog supply for [`Reference::Avdd`].
    pub const fn millivolts(self) -> u16 {
        match self {
            Reference::Internal1V2 => 1_200,
            Reference::Avdd => 3_300,
            Reference::External { millivolts } => millivolts,
        }
    }
}

/// Analog conversion mode, which bounds the permitted `CLK_ADC` frequency.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConversionMode {
    Normal,
    HighAccuracy,
}

impl ConversionMode {
    /// Highest `CLK_ADC` frequency the mode tolerates.
    pub const fn max_adc_clock_hz(self) -> u32 {
        match self {
            ConversionMode::Normal => NORMAL_MODE_MAX_ADC_CLOCK_HZ,
            ConversionMode::HighAccuracy => HIGH_ACCURACY_MAX_ADC_CLOCK_HZ,
        }
    }
}

/// Warm-up policy applied between conversions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WarmupMode {
    /// Power down after every conversion.
    Normal,
    /// Keep the reference in standby between conversions.
    KeepInStandby,
    /// Keep the whole front end warm while enabled.
    KeepWarm,
}

/// GPIO port that can be routed onto an analog bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Port {
    A,
    B,
    C,
    D,
}

/// Physical pin routed to one side of the differential pair.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PortPin {
    pub port: Port,
    pub pin: u8,
}

impl PortPin {
    pub const fn new(port: Port, pin: u8) -> Self {
        Self { port, pin }
    }
}

/// Source for the positive converter input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PositiveInput {
    Gnd,
    /// Analog supply divided by four.
    Avdd,
    /// I/O supply divided by four.
    Vddio,
    Pin(PortPin),
}

/// Source for the negative converter input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NegativeInput {
    Gnd,
    Pin(PortPin),
}

/// Analog bus that carries the converter inputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AnalogBus {
    A,
    B,
    Cd,
}

/// Ownership of the even/odd bus lanes by ADC0.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BusAllocation {
    pub bus: AnalogBus,
    pub even_to_adc0: bool,
    pub odd_to_adc0: bool,
}

impl BusAllocation {
    /// Both lanes of the CD bus handed to ADC0.
    pub const CD_ADC0: Self = Self {
        bus: AnalogBus::Cd,
        even_to_adc0: true,
        odd_to_adc0: true,
    };
}

/// Bring-up settings for the differential single-conversion path.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BootstrapConfig {
    pub source_clock_hz: u32,
    pub src_clock_target_hz: u32,
    pub adc_clock_target_hz: u32,
    pub reference: Reference,
    pub mode: ConversionMode,
    pub warmup: WarmupMode,
    pub positive: PositiveInput,
    pub negative: NegativeInput,
    pub bus: BusAllocation,
}

impl BootstrapConfig {
    /// FSRCO clocking, internal 1.2 V reference, AVDD/4 against ground on the CD bus.
    pub const DEFAULT: Self = Self {
        source_clock_hz: FSRCO_HZ,
        src_clock_target_hz: DEFAULT_SRC_CLOCK_HZ,
        adc_clock_target_hz: DEFAULT_ADC_CLOCK_HZ,
        reference: Reference::Internal1V2,
        mode: ConversionMode::Normal,
        warmup: WarmupMode::KeepWarm,
        positive: PositiveInput::Avdd,
        negative: NegativeInput::Gnd,
        bus: BusAllocation::CD_ADC0,
    };

    /// Replaces the input routing.
    #[must_use]
    pub const fn with_inputs(mut self, positive: PositiveInput, negative: NegativeInput) -> Self {
        self.positive = positive;
        self.negative = negative;
        self
    }

    /// Replaces the conversion mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replaces the reference selection.
    #[must_use]
    pub const fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = reference;
        self
    }

    /// Validates the settings and derives the prescaler values.
    pub fn resolve(&self) -> Result<BootstrapPlan, BootstrapError> {
        if matches!(
            (self.positive, self.negative),
            (PositiveInput::Gnd, NegativeInput::Gnd)
        ) {
            return Err(BootstrapError::InputRouting);
        }

        let src_prescale = src_clock_prescale(self.source_clock_hz, self.src_clock_target_hz)?;
        let src_clock_hz = divided(self.source_clock_hz, u32::from(src_prescale));
        let adc_prescale = adc_clock_prescale(src_clock_hz, self.adc_clock_target_hz, self.mode)?;
        let adc_clock_hz = divided(src_clock_hz, u32::from(adc_prescale));

        Ok(BootstrapPlan {
            config: *self,
            src_prescale,
            src_clock_hz,
            adc_prescale,
            adc_clock_hz,
        })
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Resolved bring-up values handed to the platform.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BootstrapPlan {
    pub config: BootstrapConfig,
    pub src_prescale: u8,
    pub src_clock_hz: u32,
    pub adc_prescale: u16,
    pub adc_clock_hz: u32,
}

/// Reasons a [`BootstrapConfig`] cannot be turned into a plan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootstrapError {
    ZeroFrequency,
    SourceClockTooSlow { source_hz: u32, target_hz: u32 },
    AdcClockTooFast { hz: u32, max_hz: u32 },
    InputRouting,
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::ZeroFrequency => f.write_str("clock frequency must be non-zero"),
            BootstrapError::SourceClockTooSlow {
                source_hz,
                target_hz,
            } => write!(f, "source clock {source_hz} Hz cannot reach {target_hz} Hz"),
            BootstrapError::AdcClockTooFast { hz, max_hz } => {
                write!(f, "ADC clock {hz} Hz exceeds mode limit {max_hz} Hz")
            }
            BootstrapError::InputRouting => {
                f.write_str("positive and negative inputs are both ground")
            }
        }
    }
}

/// Computes the high-speed prescaler that brings `source_hz` down to at most `target_hz`.
pub fn src_clock_prescale(source_hz: u32, target_hz: u32) -> Result<u8, BootstrapError> {
    let divider = ceil_divider(source_hz, target_hz)?;
    let prescale = divider - 1;
    Ok(u8::try_from(prescale)
        .unwrap_or(u8::MAX)
        .min(MAX_SRC_CLK_PRESCALE))
}

/// Computes the `CLK_ADC` prescaler and checks the result against the mode ceiling.
pub fn adc_clock_prescale(
    src_clock_hz: u32,
    target_hz: u32,
    mode: ConversionMode,
) -> Result<u16, BootstrapError> {
    let divider = ceil_divider(src_clock_hz, target_hz)?;
    let prescale = u16::try_from(divider - 1)
        .unwrap_or(u16::MAX)
        .min(MAX_ADC_CLK_PRESCALE);

    let hz = divided(src_clock_hz, u32::from(prescale));
    let max_hz = mode.max_adc_clock_hz();
    if hz > max_hz {
        return Err(BootstrapError::AdcClockTooFast { hz, max_hz });
    }

    Ok(prescale)
}

fn ceil_divider(source_hz: u32, target_hz: u32) -> Result<u32, BootstrapError> {
    if source_hz == 0 || target_hz == 0 {
        return Err(BootstrapError::ZeroFrequency);
    }
    if target_hz > source_hz {
        return Err(BootstrapError::SourceClockTooSlow {
            source_hz,
            target_hz,
        });
    }
    Ok(source_hz.div_ceil(target_hz))
}

const fn divided(hz: u32, prescale: u32) -> u32 {
    hz / (prescale + 1)
}

/// Platform hook that performs the register-level bring-up.
pub trait PeripheralBootstrap {
    /// Platform-specific failure.
    type Error;

    /// Applies the plan to the peripheral. Runs once per boot.
    fn initialize(&mut self, plan: &BootstrapPlan) -> Result<(), Self::Error>;
}

/// Failure reported by [`bootstrap`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootstrapFailure<E> {
    /// The configuration was rejected before touching hardware.
    Plan(BootstrapError),
    /// The platform reported an error while applying the plan.
    Peripheral(E),
}

impl<E: fmt::Debug> fmt::Display for BootstrapFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapFailure::Plan(err) => write!(f, "invalid bootstrap plan: {err}"),
            BootstrapFailure::Peripheral(err) => write!(f, "peripheral bring-up failed: {err:?}"),
        }
    }
}

/// Peripheral that has completed bring-up and sits powered down.
#[derive(Debug)]
pub struct Bootstrapped<P> {
    peripheral: P,
    plan: BootstrapPlan,
}

impl<P> Bootstrapped<P> {
    /// Returns the plan that was applied.
    pub const fn plan(&self) -> &BootstrapPlan {
        &self.plan
    }

    /// Provides access to the peripheral.
    pub const fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Consumes the token and returns the peripheral with its plan.
    pub fn into_parts(self) -> (P, BootstrapPlan) {
        (self.peripheral, self.plan)
    }
}

/// Runs the one-time bring-up and leaves the front end disabled.
pub fn bootstrap<P>(
    mut peripheral: P,
    config: &BootstrapConfig,
) -> Result<Bootstrapped<P>, BootstrapFailure<P::Error>>
where
    P: PeripheralBootstrap + AnalogFrontEnd,
{
    let plan = config.resolve().map_err(BootstrapFailure::Plan)?;
    peripheral
        .initialize(&plan)
        .map_err(BootstrapFailure::Peripheral)?;
    peripheral.disable();

    Ok(Bootstrapped { peripheral, plan })
}
