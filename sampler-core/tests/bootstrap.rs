use sampler_core::bootstrap::{
    BootstrapConfig, BootstrapError, BootstrapFailure, BootstrapPlan, ConversionMode,
    NegativeInput, PeripheralBootstrap, PositiveInput, Reference, bootstrap,
};
use sampler_core::frontend::{AnalogFrontEnd, RawSample, ScriptedFrontEnd};
use sampler_core::sampler::{Sampler, SamplerConfig};
use sampler_core::scale::FullScale;

/// Front end whose bring-up fails, for checking error propagation.
struct BrokenFrontEnd;

#[derive(Debug, PartialEq, Eq)]
struct ClockNotReady;

impl AnalogFrontEnd for BrokenFrontEnd {
    fn enable(&mut self) {}

    fn disable(&mut self) {}

    fn start_conversion(&mut self) {}

    fn is_result_ready(&mut self) -> bool {
        false
    }

    fn read_result(&mut self) -> RawSample {
        0
    }
}

impl PeripheralBootstrap for BrokenFrontEnd {
    type Error = ClockNotReady;

    fn initialize(&mut self, _plan: &BootstrapPlan) -> Result<(), Self::Error> {
        Err(ClockNotReady)
    }
}

#[test]
fn bootstrap_applies_plan_once_and_leaves_front_end_disabled() {
    let ready = bootstrap(ScriptedFrontEnd::new(), &BootstrapConfig::default())
        .expect("default bring-up should pass");

    let front_end = ready.peripheral();
    assert!(!front_end.is_enabled());
    assert_eq!(front_end.stats().initializations, 1);
    assert_eq!(front_end.bootstrap_plan(), Some(ready.plan()));
    assert_eq!(ready.plan().adc_clock_hz, 10_000_000);
}

#[test]
fn sampler_exposes_the_applied_plan() {
    let config = BootstrapConfig::default().with_reference(Reference::Avdd);
    let ready = bootstrap(ScriptedFrontEnd::new(), &config).expect("bring-up should pass");
    let sampler = Sampler::new(
        ready,
        SamplerConfig::default().with_scale(FullScale::AVDD_DIFFERENTIAL),
    );

    assert_eq!(sampler.plan().config.reference, Reference::Avdd);
    assert_eq!(sampler.config().scale, FullScale::AVDD_DIFFERENTIAL);
}

#[test]
fn invalid_plan_never_reaches_the_peripheral() {
    let config = BootstrapConfig::default().with_inputs(PositiveInput::Gnd, NegativeInput::Gnd);

    match bootstrap(ScriptedFrontEnd::new(), &config) {
        Err(BootstrapFailure::Plan(BootstrapError::InputRouting)) => {}
        Err(other) => panic!("unexpected failure: {other:?}"),
        Ok(_) => panic!("grounded inputs should be rejected"),
    }
}

#[test]
fn high_accuracy_mode_needs_a_slower_adc_clock() {
    let config = BootstrapConfig {
        adc_clock_target_hz: 5_000_000,
        ..BootstrapConfig::default().with_mode(ConversionMode::HighAccuracy)
    };

    let plan = config.resolve().expect("5 MHz fits high-accuracy mode");
    assert_eq!(plan.adc_prescale, 1);
    assert_eq!(plan.adc_clock_hz, 5_000_000);
}

#[test]
fn peripheral_errors_are_reported() {
    let result = bootstrap(BrokenFrontEnd, &BootstrapConfig::default());

    match result {
        Err(BootstrapFailure::Peripheral(err)) => assert_eq!(err, ClockNotReady),
        Err(other) => panic!("unexpected failure: {other:?}"),
        Ok(_) => panic!("bring-up should fail"),
    }
}
