use core::time::Duration;

use sampler_core::bootstrap::{BootstrapConfig, bootstrap};
use sampler_core::frontend::{RawSample, ScriptedFrontEnd};
use sampler_core::sampler::{AcquireError, PollPolicy, Sampler, SamplerConfig};

fn build_sampler(script: &[RawSample], config: SamplerConfig) -> Sampler<ScriptedFrontEnd> {
    let front_end = ScriptedFrontEnd::with_script(script).expect("script should fit");
    let ready = bootstrap(front_end, &BootstrapConfig::default()).expect("bootstrap should pass");
    let mut sampler = Sampler::new(ready, config);
    sampler.front_end_mut().reset_stats();
    sampler
}

#[test]
fn constant_input_of_one_hundred_reads_117() {
    let mut sampler = build_sampler(&[100; 9], SamplerConfig::default());

    assert_eq!(sampler.acquire_filtered_sample(), Ok(117));
}

#[test]
fn outliers_are_trimmed_before_scaling() {
    let mut sampler = build_sampler(
        &[0, 0, 0, 0, 4_095, 2_000, 2_000, 2_000, 2_000],
        SamplerConfig::default(),
    );

    let reading = sampler.acquire().expect("reading should complete");
    assert_eq!(reading.filter.filtered_code, 2_000);
    assert_eq!(reading.output, 2_344);
    assert_eq!(
        reading.burst.participating(&sampler.config().filter),
        &[0, 4_095, 2_000, 2_000, 2_000, 2_000]
    );
}

#[test]
fn warmup_samples_do_not_change_the_result() {
    let tail = [812, 809, 815, 790, 833, 811];
    let mut quiet = [0; 9];
    let mut loud = [4_095; 9];
    quiet[3..].copy_from_slice(&tail);
    loud[3..].copy_from_slice(&tail);

    let mut first = build_sampler(&quiet, SamplerConfig::default());
    let mut second = build_sampler(&loud, SamplerConfig::default());

    assert_eq!(
        first.acquire_filtered_sample(),
        second.acquire_filtered_sample()
    );
}

#[test]
fn repeated_calls_on_identical_input_agree() {
    let mut script = [0; 18];
    script[..9].copy_from_slice(&[5, 6, 7, 1_000, 1_001, 999, 1_003, 998, 1_000]);
    script[9..].copy_from_slice(&[9, 8, 7, 1_000, 1_001, 999, 1_003, 998, 1_000]);
    let mut sampler = build_sampler(&script, SamplerConfig::default());

    let first = sampler.acquire_filtered_sample().expect("first reading");
    let second = sampler.acquire_filtered_sample().expect("second reading");
    assert_eq!(first, second);
    assert_eq!(sampler.front_end().samples_remaining(), 0);
}

#[test]
fn every_acquisition_follows_the_power_protocol() {
    let mut sampler = build_sampler(&[], SamplerConfig::default());
    sampler.front_end_mut().set_level(Some(1_234));
    sampler.front_end_mut().set_ready_latency(3);

    for _ in 0..4 {
        sampler.acquire().expect("reading should complete");
        assert!(!sampler.front_end().is_enabled());
    }

    let stats = sampler.front_end().stats();
    assert_eq!(stats.enables, 4);
    assert_eq!(stats.disables, 4);
    assert_eq!(stats.conversions, 36);
    assert_eq!(stats.reads, 36);
    assert_eq!(stats.polls, 36 * 4);
    assert_eq!(stats.premature_reads, 0);
    assert_eq!(stats.conversions_while_disabled, 0);
}

#[test]
fn stalled_front_end_times_out_and_is_powered_down() {
    let policy = PollPolicy::new(50, Duration::ZERO, 1);
    let mut sampler = build_sampler(&[], SamplerConfig::default().with_poll(policy));
    sampler.front_end_mut().set_level(Some(10));
    sampler.front_end_mut().stall_forever();

    let err = sampler.acquire().expect_err("stall should time out");
    assert_eq!(
        err,
        AcquireError::ConversionTimeout {
            sample_index: 0,
            polls: 100,
            attempts: 2,
        }
    );

    let stats = sampler.front_end().stats();
    assert!(!sampler.front_end().is_enabled());
    assert_eq!(stats.enables, 1);
    assert_eq!(stats.disables, 1);
    assert_eq!(stats.reads, 0);
}

#[test]
fn retry_recovers_from_a_single_lost_conversion() {
    let policy = PollPolicy::new(20, Duration::ZERO, 1);
    let mut sampler = build_sampler(&[], SamplerConfig::default().with_poll(policy));
    sampler.front_end_mut().set_level(Some(2_000));
    sampler.front_end_mut().stall_conversions(1);

    let reading = sampler.acquire().expect("retry should recover");
    assert_eq!(reading.output, 2_344);
    assert_eq!(reading.retries, 1);
    assert_eq!(reading.polls, 20 + 9);
    assert_eq!(sampler.front_end().stats().conversions, 10);
}

#[test]
fn sampler_recovers_after_stall_is_cleared() {
    let policy = PollPolicy::new(5, Duration::ZERO, 0);
    let mut sampler = build_sampler(&[], SamplerConfig::default().with_poll(policy));
    sampler.front_end_mut().set_level(Some(100));
    sampler.front_end_mut().stall_forever();

    assert!(matches!(
        sampler.acquire_filtered_sample(),
        Err(AcquireError::ConversionTimeout { .. })
    ));

    sampler.front_end_mut().resume();
    assert_eq!(sampler.acquire_filtered_sample(), Ok(117));
}

#[test]
fn negative_filtered_code_saturates_to_zero() {
    let mut sampler = build_sampler(&[-100; 9], SamplerConfig::default());

    let reading = sampler.acquire().expect("reading should complete");
    assert_eq!(reading.millivolts, -117);
    assert_eq!(reading.output, 0);
}
