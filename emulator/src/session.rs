use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use sampler_core::bootstrap::{BootstrapConfig, BootstrapPlan, bootstrap};
use sampler_core::filter::FilterConfig;
use sampler_core::frontend::{RawSample, ScriptedFrontEnd};
use sampler_core::repl::catalog::{self, COMMANDS};
use sampler_core::repl::{Command, StallCommand, parse};
use sampler_core::sampler::{AcquireError, PollPolicy, Reading, Sampler, SamplerConfig};
use sampler_core::telemetry::{ReadingLog, TelemetryInstant, TelemetryPayload};

/// Input level, in raw codes, used by every profile until changed.
const DEFAULT_LEVEL: RawSample = 1_000;
const SPIKY_NOISE: u32 = 6;
/// Ready polls allowed per conversion before the emulator reports a timeout.
const EMULATOR_MAX_POLLS: u32 = 10_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    /// Clean input at the default level.
    Steady,
    /// Noisy input with one spike and one dip in every burst.
    Spiky,
    /// Front end whose ready flag never asserts.
    Stuck,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Steady => "transcripts/emulator-steady.log",
            TranscriptProfile::Spiky => "transcripts/emulator-spiky.log",
            TranscriptProfile::Stuck => "transcripts/emulator-stuck.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Steady => "IADC sampler emulator steady-input transcript",
            TranscriptProfile::Spiky => "IADC sampler emulator spiky-input transcript",
            TranscriptProfile::Stuck => "IADC sampler emulator stuck-converter transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("steady") {
            Ok(Self::Steady)
        } else if tag.eq_ignore_ascii_case("spiky") {
            Ok(Self::Spiky)
        } else if tag.eq_ignore_ascii_case("stuck") {
            Ok(Self::Stuck)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }
}

/// Host clock adapter for the reading log.
#[derive(Clone, Copy, Debug)]
struct HostInstant(Instant);

impl HostInstant {
    fn now() -> Self {
        Self(Instant::now())
    }
}

impl TelemetryInstant for HostInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

/// Linear congruential generator; reproducible noise between runs.
struct NoiseSource {
    state: u32,
}

impl NoiseSource {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns an offset in `-amplitude..=amplitude`.
    fn offset(&mut self, amplitude: u32) -> RawSample {
        if amplitude == 0 {
            return 0;
        }
        self.state = self
            .state
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345);
        let span = u64::from(amplitude) * 2 + 1;
        let draw = u64::from(self.state >> 8) % span;
        let offset = i64::try_from(draw).unwrap_or(0) - i64::from(amplitude);
        RawSample::try_from(offset).unwrap_or(0)
    }
}

pub struct Session {
    sampler: Sampler<ScriptedFrontEnd>,
    log: ReadingLog<HostInstant>,
    transcript: TranscriptLogger,
    noise: NoiseSource,
    noise_amplitude: u32,
    spikes: bool,
    started_at: Instant,
    readings: usize,
}

impl Session {
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let transcript = TranscriptLogger::to_file(profile)?;
        Self::with_transcript(profile, transcript)
    }

    /// Creates a session that discards its transcript.
    #[cfg(test)]
    pub fn in_memory(profile: TranscriptProfile) -> io::Result<Self> {
        Self::with_transcript(profile, TranscriptLogger::discard())
    }

    fn with_transcript(profile: TranscriptProfile, transcript: TranscriptLogger) -> io::Result<Self> {
        let mut front_end = ScriptedFrontEnd::new();
        front_end.set_level(Some(DEFAULT_LEVEL));
        if profile == TranscriptProfile::Stuck {
            front_end.stall_forever();
        }

        let ready = bootstrap(front_end, &BootstrapConfig::default())
            .map_err(|err| io::Error::other(err.to_string()))?;
        let config = SamplerConfig::default().with_poll(PollPolicy::new(
            EMULATOR_MAX_POLLS,
            Duration::ZERO,
            PollPolicy::DEFAULT.conversion_retries(),
        ));

        let (noise_amplitude, spikes) = match profile {
            TranscriptProfile::Spiky => (SPIKY_NOISE, true),
            TranscriptProfile::Steady | TranscriptProfile::Stuck => (0, false),
        };

        Ok(Self {
            sampler: Sampler::new(ready, config),
            log: ReadingLog::new(),
            transcript,
            noise: NoiseSource::new(0x5EED),
            noise_amplitude,
            spikes,
            started_at: Instant::now(),
            readings: 0,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::Host, trimmed)?;

        let lines = match parse(trimmed) {
            Ok(Command::Sample { count }) => self.handle_sample(count),
            Ok(Command::Script(values)) => self.handle_script(&values),
            Ok(Command::Level(level)) => {
                self.sampler.front_end_mut().set_level(level);
                match level {
                    Some(code) => vec![format!("OK level {code}")],
                    None => vec!["OK level off (unscripted conversions will hang)".to_string()],
                }
            }
            Ok(Command::Noise { amplitude }) => {
                self.noise_amplitude = amplitude;
                vec![format!("OK noise +/-{amplitude}")]
            }
            Ok(Command::Stall(stall)) => self.handle_stall(stall),
            Ok(Command::Status) => self.handle_status(),
            Ok(Command::Help { topic }) => help_lines(topic),
            Ok(Command::Exit) => vec!["Session closed.".to_string()],
            Err(err) => vec![format!("ERR syntax {err}")],
        };

        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    /// Returns `true` when `line` asks the session to end.
    pub fn should_terminate(line: &str) -> bool {
        matches!(parse(line), Ok(Command::Exit))
    }

    fn handle_sample(&mut self, count: u8) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..count {
            if let Err(line) = self.prepare_burst() {
                lines.push(line);
                break;
            }

            let started_at = HostInstant::now();
            let outcome = self.sampler.acquire();
            self.log
                .record_acquisition(&outcome, started_at, HostInstant::now());
            self.readings += 1;
            lines.push(match &outcome {
                Ok(reading) => describe_reading(self.readings, reading),
                Err(err) => describe_failure(self.readings, err),
            });
        }
        lines
    }

    /// Queues a synthetic burst when noise or spikes are active.
    fn prepare_burst(&mut self) -> Result<(), String> {
        if self.noise_amplitude == 0 && !self.spikes {
            return Ok(());
        }
        let front_end = self.sampler.front_end();
        let Some(level) = front_end.level() else {
            return Ok(());
        };
        if front_end.samples_remaining() > 0 {
            return Ok(());
        }

        let filter = self.sampler.config().filter;
        let mut burst = Vec::with_capacity(filter.burst_len());
        for index in 0..filter.burst_len() {
            burst.push(level.saturating_add(self.noise.offset(self.noise_amplitude)));
            if self.spikes && index == filter.warmup() + 1 {
                burst[index] = 4_095;
            }
            if self.spikes && index + 1 == filter.burst_len() {
                burst[index] = 0;
            }
        }

        self.sampler
            .front_end_mut()
            .push_samples(&burst)
            .map_err(|full| format!("ERR script full after {} samples", full.accepted))
    }

    fn handle_script(&mut self, values: &[RawSample]) -> Vec<String> {
        match self.sampler.front_end_mut().push_samples(values) {
            Ok(()) => vec![format!(
                "OK script queued={} pending={}",
                values.len(),
                self.sampler.front_end().samples_remaining()
            )],
            Err(full) => vec![format!(
                "ERR script full: accepted {} of {}",
                full.accepted,
                values.len()
            )],
        }
    }

    fn handle_stall(&mut self, stall: StallCommand) -> Vec<String> {
        let front_end = self.sampler.front_end_mut();
        match stall {
            StallCommand::Forever => {
                front_end.stall_forever();
                vec!["OK stall forever".to_string()]
            }
            StallCommand::Next(count) => {
                front_end.stall_conversions(count);
                vec![format!("OK stall next={count}")]
            }
            StallCommand::Off => {
                front_end.resume();
                vec!["OK stall off".to_string()]
            }
        }
    }

    fn handle_status(&self) -> Vec<String> {
        let config = self.sampler.config();
        let front_end = self.sampler.front_end();
        let stats = front_end.stats();
        let mut lines = vec![
            describe_filter(&config.filter),
            format!(
                "scale span={}V codes={} poll max={} retries={}",
                config.scale.span_volts(),
                config.scale.code_span(),
                config.poll.max_polls(),
                config.poll.conversion_retries()
            ),
            describe_plan(self.sampler.plan()),
            format!(
                "front-end enabled={} level={} noise=+/-{} spikes={} stalled={} pending={}",
                front_end.is_enabled(),
                front_end
                    .level()
                    .map_or_else(|| "off".to_string(), |code| code.to_string()),
                self.noise_amplitude,
                self.spikes,
                front_end.is_stalled(),
                front_end.samples_remaining()
            ),
            format!(
                "counters enables={} disables={} conversions={} polls={} reads={}",
                stats.enables, stats.disables, stats.conversions, stats.polls, stats.reads
            ),
            format!(
                "log readings={} failures={} retained={}",
                self.log.readings(),
                self.log.failures(),
                self.log.len()
            ),
        ];

        match self.log.latest() {
            Some(record) => {
                let detail = match record.details {
                    TelemetryPayload::Reading(reading) => format!(
                        "output={} mV={} code={}",
                        reading.output, reading.millivolts, reading.filtered_code
                    ),
                    TelemetryPayload::Timeout(timeout) => format!(
                        "sample={} polls={} attempts={}",
                        timeout.sample_index, timeout.polls, timeout.attempts
                    ),
                    _ => String::new(),
                };
                lines.push(format!("last #{} {} {detail}", record.id, record.event));
            }
            None => lines.push("last none".to_string()),
        }

        if let Some(record) = self
            .log
            .oldest_first()
            .rfind(|record| record.event.is_failure())
        {
            lines.push(format!("last-failure #{} {}", record.id, record.event));
        }

        lines
    }

    fn record_output(&mut self, elapsed: Duration, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn describe_reading(index: usize, reading: &Reading) -> String {
    format!(
        "OK reading #{index} output={} mV={} volts={:.4} code={} trimmed-sum={} polls={} retries={}",
        reading.output,
        reading.millivolts,
        reading.volts,
        reading.filter.filtered_code,
        reading.filter.trimmed_sum,
        reading.polls,
        reading.retries
    )
}

fn describe_failure(index: usize, error: &AcquireError) -> String {
    match error {
        AcquireError::ConversionTimeout {
            sample_index,
            polls,
            attempts,
        } => format!(
            "ERR reading #{index} timeout sample={sample_index} polls={polls} attempts={attempts}"
        ),
        AcquireError::Config(err) => format!("ERR reading #{index} config {err}"),
    }
}

fn describe_filter(filter: &FilterConfig) -> String {
    format!(
        "filter burst={} warmup={} participating={} divisor={}",
        filter.burst_len(),
        filter.warmup(),
        filter.participating(),
        filter.divisor()
    )
}

fn describe_plan(plan: &BootstrapPlan) -> String {
    format!(
        "bootstrap src-clk={}Hz (prescale {}) adc-clk={}Hz (prescale {}) ref={:?} ({} mV) warmup={:?}",
        plan.src_clock_hz,
        plan.src_prescale,
        plan.adc_clock_hz,
        plan.adc_prescale,
        plan.config.reference,
        plan.config.reference.millivolts(),
        plan.config.warmup
    )
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some(spec) = catalog::find(target) {
                lines.push(format!("{:<28} - {}", spec.usage, spec.summary));
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for spec in COMMANDS {
                lines.push(format!("  {:<28} - {}", spec.usage, spec.summary));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    COMMANDS
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

struct TranscriptLogger {
    writer: BufWriter<Box<dyn Write>>,
}

impl TranscriptLogger {
    fn to_file(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(Box::new(file)),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    #[cfg(test)]
    fn discard() -> Self {
        Self {
            writer: BufWriter::new(Box::new(io::sink())),
        }
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(profile: TranscriptProfile) -> Session {
        Session::in_memory(profile).expect("session should start")
    }

    #[test]
    fn steady_profile_reads_default_level() {
        let mut session = session(TranscriptProfile::Steady);
        let lines = session.handle_command("sample 2").expect("command runs");

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("OK reading #1 output=1172 mV=1172"), "{}", lines[0]);
        assert!(lines[1].starts_with("OK reading #2 output=1172"), "{}", lines[1]);
    }

    #[test]
    fn spiky_profile_trims_spike_and_dip() {
        let mut session = session(TranscriptProfile::Spiky);
        session.handle_command("noise 0").expect("command runs");

        let lines = session.handle_command("sample").expect("command runs");
        assert!(lines[0].contains(" code=1000 "), "{}", lines[0]);
    }

    #[test]
    fn stuck_profile_reports_timeout_and_recovers() {
        let mut session = session(TranscriptProfile::Stuck);

        let lines = session.handle_command("sample").expect("command runs");
        assert!(lines[0].starts_with("ERR reading #1 timeout sample=0"), "{}", lines[0]);

        session.handle_command("stall off").expect("command runs");
        let lines = session.handle_command("sample").expect("command runs");
        assert!(lines[0].starts_with("OK reading #2 output=1172"), "{}", lines[0]);

        let status = session.handle_command("status").expect("command runs");
        assert!(status.iter().any(|line| line == "log readings=1 failures=1 retained=6"));
        assert!(status.iter().any(|line| line == "last-failure #2 conversion-timeout"));
    }

    #[test]
    fn status_reports_power_events_and_reference() {
        let mut session = session(TranscriptProfile::Steady);
        session.handle_command("sample").expect("command runs");

        let status = session.handle_command("status").expect("command runs");
        assert!(status.iter().any(|line| line == "log readings=1 failures=0 retained=3"));
        assert!(status.iter().any(|line| line.starts_with("last #2 reading-complete")));
        assert!(!status.iter().any(|line| line.starts_with("last-failure")));
        assert!(status.iter().any(|line| line.contains("ref=Internal1V2 (1200 mV)")));
    }

    #[test]
    fn scripted_codes_take_priority_over_level() {
        let mut session = session(TranscriptProfile::Steady);
        session
            .handle_command("script 0,0,0,0,4095,2000,2000,2000,2000")
            .expect("command runs");

        let lines = session.handle_command("sample").expect("command runs");
        assert!(lines[0].starts_with("OK reading #1 output=2344 mV=2344"), "{}", lines[0]);
    }

    #[test]
    fn syntax_errors_are_reported_inline() {
        let mut session = session(TranscriptProfile::Steady);
        let lines = session.handle_command("sample many").expect("command runs");
        assert!(lines[0].starts_with("ERR syntax expected sample count"), "{}", lines[0]);
    }

    #[test]
    fn exit_and_quit_terminate() {
        assert!(Session::should_terminate("exit"));
        assert!(Session::should_terminate("QUIT"));
        assert!(!Session::should_terminate("status"));
    }
}
