mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{Session, TranscriptProfile};

const USAGE: &str =
    "Usage: sampler-emulator [--batch] [--profile <steady|spiky|stuck> | <steady|spiky|stuck>]";

/// Command-line options.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Options {
    profile: TranscriptProfile,
    /// Suppresses the banner and prompt so piped output only carries responses.
    batch: bool,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let mut session = Session::new(options.profile)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    run(&mut session, options, stdin.lock(), stdout.lock())
}

fn run(
    session: &mut Session,
    options: Options,
    mut reader: impl BufRead,
    mut writer: impl Write,
) -> io::Result<()> {
    if !options.batch {
        writeln!(
            writer,
            "IADC sampler emulator ({:?} input). `help` lists commands, `exit` leaves.",
            options.profile
        )?;
    }

    let mut line = String::new();
    loop {
        if !options.batch {
            write!(writer, "> ")?;
            writer.flush()?;
        }

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            if !options.batch {
                writeln!(writer)?;
            }
            return Ok(());
        }

        let command = line.trim();
        for response in session.handle_command(command)? {
            writeln!(writer, "{response}")?;
        }
        if Session::should_terminate(command) {
            return Ok(());
        }
    }
}

fn parse_options(args: impl IntoIterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        profile: TranscriptProfile::Steady,
        batch: false,
    };
    let mut profile_seen = false;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let tag = if arg == "--batch" {
            options.batch = true;
            continue;
        } else if arg == "--profile" {
            args.next()
                .ok_or_else(|| "Expected value after --profile".to_string())?
        } else if let Some(value) = arg.strip_prefix("--profile=") {
            value.to_string()
        } else if arg.starts_with("--") {
            return Err(format!("Unknown option `{arg}`"));
        } else {
            arg
        };

        if profile_seen {
            return Err("Only one profile may be selected".to_string());
        }
        options.profile = TranscriptProfile::from_tag(&tag)?;
        profile_seen = true;
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn options_accept_flag_and_bare_profile() {
        assert_eq!(
            parse_options(args(&[])),
            Ok(Options {
                profile: TranscriptProfile::Steady,
                batch: false
            })
        );
        assert_eq!(
            parse_options(args(&["--batch", "--profile=Spiky"])),
            Ok(Options {
                profile: TranscriptProfile::Spiky,
                batch: true
            })
        );
        assert_eq!(
            parse_options(args(&["stuck"])).map(|options| options.profile),
            Ok(TranscriptProfile::Stuck)
        );
    }

    #[test]
    fn options_reject_bad_input() {
        assert!(parse_options(args(&["--profile"])).is_err());
        assert!(parse_options(args(&["--verbose"])).is_err());
        assert!(parse_options(args(&["steady", "spiky"])).is_err());
        assert!(parse_options(args(&["noisy"])).is_err());
    }

    #[test]
    fn batch_run_prints_only_responses_and_stops_at_exit() {
        let options = Options {
            profile: TranscriptProfile::Steady,
            batch: true,
        };
        let mut session = Session::in_memory(options.profile).expect("session should start");
        let input = "sample\n\nexit\nsample\n";
        let mut output = Vec::new();

        run(&mut session, options, input.as_bytes(), &mut output).expect("run succeeds");

        let text = String::from_utf8(output).expect("utf-8 output");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");
        assert!(lines[0].starts_with("OK reading #1 output=1172"), "{text}");
        assert_eq!(lines[1], "Session closed.");
    }

    #[test]
    fn interactive_run_prompts_until_end_of_input() {
        let options = Options {
            profile: TranscriptProfile::Steady,
            batch: false,
        };
        let mut session = Session::in_memory(options.profile).expect("session should start");
        let mut output = Vec::new();

        run(&mut session, options, "status\n".as_bytes(), &mut output).expect("run succeeds");

        let text = String::from_utf8(output).expect("utf-8 output");
        assert!(text.starts_with("IADC sampler emulator (Steady input)."), "{text}");
        assert_eq!(text.matches("> ").count(), 2, "{text}");
    }
}
