#![allow(clippy::module_name_repetitions)]

//! Parser for the sampler REPL.
//!
//! Lines are parsed in place with `winnow` combinators over `&str`. Parsed
//! values borrow from the input line and lists land in fixed-capacity
//! buffers, so the parser works the same on `no_std` targets.

use core::fmt;

use heapless::Vec as HeaplessVec;
use winnow::ascii::{dec_int, dec_uint, space0, space1};
use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

use super::catalog::{self, CommandTag};
use crate::frontend::RawSample;

/// Most acquisitions a single `sample` command may request.
pub const MAX_SAMPLE_COUNT: u32 = 16;
/// Most raw codes a single `script` command may queue.
pub const MAX_SCRIPT_VALUES: usize = 32;

type PResult<O> = Result<O, ErrMode<ContextError>>;

/// Codes carried by a `script` command.
pub type ScriptValues = HeaplessVec<RawSample, MAX_SCRIPT_VALUES>;

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Sample { count: u8 },
    Script(ScriptValues),
    /// `None` turns the fallback level off.
    Level(Option<RawSample>),
    Noise { amplitude: u32 },
    Stall(StallCommand),
    Status,
    Help { topic: Option<&'a str> },
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallCommand {
    Forever,
    Next(u32),
    Off,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    Empty,
    UnknownCommand {
        keyword: &'a str,
    },
    Expected {
        expected: &'static str,
        found: Option<&'a str>,
    },
    OutOfRange {
        value: i64,
        min: i64,
        max: i64,
    },
    TooManyValues {
        max: usize,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::Empty => f.write_str("empty command"),
            GrammarErrorKind::UnknownCommand { keyword } => {
                write!(f, "unknown command `{keyword}`")
            }
            GrammarErrorKind::Expected {
                expected,
                found: Some(found),
            } => write!(f, "expected {expected}, found `{found}`"),
            GrammarErrorKind::Expected {
                expected,
                found: None,
            } => write!(f, "unexpected end of input, expected {expected}"),
            GrammarErrorKind::OutOfRange { value, min, max } => {
                write!(f, "{value} is outside {min}..={max}")
            }
            GrammarErrorKind::TooManyValues { max } => {
                write!(f, "at most {max} values fit in one command")
            }
        }
    }
}

/// Parse failure with the byte offset where it was detected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
    pub offset: usize,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (column {})", self.kind, self.offset + 1)
    }
}

/// Tracks the full input line so errors can report offsets.
struct Cursor<'a> {
    line: &'a str,
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, rest: line }
    }

    fn offset(&self) -> usize {
        self.line.len() - self.rest.len()
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn error(&self, kind: GrammarErrorKind<'a>) -> GrammarError<'a> {
        GrammarError {
            kind,
            offset: self.offset(),
        }
    }

    fn expected(&self, expected: &'static str) -> GrammarError<'a> {
        let found = self
            .rest
            .split(|c: char| c.is_whitespace() || c == ',')
            .find(|fragment| !fragment.is_empty());
        self.error(GrammarErrorKind::Expected { expected, found })
    }

    fn run<O>(
        &mut self,
        expected: &'static str,
        mut parser: impl FnMut(&mut &'a str) -> PResult<O>,
    ) -> Result<O, GrammarError<'a>> {
        let checkpoint = self.rest;
        parser(&mut self.rest).map_err(|_| {
            self.rest = checkpoint;
            self.expected(expected)
        })
    }

    fn skip_blank(&mut self) {
        let _ = blank(&mut self.rest);
    }

    fn keyword_is(&mut self, keyword: &str) -> bool {
        let checkpoint = self.rest;
        match word(&mut self.rest) {
            Ok(found) if found.eq_ignore_ascii_case(keyword) => true,
            _ => {
                self.rest = checkpoint;
                false
            }
        }
    }
}

fn blank(input: &mut &str) -> PResult<()> {
    space0.void().parse_next(input)
}

fn word<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_while(1.., |c: char| !c.is_whitespace() && c != ',').parse_next(input)
}

fn signed(input: &mut &str) -> PResult<i64> {
    dec_int.parse_next(input)
}

fn unsigned(input: &mut &str) -> PResult<u64> {
    dec_uint.parse_next(input)
}

fn separator(input: &mut &str) -> PResult<()> {
    alt(((space0, ',', space0).void(), space1.void())).parse_next(input)
}

/// Parse one REPL line into a command.
pub fn parse(line: &str) -> Result<Command<'_>, GrammarError<'_>> {
    let mut cursor = Cursor::new(line.trim_end());
    cursor.skip_blank();
    if cursor.is_empty() {
        return Err(cursor.error(GrammarErrorKind::Empty));
    }

    let start = cursor.offset();
    let keyword = cursor.run("command keyword", word)?;
    let spec = catalog::find(keyword).ok_or(GrammarError {
        kind: GrammarErrorKind::UnknownCommand { keyword },
        offset: start,
    })?;
    cursor.skip_blank();

    let command = match spec.tag {
        CommandTag::Sample => parse_sample(&mut cursor)?,
        CommandTag::Script => parse_script(&mut cursor)?,
        CommandTag::Level => parse_level(&mut cursor)?,
        CommandTag::Noise => {
            let amplitude = ranged_unsigned(&mut cursor, "noise amplitude", 0, u64::from(u32::MAX))?;
            Command::Noise {
                amplitude: u32::try_from(amplitude).unwrap_or(u32::MAX),
            }
        }
        CommandTag::Stall => parse_stall(&mut cursor)?,
        CommandTag::Status => Command::Status,
        CommandTag::Help => {
            let topic = opt(word).parse_next(&mut cursor.rest).unwrap_or(None);
            Command::Help { topic }
        }
        CommandTag::Exit => Command::Exit,
    };

    cursor.skip_blank();
    if cursor.is_empty() {
        Ok(command)
    } else {
        Err(cursor.expected("end of command"))
    }
}

fn parse_sample<'a>(cursor: &mut Cursor<'a>) -> Result<Command<'a>, GrammarError<'a>> {
    if cursor.is_empty() {
        return Ok(Command::Sample { count: 1 });
    }

    let count = ranged_unsigned(cursor, "sample count", 1, u64::from(MAX_SAMPLE_COUNT))?;
    Ok(Command::Sample {
        count: u8::try_from(count).unwrap_or(u8::MAX),
    })
}

fn parse_script<'a>(cursor: &mut Cursor<'a>) -> Result<Command<'a>, GrammarError<'a>> {
    let mut values = ScriptValues::new();

    loop {
        let value = ranged_signed(
            cursor,
            "raw code",
            i64::from(RawSample::MIN),
            i64::from(RawSample::MAX),
        )?;
        let offset = cursor.offset();
        let code = RawSample::try_from(value).unwrap_or_default();
        if values.push(code).is_err() {
            return Err(GrammarError {
                kind: GrammarErrorKind::TooManyValues {
                    max: MAX_SCRIPT_VALUES,
                },
                offset,
            });
        }

        if cursor.is_empty() || separator(&mut cursor.rest).is_err() {
            break;
        }
    }

    Ok(Command::Script(values))
}

fn parse_level<'a>(cursor: &mut Cursor<'a>) -> Result<Command<'a>, GrammarError<'a>> {
    if cursor.keyword_is("off") {
        return Ok(Command::Level(None));
    }

    let value = ranged_signed(
        cursor,
        "raw code or `off`",
        i64::from(RawSample::MIN),
        i64::from(RawSample::MAX),
    )?;
    Ok(Command::Level(Some(
        RawSample::try_from(value).unwrap_or(RawSample::MAX),
    )))
}

fn parse_stall<'a>(cursor: &mut Cursor<'a>) -> Result<Command<'a>, GrammarError<'a>> {
    if cursor.is_empty() || cursor.keyword_is("forever") {
        return Ok(Command::Stall(StallCommand::Forever));
    }
    if cursor.keyword_is("off") {
        return Ok(Command::Stall(StallCommand::Off));
    }

    let count = ranged_unsigned(
        cursor,
        "conversion count, `forever`, or `off`",
        1,
        u64::from(u32::MAX),
    )?;
    Ok(Command::Stall(StallCommand::Next(
        u32::try_from(count).unwrap_or(u32::MAX),
    )))
}

fn ranged_unsigned<'a>(
    cursor: &mut Cursor<'a>,
    expected: &'static str,
    min: u64,
    max: u64,
) -> Result<u64, GrammarError<'a>> {
    let offset = cursor.offset();
    let value = cursor.run(expected, unsigned)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(GrammarError {
            kind: GrammarErrorKind::OutOfRange {
                value: i64::try_from(value).unwrap_or(i64::MAX),
                min: i64::try_from(min).unwrap_or(i64::MAX),
                max: i64::try_from(max).unwrap_or(i64::MAX),
            },
            offset,
        })
    }
}

fn ranged_signed<'a>(
    cursor: &mut Cursor<'a>,
    expected: &'static str,
    min: i64,
    max: i64,
) -> Result<i64, GrammarError<'a>> {
    let offset = cursor.offset();
    let value = cursor.run(expected, signed)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(GrammarError {
            kind: GrammarErrorKind::OutOfRange { value, min, max },
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Command<'_> {
        parse(input).expect("command should parse")
    }

    #[test]
    fn sample_defaults_to_one_acquisition() {
        assert_eq!(parse_ok("sample"), Command::Sample { count: 1 });
        assert_eq!(parse_ok("  SAMPLE 4  \r\n"), Command::Sample { count: 4 });
    }

    #[test]
    fn sample_count_is_bounded() {
        let err = parse("sample 17").expect_err("count above limit");
        assert_eq!(
            err.kind,
            GrammarErrorKind::OutOfRange {
                value: 17,
                min: 1,
                max: 16
            }
        );
        assert_eq!(err.offset, 7);
        assert!(parse("sample 0").is_err());
    }

    #[test]
    fn script_accepts_commas_and_spaces() {
        match parse_ok("script 0, 4095,-12 7") {
            Command::Script(values) => assert_eq!(values.as_slice(), &[0, 4_095, -12, 7]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn script_rejects_dangling_comma() {
        let err = parse("script 1,2,").expect_err("missing value");
        assert_eq!(
            err.kind,
            GrammarErrorKind::Expected {
                expected: "raw code",
                found: None
            }
        );
    }

    #[test]
    fn script_overflow_is_reported() {
        let mut line = heapless::String::<256>::new();
        line.push_str("script").expect("fits");
        for _ in 0..=MAX_SCRIPT_VALUES {
            line.push_str(" 1").expect("fits");
        }

        let err = parse(&line).expect_err("too many values");
        assert_eq!(
            err.kind,
            GrammarErrorKind::TooManyValues {
                max: MAX_SCRIPT_VALUES
            }
        );
    }

    #[test]
    fn level_and_stall_keywords() {
        assert_eq!(parse_ok("level -250"), Command::Level(Some(-250)));
        assert_eq!(parse_ok("level OFF"), Command::Level(None));
        assert_eq!(parse_ok("stall"), Command::Stall(StallCommand::Forever));
        assert_eq!(parse_ok("stall 3"), Command::Stall(StallCommand::Next(3)));
        assert_eq!(parse_ok("stall off"), Command::Stall(StallCommand::Off));
        assert_eq!(parse_ok("noise 12"), Command::Noise { amplitude: 12 });
    }

    #[test]
    fn help_topic_and_aliases() {
        assert_eq!(
            parse_ok("help script"),
            Command::Help {
                topic: Some("script")
            }
        );
        assert_eq!(parse_ok("?"), Command::Help { topic: None });
        assert_eq!(parse_ok("quit"), Command::Exit);
    }

    #[test]
    fn unknown_and_trailing_input_are_rejected() {
        let err = parse("  reboot now").expect_err("unknown keyword");
        assert_eq!(
            err.kind,
            GrammarErrorKind::UnknownCommand { keyword: "reboot" }
        );
        assert_eq!(err.offset, 2);

        let err = parse("status now").expect_err("trailing word");
        assert_eq!(
            err.kind,
            GrammarErrorKind::Expected {
                expected: "end of command",
                found: Some("now")
            }
        );

        assert_eq!(parse("   ").map_err(|err| err.kind), Err(GrammarErrorKind::Empty));
    }

    #[test]
    fn non_numeric_argument_names_the_fragment() {
        let err = parse("noise loud").expect_err("not a number");
        assert_eq!(
            err.kind,
            GrammarErrorKind::Expected {
                expected: "noise amplitude",
                found: Some("loud")
            }
        );
    }
}
