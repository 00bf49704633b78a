//! Keyword table shared by the parser and the help command.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Sample,
    Script,
    Level,
    Noise,
    Stall,
    Status,
    Help,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

impl CommandSpec {
    /// Returns `true` when `keyword` names this command, ignoring ASCII case.
    #[must_use]
    pub fn matches(&self, keyword: &str) -> bool {
        self.name.eq_ignore_ascii_case(keyword)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(keyword))
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "sample",
        aliases: &[],
        tag: CommandTag::Sample,
        usage: "sample [count]",
        summary: "run filtered acquisitions (default 1, max 16)",
    },
    CommandSpec {
        name: "script",
        aliases: &[],
        tag: CommandTag::Script,
        usage: "script <code>[,<code>...]",
        summary: "queue raw conversion results on the simulated front end",
    },
    CommandSpec {
        name: "level",
        aliases: &[],
        tag: CommandTag::Level,
        usage: "level <code>|off",
        summary: "set the simulated input level once the script runs dry",
    },
    CommandSpec {
        name: "noise",
        aliases: &[],
        tag: CommandTag::Noise,
        usage: "noise <amplitude>",
        summary: "add uniform noise of +/- amplitude codes to the level",
    },
    CommandSpec {
        name: "stall",
        aliases: &[],
        tag: CommandTag::Stall,
        usage: "stall [count|off]",
        summary: "stop the ready flag for count conversions, forever, or clear it",
    },
    CommandSpec {
        name: "status",
        aliases: &[],
        tag: CommandTag::Status,
        usage: "status",
        summary: "show sampler configuration and the last reading",
    },
    CommandSpec {
        name: "help",
        aliases: &["?"],
        tag: CommandTag::Help,
        usage: "help [command]",
        summary: "list commands or describe one",
    },
    CommandSpec {
        name: "exit",
        aliases: &["quit"],
        tag: CommandTag::Exit,
        usage: "exit",
        summary: "leave the emulator",
    },
];

/// Looks up a command by name or alias.
#[must_use]
pub fn find(keyword: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_their_command() {
        assert_eq!(find("QUIT").map(|spec| spec.tag), Some(CommandTag::Exit));
        assert_eq!(find("?").map(|spec| spec.tag), Some(CommandTag::Help));
        assert!(find("reboot").is_none());
    }

    #[test]
    fn names_are_unique() {
        for (index, spec) in COMMANDS.iter().enumerate() {
            assert!(
                COMMANDS[index + 1..]
                    .iter()
                    .all(|other| !other.matches(spec.name)),
                "duplicate keyword {}",
                spec.name
            );
        }
    }
}
