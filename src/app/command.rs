// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    Apply,
    Discard,
    Undo,
    Snapshots,
    Restore,
    History,
    Proposal,
    Diff,
    Show,
    Copy,
    Rename,
    Fork,
    Cancel,
    Help,
    Quit,
}

/// One line of cockpit input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CockpitCommand {
    /// Free text: ask for a proposal.
    Submit(String),
    Apply,
    Discard,
    Undo,
    Snapshots,
    /// Zero-based snapshot index.
    Restore(usize),
    History,
    /// Zero-based history index.
    Proposal(usize),
    Diff,
    Show,
    Copy,
    Rename(String),
    Fork,
    Cancel,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `/{0}` (try /help)")]
    Unknown(String),

    #[error("usage: /{name} {usage}")]
    MissingArgument {
        name: &'static str,
        usage: &'static str,
    },

    #[error("/{name} takes no argument (got `{value}`)")]
    UnexpectedArgument { name: &'static str, value: String },

    #[error("`{value}` is not a valid number for /{name} (numbers start at 1)")]
    BadNumber { name: &'static str, value: String },
}

// ── Builtin table (single source for parsing and help) ───────────────────────

/// (variant, name, argument usage, description)
const BUILTIN_COMMANDS: &[(BuiltinCommand, &str, &str, &str)] = &[
    (
        BuiltinCommand::Apply,
        "apply",
        "",
        "replace the document with the pending proposal",
    ),
    (BuiltinCommand::Discard, "discard", "", "drop the pending proposal"),
    (
        BuiltinCommand::Undo,
        "undo",
        "",
        "restore the most recent snapshot",
    ),
    (BuiltinCommand::Snapshots, "snapshots", "", "list snapshots"),
    (BuiltinCommand::Restore, "restore", "<n>", "restore snapshot n"),
    (
        BuiltinCommand::History,
        "history",
        "",
        "list generated proposals",
    ),
    (
        BuiltinCommand::Proposal,
        "proposal",
        "<n>",
        "make history entry n pending again",
    ),
    (
        BuiltinCommand::Diff,
        "diff",
        "",
        "diff the document against the pending proposal",
    ),
    (BuiltinCommand::Show, "show", "", "print the current document"),
    (
        BuiltinCommand::Copy,
        "copy",
        "",
        "copy the pending proposal (or the document) to the clipboard",
    ),
    (BuiltinCommand::Rename, "rename", "<name>", "rename the project"),
    (
        BuiltinCommand::Fork,
        "fork",
        "",
        "record a fork of the current document",
    ),
    (
        BuiltinCommand::Cancel,
        "cancel",
        "",
        "abandon the generation in flight (also Esc)",
    ),
    (BuiltinCommand::Help, "help", "", "show this list"),
    (BuiltinCommand::Quit, "quit", "", "leave the cockpit (also Ctrl+C)"),
];

pub(crate) fn builtin_commands() -> impl Iterator<Item = (&'static str, &'static str, &'static str)>
{
    BUILTIN_COMMANDS
        .iter()
        .map(|(_, name, usage, description)| (*name, *usage, *description))
}

fn lookup(name: &str) -> Option<(BuiltinCommand, &'static str, &'static str)> {
    BUILTIN_COMMANDS
        .iter()
        .find(|(_, n, ..)| n.eq_ignore_ascii_case(name))
        .map(|(variant, n, usage, _)| (*variant, *n, *usage))
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse one input line. Blank input yields `Ok(None)`. A leading `//`
/// submits the rest (starting with `/`) as plain text.
pub fn parse(line: &str) -> Result<Option<CockpitCommand>, CommandError> {
    let text = line.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.starts_with("//") {
        return Ok(Some(CockpitCommand::Submit(text[1..].to_string())));
    }
    let Some(rest) = text.strip_prefix('/') else {
        return Ok(Some(CockpitCommand::Submit(text.to_string())));
    };

    let (word, arg) = match rest.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (rest, ""),
    };
    let (builtin, name, usage) = lookup(word).ok_or_else(|| CommandError::Unknown(word.into()))?;

    let required = |arg: &str| {
        if arg.is_empty() {
            Err(CommandError::MissingArgument { name, usage })
        } else {
            Ok(arg.to_string())
        }
    };
    let bare = |command: CockpitCommand| {
        if arg.is_empty() {
            Ok(command)
        } else {
            Err(CommandError::UnexpectedArgument {
                name,
                value: arg.to_string(),
            })
        }
    };
    let number = |arg: &str| -> Result<usize, CommandError> {
        let raw = required(arg)?;
        raw.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or(CommandError::BadNumber { name, value: raw })
    };

    let command = match builtin {
        BuiltinCommand::Apply => bare(CockpitCommand::Apply)?,
        BuiltinCommand::Discard => bare(CockpitCommand::Discard)?,
        BuiltinCommand::Undo => bare(CockpitCommand::Undo)?,
        BuiltinCommand::Snapshots => bare(CockpitCommand::Snapshots)?,
        BuiltinCommand::Restore => CockpitCommand::Restore(number(arg)?),
        BuiltinCommand::History => bare(CockpitCommand::History)?,
        BuiltinCommand::Proposal => CockpitCommand::Proposal(number(arg)?),
        BuiltinCommand::Diff => bare(CockpitCommand::Diff)?,
        BuiltinCommand::Show => bare(CockpitCommand::Show)?,
        BuiltinCommand::Copy => bare(CockpitCommand::Copy)?,
        BuiltinCommand::Rename => CockpitCommand::Rename(required(arg)?),
        BuiltinCommand::Fork => bare(CockpitCommand::Fork)?,
        BuiltinCommand::Cancel => bare(CockpitCommand::Cancel)?,
        BuiltinCommand::Help => bare(CockpitCommand::Help)?,
        BuiltinCommand::Quit => bare(CockpitCommand::Quit)?,
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_submission() {
        assert_eq!(
            parse("  add a footer  "),
            Ok(Some(CockpitCommand::Submit("add a footer".into())))
        );
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn double_slash_escapes_a_submission() {
        assert_eq!(
            parse("//apply is a word"),
            Ok(Some(CockpitCommand::Submit("/apply is a word".into())))
        );
    }

    #[test]
    fn numbers_are_one_based() {
        assert_eq!(parse("/restore 1"), Ok(Some(CockpitCommand::Restore(0))));
        assert_eq!(parse("/PROPOSAL 3"), Ok(Some(CockpitCommand::Proposal(2))));
        assert_eq!(
            parse("/restore 0"),
            Err(CommandError::BadNumber {
                name: "restore",
                value: "0".into()
            })
        );
        assert_eq!(
            parse("/proposal two"),
            Err(CommandError::BadNumber {
                name: "proposal",
                value: "two".into()
            })
        );
    }

    #[test]
    fn missing_arguments_report_usage() {
        let err = parse("/rename   ").unwrap_err();
        assert_eq!(
            err,
            CommandError::MissingArgument {
                name: "rename",
                usage: "<name>"
            }
        );
        assert_eq!(err.to_string(), "usage: /rename <name>");
    }

    #[test]
    fn bare_commands_reject_trailing_text() {
        let err = parse("/apply now").unwrap_err();
        assert_eq!(
            err,
            CommandError::UnexpectedArgument {
                name: "apply",
                value: "now".into()
            }
        );
        assert_eq!(err.to_string(), "/apply takes no argument (got `now`)");
        assert_eq!(parse("/quit  "), Ok(Some(CockpitCommand::Quit)));
    }

    #[test]
    fn rename_keeps_inner_spaces() {
        assert_eq!(
            parse("/rename  Landing Page "),
            Ok(Some(CockpitCommand::Rename("Landing Page".into())))
        );
    }

    #[test]
    fn unknown_commands_are_errors() {
        assert_eq!(
            parse("/publish"),
            Err(CommandError::Unknown("publish".into()))
        );
    }

    #[test]
    fn every_builtin_parses() {
        for (name, usage, _) in builtin_commands() {
            let line = if usage.is_empty() {
                format!("/{name}")
            } else {
                format!("/{name} 1")
            };
            assert!(parse(&line).is_ok(), "{line} should parse");
        }
    }
}
