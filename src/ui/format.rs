use crossterm::style::Stylize;
use similar::TextDiff;

use crate::app::command::builtin_commands;
use crate::document::{ControllerError, Document, ForkDescriptor, Snapshot};
use crate::proposal::{GenerationError, Proposal};
use crate::ui::symbols::Symbols;

const DIFF_CONTEXT_LINES: usize = 3;
const DIAGNOSTIC_LINES: usize = 4;

pub(crate) fn help_lines() -> Vec<String> {
    let entries: Vec<(String, &str)> =
        std::iter::once(("<text>".to_string(), "generate a proposal"))
            .chain(builtin_commands().map(|(name, usage, description)| {
                let cmd = if usage.is_empty() {
                    format!("/{name}")
                } else {
                    format!("/{name} {usage}")
                };
                (cmd, description)
            }))
            .collect();
    let width = entries.iter().map(|(cmd, _)| cmd.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|(cmd, text)| format!("  {}  {}", format!("{cmd:<width$}").cyan(), text.grey()))
        .collect()
}

pub(crate) fn command_echo(text: &str) -> Vec<String> {
    let sym = Symbols::current();
    vec![format!("{} {}", sym.prompt, text).bold().to_string()]
}

pub(crate) fn notice_lines(text: &str) -> Vec<String> {
    let sym = Symbols::current();
    vec![format!("  {} {}", sym.corner, text).grey().to_string()]
}

pub(crate) fn success_lines(text: &str) -> Vec<String> {
    let sym = Symbols::current();
    vec![format!("  {} {}", sym.check, text).green().to_string()]
}

pub(crate) fn warning_lines(text: &str) -> Vec<String> {
    let sym = Symbols::current();
    vec![format!("  {} {}", sym.warning, text).dark_yellow().to_string()]
}

pub(crate) fn proposal_lines(proposal: &Proposal, number: usize) -> Vec<String> {
    let sym = Symbols::current();
    vec![
        format!(
            "  {} Proposal #{number} {} {} {} {} chars",
            sym.record,
            sym.dot,
            proposal.info,
            sym.dot,
            proposal.content.chars().count()
        )
        .cyan()
        .to_string(),
        format!(
            "  {} /apply to accept, /discard to drop, /diff to review",
            sym.corner
        )
        .grey()
        .to_string(),
    ]
}

pub(crate) fn error_lines(err: &ControllerError) -> Vec<String> {
    let sym = Symbols::current();
    let message = match err {
        // Shown 1-based, as listed by /snapshots and /history.
        ControllerError::IndexOutOfRange { index, len } => {
            format!("no entry #{} (there are {len})", index + 1)
        }
        other => other.to_string(),
    };
    let mut lines = vec![format!("  {} {}", sym.warning, message).red().to_string()];
    if let ControllerError::Generation(generation) = err {
        lines.extend(diagnostic_lines(generation));
    }
    lines
}

fn diagnostic_lines(err: &GenerationError) -> Vec<String> {
    let Some(detail) = err.diagnostic() else {
        return Vec::new();
    };
    let sym = Symbols::current();
    let mut lines: Vec<String> = detail
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DIAGNOSTIC_LINES)
        .map(|l| format!("    {}", shorten_text(l, 110)).grey().to_string())
        .collect();
    if detail.lines().filter(|l| !l.trim().is_empty()).count() > DIAGNOSTIC_LINES {
        lines.push(format!("    {}", sym.ellipsis).grey().to_string());
    }
    lines
}

pub(crate) fn snapshot_lines(snapshots: &[Snapshot]) -> Vec<String> {
    if snapshots.is_empty() {
        return notice_lines("No snapshots yet.");
    }
    let sym = Symbols::current();
    let mut lines = vec![format!("  Snapshots ({})", snapshots.len()).bold().to_string()];
    for (i, snapshot) in snapshots.iter().enumerate() {
        lines.push(format!(
            "  {:>3}. {} {} {} {} {} chars",
            i + 1,
            snapshot.label,
            sym.dot.dark_grey(),
            snapshot.taken_at.format("%H:%M:%S").to_string().grey(),
            sym.dot.dark_grey(),
            snapshot.content.chars().count()
        ));
    }
    lines
}

pub(crate) fn history_lines(history: &[Proposal], pending: Option<&Proposal>) -> Vec<String> {
    if history.is_empty() {
        return notice_lines("No proposals generated yet.");
    }
    let sym = Symbols::current();
    let mut lines = vec![format!("  History ({})", history.len()).bold().to_string()];
    for (i, proposal) in history.iter().enumerate() {
        let marker = if pending.is_some_and(|p| p.content == proposal.content) {
            sym.record.cyan().to_string()
        } else {
            " ".to_string()
        };
        lines.push(format!(
            "{marker} {:>3}. {} {} {} {} {} chars",
            i + 1,
            shorten_text(&proposal.source_command, 60),
            sym.dot.dark_grey(),
            proposal.created_at.format("%H:%M:%S").to_string().grey(),
            sym.dot.dark_grey(),
            proposal.content.chars().count()
        ));
    }
    lines
}

pub(crate) fn fork_lines(fork: &ForkDescriptor) -> Vec<String> {
    success_lines(&format!(
        "Forked \"{}\" as \"{}\" ({} chars)",
        fork.source_name, fork.name, fork.content_chars
    ))
}

pub(crate) fn document_lines(document: &Document) -> Vec<String> {
    let mut lines = vec![
        format!(
            "  {} ({} chars)",
            document.name,
            document.content.chars().count()
        )
        .bold()
        .to_string(),
    ];
    let total = document.content.lines().count();
    let width = total.max(1).to_string().len();
    for (i, line) in document.content.lines().enumerate() {
        lines.push(format!(
            "  {} {}",
            format!("{:>width$}", i + 1).dark_grey(),
            line
        ));
    }
    lines
}

/// Unified diff of `current` against `proposed`, styled per line.
pub(crate) fn diff_lines(current: &str, proposed: &str) -> Vec<String> {
    if current == proposed {
        return notice_lines("Proposal is identical to the current document.");
    }
    let diff = TextDiff::from_lines(current, proposed);
    let text = diff
        .unified_diff()
        .context_radius(DIFF_CONTEXT_LINES)
        .header("current", "proposal")
        .to_string();
    text.lines().map(style_diff_line).collect()
}

fn style_diff_line(line: &str) -> String {
    let rendered = format!("  {line}");
    if line.starts_with("+++") || line.starts_with("---") {
        return rendered.dark_yellow().to_string();
    }
    if line.starts_with("@@") {
        return rendered.dark_grey().to_string();
    }
    if line.starts_with('+') {
        return rendered.green().to_string();
    }
    if line.starts_with('-') {
        return rendered.red().to_string();
    }
    rendered.white().to_string()
}

pub(crate) fn shorten_text(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars.saturating_sub(1)).collect();
    out.push_str(Symbols::current().ellipsis);
    out
}
