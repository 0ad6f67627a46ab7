use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers},
    style::Stylize,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::command::{self, CockpitCommand};
use crate::document::{ControllerError, DocumentController, GenerationEvent, PendingState};
use crate::proposal::{GenerationError, Proposal};
use crate::ui::format::{
    command_echo, diff_lines, document_lines, error_lines, fork_lines, help_lines, history_lines,
    notice_lines, proposal_lines, snapshot_lines, success_lines, warning_lines,
};
use crate::ui::preview::PreviewSink;
use crate::ui::screen::Screen;
use crate::ui::symbols::Symbols;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Interactive front end: turns input lines into controller calls and
/// controller outcomes into transcript lines.
pub(crate) struct Cockpit {
    controller: DocumentController,
    preview: PreviewSink,
    events_tx: mpsc::Sender<GenerationEvent>,
    events_rx: mpsc::Receiver<GenerationEvent>,
    received_chars: usize,
    quit: bool,
}

impl Cockpit {
    pub(crate) fn new(controller: DocumentController, preview: PreviewSink) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            controller,
            preview,
            events_tx,
            events_rx,
            received_chars: 0,
            quit: false,
        }
    }

    pub(crate) fn controller(&self) -> &DocumentController {
        &self.controller
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.quit
    }

    /// Handle one submitted input line.
    pub(crate) fn handle_line(&mut self, line: &str) -> Vec<String> {
        let command = match command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Vec::new(),
            Err(e) => {
                let mut lines = command_echo(line.trim());
                lines.extend(warning_lines(&e.to_string()));
                return lines;
            }
        };
        let mut lines = command_echo(line.trim());
        lines.extend(self.dispatch(command));
        lines
    }

    pub(crate) fn dispatch(&mut self, command: CockpitCommand) -> Vec<String> {
        let outcome = match command {
            CockpitCommand::Submit(text) => self.submit(&text),
            CockpitCommand::Apply => self.controller.apply_pending().map(|()| {
                success_lines(&format!(
                    "Applied. Previous version kept as snapshot #{}.",
                    self.controller.snapshots().len()
                ))
            }),
            CockpitCommand::Discard => {
                let had_pending = self.controller.pending().is_some();
                self.controller.discard_pending();
                Ok(if had_pending {
                    notice_lines("Proposal discarded.")
                } else {
                    notice_lines("Nothing to discard.")
                })
            }
            CockpitCommand::Undo => self
                .controller
                .undo()
                .map(|()| success_lines("Restored the most recent snapshot.")),
            CockpitCommand::Snapshots => Ok(snapshot_lines(self.controller.snapshots())),
            CockpitCommand::Restore(index) => {
                self.controller.restore_snapshot(index).map(|()| {
                    success_lines(&format!(
                        "Restored snapshot #{}; the replaced version is snapshot #{}.",
                        index + 1,
                        self.controller.snapshots().len()
                    ))
                })
            }
            CockpitCommand::History => Ok(history_lines(
                self.controller.history(),
                self.controller.pending(),
            )),
            CockpitCommand::Proposal(index) => {
                self.controller.restore_proposal(index).map(|()| {
                    self.controller
                        .pending()
                        .map(|p| proposal_lines(p, index + 1))
                        .unwrap_or_default()
                })
            }
            CockpitCommand::Diff => Ok(match self.controller.pending() {
                Some(pending) => diff_lines(&self.controller.document().content, &pending.content),
                None => notice_lines("No proposal is pending."),
            }),
            CockpitCommand::Show => Ok(document_lines(self.controller.document())),
            CockpitCommand::Copy => Ok(self.copy_to_clipboard()),
            CockpitCommand::Rename(name) => self.controller.rename(&name).map(|()| {
                let name = &self.controller.document().name;
                success_lines(&format!("Project renamed to \"{name}\"."))
            }),
            CockpitCommand::Fork => {
                let fork = self.controller.fork();
                info!(
                    name = %fork.name,
                    source = %fork.source_name,
                    chars = fork.content_chars,
                    "fork recorded"
                );
                Ok(fork_lines(&fork))
            }
            CockpitCommand::Cancel => Ok(match self.controller.abandon_in_flight() {
                Some(ticket) => warning_lines(&format!(
                    "Generation #{ticket} cancelled; its result will be discarded."
                )),
                None => notice_lines("Nothing is being generated."),
            }),
            CockpitCommand::Help => Ok(help_lines()),
            CockpitCommand::Quit => {
                self.quit = true;
                Ok(Vec::new())
            }
        };

        let mut lines = match outcome {
            Ok(lines) => lines,
            Err(err) => {
                warn!(error = %err, "command failed");
                error_lines(&err)
            }
        };
        debug!(state = self.controller.state().as_str(), "command handled");
        lines.extend(self.sync_preview());
        lines
    }

    fn submit(&mut self, text: &str) -> Result<Vec<String>, ControllerError> {
        let ticket = self.controller.spawn_submit(text, self.events_tx.clone())?;
        self.received_chars = 0;
        info!(ticket, "generation requested");
        Ok(notice_lines(&format!(
            "Generating proposal #{ticket}... (Esc or /cancel to abandon)"
        )))
    }

    fn copy_to_clipboard(&self) -> Vec<String> {
        let (what, text) = match self.controller.pending() {
            Some(pending) => ("pending proposal", pending.content.as_str()),
            None => ("current document", self.controller.document().content.as_str()),
        };
        let copied = arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(text.to_string()))
            .context("clipboard unavailable");
        match copied {
            Ok(()) => success_lines(&format!(
                "Copied the {what} ({} chars).",
                text.chars().count()
            )),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "copy failed");
                warning_lines(&format!("{e:#}"))
            }
        }
    }

    /// Drain finished or progressing generations.
    pub(crate) fn poll_generation(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                GenerationEvent::Progress { ticket, chars } => {
                    if self.controller.in_flight_ticket() == Some(ticket) {
                        self.received_chars = chars;
                    }
                }
                GenerationEvent::Finished { ticket, result } => {
                    lines.extend(self.finish(ticket, result));
                }
            }
        }
        lines
    }

    fn finish(&mut self, ticket: u64, result: Result<Proposal, GenerationError>) -> Vec<String> {
        let mut lines = match self.controller.finish_submit(ticket, result) {
            Ok(proposal) => proposal_lines(&proposal, self.controller.history().len()),
            Err(ControllerError::Stale { ticket }) => {
                notice_lines(&format!("Discarded the result of cancelled generation #{ticket}."))
            }
            Err(err) => {
                warn!(ticket, error = %err, "generation failed");
                error_lines(&err)
            }
        };
        lines.extend(self.sync_preview());
        lines
    }

    fn sync_preview(&self) -> Vec<String> {
        let pending = self.controller.pending().map(|p| p.content.as_str());
        match self
            .preview
            .sync(&self.controller.document().content, pending)
        {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "preview sync failed");
                warning_lines(&format!("preview not updated: {e:#}"))
            }
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub(crate) fn status_line(&self) -> String {
        let sym = Symbols::current();
        let doc = self.controller.document();
        match self.controller.state() {
            PendingState::AwaitingProposal => format!(
                "Generating {} {} chars received",
                sym.dot, self.received_chars
            ),
            PendingState::Proposed => format!(
                "{} {} proposal ready {} /apply /discard /diff",
                doc.name.as_str().bold(),
                sym.dot,
                sym.dot
            ),
            PendingState::Idle => format!(
                "{} {} {} snapshots {} {} proposals",
                doc.name.as_str().bold(),
                sym.dot,
                self.controller.snapshots().len(),
                sym.dot,
                self.controller.history().len()
            ),
        }
    }

    pub(crate) fn hint_line(&self) -> String {
        format!(
            "preview: {} {} /help for commands",
            self.preview.current_path().display(),
            Symbols::current().dot
        )
    }
}

// ── Terminal loop ─────────────────────────────────────────────────────────────

pub(crate) async fn run_loop(cockpit: &mut Cockpit, screen: &mut Screen) -> anyhow::Result<()> {
    let startup = cockpit.sync_preview();
    if !startup.is_empty() {
        screen.emit(&startup);
    }
    update_footer(cockpit, screen);
    screen.refresh();

    loop {
        let finished = cockpit.poll_generation();
        if !finished.is_empty() {
            update_footer(cockpit, screen);
            screen.emit(&finished);
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(cockpit, screen, key.code, key.modifiers) {
                        break;
                    }
                }
                CEvent::Paste(text) => {
                    screen.insert_at_cursor(&text.replace(['\r', '\n'], " "));
                    screen.refresh();
                }
                _ => {}
            }
        }

        if cockpit.should_quit() {
            break;
        }
        if cockpit.is_busy() {
            update_footer(cockpit, screen);
            screen.tick();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    screen.finish();
    Ok(())
}

fn update_footer(cockpit: &Cockpit, screen: &mut Screen) {
    screen.is_running = cockpit.is_busy();
    screen.status = cockpit.status_line();
    screen.hint = cockpit.hint_line();
}

/// Returns true when the cockpit should exit.
fn handle_key(
    cockpit: &mut Cockpit,
    screen: &mut Screen,
    key: KeyCode,
    modifiers: KeyModifiers,
) -> bool {
    if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match key {
        KeyCode::Enter => {
            let line = screen.take_input();
            let lines = cockpit.handle_line(&line);
            update_footer(cockpit, screen);
            if lines.is_empty() {
                screen.refresh();
            } else {
                screen.emit(&lines);
            }
        }
        KeyCode::Esc if modifiers.is_empty() => {
            if cockpit.is_busy() {
                let lines = cockpit.dispatch(CockpitCommand::Cancel);
                update_footer(cockpit, screen);
                screen.emit(&lines);
            } else {
                screen.take_input();
                screen.refresh();
            }
        }
        KeyCode::Char(c) if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT => {
            screen.insert_char_at_cursor(c);
            screen.refresh();
        }
        KeyCode::Backspace => {
            if screen.delete_char_before_cursor().is_some() {
                screen.refresh();
            }
        }
        KeyCode::Left => {
            if screen.cursor_left() {
                screen.refresh();
            }
        }
        KeyCode::Right => {
            if screen.cursor_right() {
                screen.refresh();
            }
        }
        KeyCode::Home => {
            screen.cursor_home();
            screen.refresh();
        }
        KeyCode::End => {
            screen.cursor_end();
            screen.refresh();
        }
        _ => {}
    }

    false
}

/// Lines shown under the banner when the cockpit starts.
pub(crate) fn startup_subtitle(cockpit: &Cockpit, model: &str, base_url: &str) -> Vec<String> {
    let host = extract_host_from_url(base_url).unwrap_or_else(|| base_url.to_string());
    vec![
        format!("Pagesmith v{}", env!("CARGO_PKG_VERSION")),
        format!("{model} {} {host}", Symbols::current().dot),
        format!(
            "project: {} {} on_invalid: {}",
            cockpit.controller().document().name,
            Symbols::current().dot,
            cockpit.controller().service().options().on_invalid
        ),
    ]
}

fn extract_host_from_url(url: &str) -> Option<String> {
    let no_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = no_scheme.split('/').next().unwrap_or(no_scheme).trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use super::*;
    use crate::document::Document;
    use crate::proposal::OnInvalid;
    use crate::proposal::testing::{ScriptedGenerator, service};
    use crate::ui::screen::strip_ansi;

    const START: &str = "<html><body>A</body></html>";
    const FOOTER: &str = "<html><body>A<footer>F</footer></body></html>";

    fn cockpit(generator: Arc<ScriptedGenerator>, dir: &std::path::Path) -> Cockpit {
        let controller = DocumentController::new(
            Arc::new(service(generator, OnInvalid::Reject)),
            Document::new("My Site", START),
        );
        Cockpit::new(controller, PreviewSink::new(dir))
    }

    fn plain(lines: &[String]) -> String {
        lines
            .iter()
            .map(|l| strip_ansi(l))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn settle(cockpit: &mut Cockpit) -> String {
        for _ in 0..200 {
            let lines = cockpit.poll_generation();
            if !lines.is_empty() {
                return plain(&lines);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("generation never finished");
    }

    #[tokio::test]
    async fn submit_then_apply_updates_preview() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ck = cockpit(ScriptedGenerator::new().reply(FOOTER), tmp.path());

        let started = plain(&ck.handle_line("add a footer"));
        assert!(started.contains("Generating proposal #1"));
        assert!(ck.is_busy());

        let finished = settle(&mut ck).await;
        assert!(finished.contains("Proposal #1"));
        assert_eq!(
            fs::read_to_string(tmp.path().join("proposal.html")).unwrap(),
            FOOTER
        );

        let applied = plain(&ck.handle_line("/apply"));
        assert!(applied.contains("snapshot #1"));
        assert_eq!(ck.controller().document().content, FOOTER);
        assert_eq!(
            fs::read_to_string(tmp.path().join("current.html")).unwrap(),
            FOOTER
        );
        assert!(!tmp.path().join("proposal.html").exists());
    }

    #[tokio::test]
    async fn cancelled_generation_is_discarded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ck = cockpit(ScriptedGenerator::new().reply(FOOTER), tmp.path());

        ck.handle_line("add a footer");
        let cancelled = plain(&ck.handle_line("/cancel"));
        assert!(cancelled.contains("cancelled"));

        let finished = settle(&mut ck).await;
        assert!(finished.contains("Discarded the result"));
        assert!(ck.controller().pending().is_none());
        assert!(ck.controller().history().is_empty());
        assert!(!ck.is_busy());
    }

    #[tokio::test]
    async fn generation_failure_is_rendered_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ck = cockpit(ScriptedGenerator::new().reply("plain words"), tmp.path());

        ck.handle_line("add a footer");
        let finished = settle(&mut ck).await;

        assert!(finished.contains("not a full HTML document"));
        assert!(finished.contains("plain words"));
        assert_eq!(ck.controller().state(), PendingState::Idle);
    }

    #[tokio::test]
    async fn second_submission_while_busy_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ck = cockpit(
            ScriptedGenerator::new().reply(FOOTER).reply(FOOTER),
            tmp.path(),
        );

        ck.handle_line("first");
        let refused = plain(&ck.handle_line("second"));

        assert!(refused.contains("already being generated"));
        settle(&mut ck).await;
        assert_eq!(ck.controller().history().len(), 1);
    }

    #[test]
    fn errors_are_shown_and_state_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ck = cockpit(ScriptedGenerator::new(), tmp.path());

        assert!(plain(&ck.handle_line("/apply")).contains("no proposal is pending"));
        assert!(plain(&ck.handle_line("/restore 3")).contains("no entry #3"));
        assert!(plain(&ck.handle_line("/publish")).contains("unknown command"));
        assert_eq!(ck.controller().document().content, START);
        assert!(ck.controller().snapshots().is_empty());
    }

    #[test]
    fn fork_and_rename_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ck = cockpit(ScriptedGenerator::new(), tmp.path());

        assert!(plain(&ck.handle_line("/rename Landing")).contains("\"Landing\""));
        let forked = plain(&ck.handle_line("/fork"));

        assert!(forked.contains("\"Landing (Fork)\""));
        assert_eq!(ck.controller().document().name, "Landing");
    }

    #[test]
    fn quit_sets_flag_and_blank_input_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ck = cockpit(ScriptedGenerator::new(), tmp.path());

        assert!(ck.handle_line("   ").is_empty());
        ck.handle_line("/quit");

        assert!(ck.should_quit());
    }

    #[test]
    fn status_reflects_state() {
        let tmp = tempfile::tempdir().unwrap();
        let ck = cockpit(ScriptedGenerator::new(), tmp.path());

        let status = strip_ansi(&ck.status_line());

        assert!(status.starts_with("My Site"));
        assert!(status.contains("0 snapshots"));
    }

    #[test]
    fn host_is_extracted_from_base_url() {
        assert_eq!(
            extract_host_from_url("https://api.openai.com/v1"),
            Some("api.openai.com".to_string())
        );
        assert_eq!(extract_host_from_url("http://"), None);
    }
}
