use std::sync::Arc;

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::model::{
    BEFORE_APPLY_LABEL, BEFORE_RESTORE_LABEL, Document, ForkDescriptor, PendingState, Snapshot,
};
use crate::proposal::{GenerationError, Proposal, ProposalService};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("a proposal is already being generated")]
    Busy,

    #[error("no proposal is pending")]
    NothingPending,

    #[error("index {index} is out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no snapshot to undo")]
    NothingToUndo,

    #[error("project name is empty")]
    EmptyName,

    #[error("submission #{ticket} was abandoned; its result was discarded")]
    Stale { ticket: u64 },

    #[error("submission #{ticket} is not in flight")]
    UnknownTicket { ticket: u64 },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Everything a generation needs, captured when the submission starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    pub id: u64,
    pub command: String,
    pub document: String,
}

/// Delivered by [`DocumentController::spawn_submit`] workers.
#[derive(Debug)]
pub enum GenerationEvent {
    Progress {
        ticket: u64,
        chars: usize,
    },
    Finished {
        ticket: u64,
        result: Result<Proposal, GenerationError>,
    },
}

#[derive(Debug)]
struct Flight {
    id: u64,
    stale: bool,
}

/// Sole owner and mutator of the document, its snapshots, the pending
/// proposal and the proposal history.
pub struct DocumentController {
    service: Arc<ProposalService>,
    document: Document,
    snapshots: Vec<Snapshot>,
    history: Vec<Proposal>,
    pending: Option<Proposal>,
    flight: Option<Flight>,
    next_ticket: u64,
}

impl DocumentController {
    pub fn new(service: Arc<ProposalService>, document: Document) -> Self {
        Self {
            service,
            document,
            snapshots: Vec::new(),
            history: Vec::new(),
            pending: None,
            flight: None,
            next_ticket: 1,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn history(&self) -> &[Proposal] {
        &self.history
    }

    pub fn pending(&self) -> Option<&Proposal> {
        self.pending.as_ref()
    }

    pub fn service(&self) -> &ProposalService {
        &self.service
    }

    pub fn state(&self) -> PendingState {
        if self.flight.is_some() {
            PendingState::AwaitingProposal
        } else if self.pending.is_some() {
            PendingState::Proposed
        } else {
            PendingState::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_some()
    }

    pub fn in_flight_ticket(&self) -> Option<u64> {
        self.flight.as_ref().map(|f| f.id)
    }

    // ── Submission ───────────────────────────────────────────────────────────

    /// Generate a proposal for `text` against the live document and make it
    /// pending. Dropping the returned future before it settles releases the
    /// in-flight guard without touching any other state.
    pub async fn submit_command(&mut self, text: &str) -> Result<Proposal, ControllerError> {
        let ticket = self.begin_submit(text)?;
        let service = Arc::clone(&self.service);
        let mut guard = FlightGuard {
            controller: self,
            ticket: ticket.id,
            armed: true,
        };
        let outcome = service.generate(&ticket.command, &ticket.document).await;
        guard.armed = false;
        guard.controller.finish_submit(ticket.id, outcome)
    }

    /// First half of a submission: validate, take the single-flight guard and
    /// capture the command plus the current content.
    pub fn begin_submit(&mut self, text: &str) -> Result<SubmitTicket, ControllerError> {
        let command = text.trim();
        if command.is_empty() {
            return Err(ControllerError::EmptyCommand);
        }
        if self.flight.is_some() {
            return Err(ControllerError::Busy);
        }

        let id = self.next_ticket;
        self.next_ticket += 1;
        self.flight = Some(Flight { id, stale: false });
        debug!(ticket = id, "submission started");

        Ok(SubmitTicket {
            id,
            command: command.to_string(),
            document: self.document.content.clone(),
        })
    }

    /// Second half of a submission. Always releases the in-flight guard for
    /// `ticket`; installs the proposal only if the flight was not abandoned.
    pub fn finish_submit(
        &mut self,
        ticket: u64,
        outcome: Result<Proposal, GenerationError>,
    ) -> Result<Proposal, ControllerError> {
        match self.flight.take() {
            Some(flight) if flight.id == ticket => {
                if flight.stale {
                    info!(ticket, "discarding result of abandoned submission");
                    return Err(ControllerError::Stale { ticket });
                }
            }
            other => {
                self.flight = other;
                return Err(ControllerError::UnknownTicket { ticket });
            }
        }

        let proposal = outcome?;
        self.history.push(proposal.clone());
        self.pending = Some(proposal.clone());
        info!(
            ticket,
            history = self.history.len(),
            chars = proposal.content.chars().count(),
            "proposal pending"
        );
        Ok(proposal)
    }

    /// Run the generation on a tokio task. Progress and the final outcome are
    /// sent on `events`; the owner must hand `Finished` back to
    /// [`finish_submit`](Self::finish_submit).
    pub fn spawn_submit(
        &mut self,
        text: &str,
        events: mpsc::Sender<GenerationEvent>,
    ) -> Result<u64, ControllerError> {
        let ticket = self.begin_submit(text)?;
        let service = Arc::clone(&self.service);
        let id = ticket.id;

        tokio::spawn(async move {
            let progress = events.clone();
            let mut received = 0usize;
            let result = service
                .generate_with(&ticket.command, &ticket.document, &mut |piece: &str| {
                    received += piece.chars().count();
                    let _ = progress.try_send(GenerationEvent::Progress {
                        ticket: id,
                        chars: received,
                    });
                })
                .await;
            let _ = events
                .send(GenerationEvent::Finished { ticket: id, result })
                .await;
        });

        Ok(id)
    }

    /// Mark the in-flight submission so its eventual result is discarded.
    /// The guard stays held until that result arrives.
    pub fn abandon_in_flight(&mut self) -> Option<u64> {
        let flight = self.flight.as_mut()?;
        flight.stale = true;
        info!(ticket = flight.id, "submission abandoned");
        Some(flight.id)
    }

    // ── Pending slot ─────────────────────────────────────────────────────────

    pub fn apply_pending(&mut self) -> Result<(), ControllerError> {
        let proposal = self.pending.take().ok_or(ControllerError::NothingPending)?;
        self.snapshots
            .push(Snapshot::of(&self.document.content, BEFORE_APPLY_LABEL));
        self.document.content = proposal.content;
        info!(snapshots = self.snapshots.len(), "proposal applied");
        Ok(())
    }

    pub fn discard_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!("pending proposal discarded");
        }
    }

    /// Re-install a past history entry as the pending proposal.
    pub fn restore_proposal(&mut self, history_index: usize) -> Result<(), ControllerError> {
        let entry = self
            .history
            .get(history_index)
            .ok_or(ControllerError::IndexOutOfRange {
                index: history_index,
                len: self.history.len(),
            })?;
        let restored = Proposal::new(
            entry.content.clone(),
            format!("Restored from history #{}", history_index + 1),
            entry.source_command.clone(),
        );
        self.pending = Some(restored);
        debug!(history_index, "history entry restored as pending");
        Ok(())
    }

    // ── Snapshots ────────────────────────────────────────────────────────────

    pub fn restore_snapshot(&mut self, index: usize) -> Result<(), ControllerError> {
        let content = self
            .snapshots
            .get(index)
            .map(|s| s.content.clone())
            .ok_or(ControllerError::IndexOutOfRange {
                index,
                len: self.snapshots.len(),
            })?;
        self.snapshots
            .push(Snapshot::of(&self.document.content, BEFORE_RESTORE_LABEL));
        self.document.content = content;
        info!(index, snapshots = self.snapshots.len(), "snapshot restored");
        Ok(())
    }

    /// Restore the most recent snapshot. Since restoring records a snapshot
    /// itself, undoing twice returns to where the first undo started.
    pub fn undo(&mut self) -> Result<(), ControllerError> {
        let last = self
            .snapshots
            .len()
            .checked_sub(1)
            .ok_or(ControllerError::NothingToUndo)?;
        self.restore_snapshot(last)
    }

    // ── Project ──────────────────────────────────────────────────────────────

    pub fn rename(&mut self, name: &str) -> Result<(), ControllerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ControllerError::EmptyName);
        }
        self.document.name = name.to_string();
        Ok(())
    }

    /// Describe a fork of the current document. No state is duplicated.
    pub fn fork(&self) -> ForkDescriptor {
        ForkDescriptor {
            name: format!("{} (Fork)", self.document.name),
            source_name: self.document.name.clone(),
            content_chars: self.document.content.chars().count(),
            taken_at: Local::now(),
        }
    }
}

/// Releases the flight if a [`DocumentController::submit_command`] future is
/// dropped before the generation settles.
struct FlightGuard<'a> {
    controller: &'a mut DocumentController,
    ticket: u64,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self
            .controller
            .flight
            .as_ref()
            .is_some_and(|f| f.id == self.ticket)
        {
            self.controller.flight = None;
            debug!(ticket = self.ticket, "submission dropped before settling");
        }
    }
}
