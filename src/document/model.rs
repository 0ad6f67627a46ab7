use chrono::{DateTime, Local};

pub const BEFORE_APPLY_LABEL: &str = "Before apply";
pub const BEFORE_RESTORE_LABEL: &str = "Before restore";

/// The single authoritative page being edited in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub content: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Immutable copy of the document content taken just before a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub label: String,
    pub content: String,
    pub taken_at: DateTime<Local>,
}

impl Snapshot {
    pub(crate) fn of(content: &str, label: &str) -> Self {
        Self {
            label: label.to_string(),
            content: content.to_string(),
            taken_at: Local::now(),
        }
    }
}

/// Record of a would-be fork. Nothing is duplicated when one is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkDescriptor {
    pub name: String,
    pub source_name: String,
    pub content_chars: usize,
    pub taken_at: DateTime<Local>,
}

/// Where the pending slot currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Idle,
    AwaitingProposal,
    Proposed,
}

impl PendingState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingProposal => "awaiting proposal",
            Self::Proposed => "proposed",
        }
    }
}
